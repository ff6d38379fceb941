//! Infrastructure layer for transport, parsing, persistence and logging
//!
//! This module provides the HTTP transport and session handling, the three
//! page/stream parsers, CSV persistence, configuration and logging.

pub mod config;
pub mod connector;
pub mod csv_store;
pub mod http_client;
pub mod logging;
pub mod parsing; // extraction grammars for the three source formats
pub mod parsing_error; // shared parsing error taxonomy

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager};
pub use connector::{Credentials, GeokretyConnector};
pub use http_client::{FormOutcome, HttpClient, HttpClientConfig, Transport};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{DetailPageParser, InventoryXmlParser, ListPageParser, PageParser};
pub use parsing_error::{ParsingError, ParsingResult};
