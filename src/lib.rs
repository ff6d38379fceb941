//! geokrety-client - client-side abstraction for geokrety.org
//!
//! Authenticates against the site, retrieves a user's inventory of tracked
//! items and their per-item details by scraping HTML pages or parsing the
//! XML export feed, and supports creating/updating items and exporting or
//! importing inventories as CSV.
//!
//! The parsing core is three independent extraction grammars feeding one
//! canonical [`Geokret`] record; network access lives behind the
//! [`infrastructure::http_client::Transport`] boundary.

// Module declarations
pub mod domain;
pub mod infrastructure;

// Re-export the public surface for easier access
pub use domain::geokret::{CacheRating, Geokret, GeokretType, UnknownTypeError};
pub use infrastructure::connector::{Credentials, GeokretyConnector};
pub use infrastructure::parsing::{
    DetailPageParser, InventoryXmlParser, ListPageParser, PageParser,
};
pub use infrastructure::parsing_error::{ParsingError, ParsingResult};
