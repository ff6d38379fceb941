//! HTML and XML parsing infrastructure
//!
//! Three extraction grammars feed the one canonical entity: the detail
//! page (one entity, all-or-nothing), the inventory listing page (one
//! entity per row, best effort) and the XML export feed (streaming).

pub mod detail_parser;
pub mod error;
pub mod list_parser;
pub mod xml_parser;

pub use detail_parser::DetailPageParser;
pub use error::{ParsingError, ParsingResult};
pub use list_parser::ListPageParser;
pub use xml_parser::InventoryXmlParser;

/// Parser over a full HTML document held in memory.
pub trait PageParser {
    type Output;

    /// Parse the full text of one page.
    fn parse(&self, document: &str) -> ParsingResult<Self::Output>;
}
