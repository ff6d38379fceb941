//! Domain module - the canonical GeoKret entity and its vocabularies
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod constants;
pub mod geokret;

pub use constants::{GK_CSV_COLUMNS, GK_DESCRIPTION_MAX};
pub use geokret::{CacheRating, Geokret, GeokretType, UnknownTypeError};
