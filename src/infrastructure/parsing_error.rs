//! Parsing error taxonomy
//!
//! One error type shared by the three extraction grammars, with
//! context-aware constructors. Structural failures propagate to the caller;
//! the list parser absorbs field-level failures per row instead.

use thiserror::Error;

use crate::domain::geokret::{Geokret, UnknownTypeError};

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    /// The XML export stream is not well formed. Fatal to the whole
    /// stream parse; entities fully closed before the failure point are
    /// carried in `partial`.
    #[error("malformed XML stream at byte {position}: {message}")]
    MalformedStream {
        position: u64,
        message: String,
        partial: Vec<Geokret>,
    },

    /// An expected structural landmark (table, row, cell, attribute) is
    /// missing, or a fixed textual pattern failed to match.
    #[error("page structure mismatch at {landmark}: {reason}")]
    PageStructure { landmark: String, reason: String },

    /// A type label or code outside the closed vocabulary.
    #[error(transparent)]
    UnknownType(#[from] UnknownTypeError),
}

impl ParsingError {
    /// Create a malformed-stream error carrying the entities completed
    /// before the failure point.
    pub fn malformed_stream(
        position: u64,
        message: impl Into<String>,
        partial: Vec<Geokret>,
    ) -> Self {
        Self::MalformedStream {
            position,
            message: message.into(),
            partial,
        }
    }

    /// Create a page-structure error naming the missing landmark.
    pub fn page_structure(landmark: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PageStructure {
            landmark: landmark.into(),
            reason: reason.into(),
        }
    }

    /// Entities completed before a stream failure, if any.
    #[must_use]
    pub fn partial_output(&self) -> &[Geokret] {
        match self {
            Self::MalformedStream { partial, .. } => partial,
            _ => &[],
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
