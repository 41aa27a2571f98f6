//! Error types for the tag model.

use thiserror::Error;

/// Errors raised while parsing tags or identifiers from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TagParseError {
    #[error("Tag '{input}' is missing the ':' separator")]
    MissingSeparator { input: String },

    #[error("Unknown tag type: {name}")]
    UnknownType { name: String },

    #[error("Entity identifier must not be empty")]
    EmptyId,

    #[error("Entity identifier '{0}' is reserved for collection tags")]
    ReservedId(&'static str),
}
