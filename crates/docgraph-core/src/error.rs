//! Error types for Docgraph Core

use thiserror::Error;

/// Result type alias using Docgraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Docgraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid character in {what} '{value}': '_' and '/' are reserved")]
    InvalidCharacter { what: &'static str, value: String },

    #[error("Empty {0} name")]
    EmptyName(&'static str),

    #[error("Mismatched label: id carries '{found}' but label '{expected}' was given")]
    MismatchedLabel { expected: String, found: String },

    #[error("Malformed relation '{0}': expected collection:[from,...]->[to,...]")]
    MalformedRelation(String),

    #[error("Invalid schema configuration: {0}")]
    SchemaConfig(String),

    #[error("Edge collection '{0}' is not covered by any relation")]
    MissingEdgeDefinition(String),

    #[error("Schema mismatch in graph '{graph}': {detail}")]
    SchemaMismatch { graph: String, detail: String },

    #[error("Incompatible graph version: stored version {found} is newer than supported version {supported}")]
    IncompatibleVersion { found: u32, supported: u32 },

    #[error("Element already exists: {0}")]
    ElementExists(String),

    #[error("Traversal interrupted: {0}")]
    TraversalInterrupted(String),

    #[error("Unknown collection '{0}' for this graph")]
    UnknownCollection(String),

    #[error("Relation '{collection}' does not allow {vertex} as its {side} vertex")]
    InvalidEndpoint {
        collection: String,
        side: &'static str,
        vertex: String,
    },

    #[error("Unsupported property value: {0}")]
    UnsupportedValue(String),

    #[error("Invalid element state: {0}")]
    InvalidState(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error was raised by local validation, before any store call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidCharacter { .. }
                | Error::EmptyName(_)
                | Error::MismatchedLabel { .. }
                | Error::MalformedRelation(_)
                | Error::SchemaConfig(_)
                | Error::MissingEdgeDefinition(_)
                | Error::UnknownCollection(_)
                | Error::InvalidEndpoint { .. }
                | Error::UnsupportedValue(_)
                | Error::Config(_)
        )
    }
}
