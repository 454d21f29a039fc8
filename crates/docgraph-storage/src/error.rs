//! Storage error types

use thiserror::Error;

/// Result type alias for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Query interrupted: {0}")]
    Interrupted(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "redb")]
    #[error("ReDB error: {0}")]
    Redb(#[from] ::redb::Error),

    #[cfg(feature = "redb")]
    #[error("ReDB database error: {0}")]
    RedbDatabase(#[from] ::redb::DatabaseError),

    #[cfg(feature = "redb")]
    #[error("ReDB table error: {0}")]
    RedbTable(#[from] ::redb::TableError),

    #[cfg(feature = "redb")]
    #[error("ReDB storage error: {0}")]
    RedbStorage(#[from] ::redb::StorageError),

    #[cfg(feature = "redb")]
    #[error("ReDB commit error: {0}")]
    RedbCommit(#[from] ::redb::CommitError),

    #[cfg(feature = "redb")]
    #[error("ReDB transaction error: {0}")]
    RedbTransaction(#[from] ::redb::TransactionError),
}

impl StoreError {
    /// The addressed document, or its collection, does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::CollectionNotFound(_))
    }
}
