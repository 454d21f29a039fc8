//! Docgraph Storage - the document store boundary
//!
//! [`DocumentStore`] is everything the graph client needs from a document
//! database: collections, point reads and writes, query execution and graph
//! definitions. Two embedded stores are provided; both execute the fixed
//! query shapes generated by `docgraph_core::QueryBuilder`.

#![allow(clippy::result_large_err)]

pub mod documents;
pub mod error;
mod eval;
pub mod traits;

#[cfg(feature = "redb")]
pub mod redb;

pub mod memory;

pub use error::{StoreError, StoreResult};
pub use traits::{CollectionKind, Cursor, DocumentStore};

#[cfg(feature = "redb")]
pub use redb::RedbStore;

pub use memory::MemoryStore;
