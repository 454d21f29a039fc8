//! Document store trait definitions

use crate::error::StoreResult;
use async_trait::async_trait;
use docgraph_core::{AqlQuery, DocumentMeta, GraphDefinition};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single-pass query results
///
/// Consumers pull items one at a time. A backend may still produce the
/// items from a snapshot it evaluated up front; the embedded stores do.
pub type Cursor = BoxStream<'static, StoreResult<Value>>;

/// Kind of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Plain documents (vertices, variables)
    Document,
    /// Documents with `_from`/`_to` references
    Edge,
}

/// Trait for document store implementations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Health check
    async fn health_check(&self) -> StoreResult<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Collections
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether a collection exists
    async fn collection_exists(&self, name: &str) -> StoreResult<bool>;

    /// Create a collection; creating an existing one is a conflict
    async fn create_collection(&self, name: &str, kind: CollectionKind) -> StoreResult<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a document by key
    async fn get_document(&self, collection: &str, key: &str) -> StoreResult<Option<Value>>;

    /// Insert a document; a `_key` already present is a conflict, a missing
    /// one is assigned
    async fn insert_document(&self, collection: &str, document: Value) -> StoreResult<DocumentMeta>;

    /// Replace an existing document
    async fn replace_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> StoreResult<DocumentMeta>;

    /// Remove a document; a missing document is `NotFound`
    async fn remove_document(&self, collection: &str, key: &str) -> StoreResult<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute a query
    async fn query(&self, query: &AqlQuery) -> StoreResult<Cursor>;

    // ─────────────────────────────────────────────────────────────────────────
    // Graph definitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a graph definition by name
    async fn graph_definition(&self, name: &str) -> StoreResult<Option<GraphDefinition>>;

    /// Create a graph definition and any collections it names
    async fn create_graph(&self, definition: &GraphDefinition) -> StoreResult<()>;

    /// Whether a graph definition exists
    async fn graph_exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.graph_definition(name).await?.is_some())
    }
}
