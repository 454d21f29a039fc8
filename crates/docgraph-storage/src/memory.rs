//! In-memory document store

use crate::documents::{prepare_insert, prepare_replace};
use crate::error::{StoreError, StoreResult};
use crate::eval::{evaluate, DocumentSource};
use crate::traits::{CollectionKind, Cursor, DocumentStore};
use async_trait::async_trait;
use docgraph_core::{AqlQuery, DocumentMeta, GraphDefinition};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tracing::debug;

struct Collection {
    kind: CollectionKind,
    documents: BTreeMap<String, Value>,
}

impl Collection {
    fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            documents: BTreeMap::new(),
        }
    }
}

/// In-memory document store
///
/// Useful for testing and for graphs that need not outlive the process.
/// Query results are a snapshot taken under the read locks; the cursor then
/// walks the copy, so later writes are not visible to it.
///
/// Lock order is `collections` before `graphs` wherever both are held.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    graphs: RwLock<HashMap<String, GraphDefinition>>,
}

fn lock_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(format!("Lock error: {}", e))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            graphs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

struct Snapshot<'a> {
    collections: &'a HashMap<String, Collection>,
    graphs: &'a HashMap<String, GraphDefinition>,
}

impl DocumentSource for Snapshot<'_> {
    fn scan(&self, collection: &str) -> StoreResult<Vec<Value>> {
        self.collections
            .get(collection)
            .map(|c| c.documents.values().cloned().collect())
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }

    fn lookup(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|c| c.documents.get(key))
            .cloned())
    }

    fn has_graph(&self, name: &str) -> StoreResult<bool> {
        Ok(self.graphs.contains_key(name))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }

    async fn collection_exists(&self, name: &str) -> StoreResult<bool> {
        let collections = self.collections.read().map_err(lock_error)?;
        Ok(collections.contains_key(name))
    }

    async fn create_collection(&self, name: &str, kind: CollectionKind) -> StoreResult<()> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        if collections.contains_key(name) {
            return Err(StoreError::Conflict(format!("collection {}", name)));
        }
        debug!(collection = name, ?kind, "Creating collection");
        collections.insert(name.to_string(), Collection::new(kind));
        Ok(())
    }

    async fn get_document(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().map_err(lock_error)?;
        let collection = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        Ok(collection.documents.get(key).cloned())
    }

    async fn insert_document(&self, collection: &str, document: Value) -> StoreResult<DocumentMeta> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let (meta, stored) = prepare_insert(collection, target.kind, document, |key| {
            Ok(target.documents.contains_key(key))
        })?;
        target.documents.insert(meta.key.clone(), stored);
        Ok(meta)
    }

    async fn replace_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> StoreResult<DocumentMeta> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        if !target.documents.contains_key(key) {
            return Err(StoreError::NotFound(format!("{}/{}", collection, key)));
        }

        let (meta, stored) = prepare_replace(collection, target.kind, key, document)?;
        target.documents.insert(key.to_string(), stored);
        Ok(meta)
    }

    async fn remove_document(&self, collection: &str, key: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        target
            .documents
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, key)))
    }

    async fn query(&self, query: &AqlQuery) -> StoreResult<Cursor> {
        let collections = self.collections.read().map_err(lock_error)?;
        let graphs = self.graphs.read().map_err(lock_error)?;
        let snapshot = Snapshot {
            collections: &collections,
            graphs: &graphs,
        };
        let documents = evaluate(&snapshot, query)?;
        Ok(stream::iter(documents.into_iter().map(Ok)).boxed())
    }

    async fn graph_definition(&self, name: &str) -> StoreResult<Option<GraphDefinition>> {
        let graphs = self.graphs.read().map_err(lock_error)?;
        Ok(graphs.get(name).cloned())
    }

    async fn create_graph(&self, definition: &GraphDefinition) -> StoreResult<()> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        let mut graphs = self.graphs.write().map_err(lock_error)?;
        if graphs.contains_key(&definition.name) {
            return Err(StoreError::Conflict(format!("graph {}", definition.name)));
        }

        for (name, kind) in definition_collections(definition) {
            collections.entry(name).or_insert_with(|| Collection::new(kind));
        }
        debug!(graph = %definition.name, "Creating graph");
        graphs.insert(definition.name.clone(), definition.clone());
        Ok(())
    }
}

/// Every collection a graph definition names, with its kind
pub(crate) fn definition_collections(definition: &GraphDefinition) -> Vec<(String, CollectionKind)> {
    let mut names = Vec::new();
    for edge in &definition.edge_definitions {
        names.push((edge.collection.clone(), CollectionKind::Edge));
        for vertex in edge.from.iter().chain(&edge.to) {
            names.push((vertex.clone(), CollectionKind::Document));
        }
    }
    for orphan in &definition.orphan_collections {
        names.push((orphan.clone(), CollectionKind::Document));
    }
    names
}
