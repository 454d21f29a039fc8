//! Two clients opening the same new graph at once

use async_trait::async_trait;
use docgraph_client::GraphClient;
use docgraph_core::naming::GRAPH_VARIABLES_COLLECTION;
use docgraph_core::{AqlQuery, DocumentMeta, Error, GraphConfig, GraphDefinition, GraphType};
use docgraph_storage::{CollectionKind, Cursor, DocumentStore, MemoryStore, StoreResult};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Delegates to a memory store, but reads miss the graph definition until the
/// next `create_graph` and the variables record until the next insert, as if
/// another client had written both just after they were read
struct StaleReadStore {
    inner: MemoryStore,
    hide_graph: AtomicBool,
    hide_variables: AtomicBool,
}

#[async_trait]
impl DocumentStore for StaleReadStore {
    async fn health_check(&self) -> StoreResult<bool> {
        self.inner.health_check().await
    }

    async fn collection_exists(&self, name: &str) -> StoreResult<bool> {
        self.inner.collection_exists(name).await
    }

    async fn create_collection(&self, name: &str, kind: CollectionKind) -> StoreResult<()> {
        self.inner.create_collection(name, kind).await
    }

    async fn get_document(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        if collection == GRAPH_VARIABLES_COLLECTION && self.hide_variables.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get_document(collection, key).await
    }

    async fn insert_document(&self, collection: &str, document: Value) -> StoreResult<DocumentMeta> {
        self.hide_variables.store(false, Ordering::SeqCst);
        self.inner.insert_document(collection, document).await
    }

    async fn replace_document(&self, collection: &str, key: &str, document: Value) -> StoreResult<DocumentMeta> {
        self.inner.replace_document(collection, key, document).await
    }

    async fn remove_document(&self, collection: &str, key: &str) -> StoreResult<()> {
        self.inner.remove_document(collection, key).await
    }

    async fn query(&self, query: &AqlQuery) -> StoreResult<Cursor> {
        self.inner.query(query).await
    }

    async fn graph_definition(&self, name: &str) -> StoreResult<Option<GraphDefinition>> {
        if self.hide_graph.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.graph_definition(name).await
    }

    async fn create_graph(&self, definition: &GraphDefinition) -> StoreResult<()> {
        self.hide_graph.store(false, Ordering::SeqCst);
        self.inner.create_graph(definition).await
    }
}

fn complex(relations: &[&str]) -> GraphConfig {
    let mut config = GraphConfig::new("g");
    config.graph_type = GraphType::Complex;
    config.relations = relations.iter().map(|r| r.to_string()).collect();
    config
}

async fn opened_then_stale(config: GraphConfig) -> Arc<StaleReadStore> {
    let store = Arc::new(StaleReadStore {
        inner: MemoryStore::new(),
        hide_graph: AtomicBool::new(false),
        hide_variables: AtomicBool::new(false),
    });
    GraphClient::open(store.clone(), config).await.unwrap();
    store.hide_graph.store(true, Ordering::SeqCst);
    store.hide_variables.store(true, Ordering::SeqCst);
    store
}

#[tokio::test]
async fn test_losing_open_adopts_matching_schema() {
    let store = opened_then_stale(complex(&["e:[a]->[b]"])).await;
    let before = store.inner.graph_definition("g").await.unwrap();

    let client = GraphClient::open(store.clone(), complex(&["e:[a]->[b]"])).await.unwrap();
    assert_eq!(store.inner.graph_definition("g").await.unwrap(), before);

    let variables = client.variables().await.unwrap();
    assert_eq!(variables.version(), docgraph_core::SCHEMA_VERSION);
}

#[tokio::test]
async fn test_losing_open_rejects_different_schema() {
    let store = opened_then_stale(complex(&["e:[a]->[b]"])).await;
    let before = store.inner.graph_definition("g").await.unwrap();

    let err = GraphClient::open(store.clone(), complex(&["e:[b]->[a]"])).await.unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }), "{:?}", err);
    assert_eq!(store.inner.graph_definition("g").await.unwrap(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_first_opens() {
    for _ in 0..50 {
        let store = Arc::new(MemoryStore::new());
        let opens: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { GraphClient::open(store, complex(&["e:[a]->[b]"])).await })
            })
            .collect();
        for open in opens {
            open.await.unwrap().unwrap();
        }
        assert!(store.graph_exists("g").await.unwrap());
    }
}
