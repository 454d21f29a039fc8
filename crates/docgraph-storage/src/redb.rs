//! ReDB document store
//!
//! Each collection lives in its own table, keyed by document key. A catalog
//! table records which collections exist and their kind; graph definitions
//! are kept as JSON in a separate table.

use crate::documents::{prepare_insert, prepare_replace};
use crate::error::{StoreError, StoreResult};
use crate::eval::{evaluate, DocumentSource};
use crate::memory::definition_collections;
use crate::traits::{CollectionKind, Cursor, DocumentStore};
use async_trait::async_trait;
use docgraph_core::{AqlQuery, DocumentMeta, GraphDefinition};
use futures::stream::{self, StreamExt};
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const COLLECTIONS: TableDefinition<&str, &str> = TableDefinition::new("collections");
const GRAPHS: TableDefinition<&str, &[u8]> = TableDefinition::new("graphs");

fn table_name(collection: &str) -> String {
    format!("doc:{}", collection)
}

fn kind_tag(kind: CollectionKind) -> &'static str {
    match kind {
        CollectionKind::Document => "document",
        CollectionKind::Edge => "edge",
    }
}

fn parse_kind(tag: &str) -> StoreResult<CollectionKind> {
    match tag {
        "document" => Ok(CollectionKind::Document),
        "edge" => Ok(CollectionKind::Edge),
        other => Err(StoreError::Database(format!("unknown collection kind '{}'", other))),
    }
}

/// ReDB document store
///
/// Each query is evaluated inside one read transaction and its results are
/// collected before the transaction ends; the cursor yields from that copy.
pub struct RedbStore {
    db: Mutex<Database>,
}

impl RedbStore {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;

        // Initialize catalog tables
        {
            let write_txn = db.begin_write()?;
            {
                write_txn.open_table(COLLECTIONS)?;
                write_txn.open_table(GRAPHS)?;
            }
            write_txn.commit()?;
        }

        Ok(Self { db: Mutex::new(db) })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| StoreError::Database(format!("Lock error: {}", e)))
    }

    fn collection_kind(txn: &WriteTransaction, collection: &str) -> StoreResult<CollectionKind> {
        let catalog = txn.open_table(COLLECTIONS)?;
        let kind = catalog.get(collection)?;
        match kind {
            Some(tag) => parse_kind(tag.value()),
            None => Err(StoreError::CollectionNotFound(collection.to_string())),
        }
    }

    /// Register a collection and materialize its table
    fn register(txn: &WriteTransaction, collection: &str, kind: CollectionKind) -> StoreResult<()> {
        {
            let mut catalog = txn.open_table(COLLECTIONS)?;
            catalog.insert(collection, kind_tag(kind))?;
        }
        let name = table_name(collection);
        txn.open_table(TableDefinition::<&str, &[u8]>::new(&name))?;
        Ok(())
    }
}

/// Read view over one transaction
struct ReadView<'a> {
    txn: &'a ReadTransaction,
}

impl ReadView<'_> {
    fn known(&self, collection: &str) -> StoreResult<bool> {
        let catalog = self.txn.open_table(COLLECTIONS)?;
        let found = catalog.get(collection)?.is_some();
        Ok(found)
    }
}

impl DocumentSource for ReadView<'_> {
    fn scan(&self, collection: &str) -> StoreResult<Vec<Value>> {
        if !self.known(collection)? {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        }
        let name = table_name(collection);
        let table = self.txn.open_table(TableDefinition::<&str, &[u8]>::new(&name))?;

        let mut documents = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            documents.push(serde_json::from_slice(value.value())?);
        }
        Ok(documents)
    }

    fn lookup(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        if !self.known(collection)? {
            return Ok(None);
        }
        let name = table_name(collection);
        let table = self.txn.open_table(TableDefinition::<&str, &[u8]>::new(&name))?;
        let document = match table.get(key)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(document)
    }

    fn has_graph(&self, name: &str) -> StoreResult<bool> {
        let graphs = self.txn.open_table(GRAPHS)?;
        let found = graphs.get(name)?.is_some();
        Ok(found)
    }
}

#[async_trait]
impl DocumentStore for RedbStore {
    async fn health_check(&self) -> StoreResult<bool> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        read_txn.open_table(COLLECTIONS)?;
        Ok(true)
    }

    async fn collection_exists(&self, name: &str) -> StoreResult<bool> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        ReadView { txn: &read_txn }.known(name)
    }

    async fn create_collection(&self, name: &str, kind: CollectionKind) -> StoreResult<()> {
        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        let exists = {
            let catalog = write_txn.open_table(COLLECTIONS)?;
            let found = catalog.get(name)?.is_some();
            found
        };
        if exists {
            return Err(StoreError::Conflict(format!("collection {}", name)));
        }
        debug!(collection = name, ?kind, "Creating collection");
        Self::register(&write_txn, name, kind)?;
        write_txn.commit()?;
        Ok(())
    }

    async fn get_document(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let view = ReadView { txn: &read_txn };
        if !view.known(collection)? {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        }
        view.lookup(collection, key)
    }

    async fn insert_document(&self, collection: &str, document: Value) -> StoreResult<DocumentMeta> {
        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        let kind = Self::collection_kind(&write_txn, collection)?;
        let meta = {
            let name = table_name(collection);
            let mut table = write_txn.open_table(TableDefinition::<&str, &[u8]>::new(&name))?;
            let (meta, stored) = prepare_insert(collection, kind, document, |key| {
                let found = table.get(key)?.is_some();
                Ok(found)
            })?;
            let bytes = serde_json::to_vec(&stored)?;
            table.insert(meta.key.as_str(), bytes.as_slice())?;
            meta
        };
        write_txn.commit()?;
        Ok(meta)
    }

    async fn replace_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> StoreResult<DocumentMeta> {
        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        let kind = Self::collection_kind(&write_txn, collection)?;
        let meta = {
            let name = table_name(collection);
            let mut table = write_txn.open_table(TableDefinition::<&str, &[u8]>::new(&name))?;
            let exists = table.get(key)?.is_some();
            if !exists {
                return Err(StoreError::NotFound(format!("{}/{}", collection, key)));
            }
            let (meta, stored) = prepare_replace(collection, kind, key, document)?;
            let bytes = serde_json::to_vec(&stored)?;
            table.insert(key, bytes.as_slice())?;
            meta
        };
        write_txn.commit()?;
        Ok(meta)
    }

    async fn remove_document(&self, collection: &str, key: &str) -> StoreResult<()> {
        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        Self::collection_kind(&write_txn, collection)?;
        let removed = {
            let name = table_name(collection);
            let mut table = write_txn.open_table(TableDefinition::<&str, &[u8]>::new(&name))?;
            let removed = table.remove(key)?.is_some();
            removed
        };
        if !removed {
            return Err(StoreError::NotFound(format!("{}/{}", collection, key)));
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn query(&self, query: &AqlQuery) -> StoreResult<Cursor> {
        let documents = {
            let db = self.lock()?;
            let read_txn = db.begin_read()?;
            evaluate(&ReadView { txn: &read_txn }, query)?
        };
        Ok(stream::iter(documents.into_iter().map(Ok)).boxed())
    }

    async fn graph_definition(&self, name: &str) -> StoreResult<Option<GraphDefinition>> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let graphs = read_txn.open_table(GRAPHS)?;
        let definition = match graphs.get(name)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(definition)
    }

    async fn create_graph(&self, definition: &GraphDefinition) -> StoreResult<()> {
        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        {
            let graphs = write_txn.open_table(GRAPHS)?;
            let exists = graphs.get(definition.name.as_str())?.is_some();
            if exists {
                return Err(StoreError::Conflict(format!("graph {}", definition.name)));
            }
        }

        for (collection, kind) in definition_collections(definition) {
            let known = {
                let catalog = write_txn.open_table(COLLECTIONS)?;
                let found = catalog.get(collection.as_str())?.is_some();
                found
            };
            if !known {
                Self::register(&write_txn, &collection, kind)?;
            }
        }

        {
            let mut graphs = write_txn.open_table(GRAPHS)?;
            let bytes = serde_json::to_vec(definition)?;
            graphs.insert(definition.name.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        debug!(graph = %definition.name, "Created graph");
        Ok(())
    }
}
