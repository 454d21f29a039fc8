//! Graph client: open, element lifecycle, variables

use crate::errors::{ignore_missing, map_store_error};
use docgraph_core::document::{decode_edge, decode_vertex, encode_edge, encode_vertex};
use docgraph_core::naming::{DEFAULT_EDGE_COLLECTION, DEFAULT_VERTEX_COLLECTION, GRAPH_VARIABLES_COLLECTION};
use docgraph_core::{
    check_version, Direction, EdgeData, ElementId, ElementState, Error, GraphConfig, GraphSchema, GraphType,
    IdCodec, Result, SchemaPlan, VariablesData, VertexData,
};
use docgraph_storage::{CollectionKind, DocumentStore, StoreError};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Lazy, single-pass stream of decoded elements
pub type ElementStream<T> = BoxStream<'static, Result<T>>;

/// Client for one graph in a document store
///
/// Holds no state that changes between calls; every operation round-trips to
/// the store.
pub struct GraphClient<S: DocumentStore> {
    pub(crate) store: Arc<S>,
    config: GraphConfig,
    pub(crate) schema: GraphSchema,
    pub(crate) codec: IdCodec,
}

impl<S: DocumentStore> std::fmt::Debug for GraphClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> GraphClient<S> {
    /// Open a graph, creating its schema and variables record on first use
    ///
    /// Configuration is validated and the stored version checked before
    /// anything is written. A stored graph definition that disagrees with the
    /// configuration fails the open and is left as it is.
    pub async fn open(store: Arc<S>, config: GraphConfig) -> Result<Self> {
        config.validate()?;
        let schema = config.schema()?;
        let codec = IdCodec::new(schema.policy().clone());
        let graph = config.name.clone();

        let existing = match store.get_document(GRAPH_VARIABLES_COLLECTION, &graph).await {
            Ok(found) => found,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(map_store_error(e)),
        };
        if let Some(document) = &existing {
            let variables = VariablesData::decode(document.clone())?;
            check_version(variables.version())?;
        }

        let remote = store.graph_definition(&graph).await.map_err(map_store_error)?;
        match schema.reconcile(remote.as_ref())? {
            SchemaPlan::Create(definition) => {
                info!(graph = %graph, relations = definition.edge_definitions.len(), "Creating graph schema");
                match store.create_graph(&definition).await {
                    Ok(()) => {}
                    // another client created it first; it must agree with ours
                    Err(StoreError::Conflict(_)) => {
                        let winner = store.graph_definition(&graph).await.map_err(map_store_error)?;
                        if let SchemaPlan::Create(_) = schema.reconcile(winner.as_ref())? {
                            return Err(Error::Store(format!("graph '{}' vanished while being created", graph)));
                        }
                        debug!(graph = %graph, "Graph schema created concurrently");
                    }
                    Err(e) => return Err(map_store_error(e)),
                }
            }
            SchemaPlan::Unchanged => debug!(graph = %graph, "Graph schema matches configuration"),
        }

        if existing.is_none() {
            ensure_collection(store.as_ref(), GRAPH_VARIABLES_COLLECTION).await?;
            let fresh = VariablesData::new(graph.clone());
            match store.insert_document(GRAPH_VARIABLES_COLLECTION, fresh.encode()?).await {
                Ok(_) => info!(graph = %graph, version = fresh.version(), "Initialized graph variables"),
                Err(StoreError::Conflict(_)) => {
                    let document = store
                        .get_document(GRAPH_VARIABLES_COLLECTION, &graph)
                        .await
                        .map_err(map_store_error)?
                        .ok_or_else(|| Error::Store(format!("variables of graph '{}' vanished", graph)))?;
                    check_version(VariablesData::decode(document)?.version())?;
                }
                Err(e) => return Err(map_store_error(e)),
            }
        }

        Ok(Self {
            store,
            config,
            schema,
            codec,
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// The reconciled schema
    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    pub fn codec(&self) -> &IdCodec {
        &self.codec
    }

    pub fn graph_name(&self) -> &str {
        self.schema.policy().graph_name()
    }

    fn is_simple(&self) -> bool {
        self.schema.policy().graph_type() == GraphType::Simple
    }

    /// Collection used for vertex ids that name none
    pub(crate) fn default_vertex_label(&self) -> &str {
        if self.is_simple() {
            self.schema
                .vertex_collections()
                .iter()
                .next()
                .map_or(DEFAULT_VERTEX_COLLECTION, String::as_str)
        } else {
            DEFAULT_VERTEX_COLLECTION
        }
    }

    /// Collection used for edge ids that name none
    pub(crate) fn default_edge_label(&self) -> &str {
        if self.is_simple() {
            self.schema
                .edge_collections()
                .iter()
                .next()
                .map_or(DEFAULT_EDGE_COLLECTION, String::as_str)
        } else {
            DEFAULT_EDGE_COLLECTION
        }
    }

    pub(crate) fn owns(&self, id: &ElementId) -> bool {
        id.prefix() == self.graph_name()
    }

    pub(crate) fn is_vertex_id(&self, id: &ElementId) -> bool {
        self.owns(id) && self.schema.has_vertex_collection(id.collection())
    }

    pub(crate) fn is_edge_id(&self, id: &ElementId) -> bool {
        self.owns(id) && self.schema.has_edge_collection(id.collection())
    }

    /// Parse an external vertex id
    pub fn vertex_id(&self, text: &str) -> Result<ElementId> {
        self.codec.parse(text, None, self.default_vertex_label())
    }

    /// Parse an external edge id
    pub fn edge_id(&self, text: &str) -> Result<ElementId> {
        self.codec.parse(text, None, self.default_edge_label())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Element construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve the collection and id of a new element
    ///
    /// A complex graph stores elements in the collection named by their
    /// label; a simple graph keeps its single collection and records the
    /// label as a field only.
    fn resolve_new(
        &self,
        label: Option<&str>,
        id: Option<&str>,
        default_label: &str,
        configured: impl Fn(&str) -> bool,
    ) -> Result<(String, ElementId)> {
        let id = match id {
            Some(text) if self.is_simple() => self.codec.parse(text, None, default_label)?,
            Some(text) => self.codec.parse(text, label, default_label)?,
            None if self.is_simple() => self.codec.element_id(default_label, None)?,
            None => self.codec.element_id(label.unwrap_or(default_label), None)?,
        };
        if !configured(id.collection()) {
            return Err(Error::UnknownCollection(id.collection().to_string()));
        }
        let label = label.unwrap_or(id.collection()).to_string();
        Ok((label, id))
    }

    /// Build a transient vertex; `id` is assigned by the store when absent
    pub fn new_vertex(&self, label: Option<&str>, id: Option<&str>) -> Result<VertexData> {
        let (label, id) = self.resolve_new(label, id, self.default_vertex_label(), |c| {
            self.schema.has_vertex_collection(c)
        })?;
        VertexData::new(id, label)
    }

    /// Build a transient edge between two stored vertices
    pub fn new_edge(
        &self,
        label: Option<&str>,
        id: Option<&str>,
        from: &ElementId,
        to: &ElementId,
    ) -> Result<EdgeData> {
        let (label, id) = self.resolve_new(label, id, self.default_edge_label(), |c| {
            self.schema.has_edge_collection(c)
        })?;
        self.check_endpoints(id.collection(), from, to)?;
        EdgeData::new(id, label, from.clone(), to.clone())
    }

    fn check_endpoints(&self, collection: &str, from: &ElementId, to: &ElementId) -> Result<()> {
        let relation = self
            .schema
            .relation(collection)
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;
        for (side, vertex, allowed) in [("from", from, &relation.from), ("to", to, &relation.to)] {
            if !self.owns(vertex) || !allowed.contains(vertex.collection()) {
                return Err(Error::InvalidEndpoint {
                    collection: collection.to_string(),
                    side,
                    vertex: vertex.to_string(),
                });
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a transient vertex and record its key and revision
    pub async fn insert_vertex(&self, vertex: &mut VertexData) -> Result<()> {
        expect_state(vertex.state(), ElementState::Transient, vertex.id())?;
        if !self.is_vertex_id(vertex.id()) {
            return Err(Error::UnknownCollection(vertex.id().store_collection()));
        }
        let collection = vertex.id().store_collection();
        let meta = self
            .store
            .insert_document(&collection, encode_vertex(vertex)?)
            .await
            .map_err(map_store_error)?;
        vertex.mark_persisted(&meta.key, &meta.rev)?;
        debug!(id = %vertex.id(), rev = %meta.rev, "Inserted vertex");
        Ok(())
    }

    /// Insert a transient edge and record its key and revision
    pub async fn insert_edge(&self, edge: &mut EdgeData) -> Result<()> {
        expect_state(edge.state(), ElementState::Transient, edge.id())?;
        if !self.is_edge_id(edge.id()) {
            return Err(Error::UnknownCollection(edge.id().store_collection()));
        }
        self.check_endpoints(edge.id().collection(), edge.from(), edge.to())?;
        let collection = edge.id().store_collection();
        let meta = self
            .store
            .insert_document(&collection, encode_edge(edge)?)
            .await
            .map_err(map_store_error)?;
        edge.mark_persisted(&meta.key, &meta.rev)?;
        debug!(id = %edge.id(), rev = %meta.rev, "Inserted edge");
        Ok(())
    }

    /// Replace a stored vertex with its in-memory state
    pub async fn update_vertex(&self, vertex: &mut VertexData) -> Result<()> {
        expect_state(vertex.state(), ElementState::Persisted, vertex.id())?;
        let key = stored_key(vertex.id())?;
        let meta = self
            .store
            .replace_document(&vertex.id().store_collection(), &key, encode_vertex(vertex)?)
            .await
            .map_err(map_store_error)?;
        vertex.mark_persisted(&meta.key, &meta.rev)?;
        debug!(id = %vertex.id(), rev = %meta.rev, "Updated vertex");
        Ok(())
    }

    /// Replace a stored edge with its in-memory state
    pub async fn update_edge(&self, edge: &mut EdgeData) -> Result<()> {
        expect_state(edge.state(), ElementState::Persisted, edge.id())?;
        let key = stored_key(edge.id())?;
        let meta = self
            .store
            .replace_document(&edge.id().store_collection(), &key, encode_edge(edge)?)
            .await
            .map_err(map_store_error)?;
        edge.mark_persisted(&meta.key, &meta.rev)?;
        debug!(id = %edge.id(), rev = %meta.rev, "Updated edge");
        Ok(())
    }

    /// Remove a vertex and its incident edges
    ///
    /// Elements that are already gone count as removed.
    pub async fn delete_vertex(&self, vertex: &mut VertexData) -> Result<()> {
        if vertex.state() == ElementState::Removed {
            return Ok(());
        }
        if let Some(key) = vertex.id().key().map(str::to_string) {
            let mut incident = self.get_vertex_edges(vertex.id(), Direction::Any, &[]).await?;
            let mut removed = 0usize;
            while let Some(edge) = incident.try_next().await? {
                self.remove_document(edge.id()).await?;
                removed += 1;
            }
            let collection = vertex.id().store_collection();
            ignore_missing(self.store.remove_document(&collection, &key).await)?;
            debug!(id = %vertex.id(), edges = removed, "Deleted vertex");
        }
        vertex.mark_removed();
        Ok(())
    }

    /// Remove an edge; an edge that is already gone counts as removed
    pub async fn delete_edge(&self, edge: &mut EdgeData) -> Result<()> {
        if edge.state() == ElementState::Removed {
            return Ok(());
        }
        if edge.id().key().is_some() {
            self.remove_document(edge.id()).await?;
            debug!(id = %edge.id(), "Deleted edge");
        }
        edge.mark_removed();
        Ok(())
    }

    async fn remove_document(&self, id: &ElementId) -> Result<()> {
        let key = stored_key(id)?;
        ignore_missing(self.store.remove_document(&id.store_collection(), &key).await)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Point reads
    // ─────────────────────────────────────────────────────────────────────────

    async fn read_document(&self, id: &ElementId) -> Result<Option<serde_json::Value>> {
        let key = stored_key(id)?;
        match self.store.get_document(&id.store_collection(), &key).await {
            Ok(found) => Ok(found),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(map_store_error(e)),
        }
    }

    /// Look up a vertex by id; ids outside this graph's vertex collections
    /// find nothing
    pub async fn read_vertex(&self, id: &ElementId) -> Result<Option<VertexData>> {
        if !self.is_vertex_id(id) {
            debug!(id = %id, "Vertex id outside graph scope");
            return Ok(None);
        }
        self.read_document(id)
            .await?
            .map(|document| decode_vertex(&self.codec, document))
            .transpose()
    }

    /// Look up an edge by id; ids outside this graph's edge collections find
    /// nothing
    pub async fn read_edge(&self, id: &ElementId) -> Result<Option<EdgeData>> {
        if !self.is_edge_id(id) {
            debug!(id = %id, "Edge id outside graph scope");
            return Ok(None);
        }
        self.read_document(id)
            .await?
            .map(|document| decode_edge(&self.codec, document))
            .transpose()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Variables
    // ─────────────────────────────────────────────────────────────────────────

    /// Current variables record of this graph
    pub async fn variables(&self) -> Result<VariablesData> {
        let document = self
            .store
            .get_document(GRAPH_VARIABLES_COLLECTION, self.graph_name())
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| {
                Error::InvalidState(format!("graph '{}' has no variables record", self.graph_name()))
            })?;
        VariablesData::decode(document)
    }

    /// Replace the variables record and record the new revision
    pub async fn save_variables(&self, variables: &mut VariablesData) -> Result<()> {
        if variables.graph_name() != self.graph_name() {
            return Err(Error::InvalidState(format!(
                "variables of graph '{}' cannot be saved to graph '{}'",
                variables.graph_name(),
                self.graph_name()
            )));
        }
        let meta = self
            .store
            .replace_document(GRAPH_VARIABLES_COLLECTION, self.graph_name(), variables.encode()?)
            .await
            .map_err(map_store_error)?;
        variables.set_revision(meta.rev);
        Ok(())
    }
}

async fn ensure_collection<S: DocumentStore>(store: &S, name: &str) -> Result<()> {
    if store.collection_exists(name).await.map_err(map_store_error)? {
        return Ok(());
    }
    match store.create_collection(name, CollectionKind::Document).await {
        // created concurrently by another client
        Err(StoreError::Conflict(_)) => Ok(()),
        other => other.map_err(map_store_error),
    }
}

fn expect_state(actual: ElementState, expected: ElementState, id: &ElementId) -> Result<()> {
    if actual != expected {
        return Err(Error::InvalidState(format!(
            "{} is {:?}, expected {:?}",
            id, actual, expected
        )));
    }
    Ok(())
}

fn stored_key(id: &ElementId) -> Result<String> {
    id.key()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidState(format!("{} has not been stored", id)))
}
