//! Bulk reads, one-hop traversals and raw queries

use crate::client::{ElementStream, GraphClient};
use crate::errors::map_store_error;
use docgraph_core::document::{decode, decode_edge, decode_vertex};
use docgraph_core::{
    AqlQuery, Decoded, Direction, EdgeData, ElementId, Error, GraphType, IdCodec, IdRef, QueryBuilder, Result,
    VertexData,
};
use docgraph_storage::DocumentStore;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

impl<S: DocumentStore> GraphClient<S> {
    /// Run a query and decode each result with `decoder`
    async fn run<T, F>(&self, query: &AqlQuery, decoder: F) -> Result<ElementStream<T>>
    where
        T: Send + 'static,
        F: Fn(&IdCodec, Value) -> Result<T> + Send + 'static,
    {
        debug!(query = %query.text, "Executing query");
        let cursor = self.store.query(query).await.map_err(map_store_error)?;
        let codec = self.codec.clone();
        Ok(cursor
            .map(move |item| item.map_err(map_store_error).and_then(|value| decoder(&codec, value)))
            .boxed())
    }

    fn prefixed(&self, labels: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
        labels
            .into_iter()
            .map(|label| self.schema.policy().prefixed(label.as_ref()))
            .collect()
    }

    /// Keep the ids this graph can answer for, in order
    fn prune(&self, ids: Vec<ElementId>, keep: impl Fn(&ElementId) -> bool) -> Vec<ElementId> {
        let (kept, dropped): (Vec<_>, Vec<_>) = ids
            .into_iter()
            .partition(|id| id.key().is_some() && keep(id));
        if !dropped.is_empty() {
            let dropped: Vec<String> = dropped.iter().map(ToString::to_string).collect();
            warn!(graph = %self.graph_name(), ?dropped, "Ignoring ids outside graph scope");
        }
        kept
    }

    /// Vertices by id, or every vertex when `ids` is empty
    ///
    /// Ids whose collection is not a vertex collection of this graph are
    /// dropped. Ids that match no document are skipped.
    pub async fn get_vertices<I, T>(&self, ids: I) -> Result<ElementStream<VertexData>>
    where
        I: IntoIterator<Item = T>,
        T: Into<IdRef>,
    {
        let ids = self.codec.normalize(ids, self.default_vertex_label())?;
        let query = if ids.is_empty() {
            QueryBuilder::fetch_all(&self.prefixed(self.schema.vertex_collections()))
        } else {
            let ids = self.prune(ids, |id| self.is_vertex_id(id));
            if ids.is_empty() {
                return Ok(stream::empty().boxed());
            }
            QueryBuilder::fetch_by_ids(&ids)
        };
        self.run(&query, decode_vertex).await
    }

    /// Edges by id, or every edge when `ids` is empty
    pub async fn get_edges<I, T>(&self, ids: I) -> Result<ElementStream<EdgeData>>
    where
        I: IntoIterator<Item = T>,
        T: Into<IdRef>,
    {
        let ids = self.codec.normalize(ids, self.default_edge_label())?;
        let query = if ids.is_empty() {
            QueryBuilder::fetch_all(&self.prefixed(self.schema.edge_collections()))
        } else {
            let ids = self.prune(ids, |id| self.is_edge_id(id));
            if ids.is_empty() {
                return Ok(stream::empty().boxed());
            }
            QueryBuilder::fetch_by_ids(&ids)
        };
        self.run(&query, decode_edge).await
    }

    /// Edge collections and label filter for a traversal
    ///
    /// In a complex graph edge labels are collections, so the labels narrow
    /// the collection scope. A simple graph has one edge collection and the
    /// labels filter on the stored label field. `None` when nothing can
    /// match.
    fn edge_scope(&self, labels: &[String]) -> Option<(Vec<String>, Vec<String>)> {
        let all = self.prefixed(self.schema.edge_collections());
        if labels.is_empty() {
            return Some((all, Vec::new()));
        }
        if self.schema.policy().graph_type() == GraphType::Simple {
            return Some((all, labels.to_vec()));
        }

        let (known, unknown): (Vec<&String>, Vec<&String>) =
            labels.iter().partition(|label| self.schema.has_edge_collection(label));
        if !unknown.is_empty() {
            warn!(graph = %self.graph_name(), ?unknown, "Ignoring edge labels outside graph scope");
        }
        let mut collections = self.prefixed(known);
        collections.sort();
        collections.dedup();
        (!collections.is_empty()).then_some((collections, Vec::new()))
    }

    fn check_start(&self, start: &ElementId) -> Result<()> {
        if !self.is_vertex_id(start) {
            return Err(Error::UnknownCollection(start.store_collection()));
        }
        Ok(())
    }

    /// Vertices one hop from `start`
    ///
    /// `labels` restricts the edges followed; empty means every edge
    /// collection of the graph.
    pub async fn get_vertex_neighbors(
        &self,
        start: &ElementId,
        direction: Direction,
        labels: &[String],
    ) -> Result<ElementStream<VertexData>> {
        self.check_start(start)?;
        let Some((collections, filter)) = self.edge_scope(labels) else {
            return Ok(stream::empty().boxed());
        };
        let query = QueryBuilder::neighbors(self.graph_name(), start, &collections, direction, &filter)?;
        self.run(&query, decode_vertex).await
    }

    /// Edges incident to `start`
    pub async fn get_vertex_edges(
        &self,
        start: &ElementId,
        direction: Direction,
        labels: &[String],
    ) -> Result<ElementStream<EdgeData>> {
        self.check_start(start)?;
        let Some((collections, filter)) = self.edge_scope(labels) else {
            return Ok(stream::empty().boxed());
        };
        let query = QueryBuilder::incident_edges(self.graph_name(), start, &collections, direction, &filter)?;
        self.run(&query, decode_edge).await
    }

    /// Run a caller-written query; graph elements in the results are
    /// recognised wherever they appear
    pub async fn query(&self, query: &AqlQuery) -> Result<ElementStream<Decoded>> {
        self.run(query, decode).await
    }
}
