//! Execution of generated read queries for the embedded stores

use crate::documents::split_handle;
use crate::error::{StoreError, StoreResult};
use docgraph_core::document::{FROM_FIELD, LABEL_FIELD, TO_FIELD};
use docgraph_core::{AqlQuery, Direction, QueryShape, TraversalTarget};
use serde_json::Value;

/// Read access an embedded store gives the evaluator
pub(crate) trait DocumentSource {
    /// All documents of a collection, in key order
    fn scan(&self, collection: &str) -> StoreResult<Vec<Value>>;

    /// A document by `collection/key`; `None` when either part is missing
    fn lookup(&self, collection: &str, key: &str) -> StoreResult<Option<Value>>;

    fn has_graph(&self, name: &str) -> StoreResult<bool>;
}

/// Evaluate a query against `source`
///
/// Only queries that carry their shape can be executed.
pub(crate) fn evaluate(source: &impl DocumentSource, query: &AqlQuery) -> StoreResult<Vec<Value>> {
    let shape = query.shape.as_ref().ok_or_else(|| {
        StoreError::Unsupported(format!("free-form query text is not supported: {}", query.text))
    })?;

    match shape {
        QueryShape::FetchAll { collections } => {
            let mut documents = Vec::new();
            for collection in collections {
                documents.extend(source.scan(collection)?);
            }
            Ok(documents)
        }
        QueryShape::FetchByIds { handles } => {
            let mut documents = Vec::with_capacity(handles.len());
            for handle in handles {
                let (collection, key) = split_handle(handle)?;
                if let Some(document) = source.lookup(collection, key)? {
                    documents.push(document);
                }
            }
            Ok(documents)
        }
        QueryShape::Traverse {
            graph,
            start,
            edge_collections,
            direction,
            labels,
            target,
        } => {
            if !source.has_graph(graph)? {
                return Err(StoreError::GraphNotFound(graph.clone()));
            }
            traverse(source, start, edge_collections, *direction, labels, *target)
        }
    }
}

fn endpoint<'a>(edge: &'a Value, field: &str) -> Option<&'a str> {
    edge.get(field).and_then(Value::as_str)
}

/// The far end of `edge` seen from `start`, if the edge runs in `direction`
fn far_end<'a>(edge: &'a Value, start: &str, direction: Direction) -> Option<&'a str> {
    let from = endpoint(edge, FROM_FIELD)?;
    let to = endpoint(edge, TO_FIELD)?;
    match direction {
        Direction::Outbound => (from == start).then_some(to),
        Direction::Inbound => (to == start).then_some(from),
        Direction::Any if from == start => Some(to),
        Direction::Any if to == start => Some(from),
        Direction::Any => None,
    }
}

fn traverse(
    source: &impl DocumentSource,
    start: &str,
    edge_collections: &[String],
    direction: Direction,
    labels: &[String],
    target: TraversalTarget,
) -> StoreResult<Vec<Value>> {
    let (start_collection, start_key) = split_handle(start)?;
    if source.lookup(start_collection, start_key)?.is_none() {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    for collection in edge_collections {
        for edge in source.scan(collection)? {
            let Some(other) = far_end(&edge, start, direction) else {
                continue;
            };
            if !labels.is_empty() {
                let label = edge.get(LABEL_FIELD).and_then(Value::as_str);
                if !label.map_or(false, |l| labels.iter().any(|wanted| wanted == l)) {
                    continue;
                }
            }
            match target {
                TraversalTarget::Edge => results.push(edge),
                TraversalTarget::Vertex => {
                    let (collection, key) = split_handle(other)?;
                    if let Some(vertex) = source.lookup(collection, key)? {
                        results.push(vertex);
                    }
                }
            }
        }
    }
    Ok(results)
}
