//! Query text for the fixed set of read primitives
//!
//! Collection and graph names are validated when the graph is configured and
//! are inlined into the text. Values that come from callers (start vertex,
//! ids, label filters) are always bound parameters.
//!
//! Each query also carries its [`QueryShape`], so that embedded stores can
//! execute it without parsing the text.

use crate::error::{Error, Result};
use crate::id::ElementId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Direction of a one-hop traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
    Any,
}

impl Direction {
    /// Traversal keyword in query text
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Outbound => "OUTBOUND",
            Self::Inbound => "INBOUND",
            Self::Any => "ANY",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "out" | "outbound" => Ok(Self::Outbound),
            "in" | "inbound" => Ok(Self::Inbound),
            "both" | "any" => Ok(Self::Any),
            other => Err(Error::Config(format!("unknown direction '{}'", other))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// What a traversal returns for each hop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalTarget {
    /// The vertex at the other end of the edge
    Vertex,
    /// The edge itself
    Edge,
}

/// Structured form of a generated query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryShape {
    /// Every document of the given collections
    FetchAll { collections: Vec<String> },
    /// Documents by native handle, in order
    FetchByIds { handles: Vec<String> },
    /// One hop from `start` over `edge_collections`
    Traverse {
        graph: String,
        start: String,
        edge_collections: Vec<String>,
        direction: Direction,
        labels: Vec<String>,
        target: TraversalTarget,
    },
}

/// Query text with its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AqlQuery {
    pub text: String,
    pub bind_vars: BTreeMap<String, Value>,
    /// `None` for caller-written queries
    pub shape: Option<QueryShape>,
}

impl AqlQuery {
    /// A caller-written query
    pub fn raw(text: impl Into<String>, bind_vars: BTreeMap<String, Value>) -> Self {
        Self {
            text: text.into(),
            bind_vars,
            shape: None,
        }
    }
}

impl fmt::Display for AqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Query generation for reads; stateless
pub struct QueryBuilder;

impl QueryBuilder {
    /// Every document of the given store collections
    pub fn fetch_all(collections: &[String]) -> AqlQuery {
        let text = match collections {
            [] => "FOR d IN [] RETURN d".to_string(),
            [single] => format!("FOR d IN `{}` RETURN d", single),
            many => {
                let scans: Vec<String> = many
                    .iter()
                    .map(|c| format!("(FOR x IN `{}` RETURN x)", c))
                    .collect();
                format!("FOR d IN UNION({}) RETURN d", scans.join(", "))
            }
        };
        AqlQuery {
            text,
            bind_vars: BTreeMap::new(),
            shape: Some(QueryShape::FetchAll {
                collections: collections.to_vec(),
            }),
        }
    }

    /// Documents for the given ids, which the caller has already restricted
    /// to collections it may read. Ids without a key match nothing.
    pub fn fetch_by_ids(ids: &[ElementId]) -> AqlQuery {
        let handles: Vec<String> = ids.iter().filter_map(ElementId::document_handle).collect();
        let mut bind_vars = BTreeMap::new();
        bind_vars.insert("ids".to_string(), Value::from(handles.clone()));
        AqlQuery {
            text: "FOR d IN DOCUMENT(@ids) RETURN d".to_string(),
            bind_vars,
            shape: Some(QueryShape::FetchByIds { handles }),
        }
    }

    /// Vertices one hop away from `start`
    pub fn neighbors(
        graph: &str,
        start: &ElementId,
        edge_collections: &[String],
        direction: Direction,
        labels: &[String],
    ) -> Result<AqlQuery> {
        Self::traverse(graph, start, edge_collections, direction, labels, TraversalTarget::Vertex)
    }

    /// Edges incident to `start`
    pub fn incident_edges(
        graph: &str,
        start: &ElementId,
        edge_collections: &[String],
        direction: Direction,
        labels: &[String],
    ) -> Result<AqlQuery> {
        Self::traverse(graph, start, edge_collections, direction, labels, TraversalTarget::Edge)
    }

    fn traverse(
        graph: &str,
        start: &ElementId,
        edge_collections: &[String],
        direction: Direction,
        labels: &[String],
        target: TraversalTarget,
    ) -> Result<AqlQuery> {
        let start = start
            .document_handle()
            .ok_or_else(|| Error::InvalidState(format!("traversal start {} has not been stored", start)))?;

        let collections: Vec<String> = edge_collections.iter().map(|c| format!("'{}'", c)).collect();
        let mut text = format!(
            "FOR v, e IN 1..1 {} @start GRAPH '{}' OPTIONS {{ edgeCollections: [{}] }}",
            direction.keyword(),
            graph,
            collections.join(", ")
        );
        let mut bind_vars = BTreeMap::new();
        bind_vars.insert("start".to_string(), Value::from(start.clone()));
        if !labels.is_empty() {
            text.push_str(" FILTER e.label IN @labels");
            bind_vars.insert("labels".to_string(), Value::from(labels.to_vec()));
        }
        text.push_str(match target {
            TraversalTarget::Vertex => " RETURN v",
            TraversalTarget::Edge => " RETURN e",
        });

        Ok(AqlQuery {
            text,
            bind_vars,
            shape: Some(QueryShape::Traverse {
                graph: graph.to_string(),
                start,
                edge_collections: edge_collections.to_vec(),
                direction,
                labels: labels.to_vec(),
                target,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdCodec;
    use crate::naming::{GraphType, NamePolicy};
    use serde_json::json;

    fn id(label: &str, key: &str) -> ElementId {
        IdCodec::new(NamePolicy::new("g", GraphType::Complex).unwrap())
            .element_id(label, Some(key))
            .unwrap()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fetch_all() {
        let q = QueryBuilder::fetch_all(&names(&["g_a"]));
        assert_eq!(q.text, "FOR d IN `g_a` RETURN d");

        let q = QueryBuilder::fetch_all(&names(&["g_a", "g_b"]));
        assert_eq!(
            q.text,
            "FOR d IN UNION((FOR x IN `g_a` RETURN x), (FOR x IN `g_b` RETURN x)) RETURN d"
        );
        assert!(q.bind_vars.is_empty());
        assert_eq!(
            q.shape,
            Some(QueryShape::FetchAll {
                collections: names(&["g_a", "g_b"])
            })
        );
    }

    #[test]
    fn test_fetch_by_ids() {
        let q = QueryBuilder::fetch_by_ids(&[id("a", "1"), id("b", "2")]);
        assert_eq!(q.text, "FOR d IN DOCUMENT(@ids) RETURN d");
        assert_eq!(q.bind_vars["ids"], json!(["g_a/1", "g_b/2"]));
    }

    #[test]
    fn test_neighbors() {
        let q = QueryBuilder::neighbors(
            "g",
            &id("a", "1"),
            &names(&["g_e", "g_f"]),
            Direction::Outbound,
            &[],
        )
        .unwrap();
        assert_eq!(
            q.text,
            "FOR v, e IN 1..1 OUTBOUND @start GRAPH 'g' OPTIONS { edgeCollections: ['g_e', 'g_f'] } RETURN v"
        );
        assert_eq!(q.bind_vars["start"], json!("g_a/1"));
        assert!(!q.bind_vars.contains_key("labels"));
    }

    #[test]
    fn test_incident_edges_with_labels() {
        let q = QueryBuilder::incident_edges(
            "g",
            &id("a", "1"),
            &names(&["g_e"]),
            Direction::Any,
            &names(&["e"]),
        )
        .unwrap();
        assert!(q.text.contains(" ANY @start "));
        assert!(q.text.ends_with("FILTER e.label IN @labels RETURN e"));
        assert_eq!(q.bind_vars["labels"], json!(["e"]));
    }

    #[test]
    fn test_direction_keywords() {
        assert_eq!(Direction::Outbound.keyword(), "OUTBOUND");
        assert_eq!(Direction::Inbound.keyword(), "INBOUND");
        assert_eq!(Direction::Any.keyword(), "ANY");
        assert_eq!("both".parse::<Direction>().unwrap(), Direction::Any);
        assert_eq!("IN".parse::<Direction>().unwrap(), Direction::Inbound);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_unstored_start_rejected() {
        let codec = IdCodec::new(NamePolicy::new("g", GraphType::Complex).unwrap());
        let start = codec.element_id("a", None).unwrap();
        assert!(QueryBuilder::neighbors("g", &start, &[], Direction::Any, &[]).is_err());
    }
}
