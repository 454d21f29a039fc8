//! Graph and collection naming rules
//!
//! Every collection sent to the store is named `<graph>_<label>`. Because `_`
//! separates the graph prefix from the label and `/` separates the collection
//! from the document key, neither character may appear in a graph name, a
//! label or a key.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the graph prefix and a collection label
pub const PREFIX_SEPARATOR: char = '_';

/// Separator between a collection and a document key
pub const KEY_SEPARATOR: char = '/';

/// Vertex collection of a simple graph, and the default vertex label
pub const DEFAULT_VERTEX_COLLECTION: &str = "vertex";

/// Edge collection of a simple graph, and the default edge label
pub const DEFAULT_EDGE_COLLECTION: &str = "edge";

/// Collection holding one variables document per graph
pub const GRAPH_VARIABLES_COLLECTION: &str = "GRAPH-VARIABLES";

/// Graph layout mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// One vertex collection and one edge collection; ids are bare keys
    #[default]
    Simple,
    /// Any number of validated collections; ids carry their collection
    Complex,
}

impl FromStr for GraphType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "complex" => Ok(Self::Complex),
            other => Err(Error::Config(format!(
                "unknown graph type '{}' (expected simple or complex)",
                other
            ))),
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

/// Check a graph name, label or key against the reserved characters
pub fn validate_name(what: &'static str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::EmptyName(what));
    }
    if name.contains(PREFIX_SEPARATOR) || name.contains(KEY_SEPARATOR) {
        return Err(Error::InvalidCharacter {
            what,
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Naming policy of one graph instance
///
/// Passed by value into document encoding and decoding so that documents
/// never need a handle back to the graph that owns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePolicy {
    graph: String,
    graph_type: GraphType,
}

impl NamePolicy {
    pub fn new(graph: impl Into<String>, graph_type: GraphType) -> Result<Self> {
        let graph = graph.into();
        validate_name("graph", &graph)?;
        Ok(Self { graph, graph_type })
    }

    pub fn graph_name(&self) -> &str {
        &self.graph
    }

    pub fn graph_type(&self) -> GraphType {
        self.graph_type
    }

    /// Store-level collection name for a label. Already prefixed names are
    /// returned unchanged.
    pub fn prefixed(&self, name: &str) -> String {
        if self.strip(name).is_some() {
            name.to_string()
        } else {
            format!("{}{}{}", self.graph, PREFIX_SEPARATOR, name)
        }
    }

    /// Label part of a store-level collection name, or the name itself when it
    /// does not carry this graph's prefix
    pub fn unprefixed<'a>(&self, name: &'a str) -> &'a str {
        self.strip(name).unwrap_or(name)
    }

    /// Label part of a store-level collection name, `None` when the name
    /// belongs to another graph or carries no prefix
    pub fn strip<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(self.graph.as_str())
            .and_then(|rest| rest.strip_prefix(PREFIX_SEPARATOR))
    }
}
