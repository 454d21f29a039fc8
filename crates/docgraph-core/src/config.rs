//! Graph configuration
//!
//! Configuration arrives as a flat key/value namespace:
//!
//! | key | meaning |
//! |---|---|
//! | `graph.db` | database name |
//! | `graph.name` | graph name, also the collection prefix |
//! | `graph.type` | `simple` or `complex` |
//! | `graph.vertex` | vertex collections, comma separated |
//! | `graph.edge` | edge collections, comma separated |
//! | `graph.relation` | `coll:[from,...]->[to,...]`, `;` separated |
//! | `graph.orphan` | orphan vertex collections, comma separated |
//! | `driver.*` | passed to the store driver untouched |
//!
//! List keys may repeat; every occurrence appends.

use crate::error::{Error, Result};
use crate::naming::{GraphType, NamePolicy};
use crate::schema::GraphSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Database used when none is configured
pub const DEFAULT_DATABASE: &str = "docgraph";

/// Configuration of one graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Database name
    #[serde(default = "default_database")]
    pub db_name: String,

    /// Graph name
    pub name: String,

    /// Layout mode
    #[serde(default)]
    pub graph_type: GraphType,

    /// Declared vertex collections
    #[serde(default)]
    pub vertices: Vec<String>,

    /// Declared edge collections
    #[serde(default)]
    pub edges: Vec<String>,

    /// Relation declarations
    #[serde(default)]
    pub relations: Vec<String>,

    /// Declared orphan collections
    #[serde(default)]
    pub orphans: Vec<String>,

    /// Driver settings (hosts, credentials, protocol)
    #[serde(default)]
    pub driver: BTreeMap<String, String>,
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl GraphConfig {
    /// Simple graph with everything else defaulted
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            db_name: default_database(),
            name: name.into(),
            graph_type: GraphType::Simple,
            vertices: Vec::new(),
            edges: Vec::new(),
            relations: Vec::new(),
            orphans: Vec::new(),
            driver: BTreeMap::new(),
        }
    }

    /// Build from the flat key/value namespace
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut name = None;
        let mut config = Self::new(String::new());

        for (key, value) in properties {
            let (key, value) = (key.as_ref().trim(), value.as_ref().trim());
            match key {
                "graph.db" => config.db_name = value.to_string(),
                "graph.name" => name = Some(value.to_string()),
                "graph.type" => config.graph_type = value.parse()?,
                "graph.vertex" => config.vertices.extend(split_list(value, ',')),
                "graph.edge" => config.edges.extend(split_list(value, ',')),
                "graph.relation" => config.relations.extend(split_list(value, ';')),
                "graph.orphan" => config.orphans.extend(split_list(value, ',')),
                other => match other.strip_prefix("driver.") {
                    Some(setting) if !setting.is_empty() => {
                        config.driver.insert(setting.to_string(), value.to_string());
                    }
                    _ => return Err(Error::Config(format!("unknown configuration key '{}'", other))),
                },
            }
        }

        config.name = name.ok_or_else(|| Error::Config("graph.name is required".to_string()))?;
        Ok(config)
    }

    /// Naming policy of the configured graph
    pub fn policy(&self) -> Result<NamePolicy> {
        NamePolicy::new(self.name.clone(), self.graph_type)
    }

    /// Derive the schema this configuration requires
    pub fn schema(&self) -> Result<GraphSchema> {
        GraphSchema::derive(&self.policy()?, self)
    }

    /// Check every name and declaration without touching a store
    pub fn validate(&self) -> Result<()> {
        if self.db_name.trim().is_empty() {
            return Err(Error::EmptyName("database"));
        }
        self.schema().map(|_| ())
    }
}

fn split_list(value: &str, separator: char) -> impl Iterator<Item = String> + '_ {
    value
        .split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_properties() {
        let config = GraphConfig::from_properties([
            ("graph.name", "social"),
            ("graph.type", "complex"),
            ("graph.vertex", "person, city"),
            ("graph.relation", "knows:[person]->[person]; livesIn:[person]->[city]"),
            ("graph.relation", "visited:[person]->[city]"),
            ("graph.orphan", "archive"),
            ("driver.hosts", "127.0.0.1:8529"),
            ("driver.user", "root"),
        ])
        .unwrap();

        assert_eq!(config.name, "social");
        assert_eq!(config.db_name, DEFAULT_DATABASE);
        assert_eq!(config.graph_type, GraphType::Complex);
        assert_eq!(config.vertices, vec!["person", "city"]);
        assert_eq!(config.relations.len(), 3);
        assert_eq!(config.orphans, vec!["archive"]);
        assert_eq!(config.driver.get("hosts").map(String::as_str), Some("127.0.0.1:8529"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_properties_errors() {
        assert!(matches!(
            GraphConfig::from_properties([("graph.type", "simple")]),
            Err(Error::Config(_))
        ));
        assert!(GraphConfig::from_properties([("graph.name", "g"), ("graph.colour", "red")]).is_err());
        assert!(GraphConfig::from_properties([("graph.name", "g"), ("graph.type", "tree")]).is_err());
        assert!(GraphConfig::from_properties([("graph.name", "g"), ("driver.", "x")]).is_err());
    }

    #[test]
    fn test_validate_names() {
        let config = GraphConfig::new("my_graph");
        assert!(matches!(config.validate(), Err(Error::InvalidCharacter { .. })));

        let config = GraphConfig {
            vertices: vec!["bad/name".into()],
            ..GraphConfig::new("g")
        };
        assert!(config.validate().unwrap_err().is_validation());

        let config = GraphConfig {
            db_name: " ".into(),
            ..GraphConfig::new("g")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: GraphConfig = serde_json::from_str(r#"{"name": "g"}"#).unwrap();
        assert_eq!(config, GraphConfig::new("g"));
    }
}
