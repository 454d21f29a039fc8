//! CLI configuration
//!
//! The configuration file is TOML. Dotted keys and nested tables are
//! flattened into the `graph.*` / `driver.*` namespace; arrays repeat their
//! key once per element.

use std::path::{Path, PathBuf};

use anyhow::Context;
use docgraph_core::GraphConfig;

/// Get default config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docgraph")
        .join("config.toml")
}

/// Load the graph configuration from `path`, or from the default location
pub fn load(path: Option<&Path>) -> anyhow::Result<GraphConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
    tracing::debug!("Loaded config for graph '{}' from {:?}", config.name, path);
    Ok(config)
}

/// Parse TOML text into a graph configuration
pub fn parse(content: &str) -> anyhow::Result<GraphConfig> {
    let table: toml::Table = toml::from_str(content)?;
    let mut properties = Vec::new();
    for (key, value) in &table {
        flatten(key, value, &mut properties);
    }
    Ok(GraphConfig::from_properties(properties)?)
}

fn flatten(key: &str, value: &toml::Value, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (child, value) in table {
                flatten(&format!("{}.{}", key, child), value, out);
            }
        }
        toml::Value::Array(items) => {
            for item in items {
                flatten(key, item, out);
            }
        }
        toml::Value::String(s) => out.push((key.to_string(), s.clone())),
        other => out.push((key.to_string(), other.to_string())),
    }
}
