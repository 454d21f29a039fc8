//! Schema and open commands

use std::fmt;

use docgraph_core::version::versions;
use docgraph_core::{GraphConfig, GraphDefinition, GraphType, SCHEMA_VERSION};
use serde::Serialize;

use crate::output::{format_output, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Serialize)]
struct SchemaView {
    graph: String,
    graph_type: GraphType,
    layout_version: u32,
    vertex_collections: Vec<String>,
    edge_collections: Vec<String>,
    definition: GraphDefinition,
}

impl fmt::Display for SchemaView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph: {} ({}, layout v{})", self.graph, self.graph_type, self.layout_version)?;
        writeln!(f, "Vertex collections: {}", self.vertex_collections.join(", "))?;
        writeln!(f, "Edge collections: {}", self.edge_collections.join(", "))?;
        for edge in &self.definition.edge_definitions {
            writeln!(f, "  {}: [{}] -> [{}]", edge.collection, edge.from.join(", "), edge.to.join(", "))?;
        }
        write!(f, "Orphans: {}", self.definition.orphan_collections.join(", "))
    }
}

/// Print the schema derived from configuration; no store is opened
pub fn schema(config: &GraphConfig, cli: &Cli) -> anyhow::Result<()> {
    config.validate()?;
    let schema = config.schema()?;
    let policy = schema.policy();
    let view = SchemaView {
        graph: policy.graph_name().to_string(),
        graph_type: policy.graph_type(),
        layout_version: SCHEMA_VERSION,
        vertex_collections: schema.vertex_collections().iter().map(|c| policy.prefixed(c)).collect(),
        edge_collections: schema.edge_collections().iter().map(|c| policy.prefixed(c)).collect(),
        definition: schema.to_definition(),
    };
    println!("{}", format_output(&view, OutputFormat::from(cli.format.as_str())));
    Ok(())
}

/// Open the graph and report where it lives
pub async fn open(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let variables = ctx.client.variables().await?;
    if cli.quiet {
        return Ok(());
    }
    let description = versions()
        .into_iter()
        .find(|v| v.version == variables.version())
        .map_or("unknown layout", |v| v.description);
    println!(
        "Opened graph '{}' ({}) at {}",
        ctx.client.graph_name(),
        ctx.client.schema().policy().graph_type(),
        ctx.db_path.display()
    );
    println!("Layout version {}: {}", variables.version(), description);
    Ok(())
}
