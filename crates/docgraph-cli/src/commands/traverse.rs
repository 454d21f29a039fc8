//! One-hop traversal commands

use clap::Args;
use docgraph_core::Direction;
use futures::TryStreamExt;

use crate::output::{format_list, EdgeView, OutputFormat, VertexView};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct TraverseArgs {
    /// Start vertex id
    pub id: String,
    /// Direction: out, in, both
    #[arg(long, default_value = "both")]
    pub direction: Direction,
    /// Only follow edges with these labels
    #[arg(short, long = "label")]
    pub labels: Vec<String>,
}

pub async fn neighbors(args: &TraverseArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = OutputFormat::from(cli.format.as_str());
    let client = &ctx.client;
    let start = client.vertex_id(&args.id)?;
    tracing::debug!("Neighbors of {} ({})", start, args.direction);

    let vertices: Vec<_> = client
        .get_vertex_neighbors(&start, args.direction, &args.labels)
        .await?
        .try_collect()
        .await?;
    let views = vertices
        .iter()
        .map(|v| VertexView::new(client.codec(), v))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if views.is_empty() && format == OutputFormat::Text {
        println!("No neighbors found");
    } else {
        println!("{}", format_list(&views, format));
    }
    Ok(())
}

pub async fn edges(args: &TraverseArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = OutputFormat::from(cli.format.as_str());
    let client = &ctx.client;
    let start = client.vertex_id(&args.id)?;
    tracing::debug!("Edges of {} ({})", start, args.direction);

    let edges: Vec<_> = client
        .get_vertex_edges(&start, args.direction, &args.labels)
        .await?
        .try_collect()
        .await?;
    let views = edges
        .iter()
        .map(|e| EdgeView::new(client.codec(), e))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if views.is_empty() && format == OutputFormat::Text {
        println!("No edges found");
    } else {
        println!("{}", format_list(&views, format));
    }
    Ok(())
}
