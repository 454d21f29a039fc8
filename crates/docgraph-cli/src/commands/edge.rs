//! Edge commands

use clap::{Args, Subcommand};
use futures::TryStreamExt;

use crate::output::{format_list, format_output, parse_property, EdgeView, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct EdgeArgs {
    #[command(subcommand)]
    pub command: EdgeCommands,
}

#[derive(Subcommand)]
pub enum EdgeCommands {
    /// Add an edge between two stored vertices
    Add {
        /// Source vertex id
        #[arg(long)]
        from: String,
        /// Target vertex id
        #[arg(long)]
        to: String,
        /// Edge label (collection in a complex graph)
        #[arg(short, long)]
        label: Option<String>,
        /// Edge id; assigned by the store when omitted
        #[arg(short, long)]
        id: Option<String>,
        /// Property as key=value
        #[arg(short, long = "prop")]
        props: Vec<String>,
    },
    /// Show an edge
    Get {
        /// Edge id
        id: String,
    },
    /// List edges; all of them when no ids are given
    List {
        /// Edge ids
        ids: Vec<String>,
    },
    /// Delete an edge
    Rm {
        /// Edge id
        id: String,
    },
}

pub async fn run(args: &EdgeArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = OutputFormat::from(cli.format.as_str());
    let client = &ctx.client;

    match &args.command {
        EdgeCommands::Add {
            from,
            to,
            label,
            id,
            props,
        } => {
            let from = client.vertex_id(from)?;
            let to = client.vertex_id(to)?;
            for end in [&from, &to] {
                if client.read_vertex(end).await?.is_none() {
                    anyhow::bail!("Vertex not found: {}", end);
                }
            }

            let mut edge = client.new_edge(label.as_deref(), id.as_deref(), &from, &to)?;
            for prop in props {
                let (key, value) = parse_property(prop)?;
                edge.set_property(&key, value)?;
            }
            client.insert_edge(&mut edge).await?;
            tracing::info!("Created edge: {}", edge.id());

            let view = EdgeView::new(client.codec(), &edge)?;
            match format {
                OutputFormat::Json => println!("{}", format_output(&view, format)),
                OutputFormat::Text => println!("Created edge: {}", view.id),
            }
        }
        EdgeCommands::Get { id } => {
            let id = client.edge_id(id)?;
            let edge = client
                .read_edge(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Edge not found: {}", id))?;
            println!("{}", format_output(&EdgeView::new(client.codec(), &edge)?, format));
        }
        EdgeCommands::List { ids } => {
            let edges: Vec<_> = client.get_edges(ids.clone()).await?.try_collect().await?;
            let views = edges
                .iter()
                .map(|e| EdgeView::new(client.codec(), e))
                .collect::<anyhow::Result<Vec<_>>>()?;
            if views.is_empty() && format == OutputFormat::Text {
                println!("No edges found");
            } else {
                println!("{}", format_list(&views, format));
            }
        }
        EdgeCommands::Rm { id } => {
            let id = client.edge_id(id)?;
            match client.read_edge(&id).await? {
                Some(mut edge) => {
                    client.delete_edge(&mut edge).await?;
                    println!("Deleted edge: {}", id);
                }
                None => println!("Edge already absent: {}", id),
            }
        }
    }

    Ok(())
}
