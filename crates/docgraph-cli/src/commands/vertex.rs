//! Vertex commands

use clap::{Args, Subcommand};
use futures::TryStreamExt;

use crate::output::{format_list, format_output, parse_property, OutputFormat, VertexView};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct VertexArgs {
    #[command(subcommand)]
    pub command: VertexCommands,
}

#[derive(Subcommand)]
pub enum VertexCommands {
    /// Add a vertex
    Add {
        /// Vertex label (collection in a complex graph)
        #[arg(short, long)]
        label: Option<String>,
        /// Vertex id; assigned by the store when omitted
        #[arg(short, long)]
        id: Option<String>,
        /// Property as key=value; repeat a key for multiple values
        #[arg(short, long = "prop")]
        props: Vec<String>,
    },
    /// Show a vertex
    Get {
        /// Vertex id
        id: String,
    },
    /// List vertices; all of them when no ids are given
    List {
        /// Vertex ids
        ids: Vec<String>,
    },
    /// Delete a vertex and its edges
    Rm {
        /// Vertex id
        id: String,
    },
}

pub async fn run(args: &VertexArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = OutputFormat::from(cli.format.as_str());
    let client = &ctx.client;

    match &args.command {
        VertexCommands::Add { label, id, props } => {
            let mut vertex = client.new_vertex(label.as_deref(), id.as_deref())?;
            for prop in props {
                let (key, value) = parse_property(prop)?;
                vertex.add_property(&key, value)?;
            }
            client.insert_vertex(&mut vertex).await?;
            tracing::info!("Created vertex: {}", vertex.id());

            let view = VertexView::new(client.codec(), &vertex)?;
            match format {
                OutputFormat::Json => println!("{}", format_output(&view, format)),
                OutputFormat::Text => println!("Created vertex: {}", view.id),
            }
        }
        VertexCommands::Get { id } => {
            let id = client.vertex_id(id)?;
            let vertex = client
                .read_vertex(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Vertex not found: {}", id))?;
            println!("{}", format_output(&VertexView::new(client.codec(), &vertex)?, format));
        }
        VertexCommands::List { ids } => {
            let vertices: Vec<_> = client.get_vertices(ids.clone()).await?.try_collect().await?;
            let views = vertices
                .iter()
                .map(|v| VertexView::new(client.codec(), v))
                .collect::<anyhow::Result<Vec<_>>>()?;
            if views.is_empty() && format == OutputFormat::Text {
                println!("No vertices found");
            } else {
                println!("{}", format_list(&views, format));
            }
        }
        VertexCommands::Rm { id } => {
            let id = client.vertex_id(id)?;
            match client.read_vertex(&id).await? {
                Some(mut vertex) => {
                    client.delete_vertex(&mut vertex).await?;
                    println!("Deleted vertex: {}", id);
                }
                None => println!("Vertex already absent: {}", id),
            }
        }
    }

    Ok(())
}
