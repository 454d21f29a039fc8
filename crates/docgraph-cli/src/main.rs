//! Docgraph CLI - property graphs on an embedded document store

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{edge, graph, traverse, var, vertex};
use docgraph_client::GraphClient;
use docgraph_core::GraphConfig;
use docgraph_storage::RedbStore;

#[derive(Parser)]
#[command(name = "docgraph")]
#[command(author, version, about = "Property graphs on a multi-collection document store")]
pub struct Cli {
    /// Graph configuration file (TOML, flat `graph.*` / `driver.*` keys)
    #[arg(short, long, env = "DOCGRAPH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long, env = "DOCGRAPH_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format: text, json
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the data directory path
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("docgraph")
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the schema derived from the configuration
    Schema,
    /// Open the graph, creating it on first use
    Open,
    /// Manage vertices
    Vertex(vertex::VertexArgs),
    /// Manage edges
    Edge(edge::EdgeArgs),
    /// List the neighbors of a vertex
    Neighbors(traverse::TraverseArgs),
    /// List the edges of a vertex
    Edges(traverse::TraverseArgs),
    /// Manage graph variables
    Var(var::VarArgs),
}

/// Application context with an open graph
pub struct AppContext {
    pub client: GraphClient<RedbStore>,
    pub db_path: PathBuf,
}

impl AppContext {
    pub async fn open(cli: &Cli, config: GraphConfig) -> anyhow::Result<Self> {
        let data_dir = cli.data_dir();
        std::fs::create_dir_all(&data_dir)?;

        let db_path = data_dir.join(format!("{}.redb", config.db_name));
        tracing::debug!("Using database at: {:?}", db_path);

        let store = RedbStore::open(&db_path)?;
        let client = GraphClient::open(std::sync::Arc::new(store), config).await?;

        Ok(Self { client, db_path })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting docgraph CLI");

    let config = config::load(cli.config.as_deref())?;

    if let Commands::Schema = cli.command {
        return graph::schema(&config, &cli);
    }

    let ctx = AppContext::open(&cli, config).await?;

    match &cli.command {
        Commands::Schema => {}
        Commands::Open => graph::open(&cli, &ctx).await?,
        Commands::Vertex(args) => vertex::run(args, &cli, &ctx).await?,
        Commands::Edge(args) => edge::run(args, &cli, &ctx).await?,
        Commands::Neighbors(args) => traverse::neighbors(args, &cli, &ctx).await?,
        Commands::Edges(args) => traverse::edges(args, &cli, &ctx).await?,
        Commands::Var(args) => var::run(args, &cli, &ctx).await?,
    }

    Ok(())
}
