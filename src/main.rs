//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the catalog API server and the remote-catalog
//! client. Handles shared concerns: env loading, structured logging, and the
//! API URL resolution every remote subcommand shares.
//!
//! ## Subcommands
//!
//! - `serve` — run the catalog REST API (optionally seeded with demo data).
//! - `list` / `show` — browse a remote catalog.
//! - `create` — import a campaign TOML and post it.
//! - `update` — post a progress update to a campaign.
//! - `pledge` — record a backer's pledge.
//! - `quote` — price timed access for a campaign.
//! - `upload` — push a data artifact (multipart; server returns the content hash).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "descidata", about = "DeSci research-crowdfunding catalog")]
struct Cli {
    /// Catalog API base URL (or set DESCIDATA_API_URL env var)
    #[arg(long, env = "DESCIDATA_API_URL", default_value = "http://localhost:4000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the catalog REST API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 4000)]
        port: u16,
        /// Seed the catalog with the demo campaign
        #[arg(long)]
        seed: bool,
    },
    /// List all experiments in the catalog
    List,
    /// Show one experiment in detail
    Show {
        /// Experiment id (URL-safe slug)
        id: String,
    },
    /// Create an experiment from a TOML campaign file
    Create {
        /// Path to the campaign TOML file
        #[arg(long)]
        file: PathBuf,
    },
    /// Post a progress update to an experiment
    Update {
        /// Experiment id
        id: String,
        /// Update headline
        #[arg(long)]
        title: String,
        /// Update body
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Record a backer's pledge
    Pledge {
        /// Experiment id
        id: String,
        /// Pledge amount in EDU
        #[arg(long)]
        amount: f64,
        /// Support tier index (ascending ladder order)
        #[arg(long)]
        tier: Option<usize>,
    },
    /// Price timed access to an experiment
    Quote {
        /// Experiment id
        id: String,
        /// Access duration in months
        #[arg(long, default_value_t = 1)]
        months: u32,
    },
    /// Upload a data artifact to an experiment
    Upload {
        /// Experiment id
        id: String,
        /// Path to the file to upload
        #[arg(long)]
        file: PathBuf,
        /// Optional description of the artifact
        #[arg(long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Structured logging: LOG_FORMAT=json for K8s, human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port, seed } => cli::run_serve(*port, *seed).await,
        Commands::List => cli::run_list(&cli.api_url).await,
        Commands::Show { id } => cli::run_show(&cli.api_url, id).await,
        Commands::Create { file } => cli::run_create(&cli.api_url, file).await,
        Commands::Update { id, title, content } => {
            cli::run_update(&cli.api_url, id, title, content).await
        }
        Commands::Pledge { id, amount, tier } => {
            cli::run_pledge(&cli.api_url, id, *amount, *tier).await
        }
        Commands::Quote { id, months } => cli::run_quote(&cli.api_url, id, *months).await,
        Commands::Upload {
            id,
            file,
            description,
        } => cli::run_upload(&cli.api_url, id, file, description.as_deref()).await,
    }
}
