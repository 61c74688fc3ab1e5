//! AI Scheduler CLI
//!
//! Asks the scheduler for placements and inspects node rankings, stability
//! analysis and pod history.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, nodes, placement};

/// AI Scheduler CLI
#[derive(Parser)]
#[command(name = "ais")]
#[command(author, version, about = "CLI for the AI Scheduler", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via AIS_API_URL env var)
    #[arg(long, env = "AIS_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pick the best node for a pod
    Predict {
        /// Pod name
        pod: String,

        /// Pod namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Rank all nodes by final score
    Nodes,

    /// Show a node's stability analysis
    Analysis {
        /// Node name
        node: String,

        /// Analysis window (e.g. 1h, 24h, 7d)
        #[arg(long, short, default_value = "24h")]
        window: String,
    },

    /// Show a node's retained pod events
    History {
        /// Node name
        node: String,
    },

    /// Show scheduler health and readiness
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;

    match cli.command {
        Commands::Predict { pod, namespace } => {
            let namespace = config.resolve_namespace(namespace);
            placement::predict(&client, &pod, &namespace, cli.format).await?;
        }
        Commands::Nodes => {
            nodes::list_nodes(&client, cli.format).await?;
        }
        Commands::Analysis { node, window } => {
            nodes::show_analysis(&client, &node, &window, cli.format).await?;
        }
        Commands::History { node } => {
            nodes::show_history(&client, &node, cli.format).await?;
        }
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
