//! CLI for the Trac ticket tracker client.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use django_triage::constants::DEFAULT_MAX_RESULTS;
use django_triage::{Config, TracClient};

#[derive(Parser)]
#[command(name = "trac", about = "Query the Django Trac ticket tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search Trac for tickets
    Search {
        /// Search query words
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Fetch one ticket by id, including its comments
    Get {
        /// Trac ticket number
        ticket_id: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let client = TracClient::new(&config).context("Failed to build Trac client")?;

    let output = match cli.command {
        Command::Search { query } => {
            let results = client.search(&query.join(" "), DEFAULT_MAX_RESULTS).await?;
            serde_json::to_string_pretty(&results)?
        }
        Command::Get { ticket_id } => {
            let ticket = client.get_ticket(ticket_id).await?;
            serde_json::to_string_pretty(&ticket)?
        }
    };
    println!("{output}");
    Ok(())
}
