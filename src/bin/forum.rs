//! CLI for the Discourse forum client.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use django_triage::constants::DEFAULT_MAX_RESULTS;
use django_triage::{Config, ForumClient};

#[derive(Parser)]
#[command(name = "forum", about = "Query the Django Discourse forum")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search forum topics
    Search {
        /// Search query words
        #[arg(required = true)]
        query: Vec<String>,
        /// Restrict to a category: announcements, users, internals,
        /// projects, events, packages
        #[arg(long)]
        category: Option<String>,
    },
    /// Fetch one topic by id, including its posts
    Get {
        /// Discourse topic id
        topic_id: u64,
    },
    /// Find topics mentioning a Trac ticket
    Ticket {
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
    let client = ForumClient::new(&config).context("Failed to build forum client")?;

    let output = match cli.command {
        Command::Search { query, category } => {
            let results = client
                .search(&query.join(" "), category.as_deref(), DEFAULT_MAX_RESULTS)
                .await?;
            serde_json::to_string_pretty(&results)?
        }
        Command::Get { topic_id } => {
            let topic = client.get_topic(topic_id).await?;
            serde_json::to_string_pretty(&topic)?
        }
        Command::Ticket { ticket_id } => {
            let results = client.search_by_ticket(ticket_id).await?;
            serde_json::to_string_pretty(&results)?
        }
    };
    println!("{output}");
    Ok(())
}
