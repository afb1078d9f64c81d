use clap::{Parser, Subcommand};
use faq_search::commands::{run_search, show_record, show_status};
use faq_search::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "faq-search")]
#[command(about = "Semantic FAQ retrieval over a precomputed embedding store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding backend and search thresholds
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Search the knowledge base for answers to a question
    Search {
        /// Free-text question
        query: String,
        /// Maximum number of answers to return
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the full record for a single id
    Get {
        /// Record id
        id: i64,
    },
    /// Show knowledge base and configuration status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Search { query, limit } => {
            run_search(&query, limit).await?;
        }
        Commands::Get { id } => {
            show_record(id).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
