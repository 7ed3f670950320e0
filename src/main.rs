use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lore_rag::Result;
use lore_rag::commands::{ask, index, run_chat, search, show_status};
use lore_rag::config::{Config, resolve_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "lore-rag")]
#[command(about = "Ask questions about your Tolkien books, answered by Gandalf")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the books and the index file
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama, models and the books directory
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Start an interactive chat (the default)
    Chat,
    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
    },
    /// Show the pages retrieved for a query without calling the LLM
    Search {
        /// Text to search for
        query: String,
        /// Number of pages to retrieve
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Build the index from the books directory
    Index {
        /// Delete the existing index and build it again
        #[arg(long)]
        rebuild: bool,
    },
    /// Show the state of the books directory and the index
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir)
        .map_err(|e| lore_rag::LoreError::Config(e.to_string()))?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Chat => {
            run_chat(&Config::load(&config_dir)?)?;
        }
        Commands::Ask { question } => {
            ask(&Config::load(&config_dir)?, &question)?;
        }
        Commands::Search { query, k } => {
            search(&Config::load(&config_dir)?, &query, k)?;
        }
        Commands::Index { rebuild } => {
            index(&Config::load(&config_dir)?, rebuild)?;
        }
        Commands::Status => {
            show_status(&Config::load(&config_dir)?)?;
        }
    }

    Ok(())
}
