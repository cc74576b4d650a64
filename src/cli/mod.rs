//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "supportrag",
    version,
    author = "neur0map",
    about = "Semantic FAQ and order retrieval for support chat",
    long_about = "supportrag builds a similarity index over FAQ pairs and order summaries, keeps it \
                  persisted next to the exact entries it was built from, and answers support \
                  questions with the closest matching knowledge."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/supportrag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the persisted index, building it if missing or invalid
    Init,

    /// Rebuild the index from the knowledge sources
    Rebuild,

    /// Rank knowledge entries by similarity to a query
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results to return
        #[arg(short, default_value = "3")]
        k: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Answer a support question from the FAQ knowledge
    Faq {
        /// Question text
        query: String,

        /// Minimum similarity score (defaults to retrieval.relevance_threshold)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Number of candidates to consider (defaults to retrieval.default_k)
        #[arg(short)]
        k: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Track an order by id
    Order {
        /// Order id (e.g., ORD001)
        order_id: String,

        /// Print the full order summary
        #[arg(long)]
        summary: bool,
    },

    /// Check refund eligibility for an order
    Refund {
        /// Order id
        order_id: String,

        /// Customer's reason for the refund
        reason: String,
    },

    /// Look up a restaurant by name
    Restaurant {
        /// Restaurant name (case-insensitive)
        name: String,
    },

    /// Open a ticket for human support
    Escalate {
        /// Description of the issue
        issue: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the default configuration path
    Path,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
