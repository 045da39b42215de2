//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fetch complete result sets from a Parse server, past the per-query cap
#[derive(Parser, Debug)]
#[command(name = "stitch-query")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stitch every page of a query on one or more classes
    Fetch {
        /// Class to query (repeat for several classes, fetched concurrently)
        #[arg(long = "class", required = true)]
        classes: Vec<String>,

        /// `where` constraints as JSON, e.g. '{"score":{"$gt":10}}'
        #[arg(long = "where")]
        where_json: Option<String>,

        /// Keep paging past the offset depth by cursoring on createdAt
        #[arg(long)]
        super_stitch: bool,

        /// Send the configured master key
        #[arg(long)]
        use_master_key: bool,

        /// Act as the user owning this session token
        #[arg(long)]
        session_token: Option<String>,

        /// Read records from a JSON file (`{"Class": [...]}`) instead of a server
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Validate configuration and optionally probe a class
    Check {
        /// Class to probe with a single-record query
        #[arg(long = "class")]
        class: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON summary object per class, one per line
    Json,
    /// One record per line
    Jsonl,
    /// Human-readable JSON
    Pretty,
}
