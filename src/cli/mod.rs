//! CLI interface for blogsearch.
//!
//! Provides command-line argument parsing using clap.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Command-line interface for blogsearch.
#[derive(Parser)]
#[command(name = "blogsearch")]
#[command(author, version, about = "Full-text search for blog posts", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where to read search documents from.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Post directory or JSON export (defaults to the configured content dir).
    #[arg(long)]
    pub content: Option<PathBuf>,

    /// Read a prebuilt search snapshot instead of posts.
    #[arg(long, conflicts_with = "content")]
    pub snapshot: Option<PathBuf>,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Build the search snapshot (JSON array of search documents).
    Index {
        /// Post directory or JSON export (defaults to the configured content dir).
        #[arg(long)]
        content: Option<PathBuf>,

        /// Snapshot file to write (defaults to the configured snapshot path).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the snapshot to stdout instead of writing a file.
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Search posts for a query.
    Search {
        /// The search query string.
        query: String,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Interactive search: every line read from stdin is a query.
    Shell {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List published posts, newest first.
    List {
        /// Only posts with this tag.
        #[arg(short, long)]
        tag: Option<String>,

        /// Show only this page of the listing (1-based).
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        page: Option<u64>,

        /// Posts per page when --page is given.
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
        page_size: u64,

        /// Post directory or JSON export (defaults to the configured content dir).
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// List every tag used by published posts.
    Tags {
        /// Post directory or JSON export (defaults to the configured content dir).
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// Start the MCP server for AI editor integration.
    #[cfg(feature = "mcp")]
    Serve {
        #[command(flatten)]
        source: SourceArgs,
    },
}
