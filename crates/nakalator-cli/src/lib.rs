//! Nakalator CLI Library
//!
//! Batch uploader for the Nakala research data repository.
//!
//! # Overview
//!
//! - **Workspace**: scaffold the data / metadatas / output layout (`nakalator init`)
//! - **Upload**: send the files of each job, with bounded retries (`nakalator main`)
//! - **Collections**: create, look up or reuse the collection of each job
//! - **Reports**: write one mapping CSV per job and check it against the repository

pub mod api;
pub mod collection;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod job;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod retry;
pub mod templates;
pub mod upload;
pub mod verify;
pub mod workflow;

// Re-export commonly used types
pub use error::{CliError, Result};
pub use job::JobConfig;

use clap::{Parser, Subcommand};
use commands::run::MainArgs;
use std::path::PathBuf;

/// Nakalator - batch uploads to Nakala
#[derive(Parser, Debug)]
#[command(name = "nakalator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace directory
    #[arg(long, env = "NAKALATOR_WORKSPACE", default_value = ".", global = true)]
    pub workspace: PathBuf,

    /// Override the API base URL of the selected environment
    #[arg(long, env = "NAKALATOR_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Print the CLI reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a Nakalator workspace
    Init {
        /// Directory in which to create nakalator_workspace/
        #[arg(default_value = ".")]
        path: String,

        /// Rewrite the template files of an existing workspace
        #[arg(short, long)]
        force: bool,
    },

    /// Upload data and create data resources on Nakala
    Main(MainArgs),
}
