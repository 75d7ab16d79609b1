//! CLI interface for Penwright
//!
//! Command-line interface built with clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Penwright multi-agent writing desk
///
/// An Editor, a Writer and a Reviewer collaborate on a piece of content,
/// each backed by its own conversation with a language model.
#[derive(Parser, Debug)]
#[command(name = "penwright")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a collaboration on a topic
    Run {
        /// Topic to write about (prompted for when omitted)
        topic: Option<String>,

        /// Pipeline definition (TOML); defaults to the blog-post pipeline
        #[arg(long, value_name = "FILE")]
        pipeline: Option<PathBuf>,

        /// Seconds to pause between steps, overriding the config
        #[arg(long, value_name = "SECS")]
        cooldown: Option<u64>,

        /// API key for the model provider
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },

    /// Check a pipeline against the configured personas without calling the model
    Validate {
        /// Pipeline definition (TOML); defaults to the blog-post pipeline
        #[arg(long, value_name = "FILE")]
        pipeline: Option<PathBuf>,
    },

    /// List the configured personas
    Personas,
}
