//! CLI argument definitions using clap
//!
//! Commands:
//! - restlayer serve --config <path>
//! - restlayer check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// restlayer - schema-driven REST resources over pluggable storage
#[derive(Parser, Debug)]
#[command(name = "restlayer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bind the configured resources and serve them over HTTP
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./restlayer.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load and bind the configuration, print the resources and exit
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./restlayer.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
