//! CLI module for restlayer
//!
//! Provides command-line interface for:
//! - serve: Bind the configured resources and serve them over HTTP
//! - check: Validate the configuration and print the bound resources

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    check, describe_index, run, run_command, serve, Config, ResourceConfig, StorageKind,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_json, write_json_to};
