//! CLI command implementations
//!
//! Both commands load the configuration and bind every resource first, so
//! `check` reports exactly the errors `serve` would fail on.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::http_server::{HttpServer, HttpServerConfig};
use crate::resource::{Conf, Index, Resource, Storer};
use crate::schema::Schema;
use crate::storage::MemoryStorer;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Storage backend of a configured resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// In-memory storer, emptied on restart
    #[default]
    Memory,
    /// No storage: every request answers 501
    None,
}

/// One resource in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub conf: Conf,
    #[serde(default)]
    pub storage: StorageKind,
    /// Field holding the parent id; required for sub-resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_resources: Vec<ResourceConfig>,
}

impl ResourceConfig {
    fn bind(self) -> CliResult<Resource> {
        let storer: Option<Arc<dyn Storer>> = match self.storage {
            StorageKind::Memory => Some(Arc::new(MemoryStorer::new())),
            StorageKind::None => None,
        };
        let mut resource = Resource::bind(self.name, self.schema, storer, self.conf)?;

        for child in self.sub_resources {
            let parent_field = child.parent_field.clone().ok_or_else(|| {
                CliError::config_error(format!(
                    "sub-resource {} of {} needs a parent_field",
                    child.name,
                    resource.name()
                ))
            })?;
            resource = resource.with_sub_resource(parent_field, child.bind()?)?;
        }
        Ok(resource)
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))
    }

    /// Bind every configured resource into an index
    pub fn build_index(&self) -> CliResult<Index> {
        let mut index = Index::new();
        for resource in self.resources.iter().cloned() {
            if resource.parent_field.is_some() {
                return Err(CliError::config_error(format!(
                    "top-level resource {} cannot have a parent_field",
                    resource.name
                )));
            }
            index.bind(resource.bind()?)?;
        }
        Ok(index)
    }
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}

/// Run a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve { config, port } => serve(&config, port),
        Command::Check { config } => check(&config),
    }
}

/// Bind the configured resources and serve until the process is stopped
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    let index = Arc::new(config.build_index()?);
    info!(
        config = %config_path.display(),
        resources = config.resources.len(),
        "configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::serve_failed(format!("Failed to start runtime: {}", e)))?;

    let server = HttpServer::with_config(index, config.server);
    runtime
        .block_on(server.start())
        .map_err(|e| CliError::serve_failed(e.to_string()))
}

/// Bind the configured resources and print a report
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let index = config.build_index()?;
    write_json(&describe_index(&index))
}

/// JSON report of every bound resource
pub fn describe_index(index: &Index) -> Value {
    Value::Array(index.resources().map(describe_resource).collect())
}

fn describe_resource(resource: &Resource) -> Value {
    let conf = resource.conf();
    let mut report = json!({
        "name": resource.name(),
        "storage": resource.storer().is_some(),
        "allowed_modes": conf.allowed_modes,
        "pagination_default_limit": conf.pagination_default_limit,
        "schema": resource.schema().describe(),
    });
    if !conf.default_sort.is_empty() {
        report["default_sort"] = Value::String(conf.default_sort.to_string());
    }
    if let Some(field) = resource.parent_field() {
        report["parent_field"] = Value::String(field.to_string());
    }
    let children: Vec<Value> = resource.sub_resources().map(describe_resource).collect();
    if !children.is_empty() {
        report["sub_resources"] = Value::Array(children);
    }
    report
}
