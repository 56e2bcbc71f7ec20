//! Configuration for the Conductor Server
//!
//! This module contains the configuration types and loading functionality,
//! plus the readers for registry seed files and workflow definition files.

use conductor_core::{ServiceEntry, ServiceRegistration, ServiceStatus, WorkflowDefinition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Step executor used by workflows loaded from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowExecutorKind {
    /// Steps report completion without doing any work
    #[default]
    Echo,
    /// Steps are POSTed to registered services
    Dispatch,
}

impl fmt::Display for WorkflowExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowExecutorKind::Echo => f.write_str("echo"),
            WorkflowExecutorKind::Dispatch => f.write_str("dispatch"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// YAML or JSON file with services to register at startup
    #[serde(default)]
    pub registry_seed_file: Option<PathBuf>,

    /// Register the built-in service list at startup
    #[serde(default = "default_seed_default_services")]
    pub seed_default_services: bool,

    /// Workflow definition files to load
    #[serde(default)]
    pub workflow_files: Vec<PathBuf>,

    /// Step executor for loaded workflows
    #[serde(default)]
    pub workflow_executor: WorkflowExecutorKind,

    /// HTTP timeout for dispatched steps, in milliseconds
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// Per-step time limit, in milliseconds
    #[serde(default)]
    pub step_timeout_ms: Option<u64>,
}

fn default_port() -> u16 {
    8089
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_seed_default_services() -> bool {
    true
}

fn default_dispatch_timeout_ms() -> u64 {
    30_000
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Start with defaults
        let mut config = Self::default();

        if let Some(port) = lookup("SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.port = port;
            } else {
                warn!("Invalid SERVER_PORT value: {}", port);
            }
        }

        if let Some(host) = lookup("SERVER_HOST") {
            config.bind_address = host;
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => {
                    warn!("Invalid LOG_FORMAT value: {}, using pretty", format);
                    LogFormat::Pretty
                }
            };
        }

        if let Some(path) = lookup("REGISTRY_SEED_FILE") {
            if !path.trim().is_empty() {
                config.registry_seed_file = Some(PathBuf::from(path.trim()));
            }
        }

        if let Some(seed) = lookup("SEED_DEFAULT_SERVICES") {
            match parse_bool(&seed) {
                Some(enabled) => config.seed_default_services = enabled,
                None => warn!("Invalid SEED_DEFAULT_SERVICES value: {}", seed),
            }
        }

        if let Some(files) = lookup("WORKFLOW_FILES") {
            config.workflow_files = files
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        if let Some(executor) = lookup("WORKFLOW_EXECUTOR") {
            config.workflow_executor = match executor.to_lowercase().as_str() {
                "echo" => WorkflowExecutorKind::Echo,
                "dispatch" => WorkflowExecutorKind::Dispatch,
                _ => {
                    return Err(ServerError::ConfigError(format!(
                        "Unsupported WORKFLOW_EXECUTOR value: {}",
                        executor
                    )))
                }
            };
        }

        if let Some(timeout) = lookup("DISPATCH_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) if ms > 0 => config.dispatch_timeout_ms = ms,
                _ => warn!("Invalid DISPATCH_TIMEOUT_MS value: {}", timeout),
            }
        }

        if let Some(timeout) = lookup("STEP_TIMEOUT_MS") {
            if timeout.to_lowercase() == "none" {
                config.step_timeout_ms = None;
            } else {
                match timeout.parse::<u64>() {
                    Ok(ms) if ms > 0 => config.step_timeout_ms = Some(ms),
                    _ => warn!("Invalid STEP_TIMEOUT_MS value: {}", timeout),
                }
            }
        }

        if config.workflow_executor == WorkflowExecutorKind::Dispatch && config.workflow_files.is_empty() {
            warn!("WORKFLOW_EXECUTOR is dispatch but no WORKFLOW_FILES were given");
        }

        info!(
            port = config.port,
            workflows = config.workflow_files.len(),
            executor = %config.workflow_executor,
            "Loaded server configuration"
        );
        Ok(config)
    }

    /// Dispatch timeout as a duration
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    /// Per-step time limit as a duration
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            registry_seed_file: None,
            seed_default_services: default_seed_default_services(),
            workflow_files: Vec::new(),
            workflow_executor: WorkflowExecutorKind::default(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            step_timeout_ms: None,
        }
    }
}

/// Contents of a registry seed file
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    /// Services to register, in order
    #[serde(default)]
    pub services: Vec<ServiceRegistration>,
}

/// Parse a YAML or JSON document; `.json` files are read as JSON, anything
/// else as YAML
fn read_document<T: DeserializeOwned>(path: &Path) -> ServerResult<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ServerError::ConfigError(format!("Cannot read {}: {}", path.display(), e)))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(&content)
            .map_err(|e| ServerError::ConfigError(format!("Invalid JSON in {}: {}", path.display(), e)))
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| ServerError::ConfigError(format!("Invalid YAML in {}: {}", path.display(), e)))
    }
}

/// Read the service registrations listed in a seed file
pub fn load_seed_file(path: &Path) -> ServerResult<Vec<ServiceEntry>> {
    let seed: SeedFile = read_document(path)?;
    let entries = seed
        .services
        .into_iter()
        .map(|registration| registration.into_entry())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::ConfigError(format!("{}: {}", path.display(), e)))?;

    info!(path = %path.display(), count = entries.len(), "Loaded registry seed file");
    Ok(entries)
}

/// Read and validate one workflow definition file
pub fn load_workflow_file(path: &Path) -> ServerResult<WorkflowDefinition> {
    let definition: WorkflowDefinition = read_document(path)?;
    definition
        .validate()
        .map_err(|e| ServerError::ConfigError(format!("{}: {}", path.display(), e)))?;

    info!(
        path = %path.display(),
        workflow = %definition.name,
        steps = definition.steps.len(),
        "Loaded workflow definition"
    );
    Ok(definition)
}

/// The coordinator's built-in service list
pub fn default_services() -> Vec<ServiceEntry> {
    [
        ("KILOCODE MCP", 8080, "Fallback creation engine"),
        ("RELEASE MANAGER_MCP", 8091, "Release management engine"),
        ("SMART UI_MCP", 8092, "Smart UI engine"),
        ("TEST MANAGER_MCP", 8093, "Test management engine"),
        ("REQUIREMENTS ANALYSIS_MCP", 8094, "Requirements analysis engine"),
        ("ARCHITECTURE DESIGN_MCP", 8095, "Architecture design engine"),
    ]
    .into_iter()
    .map(|(name, port, description)| {
        ServiceEntry::new(name, format!("localhost:{}", port))
            .with_status(ServiceStatus::Healthy)
            .with_metadata("port", port as u64)
            .with_metadata("description", description)
    })
    .collect()
}
