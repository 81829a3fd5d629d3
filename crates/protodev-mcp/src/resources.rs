//! MCP resource implementations for the dev container environment
//!
//! This module defines the two read-only resources exposed by the server:
//! - container://info: host metadata and ecosystem tools found on PATH
//! - workspace://structure: shallow snapshot of the workspace directory
//!
//! Resources never fail on missing data: absent tools are omitted, absent
//! environment variables become `"unknown"` or are left out, and unreadable
//! directories are reported inside the payload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ServerConfig;
use crate::process::resolve_on_path;
use crate::types::ResourceDescriptor;
use crate::{Error, Result};

pub const CONTAINER_INFO_URI: &str = "container://info";
pub const WORKSPACE_STRUCTURE_URI: &str = "workspace://structure";

/// Maximum number of entries reported per workspace directory
pub const MAX_ENTRIES_PER_DIR: usize = 10;

/// Placeholder entry for a directory that could not be listed
pub const ACCESS_DENIED: &str = "(access denied)";

const UNKNOWN: &str = "unknown";

/// A readable resource bound to a URI
pub trait ResourceHandler: Send + Sync {
    fn descriptor(&self) -> ResourceDescriptor;

    /// Produce the resource payload as JSON
    fn read(&self) -> BoxFuture<'_, Result<Value>>;
}

/// Immutable set of resources keyed by URI
#[derive(Default, Clone)]
pub struct ResourceRegistry {
    resources: Vec<Arc<dyn ResourceHandler>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the container info and workspace structure resources
    pub fn with_defaults(config: &ServerConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            resources: vec![
                Arc::new(ContainerInfoResource::new(
                    config.probe_tools.clone(),
                    started_at,
                )) as Arc<dyn ResourceHandler>,
                Arc::new(WorkspaceStructureResource::new(
                    config.workspace_root.clone(),
                )) as Arc<dyn ResourceHandler>,
            ],
        }
    }

    /// Add a resource; URIs must be unique
    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) -> Result<()> {
        let uri = handler.descriptor().uri;
        if self.get(uri).is_some() {
            return Err(Error::internal(format!(
                "resource '{}' is already registered",
                uri
            )));
        }
        self.resources.push(handler);
        Ok(())
    }

    pub fn get(&self, uri: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.resources
            .iter()
            .find(|r| r.descriptor().uri == uri)
            .cloned()
    }

    pub fn descriptors(&self) -> Vec<ResourceDescriptor> {
        self.resources.iter().map(|r| r.descriptor()).collect()
    }
}

// ============================================================================
// container://info
// ============================================================================

/// Payload of the container info resource
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContainerInfo {
    pub hostname: String,
    pub user: String,
    pub workdir: String,
    pub server_version: String,
    pub server_started_at: String,
    /// Tool name to resolved path; tools not found are omitted
    pub available_tools: BTreeMap<String, String>,
    pub env: DisplayEnv,
}

/// Environment variables reported for display only
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DisplayEnv {
    #[serde(rename = "DISPLAY", skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(rename = "DOCKER_HOST", skip_serializing_if = "Option::is_none")]
    pub docker_host: Option<String>,
}

impl ContainerInfo {
    /// Assemble container info from an environment lookup and a PATH probe
    pub fn collect<E, P>(
        probe_tools: &[String],
        started_at: DateTime<Utc>,
        env: E,
        probe: P,
    ) -> Self
    where
        E: Fn(&str) -> Option<String>,
        P: Fn(&str) -> Option<PathBuf>,
    {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());

        let available_tools = probe_tools
            .iter()
            .filter_map(|tool| probe(tool).map(|path| (tool.clone(), path.display().to_string())))
            .collect();

        let workdir = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| UNKNOWN.to_string());

        Self {
            hostname: var("HOSTNAME").unwrap_or_else(|| UNKNOWN.to_string()),
            user: var("USER").unwrap_or_else(|| UNKNOWN.to_string()),
            workdir,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            server_started_at: started_at.to_rfc3339(),
            available_tools,
            env: DisplayEnv {
                display: var("DISPLAY"),
                docker_host: var("DOCKER_HOST"),
            },
        }
    }
}

/// Container information resource
pub struct ContainerInfoResource {
    probe_tools: Vec<String>,
    started_at: DateTime<Utc>,
}

impl ContainerInfoResource {
    pub fn new(probe_tools: Vec<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            probe_tools,
            started_at,
        }
    }
}

impl ResourceHandler for ContainerInfoResource {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: CONTAINER_INFO_URI,
            name: "Container Information",
            mime_type: "application/json",
            description:
                "Information about the dev container environment including available tools",
        }
    }

    fn read(&self) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let info = ContainerInfo::collect(
                &self.probe_tools,
                self.started_at,
                |key| std::env::var(key).ok(),
                resolve_on_path,
            );
            debug!(
                "Container info: {} of {} probed tools available",
                info.available_tools.len(),
                self.probe_tools.len()
            );
            serde_json::to_value(&info).map_err(|e| Error::internal(e.to_string()))
        })
    }
}

// ============================================================================
// workspace://structure
// ============================================================================

/// Payload of the workspace structure resource
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WorkspaceStructure {
    /// Visible top-level directory name to its first entries
    Listing(BTreeMap<String, Vec<String>>),
    /// The root itself could not be read
    Unreadable { error: String },
}

impl WorkspaceStructure {
    /// Snapshot `root`: visible subdirectories with up to ten sorted entries each
    pub async fn scan(root: &Path) -> Self {
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) => {
                return WorkspaceStructure::Unreadable {
                    error: format!("{}: {}", root.display(), e),
                }
            }
        };

        let mut listing = BTreeMap::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return WorkspaceStructure::Unreadable {
                        error: format!("{}: {}", root.display(), e),
                    }
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }

            let children = match list_names(&entry.path()).await {
                Ok(mut names) => {
                    names.truncate(MAX_ENTRIES_PER_DIR);
                    names
                }
                Err(_) => vec![ACCESS_DENIED.to_string()],
            };
            listing.insert(name, children);
        }

        WorkspaceStructure::Listing(listing)
    }
}

/// Sorted entry names of `dir`
async fn list_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Workspace structure resource
pub struct WorkspaceStructureResource {
    root: PathBuf,
}

impl WorkspaceStructureResource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ResourceHandler for WorkspaceStructureResource {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: WORKSPACE_STRUCTURE_URI,
            name: "Workspace Structure",
            mime_type: "application/json",
            description: "Directory structure of the workspace folder",
        }
    }

    fn read(&self) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let structure = WorkspaceStructure::scan(&self.root).await;
            serde_json::to_value(&structure).map_err(|e| Error::internal(e.to_string()))
        })
    }
}
