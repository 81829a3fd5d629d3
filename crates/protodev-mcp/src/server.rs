//! MCP server lifecycle and state management
//!
//! This module contains the main server state: the resolved configuration
//! and the dispatcher built from it. The registries are constructed once
//! here and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::process::ProcessRunner;
use crate::protocol;
use crate::resources::ResourceRegistry;
use crate::tools::ToolRegistry;

/// Main server state holding all runtime resources
pub struct McpServerState {
    /// Configuration the registries were built from
    pub config: ServerConfig,

    /// Server initialization timestamp for metadata
    pub initialized_at: DateTime<Utc>,

    dispatcher: Dispatcher,
}

impl McpServerState {
    /// Create server state with the default tools and resources
    pub fn new(config: ServerConfig) -> Self {
        let initialized_at = Utc::now();
        let runner = ProcessRunner::new(config.command_timeout);
        let dispatcher = Dispatcher::new(
            ToolRegistry::with_defaults(&config, runner),
            ResourceRegistry::with_defaults(&config, initialized_at),
        );

        Self {
            config,
            initialized_at,
            dispatcher,
        }
    }

    /// Create server state from environment configuration
    pub fn from_env() -> Self {
        Self::new(ServerConfig::from_env())
    }

    /// Create server state around a custom dispatcher
    pub fn with_dispatcher(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            initialized_at: Utc::now(),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Log the effective configuration and flag missing directories
    ///
    /// Missing directories are not fatal: the affected tool or resource
    /// reports the problem when it is called.
    pub async fn initialize(&self) -> crate::Result<()> {
        info!(
            "MCP server configured: projects={} workspace={} runtime={} interpreter={}",
            self.config.projects_dir.display(),
            self.config.workspace_root.display(),
            self.config.container_runtime,
            self.config.interpreter
        );

        for (label, dir) in [
            ("projects", &self.config.projects_dir),
            ("workspace", &self.config.workspace_root),
        ] {
            if tokio::fs::metadata(dir).await.is_err() {
                warn!("{} directory {} is not accessible", label, dir.display());
            }
        }

        if let Some(limit) = self.config.command_timeout {
            info!("Subprocess timeout set to {:?}", limit);
        }

        Ok(())
    }

    /// Handle one raw frame, returning the response frame if any
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        protocol::handle_line(&self.dispatcher, line).await
    }
}
