//! Server configuration
//!
//! Paths and binary names are configuration constants, never derived from
//! requests. Resolution order (highest to lowest priority):
//! 1. Explicit overrides applied by the caller (CLI flags)
//! 2. `PROTODEV_*` environment variables
//! 3. Compiled defaults matching the protodev dev container layout
//!
//! # Environment Variables
//!
//! - `PROTODEV_PROJECTS_DIR`: directory listed by `list_projects`
//! - `PROTODEV_WORKSPACE_DIR`: root snapshotted by `workspace://structure`
//! - `PROTODEV_CONTAINER_RUNTIME`: container CLI used by `container_list`
//! - `PROTODEV_INTERPRETER`: interpreter used by `run_script`
//! - `PROTODEV_PROBE_TOOLS`: comma-separated tools reported by `container://info`
//! - `PROTODEV_COMMAND_TIMEOUT_SECS`: optional subprocess wait limit

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_PROJECTS_DIR: &str = "/workspace/projects";
pub const DEFAULT_WORKSPACE_ROOT: &str = "/workspace";
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Ecosystem tools probed on PATH for the container info resource
pub const DEFAULT_PROBE_TOOLS: &[&str] =
    &["docker", "python3", "node", "npm", "pnpm", "bun", "git", "gh"];

/// Runtime configuration shared by the resource provider and tool handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory whose immediate subdirectories are reported as projects
    pub projects_dir: PathBuf,

    /// Root of the workspace structure snapshot
    pub workspace_root: PathBuf,

    /// Container runtime CLI (`docker`, `podman`, ...)
    pub container_runtime: String,

    /// Scripting interpreter invoked with `-c <code>`
    pub interpreter: String,

    /// Tools looked up on PATH for `container://info`
    pub probe_tools: Vec<String>,

    /// Upper bound on a single subprocess wait; `None` waits indefinitely
    pub command_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            projects_dir: PathBuf::from(DEFAULT_PROJECTS_DIR),
            workspace_root: PathBuf::from(DEFAULT_WORKSPACE_ROOT),
            container_runtime: DEFAULT_CONTAINER_RUNTIME.to_string(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            probe_tools: DEFAULT_PROBE_TOOLS.iter().map(|t| t.to_string()).collect(),
            command_timeout: None,
        }
    }
}

impl ServerConfig {
    /// Create configuration from defaults overlaid with environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] but reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = var("PROTODEV_PROJECTS_DIR") {
            config.projects_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("PROTODEV_WORKSPACE_DIR") {
            config.workspace_root = PathBuf::from(dir);
        }
        if let Some(runtime) = var("PROTODEV_CONTAINER_RUNTIME") {
            config.container_runtime = runtime.trim().to_string();
        }
        if let Some(interpreter) = var("PROTODEV_INTERPRETER") {
            config.interpreter = interpreter.trim().to_string();
        }
        if let Some(tools) = var("PROTODEV_PROBE_TOOLS") {
            config.probe_tools = tools
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = var("PROTODEV_COMMAND_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.command_timeout = Some(Duration::from_secs(secs)),
                _ => warn!(
                    "Ignoring PROTODEV_COMMAND_TIMEOUT_SECS={:?}: expected a positive integer",
                    raw
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_container_layout() {
        let config = ServerConfig::default();
        assert_eq!(config.projects_dir, PathBuf::from("/workspace/projects"));
        assert_eq!(config.workspace_root, PathBuf::from("/workspace"));
        assert_eq!(config.container_runtime, "docker");
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.probe_tools.len(), 8);
        assert!(config.command_timeout.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PROTODEV_PROJECTS_DIR", "/tmp/projects"),
            ("PROTODEV_CONTAINER_RUNTIME", "podman"),
            ("PROTODEV_PROBE_TOOLS", "git, ,cargo"),
            ("PROTODEV_COMMAND_TIMEOUT_SECS", "30"),
        ]));

        assert_eq!(config.projects_dir, PathBuf::from("/tmp/projects"));
        assert_eq!(config.workspace_root, PathBuf::from("/workspace"));
        assert_eq!(config.container_runtime, "podman");
        assert_eq!(config.probe_tools, vec!["git", "cargo"]);
        assert_eq!(config.command_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_empty_and_invalid_values_ignored() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PROTODEV_INTERPRETER", "   "),
            ("PROTODEV_COMMAND_TIMEOUT_SECS", "soon"),
        ]));

        assert_eq!(config.interpreter, "python3");
        assert!(config.command_timeout.is_none());
    }
}
