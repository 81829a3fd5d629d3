//! Subprocess execution for tool handlers and resource probes
//!
//! Commands are spawned from an argument vector, never through a shell, so
//! caller-supplied text (script source, tool names) cannot alter the command
//! line. Every failure mode is folded into [`ProcessOutcome`]; callers decide
//! how to present it.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of one subprocess invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Non-zero exit, signal termination, spawn failure or timeout
    pub exit_failed: bool,
    /// Describes why the invocation failed, when it did
    pub error_message: Option<String>,
}

impl ProcessOutcome {
    fn failed(message: String) -> Self {
        Self {
            exit_failed: true,
            error_message: Some(message),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        !self.exit_failed
    }

    /// Human-readable failure description including captured stderr
    pub fn failure_detail(&self) -> String {
        let message = self
            .error_message
            .clone()
            .unwrap_or_else(|| "command failed".to_string());
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            message
        } else {
            format!("{}\n{}", message, stderr)
        }
    }
}

/// Spawns external commands and waits for them to finish
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run `program` with `args` and capture its output. Never fails.
    pub async fn run<P, I, S>(&self, program: P, args: I) -> ProcessOutcome
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let name = program.as_ref().to_string_lossy().into_owned();
        debug!(program = %name, "Spawning process");

        let mut command = Command::new(program.as_ref());
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, command.output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(program = %name, "Process timed out after {:?}", limit);
                    return ProcessOutcome::failed(format!("{} timed out after {:?}", name, limit));
                }
            },
            None => command.output().await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!(program = %name, "Failed to start process: {}", e);
                return ProcessOutcome::failed(format!("failed to start {}: {}", name, e));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            return ProcessOutcome {
                stdout,
                stderr,
                exit_failed: false,
                error_message: None,
            };
        }

        let message = match output.status.code() {
            Some(code) => format!("{} exited with status {}", name, code),
            None => format!("{} was terminated by a signal", name),
        };
        debug!(program = %name, "{}", message);

        ProcessOutcome {
            stdout,
            stderr,
            exit_failed: true,
            error_message: Some(message),
        }
    }
}

/// Resolve a bare command name against PATH
pub fn resolve_on_path(tool: &str) -> Option<PathBuf> {
    which::which(tool).ok()
}
