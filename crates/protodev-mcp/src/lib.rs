//! MCP (Model Context Protocol) server for the protodev dev container
//!
//! This crate provides a stdio-based MCP server that exposes container
//! introspection and a few developer tools to AI assistants via the Model
//! Context Protocol.
//!
//! # Architecture
//!
//! The MCP server is organized into the following submodules:
//! - `server`: Server state and lifecycle
//! - `dispatcher`: Routes decoded requests to the registries, catches handler panics
//! - `protocol`: JSON-RPC 2.0 framing of MCP methods
//! - `transport`: Newline-delimited stdio transport and the server loop
//! - `tools`: Tool implementations (container_list, run_script, list_projects, check_tool)
//! - `resources`: Resource implementations (container://info, workspace://structure)
//! - `process`: Subprocess execution without a shell
//! - `config`: Environment-driven configuration
//! - `error`: Protocol error type
//!
//! # Transport
//!
//! The server communicates via stdio using JSON-RPC 2.0 messages, one per
//! line. All logging goes to stderr so stdout carries protocol frames only.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod process;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use dispatcher::{Dispatcher, Request, Response};
pub use error::{Error, Result};
pub use server::McpServerState;
pub use transport::{run_server_loop, LineTransport, StdioTransport};
pub use types::{Content, ToolResult};
