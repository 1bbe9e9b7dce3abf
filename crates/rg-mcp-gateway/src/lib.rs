//! # rg-mcp-gateway
//!
//! MCP server that puts the read-before-write gate in front of a filesystem
//! MCP server.
//!
//! The gateway launches the configured delegate server as a child process
//! ([`McpDelegate`]), wraps it in an [`rg_gate::ReadGate`], and serves the
//! four gated tools over stdio ([`ReadGateServer`]). Configuration lives in
//! `.readgate/config.toml` ([`GatewayConfig`]).

pub mod config;
pub mod delegate;
pub mod error;
pub mod server;

pub use config::{DelegateConfig, DelegateToolNames, GatewayConfig};
pub use delegate::McpDelegate;
pub use error::GatewayError;
pub use server::{build_gate, ReadGateServer, SharedDelegate};
