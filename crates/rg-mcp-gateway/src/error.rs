// error.rs: Error types for the MCP gateway.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring or starting the gateway.
///
/// Tool-call failures never use this type; they travel as `GateError`
/// and are mapped straight to MCP error data.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gate error: {0}")]
    Gate(#[from] rg_gate::GateError),

    #[error("audit error: {0}")]
    Audit(#[from] rg_audit::AuditError),

    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// No program to launch as the delegate filesystem server.
    #[error("no delegate command configured: set [delegate] command in .readgate/config.toml or pass one after `--`")]
    NoDelegateCommand,

    /// The delegate process started but the MCP handshake failed.
    #[error("failed to start delegate `{command}`: {reason}")]
    DelegateStartup { command: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
