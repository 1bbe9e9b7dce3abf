// config.rs: Gateway configuration.
//
// `for_project()` gives the defaults, with gateway state under `.readgate/`
// in the project root. `load()` overlays `.readgate/config.toml` when it
// exists. Relative paths in the file resolve against the project root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rg_gate::{DelegateOp, StatFailurePolicy};

use crate::error::GatewayError;

/// Directory under the project root holding gateway state and config.
pub const STATE_DIR: &str = ".readgate";
pub const CONFIG_FILE: &str = "config.toml";

/// Tool names the delegate filesystem server exposes for each operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegateToolNames {
    pub read: String,
    pub stat: String,
    pub write: String,
    pub apply_diff: String,
}

impl Default for DelegateToolNames {
    fn default() -> Self {
        Self {
            read: "read_file".to_string(),
            stat: "get_file_info".to_string(),
            write: "write_to_file".to_string(),
            apply_diff: "apply_diff".to_string(),
        }
    }
}

impl DelegateToolNames {
    /// The delegate tool that performs `op`.
    pub fn for_op(&self, op: DelegateOp) -> &str {
        match op {
            DelegateOp::Read => &self.read,
            DelegateOp::Stat => &self.stat,
            DelegateOp::Write => &self.write,
            DelegateOp::ApplyDiff => &self.apply_diff,
        }
    }
}

/// How to launch the delegate filesystem MCP server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegateConfig {
    /// Program followed by its arguments, e.g. `["npx", "-y", "some-fs-server", "."]`.
    pub command: Vec<String>,

    /// Extra environment for the child process.
    pub env: BTreeMap<String, String>,

    pub tools: DelegateToolNames,
}

impl DelegateConfig {
    /// Split `command` into program and arguments.
    pub fn program(&self) -> Result<(&str, &[String]), GatewayError> {
        match self.command.split_first() {
            Some((program, args)) if !program.trim().is_empty() => Ok((program.as_str(), args)),
            _ => Err(GatewayError::NoDelegateCommand),
        }
    }
}

/// Configuration for the gateway server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Project root; the delegate runs with this as its working directory.
    pub workspace_root: PathBuf,

    /// Name advertised in the MCP handshake.
    pub server_name: String,

    /// Decision log path. None disables the log.
    pub audit_log: Option<PathBuf>,

    pub stat_failure: StatFailurePolicy,

    pub delegate: DelegateConfig,
}

/// On-disk shape of `.readgate/config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    server_name: Option<String>,
    audit: Option<bool>,
    audit_log: Option<PathBuf>,
    stat_failure: Option<StatFailurePolicy>,
    delegate: Option<DelegateConfig>,
}

impl GatewayConfig {
    /// Defaults for a project, with no delegate command.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        Self {
            audit_log: Some(root.join(STATE_DIR).join("audit.jsonl")),
            workspace_root: root,
            server_name: "code-mode-rules".to_string(),
            stat_failure: StatFailurePolicy::default(),
            delegate: DelegateConfig::default(),
        }
    }

    pub fn config_path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(STATE_DIR).join(CONFIG_FILE)
    }

    /// Defaults overlaid with `.readgate/config.toml`, if present.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let mut config = Self::for_project(&project_root);
        let path = Self::config_path(&project_root);
        if !path.exists() {
            return Ok(config);
        }

        let text = std::fs::read_to_string(&path).map_err(|source| GatewayError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(|source| GatewayError::ConfigParse {
            path: path.clone(),
            source,
        })?;

        if let Some(name) = file.server_name {
            config.server_name = name;
        }
        if let Some(log) = file.audit_log {
            config.audit_log = Some(config.workspace_root.join(log));
        }
        if file.audit == Some(false) {
            config.audit_log = None;
        }
        if let Some(policy) = file.stat_failure {
            config.stat_failure = policy;
        }
        if let Some(delegate) = file.delegate {
            config.delegate = delegate;
        }

        tracing::debug!(path = %path.display(), "loaded gateway config");
        Ok(config)
    }

    /// Replace the delegate command line, e.g. from CLI arguments.
    pub fn with_delegate_command(mut self, command: Vec<String>) -> Self {
        if !command.is_empty() {
            self.delegate.command = command;
        }
        self
    }
}
