// delegate.rs: McpDelegate, an FsDelegate backed by a child MCP server.
//
// The gateway does no file I/O of its own. It launches the configured
// filesystem MCP server as a child process over stdio and forwards each
// gate operation as a tool call. Results come back as the serialized
// CallToolResult, so reads pass through byte-for-byte.

use std::path::Path;

use async_trait::async_trait;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use rmcp::ServiceExt;
use serde_json::{json, Value};
use tokio::process::Command;

use rg_gate::{DelegateError, DelegateOp, FsDelegate};

use crate::config::{DelegateConfig, DelegateToolNames};
use crate::error::GatewayError;

/// Markers that identify a "file does not exist" failure in delegate text.
const NOT_FOUND_MARKERS: &[&str] = &["enoent", "no such file", "not found", "does not exist"];

/// Filesystem delegate that forwards to a child MCP server.
pub struct McpDelegate {
    client: RunningService<RoleClient, ()>,
    tools: DelegateToolNames,
}

impl McpDelegate {
    /// Launch the delegate in `workdir` and complete the MCP handshake.
    pub async fn spawn(config: &DelegateConfig, workdir: &Path) -> Result<Self, GatewayError> {
        let (program, args) = config.program()?;
        let command_line = config.command.join(" ");

        let mut command = Command::new(program);
        command.args(args).envs(&config.env).current_dir(workdir);

        let transport = TokioChildProcess::new(command)?;
        let client = ().serve(transport).await.map_err(|e| GatewayError::DelegateStartup {
            command: command_line.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(command = %command_line, "delegate filesystem server connected");
        Ok(Self {
            client,
            tools: config.tools.clone(),
        })
    }

    async fn invoke(
        &self,
        op: DelegateOp,
        path: &str,
        arguments: Value,
    ) -> Result<Value, DelegateError> {
        let request = tool_request(&self.tools, op, arguments);
        let tool = self.tools.for_op(op).to_string();
        let params = serde_json::from_value(request)
            .map_err(|e| DelegateError::Failed(format!("failed to build {} call: {}", tool, e)))?;

        let result = self
            .client
            .peer()
            .call_tool(params)
            .await
            .map_err(|e| call_failure(&tool, e))?;

        let payload = serde_json::to_value(&result)
            .map_err(|e| DelegateError::Failed(format!("unreadable {} result: {}", tool, e)))?;
        into_delegate_result(&tool, path, payload)
    }
}

#[async_trait]
impl FsDelegate for McpDelegate {
    async fn read(&self, path: &str) -> Result<Value, DelegateError> {
        self.invoke(DelegateOp::Read, path, json!({ "path": path }))
            .await
    }

    async fn stat(&self, path: &str) -> Result<Value, DelegateError> {
        self.invoke(DelegateOp::Stat, path, json!({ "path": path }))
            .await
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        line_count: u64,
    ) -> Result<Value, DelegateError> {
        self.invoke(
            DelegateOp::Write,
            path,
            json!({ "path": path, "content": content, "line_count": line_count }),
        )
        .await
    }

    async fn apply_diff(&self, path: &str, diff: &str) -> Result<Value, DelegateError> {
        self.invoke(
            DelegateOp::ApplyDiff,
            path,
            json!({ "path": path, "diff": diff }),
        )
        .await
    }
}

/// The `tools/call` params for `op`, in wire shape.
fn tool_request(tools: &DelegateToolNames, op: DelegateOp, arguments: Value) -> Value {
    json!({ "name": tools.for_op(op), "arguments": arguments })
}

/// Transport and protocol errors say nothing about the file itself, so they
/// are never NotFound, whatever their wording.
fn call_failure(tool: &str, err: impl std::fmt::Display) -> DelegateError {
    DelegateError::Failed(format!("{} call failed: {}", tool, err))
}

/// Map a serialized CallToolResult onto the delegate contract.
///
/// Results flagged `isError` fail; their text decides NotFound vs Failed.
fn into_delegate_result(tool: &str, path: &str, payload: Value) -> Result<Value, DelegateError> {
    if payload.get("isError").and_then(Value::as_bool).unwrap_or(false) {
        return Err(classify(path, error_text(tool, &payload)));
    }
    Ok(payload)
}

/// Collect the text content of a tool result flagged `isError`.
fn error_text(tool: &str, payload: &Value) -> String {
    let texts: Vec<&str> = payload
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        format!("{} reported an error", tool)
    } else {
        texts.join("\n")
    }
}

/// Only the delegate's own wording counts; the path is masked out first.
fn classify(path: &str, message: String) -> DelegateError {
    let wording = if path.is_empty() {
        message.to_lowercase()
    } else {
        message.replace(path, "").to_lowercase()
    };
    if NOT_FOUND_MARKERS.iter().any(|m| wording.contains(m)) {
        tracing::debug!(path, "delegate reports file not found");
        DelegateError::NotFound(message)
    } else {
        DelegateError::Failed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_missing_file_messages() {
        for msg in [
            "ENOENT: no such file or directory, stat 'a.txt'",
            "File not found: a.txt",
            "path does not exist",
        ] {
            assert!(matches!(
                classify("a.txt", msg.to_string()),
                DelegateError::NotFound(_)
            ));
        }
        assert!(matches!(
            classify("a.txt", "EACCES: permission denied".to_string()),
            DelegateError::Failed(_)
        ));
    }

    #[test]
    fn error_text_joins_text_content() {
        let payload = json!({
            "content": [
                { "type": "text", "text": "ENOENT" },
                { "type": "image", "data": "..", "mimeType": "image/png" },
                { "type": "text", "text": "stat failed" }
            ],
            "isError": true
        });
        assert_eq!(error_text("get_file_info", &payload), "ENOENT\nstat failed");
        assert_eq!(
            error_text("get_file_info", &json!({ "isError": true })),
            "get_file_info reported an error"
        );
    }

    #[test]
    fn path_text_does_not_count_as_not_found() {
        let path = "x/not found/y.txt";
        let err = classify(path, format!("EACCES: permission denied, open '{}'", path));
        assert!(matches!(err, DelegateError::Failed(_)));

        let err = classify(path, format!("ENOENT: no such file, stat '{}'", path));
        assert!(matches!(err, DelegateError::NotFound(_)));
    }

    #[test]
    fn call_errors_are_never_not_found() {
        let err = call_failure("get_file_info", "Mcp error: -32602: tool not found");
        assert_eq!(
            err,
            DelegateError::Failed(
                "get_file_info call failed: Mcp error: -32602: tool not found".into()
            )
        );
    }

    #[test]
    fn error_results_map_to_delegate_errors() {
        let missing = json!({
            "content": [{ "type": "text", "text": "ENOENT: no such file or directory" }],
            "isError": true
        });
        assert!(matches!(
            into_delegate_result("get_file_info", "a.txt", missing),
            Err(DelegateError::NotFound(_))
        ));

        let denied = json!({
            "content": [{ "type": "text", "text": "EACCES: permission denied" }],
            "isError": true
        });
        assert_eq!(
            into_delegate_result("write_to_file", "a.txt", denied),
            Err(DelegateError::Failed("EACCES: permission denied".into()))
        );

        let ok = json!({
            "content": [{ "type": "text", "text": "1 | hello" }],
            "isError": false
        });
        assert_eq!(
            into_delegate_result("read_file", "a.txt", ok.clone()),
            Ok(ok)
        );
    }

    #[test]
    fn requests_use_configured_tool_names() {
        let tools = DelegateToolNames {
            stat: "stat_path".to_string(),
            ..DelegateToolNames::default()
        };
        let args = json!({ "path": "a.txt", "content": "hi\n", "line_count": 1 });

        assert_eq!(
            tool_request(&tools, DelegateOp::Write, args.clone()),
            json!({ "name": "write_to_file", "arguments": args })
        );
        assert_eq!(
            tool_request(&tools, DelegateOp::Stat, json!({ "path": "a.txt" }))["name"],
            "stat_path"
        );
        assert_eq!(
            tool_request(&tools, DelegateOp::ApplyDiff, json!({}))["name"],
            "apply_diff"
        );
        assert_eq!(
            tool_request(&tools, DelegateOp::Read, json!({}))["name"],
            "read_file"
        );
    }

    #[tokio::test]
    async fn spawn_without_command_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = McpDelegate::spawn(&DelegateConfig::default(), dir.path()).await;
        assert!(matches!(result, Err(GatewayError::NoDelegateCommand)));
    }
}
