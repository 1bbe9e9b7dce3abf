// server.rs: MCP server exposing the read-before-write gate.
//
// ReadGateServer implements the rmcp ServerHandler trait. Every tool call is
// turned into a GateRequest and handed to the shared ReadGate, which talks
// to the delegate filesystem server.
//
// Tools:
//   checked_read_file      read a file and grant a one-shot write credential
//   checked_write_to_file  write, rejected for existing files not yet read
//   checked_apply_diff     apply a diff, rejected for files not yet read
//   list_my_tools          describe the four tools

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::handler::server::tool::ToolCallContext;
use rmcp::service::RequestContext;
use rmcp::{tool, tool_router, ErrorData as McpError, RoleServer, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use rg_audit::AuditLog;
use rg_gate::{ErrorKind, FsDelegate, GateError, GateRequest, ReadGate, GUIDANCE_KEY};

use crate::config::GatewayConfig;
use crate::delegate::McpDelegate;
use crate::error::GatewayError;

/// Delegate handle shared by the gate and, in tests, the caller.
pub type SharedDelegate = Arc<dyn FsDelegate>;

// ── Tool parameter types ─────────────────────────────────────────

/// Parameters for `checked_read_file`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckedReadParams {
    /// Path to the file to read.
    pub path: String,
}

/// Parameters for `checked_write_to_file`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckedWriteParams {
    /// Path to write the file to.
    pub path: String,
    /// Content to write to the file.
    pub content: String,
    /// Number of lines in the content.
    pub line_count: u64,
}

/// Parameters for `checked_apply_diff`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckedDiffParams {
    /// Path to the file to modify.
    pub path: String,
    /// Unified diff content to apply.
    pub diff: String,
}

// ── Gate construction ────────────────────────────────────────────

/// Build a gate over `delegate` with the config's stat policy and audit log.
pub fn build_gate(
    config: &GatewayConfig,
    delegate: SharedDelegate,
) -> Result<ReadGate<SharedDelegate>, GatewayError> {
    let mut gate = ReadGate::new(delegate).with_stat_failure(config.stat_failure);
    if let Some(path) = &config.audit_log {
        gate = gate.with_audit_log(AuditLog::open(path)?);
        tracing::info!("Decision log: {}", path.display());
    }
    Ok(gate)
}

// ── MCP Server ───────────────────────────────────────────────────

/// The MCP server. Holds the gate handle and the tool router.
pub struct ReadGateServer {
    gate: Arc<ReadGate<SharedDelegate>>,
    server_name: String,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ReadGateServer {
    pub fn new(gate: ReadGate<SharedDelegate>, server_name: impl Into<String>) -> Self {
        Self {
            gate: Arc::new(gate),
            server_name: server_name.into(),
            tool_router: Self::tool_router(),
        }
    }

    /// Launch the configured delegate and wrap it in a gate.
    pub async fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let delegate = McpDelegate::spawn(&config.delegate, &config.workspace_root).await?;
        let gate = build_gate(config, Arc::new(delegate))?;
        Ok(Self::new(gate, config.server_name.clone()))
    }

    pub fn gate(&self) -> &Arc<ReadGate<SharedDelegate>> {
        &self.gate
    }

    #[tool(description = "Read a file and mark it as read for future editing")]
    async fn checked_read_file(
        &self,
        Parameters(params): Parameters<CheckedReadParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(GateRequest::Read { path: params.path }).await
    }

    #[tool(description = "Write to a file, requiring it to have been read first if it exists")]
    async fn checked_write_to_file(
        &self,
        Parameters(params): Parameters<CheckedWriteParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(GateRequest::Write {
            path: params.path,
            content: params.content,
            line_count: params.line_count,
        })
        .await
    }

    #[tool(description = "Apply a diff to a file, requiring it to have been read first")]
    async fn checked_apply_diff(
        &self,
        Parameters(params): Parameters<CheckedDiffParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run(GateRequest::Diff {
            path: params.path,
            diff: params.diff,
        })
        .await
    }

    #[tool(description = "List the tools registered in this server")]
    async fn list_my_tools(&self) -> Result<CallToolResult, McpError> {
        self.run(GateRequest::ListTools).await
    }

    /// Reject names outside the catalog the same way the gate does.
    fn ensure_routed(&self, name: &str) -> Result<(), McpError> {
        if self.tool_router.has_route(name) {
            Ok(())
        } else {
            tracing::info!(tool = name, "unknown tool rejected");
            Err(to_mcp_error(GateError::UnknownOperation {
                name: name.to_string(),
            }))
        }
    }

    async fn run(&self, request: GateRequest) -> Result<CallToolResult, McpError> {
        let tool = request.tool_name();
        let payload = self.gate.handle(request).await.map_err(|e| {
            tracing::info!(tool, "tool call rejected: {}", e);
            to_mcp_error(e)
        })?;
        to_call_tool_result(payload)
    }
}

// ── ServerHandler implementation ─────────────────────────────────

impl ServerHandler for ReadGateServer {
    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.ensure_routed(request.name.as_ref())?;
        let tcc = ToolCallContext::new(self, request, context);
        self.tool_router.call(tcc).await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            meta: None,
            next_cursor: None,
        })
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("readgate".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-before-write gate. Call checked_read_file on a file before \
                 checked_write_to_file (if it exists) or checked_apply_diff. Each read \
                 permits one mutation. Follow the commitMessageGuidance returned by \
                 successful mutations."
                    .into(),
            ),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Map a gate error onto MCP error data without re-wrapping its message.
pub fn to_mcp_error(err: GateError) -> McpError {
    match err.kind() {
        ErrorKind::InvalidRequest => McpError::invalid_request(err.to_string(), None),
        ErrorKind::InternalError => McpError::internal_error(err.to_string(), None),
    }
}

/// Turn a gate payload into a tool result.
///
/// Payloads already shaped like a CallToolResult (what McpDelegate returns)
/// pass through. Commit guidance moves into `structuredContent` under
/// `commitMessageGuidance` and is also appended as a text item. Other
/// payloads become a single JSON content item.
pub fn to_call_tool_result(mut payload: Value) -> Result<CallToolResult, McpError> {
    let is_tool_result = payload
        .get("content")
        .map(Value::is_array)
        .unwrap_or(false);

    if !is_tool_result {
        let content = Content::json(payload).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        return Ok(CallToolResult::success(vec![content]));
    }

    let guidance = payload
        .as_object_mut()
        .and_then(|map| map.remove(GUIDANCE_KEY));
    if let Some(Value::String(text)) = guidance {
        if let Some(content) = payload.get_mut("content").and_then(Value::as_array_mut) {
            content.push(json!({
                "type": "text",
                "text": format!("{}: {}", GUIDANCE_KEY, text),
            }));
        }
        if let Some(map) = payload.as_object_mut() {
            let structured = map
                .entry("structuredContent")
                .or_insert_with(|| json!({}));
            if !structured.is_object() {
                let original = structured.take();
                *structured = json!({ "result": original });
            }
            if let Some(fields) = structured.as_object_mut() {
                fields.insert(GUIDANCE_KEY.to_string(), Value::String(text));
            }
        }
    }

    serde_json::from_value(payload)
        .map_err(|e| McpError::internal_error(format!("malformed delegate result: {}", e), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_gate::{tool_catalog, DelegateError, DelegateOp, MemoryDelegate, COMMIT_MESSAGE_GUIDANCE};
    use tempfile::tempdir;

    fn test_server(files: &[(&str, &str)]) -> (ReadGateServer, Arc<MemoryDelegate>) {
        let fs = Arc::new(MemoryDelegate::new());
        for (path, content) in files {
            fs.insert_file(*path, *content);
        }
        let gate = ReadGate::new(fs.clone() as SharedDelegate);
        (ReadGateServer::new(gate, "code-mode-rules"), fs)
    }

    fn result_text(result: &CallToolResult) -> String {
        serde_json::to_string(result).unwrap()
    }

    fn read(path: &str) -> Parameters<CheckedReadParams> {
        Parameters(CheckedReadParams { path: path.into() })
    }

    fn write(path: &str, content: &str) -> Parameters<CheckedWriteParams> {
        Parameters(CheckedWriteParams {
            path: path.into(),
            content: content.into(),
            line_count: 1,
        })
    }

    fn diff(path: &str) -> Parameters<CheckedDiffParams> {
        Parameters(CheckedDiffParams {
            path: path.into(),
            diff: "@@ -1 +1 @@\n-a\n+b\n".into(),
        })
    }

    #[test]
    fn router_matches_catalog() {
        let (server, _fs) = test_server(&[]);
        let mut routed: Vec<(String, String)> = server
            .tool_router
            .list_all()
            .iter()
            .map(|t| {
                let tool = serde_json::to_value(t).unwrap();
                (
                    tool["name"].as_str().unwrap().to_string(),
                    tool["description"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        routed.sort();

        let mut catalog: Vec<(String, String)> = tool_catalog()
            .iter()
            .map(|t| (t.name.to_string(), t.description.to_string()))
            .collect();
        catalog.sort();

        assert_eq!(routed, catalog);
    }

    #[test]
    fn server_info_advertises_configured_name() {
        let (server, _fs) = test_server(&[]);
        let info = server.get_info();
        assert_eq!(info.server_info.name, "code-mode-rules");
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn read_then_write_then_blind_write() {
        let (server, fs) = test_server(&[("a.txt", "old")]);

        let read_result = server.checked_read_file(read("a.txt")).await.unwrap();
        assert!(!result_text(&read_result).contains(GUIDANCE_KEY));

        let ok = server.checked_write_to_file(write("a.txt", "hi")).await.unwrap();
        assert!(result_text(&ok).contains(GUIDANCE_KEY));
        assert_eq!(fs.file("a.txt").as_deref(), Some("hi"));

        let err = server
            .checked_write_to_file(write("a.txt", "bye"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert!(err.message.contains("a.txt"));
        assert!(err.message.contains("checked_read_file"));
    }

    #[tokio::test]
    async fn blind_diff_is_invalid_request() {
        let (server, fs) = test_server(&[("b.txt", "a\n")]);

        let err = server.checked_apply_diff(diff("b.txt")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert!(err.message.contains("b.txt"));
        assert!(fs.calls().is_empty());

        server.checked_read_file(read("b.txt")).await.unwrap();
        let ok = server.checked_apply_diff(diff("b.txt")).await.unwrap();
        assert!(result_text(&ok).contains(GUIDANCE_KEY));
    }

    #[tokio::test]
    async fn delegate_failures_are_internal_errors() {
        let (server, fs) = test_server(&[("a.txt", "old")]);
        fs.fail(
            DelegateOp::Write,
            "a.txt",
            DelegateError::Failed("EROFS: read-only file system".into()),
        );

        server.checked_read_file(read("a.txt")).await.unwrap();
        let err = server
            .checked_write_to_file(write("a.txt", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("EROFS"));
        assert!(!server.gate().is_cleared("a.txt").unwrap());
    }

    #[tokio::test]
    async fn list_my_tools_returns_four_descriptors() {
        let (server, fs) = test_server(&[]);
        let result = server.list_my_tools().await.unwrap();
        let text = result_text(&result);
        for name in [
            "checked_read_file",
            "checked_write_to_file",
            "checked_apply_diff",
            "list_my_tools",
        ] {
            assert!(text.contains(name), "{name} missing from {text}");
        }
        assert!(fs.calls().is_empty());
    }

    #[test]
    fn tool_result_payloads_pass_through_with_guidance_appended() {
        let payload = json!({
            "content": [{ "type": "text", "text": "wrote 2 lines" }],
            "isError": false,
            GUIDANCE_KEY: COMMIT_MESSAGE_GUIDANCE,
        });
        let result = to_call_tool_result(payload).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        let content = value["content"].as_array().unwrap();

        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["text"], "wrote 2 lines");
        assert!(content[1]["text"]
            .as_str()
            .unwrap()
            .ends_with(COMMIT_MESSAGE_GUIDANCE));
        assert_eq!(
            value["structuredContent"][GUIDANCE_KEY],
            COMMIT_MESSAGE_GUIDANCE
        );
    }

    #[test]
    fn guidance_merges_into_existing_structured_content() {
        let payload = json!({
            "content": [{ "type": "text", "text": "applied" }],
            "structuredContent": { "hunks": 2 },
            GUIDANCE_KEY: COMMIT_MESSAGE_GUIDANCE,
        });
        let value = serde_json::to_value(to_call_tool_result(payload).unwrap()).unwrap();
        assert_eq!(value["structuredContent"]["hunks"], 2);
        assert_eq!(
            value["structuredContent"][GUIDANCE_KEY],
            COMMIT_MESSAGE_GUIDANCE
        );
    }

    #[test]
    fn unknown_tool_names_are_invalid_requests() {
        let (server, _fs) = test_server(&[]);
        let err = server.ensure_routed("delete_file").unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert_eq!(err.message, "Unknown tool: delete_file");

        for tool in tool_catalog() {
            server.ensure_routed(tool.name).unwrap();
        }
    }

    #[test]
    fn tool_result_payloads_without_guidance_are_unchanged() {
        let payload = json!({
            "content": [{ "type": "text", "text": "line one\nline two" }],
            "isError": false,
        });
        let result = to_call_tool_result(payload).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["content"].as_array().unwrap().len(), 1);
        assert_eq!(value["content"][0]["text"], "line one\nline two");
    }

    #[test]
    fn build_gate_opens_configured_audit_log() {
        let dir = tempdir().unwrap();
        let config = GatewayConfig::for_project(dir.path());
        let gate = build_gate(&config, Arc::new(MemoryDelegate::new())).unwrap();
        assert_eq!(gate.stat_failure(), config.stat_failure);
        assert!(config.audit_log.unwrap().exists());
    }
}
