// request.rs: Tool-call routing.
//
// Turns a (tool name, JSON arguments) pair into a GateRequest and runs it
// against a ReadGate. Unknown names are rejected here, never ignored.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalog::{
    tool_catalog, CHECKED_APPLY_DIFF, CHECKED_READ_FILE, CHECKED_WRITE_TO_FILE, LIST_MY_TOOLS,
};
use crate::delegate::FsDelegate;
use crate::error::GateError;
use crate::gate::ReadGate;

/// A parsed call to one of the gated tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRequest {
    Read {
        path: String,
    },
    Write {
        path: String,
        content: String,
        line_count: u64,
    },
    Diff {
        path: String,
        diff: String,
    },
    ListTools,
}

#[derive(Deserialize)]
struct ReadArgs {
    path: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
    line_count: u64,
}

#[derive(Deserialize)]
struct DiffArgs {
    path: String,
    diff: String,
}

impl GateRequest {
    /// Parse a tool call. `arguments` may be `null` for `list_my_tools`.
    pub fn from_tool_call(name: &str, arguments: &Value) -> Result<Self, GateError> {
        match name {
            CHECKED_READ_FILE => {
                let args: ReadArgs = parse_args(name, arguments)?;
                Ok(GateRequest::Read { path: args.path })
            }
            CHECKED_WRITE_TO_FILE => {
                let args: WriteArgs = parse_args(name, arguments)?;
                Ok(GateRequest::Write {
                    path: args.path,
                    content: args.content,
                    line_count: args.line_count,
                })
            }
            CHECKED_APPLY_DIFF => {
                let args: DiffArgs = parse_args(name, arguments)?;
                Ok(GateRequest::Diff {
                    path: args.path,
                    diff: args.diff,
                })
            }
            LIST_MY_TOOLS => Ok(GateRequest::ListTools),
            other => Err(GateError::UnknownOperation {
                name: other.to_string(),
            }),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            GateRequest::Read { .. } => CHECKED_READ_FILE,
            GateRequest::Write { .. } => CHECKED_WRITE_TO_FILE,
            GateRequest::Diff { .. } => CHECKED_APPLY_DIFF,
            GateRequest::ListTools => LIST_MY_TOOLS,
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &Value) -> Result<T, GateError> {
    serde_json::from_value(arguments.clone()).map_err(|e| GateError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

impl<D: FsDelegate> ReadGate<D> {
    /// Run a parsed request and return its JSON payload.
    pub async fn handle(&self, request: GateRequest) -> Result<Value, GateError> {
        match request {
            GateRequest::Read { path } => self.checked_read(&path).await,
            GateRequest::Write {
                path,
                content,
                line_count,
            } => self.checked_write(&path, &content, line_count).await,
            GateRequest::Diff { path, diff } => self.checked_diff(&path, &diff).await,
            GateRequest::ListTools => Ok(json!({ "tools": tool_catalog() })),
        }
    }

    /// Parse and run a raw tool call.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<Value, GateError> {
        self.handle(GateRequest::from_tool_call(name, arguments)?)
            .await
    }
}
