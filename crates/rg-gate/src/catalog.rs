// catalog.rs: Static descriptors for the four gated tools.

use serde::Serialize;
use serde_json::{json, Value};

pub const CHECKED_READ_FILE: &str = "checked_read_file";
pub const CHECKED_WRITE_TO_FILE: &str = "checked_write_to_file";
pub const CHECKED_APPLY_DIFF: &str = "checked_apply_diff";
pub const LIST_MY_TOOLS: &str = "list_my_tools";

/// Name, description, and JSON input schema of one tool.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// The schema's `required` list.
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema["required"]
            .as_array()
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// The tools this gate serves, in advertised order.
pub fn tool_catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: CHECKED_READ_FILE,
            description: "Read a file and mark it as read for future editing",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path to the file to read" }
                },
                "required": ["path"]
            }),
        },
        ToolDescriptor {
            name: CHECKED_WRITE_TO_FILE,
            description: "Write to a file, requiring it to have been read first if it exists",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path to write the file to" },
                    "content": { "type": "string", "description": "Content to write to the file" },
                    "line_count": { "type": "integer", "minimum": 0, "description": "Number of lines in the content" }
                },
                "required": ["path", "content", "line_count"]
            }),
        },
        ToolDescriptor {
            name: CHECKED_APPLY_DIFF,
            description: "Apply a diff to a file, requiring it to have been read first",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path to the file to modify" },
                    "diff": { "type": "string", "description": "Unified diff content to apply" }
                },
                "required": ["path", "diff"]
            }),
        },
        ToolDescriptor {
            name: LIST_MY_TOOLS,
            description: "List the tools registered in this server",
            input_schema: json!({ "type": "object", "properties": {}, "required": [] }),
        },
    ]
}
