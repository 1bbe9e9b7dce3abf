// replay.rs: Run a JSONL transcript of tool calls through a fresh gate.
//
// Each input line is `{"name": "<tool>", "arguments": {..}}`. Each output
// line is either the tool result or `{"error": .., "kind": ..}`, in input
// order. Blank lines and lines starting with `#` are skipped.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};

use rg_gate::{ErrorKind, GateError, ReadGate};
use rg_mcp_gateway::{build_gate, GatewayConfig, McpDelegate, SharedDelegate};

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub fn execute(transcript: &Path, config: GatewayConfig) -> anyhow::Result<()> {
    let file = std::fs::File::open(transcript)
        .with_context(|| format!("failed to open transcript {}", transcript.display()))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let delegate = McpDelegate::spawn(&config.delegate, &config.workspace_root).await?;
        let gate = build_gate(&config, Arc::new(delegate) as SharedDelegate)?;

        let stdout = std::io::stdout();
        let summary = run_transcript(&gate, BufReader::new(file), stdout.lock()).await?;
        tracing::info!(
            calls = summary.calls,
            denied = summary.denied,
            failed = summary.failed,
            "replay finished"
        );
        Ok::<(), anyhow::Error>(())
    })
}

/// Per-run counts, reported once the transcript is exhausted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub calls: usize,
    /// Calls refused by the read-before-write rule.
    pub denied: usize,
    /// Every other error, including malformed lines.
    pub failed: usize,
}

pub async fn run_transcript<R: BufRead, W: Write>(
    gate: &ReadGate<SharedDelegate>,
    input: R,
    mut output: W,
) -> anyhow::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        summary.calls += 1;

        let result = match serde_json::from_str::<ToolCall>(trimmed) {
            Ok(call) => gate.call(&call.name, &call.arguments).await,
            Err(e) => Err(GateError::InvalidArguments {
                tool: format!("line {}", index + 1),
                reason: e.to_string(),
            }),
        };

        let rendered = match result {
            Ok(value) => value,
            Err(err) => {
                if err.is_gating_violation() {
                    summary.denied += 1;
                } else {
                    summary.failed += 1;
                }
                json!({ "error": err.to_string(), "kind": kind_label(err.kind()) })
            }
        };
        writeln!(output, "{}", serde_json::to_string(&rendered)?)?;
    }

    Ok(summary)
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidRequest => "invalid_request",
        ErrorKind::InternalError => "internal_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_gate::MemoryDelegate;

    fn gate_over(fs: &Arc<MemoryDelegate>) -> ReadGate<SharedDelegate> {
        ReadGate::new(fs.clone() as SharedDelegate)
    }

    #[tokio::test]
    async fn replays_calls_in_order() {
        let fs = Arc::new(MemoryDelegate::new());
        fs.insert_file("a.txt", "one\n");
        let gate = gate_over(&fs);

        let transcript = r#"
# blind write, then read, then write
{"name": "checked_write_to_file", "arguments": {"path": "a.txt", "content": "two\n", "line_count": 1}}
{"name": "checked_read_file", "arguments": {"path": "a.txt"}}
{"name": "checked_write_to_file", "arguments": {"path": "a.txt", "content": "two\n", "line_count": 1}}
"#;
        let mut out = Vec::new();
        let summary = run_transcript(&gate, transcript.as_bytes(), &mut out)
            .await
            .unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                calls: 3,
                denied: 1,
                failed: 0
            }
        );
        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["kind"], "invalid_request");
        assert!(lines[0]["error"]
            .as_str()
            .unwrap()
            .starts_with("Blind write prevented"));
        assert!(lines[1].get("error").is_none());
        assert!(lines[2].get("commitMessageGuidance").is_some());
        assert_eq!(fs.file("a.txt").as_deref(), Some("two\n"));
    }

    #[tokio::test]
    async fn malformed_and_unknown_lines_are_reported() {
        let fs = Arc::new(MemoryDelegate::new());
        let gate = gate_over(&fs);

        let transcript = "not json\n{\"name\": \"delete_file\", \"arguments\": {}}\n";
        let mut out = Vec::new();
        let summary = run_transcript(&gate, transcript.as_bytes(), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.calls, 2);
        assert_eq!(summary.failed, 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("line 1"));
        assert!(text.contains("Unknown tool: delete_file"));
    }
}
