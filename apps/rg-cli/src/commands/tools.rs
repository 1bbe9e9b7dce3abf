// tools.rs: Print the gated tool catalog.

use rg_gate::tool_catalog;

pub fn execute() -> anyhow::Result<()> {
    let tools = serde_json::json!({ "tools": tool_catalog() });
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}
