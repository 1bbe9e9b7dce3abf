// guidance.rs: Commit-message guidance attached to successful mutations.

use serde_json::{Map, Value};

/// Result key under which the guidance is attached.
pub const GUIDANCE_KEY: &str = "commitMessageGuidance";

pub const COMMIT_MESSAGE_GUIDANCE: &str = "Create a detailed, specific, measured, descriptive commit message that leaves meticulous forensic evidence for future users and agents to know and understand every action and intention. Make sure not to be unjustifiably definitive in your claims. Future agents and users must be able to understand the true state and the complete thinking and actions in code from commit messages.";

/// Attach the guidance to a delegate result.
///
/// Object results gain a `commitMessageGuidance` key (overwriting any
/// existing one). Anything else is wrapped as `{"result": .., "commitMessageGuidance": ..}`.
pub fn with_guidance(result: Value) -> Value {
    let mut map = match result {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    map.insert(
        GUIDANCE_KEY.to_string(),
        Value::String(COMMIT_MESSAGE_GUIDANCE.to_string()),
    );
    Value::Object(map)
}
