// event.rs: Gate decision events.
//
// One GateEvent per gate decision. Events form a chain through
// `previous_hash`, which the log fills in on append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which gated operation produced the event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    /// `checked_read_file`: grants a credential on success.
    Read,
    /// `checked_write_to_file`.
    Write,
    /// `checked_apply_diff`.
    Diff,
}

/// What the gate decided, and how the delegate call went.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Dispatched and the delegate succeeded.
    Allowed,
    /// Rejected by the gate before any mutating delegate call.
    Denied,
    /// Dispatched (or attempted) but the delegate failed.
    Failed,
}

/// A single line in the decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: GateAction,
    /// The path exactly as the caller supplied it.
    pub path: String,
    pub outcome: GateOutcome,

    /// SHA-256 of the write content or diff payload. None for reads.
    pub input_hash: Option<String>,

    /// Whether a read credential was consumed by this event.
    #[serde(default)]
    pub credential_consumed: bool,

    /// Free-form reason, usually the error message on denial or failure.
    pub detail: Option<String>,

    /// Hash of the previous log line. None for the first event.
    pub previous_hash: Option<String>,
}

impl GateEvent {
    pub fn new(action: GateAction, path: impl Into<String>, outcome: GateOutcome) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            path: path.into(),
            outcome,
            input_hash: None,
            credential_consumed: false,
            detail: None,
            previous_hash: None,
        }
    }

    pub fn with_input_hash(mut self, hash: impl Into<String>) -> Self {
        self.input_hash = Some(hash.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_credential_consumed(mut self, consumed: bool) -> Self {
        self.credential_consumed = consumed;
        self
    }
}
