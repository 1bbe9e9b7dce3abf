//! # rg-audit
//!
//! Append-only decision log for the readgate write gate.
//!
//! Every read, write, and diff that passes through the gate is recorded as a
//! [`GateEvent`] in a JSONL file. Events carry SHA-256 hashes of their inputs
//! and a `previous_hash` link to the prior line, so edits to the log are
//! detectable with [`AuditLog::verify_chain`].
//!
//! ```rust,no_run
//! use rg_audit::{AuditLog, GateAction, GateEvent, GateOutcome};
//!
//! let mut log = AuditLog::open("/tmp/gate-audit.jsonl").unwrap();
//! let mut event = GateEvent::new(GateAction::Write, "src/main.rs", GateOutcome::Denied)
//!     .with_detail("file exists and was not read");
//! log.append(&mut event).unwrap();
//! ```

pub mod error;
pub mod event;
pub mod hasher;
pub mod log;

pub use error::AuditError;
pub use event::{GateAction, GateEvent, GateOutcome};
pub use log::AuditLog;
