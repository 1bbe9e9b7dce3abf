//! # rg-gate
//!
//! Read-before-write gate for agent file mutations.
//!
//! [`ReadGate`] sits in front of an [`FsDelegate`] (the service that does the
//! real file I/O) and tracks which paths have been read through it. A path
//! that exists cannot be overwritten, and no path can be patched, until it
//! has been read. Each read grants one credential; the next dispatched write
//! or diff on that path consumes it, whether the delegate succeeds or not.
//!
//! ## Flow
//!
//! 1. `checked_read(path)`: delegate read, then `path` is cleared
//! 2. `checked_write(path, ..)`: stat; existing and uncleared paths are rejected
//! 3. `checked_diff(path, ..)`: uncleared paths are rejected, no stat
//! 4. Successful mutations carry [`COMMIT_MESSAGE_GUIDANCE`]
//!
//! Tool-call routing ([`GateRequest`]) and the advertised tool list
//! ([`tool_catalog`]) live here too, so any transport can sit on top.

pub mod catalog;
pub mod delegate;
pub mod error;
pub mod gate;
pub mod guidance;
pub mod locks;
pub mod memory;
pub mod request;

pub use catalog::{tool_catalog, ToolDescriptor};
pub use delegate::{DelegateOp, FsDelegate};
pub use error::{DelegateError, ErrorKind, GateError};
pub use gate::{ReadGate, StatFailurePolicy};
pub use guidance::{with_guidance, COMMIT_MESSAGE_GUIDANCE, GUIDANCE_KEY};
pub use locks::PathLocks;
pub use memory::MemoryDelegate;
pub use request::GateRequest;
