//! # savesync engine
//!
//! The decision core of savesync.
//!
//! This crate provides:
//! - Snapshot naming: the fixed-width UTC timestamp key format
//! - Local state: the newest modification time under a tracked directory
//! - The sync decision algorithm (upload / download / nothing)
//! - The per-item orchestrator that executes a decision
//! - A debounced filesystem watcher that re-syncs after changes
//!
//! ## Decision model
//!
//! A tracked item converges on "most recent wins by timestamp": the local
//! directory is uploaded when no remote snapshot matches its newest mtime,
//! and the newest strictly-newer remote snapshot is downloaded over it.
//! The two decisions are independent; an exact timestamp match suppresses
//! the upload but a newer remote snapshot is still fetched.
//!
//! ## Key Invariants
//!
//! - Snapshot keys sort lexicographically in chronological order
//! - Remote snapshots are immutable; replacement state is a new snapshot
//! - An undecodable remote key is skipped, never fatal
//! - Local state is recomputed on every run, never cached
//! - At most one sync runs per item at a time (callers serialize runs;
//!   the watcher does so by owning its item)

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decision;
mod error;
mod item;
mod local;
mod options;
mod orchestrator;
pub mod stamp;
mod watcher;

pub use decision::{decide, SyncDecision};
pub use error::{SyncError, SyncResult};
pub use item::TrackedItem;
pub use local::local_save_time;
pub use options::SyncOptions;
pub use orchestrator::{SyncOrchestrator, SyncOutcome};
pub use watcher::{ProcessProbe, SaveWatcher, SystemProcessProbe};
