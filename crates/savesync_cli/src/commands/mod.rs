//! CLI command implementations.

pub mod migrate_keys;
pub mod sync;
pub mod watch;
