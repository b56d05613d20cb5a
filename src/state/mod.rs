//! State module
//!
//! Handles replication bookmarks between sync runs. Reading and writing the
//! state file is left to the host; this module only defines the document and
//! how bookmarks move forward.
//!
//! # Overview
//!
//! - `State` - Per-stream bookmarks
//! - `StreamState` - Stream-level and per-partition bookmarks
//! - `PartitionState` - Bookmark for one parent context

mod types;

pub use types::{PartitionState, State, StreamState};
