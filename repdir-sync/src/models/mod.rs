//! Data models for repdir-sync

pub mod sync_run;

pub use sync_run::{RunState, StateTransition, SyncRun};
