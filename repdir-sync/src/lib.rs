//! repdir-sync library interface
//!
//! Directory synchronization and reconciliation engine: pulls officeholder
//! records from independent sources, resolves them to stable identities, and
//! brings the representatives store in line with what the sources currently
//! publish.

pub mod config;
pub mod db;
pub mod identity_resolver;
pub mod models;
pub mod normalizer;
pub mod reconciler;
pub mod sources;
pub mod store;
pub mod sync_runner;
pub mod types;

pub use crate::config::SyncConfig;
pub use crate::store::{SqliteStore, StoreGateway};
pub use crate::sync_runner::{run_sync, SyncRunner};
pub use crate::types::{RunOutcome, RunStatus, RunSummary, SyncError, SyncResult};
