//! Database Test Utilities

use async_trait::async_trait;
use repdir_common::db::init::init_database;
use repdir_common::{Error, IdentityKey, Representative, Result};
use repdir_sync::db::representatives::{load_representative, StoredRepresentative};
use repdir_sync::models::SyncRun;
use repdir_sync::store::{ApplyReport, SqliteStore, StoreGateway};
use repdir_sync::types::{ObservedRecord, ReconciliationPlan, SourceKind};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use uuid::Uuid;

/// Create temporary on-disk database with schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("test_repdir.db"))
        .await
        .unwrap();
    (temp_dir, pool)
}

/// Insert representatives as if a previous run had observed them
pub async fn seed(pool: &SqlitePool, reps: &[Representative]) {
    let store = SqliteStore::new(pool.clone());
    let run_id = Uuid::new_v4();
    for rep in reps {
        store
            .upsert(
                run_id,
                &ObservedRecord {
                    representative: rep.clone(),
                    source: SourceKind::OpenStates,
                },
            )
            .await
            .unwrap();
    }
}

/// Load a row that must exist
pub async fn load(pool: &SqlitePool, name: &str, position: &str) -> StoredRepresentative {
    load_representative(pool, &IdentityKey::new(name, position))
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("{} / {} not found", name, position))
}

/// Store whose apply step always fails; reads go to the real store
pub struct FailingStore {
    inner: SqliteStore,
    pub apply_calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteStore::new(pool),
            apply_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StoreGateway for FailingStore {
    async fn snapshot(&self) -> Result<BTreeSet<IdentityKey>> {
        self.inner.snapshot().await
    }

    async fn upsert(&self, run_id: Uuid, record: &ObservedRecord) -> Result<()> {
        self.inner.upsert(run_id, record).await
    }

    async fn soft_clear(&self, key: &IdentityKey) -> Result<bool> {
        self.inner.soft_clear(key).await
    }

    async fn apply(&self, _run_id: Uuid, _plan: &ReconciliationPlan) -> Result<ApplyReport> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Internal("injected apply failure".to_string()))
    }

    async fn record_run(&self, run: &SyncRun) -> Result<()> {
        self.inner.record_run(run).await
    }
}
