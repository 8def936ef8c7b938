//! Store gateway
//!
//! The engine reads a snapshot of known identities once per run and hands
//! back a plan. `apply` writes the whole plan inside one transaction: all
//! upserts first, then all soft clears, then commit. Any error rolls the
//! transaction back so the store is left in its pre-run state.

use crate::db::{representatives, runs};
use crate::models::SyncRun;
use crate::types::{ObservedRecord, ReconciliationPlan};
use async_trait::async_trait;
use repdir_common::{IdentityKey, Result};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

/// Rows written by one applied plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub upserted: usize,
    pub soft_removed: usize,
}

/// Read/write contract the engine needs from persistence
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Identity keys of every active row
    async fn snapshot(&self) -> Result<BTreeSet<IdentityKey>>;

    /// Write-or-overwrite one record by identity key
    async fn upsert(&self, run_id: Uuid, record: &ObservedRecord) -> Result<()>;

    /// Null the contact fields of one identity, keeping the row
    async fn soft_clear(&self, key: &IdentityKey) -> Result<bool>;

    /// Apply a full plan atomically, upserts before soft clears
    async fn apply(&self, run_id: Uuid, plan: &ReconciliationPlan) -> Result<ApplyReport>;

    /// Persist run bookkeeping
    async fn record_run(&self, run: &SyncRun) -> Result<()>;
}

/// SQLite-backed store gateway
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl StoreGateway for SqliteStore {
    async fn snapshot(&self) -> Result<BTreeSet<IdentityKey>> {
        representatives::load_active_keys(&self.pool).await
    }

    async fn upsert(&self, run_id: Uuid, record: &ObservedRecord) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        representatives::upsert_representative(
            &mut conn,
            &record.representative,
            record.source,
            run_id,
        )
        .await
    }

    async fn soft_clear(&self, key: &IdentityKey) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(representatives::soft_clear(&mut conn, key).await? > 0)
    }

    async fn apply(&self, run_id: Uuid, plan: &ReconciliationPlan) -> Result<ApplyReport> {
        let mut tx = self.pool.begin().await?;
        let mut report = ApplyReport::default();

        for record in &plan.upserts {
            representatives::upsert_representative(
                &mut tx,
                &record.representative,
                record.source,
                run_id,
            )
            .await?;
            report.upserted += 1;
        }

        for key in &plan.soft_removals {
            if representatives::soft_clear(&mut tx, key).await? > 0 {
                report.soft_removed += 1;
            } else {
                debug!(key = %key, "Soft removal matched no row");
            }
        }

        tx.commit().await?;
        Ok(report)
    }

    async fn record_run(&self, run: &SyncRun) -> Result<()> {
        runs::save_run(&self.pool, run).await
    }
}
