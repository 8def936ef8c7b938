//! Sync run bookkeeping

use crate::models::{RunState, SyncRun};
use crate::types::RunSummary;
use repdir_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Insert or update a run row
pub async fn save_run(pool: &SqlitePool, run: &SyncRun) -> Result<()> {
    let summary = &run.summary;

    sqlx::query(
        r#"
        INSERT INTO sync_runs (
            run_id, state, sources_total, sources_failed, records_dropped,
            conflicts, upserted, soft_removed, error, started_at, ended_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            state = excluded.state,
            sources_total = excluded.sources_total,
            sources_failed = excluded.sources_failed,
            records_dropped = excluded.records_dropped,
            conflicts = excluded.conflicts,
            upserted = excluded.upserted,
            soft_removed = excluded.soft_removed,
            error = excluded.error,
            ended_at = excluded.ended_at
        "#,
    )
    .bind(run.run_id.to_string())
    .bind(run.state.as_str())
    .bind(summary.sources_total as i64)
    .bind(summary.sources_failed as i64)
    .bind(summary.records_dropped as i64)
    .bind(summary.conflicts as i64)
    .bind(summary.upserted as i64)
    .bind(summary.soft_removed as i64)
    .bind(&run.error)
    .bind(run.started_at.to_rfc3339())
    .bind(run.ended_at.map(|dt| dt.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a run by id
pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<SyncRun>> {
    let row = sqlx::query(
        r#"
        SELECT run_id, state, sources_total, sources_failed, records_dropped,
               conflicts, upserted, soft_removed, error, started_at, ended_at
        FROM sync_runs
        WHERE run_id = ?
        "#,
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let state: String = row.get("state");
    let state = RunState::parse(&state)
        .ok_or_else(|| Error::Internal(format!("Unknown run state '{}'", state)))?;

    let started_at: String = row.get("started_at");
    let started_at = parse_timestamp(&started_at)?;

    let ended_at: Option<String> = row.get("ended_at");
    let ended_at = ended_at.as_deref().map(parse_timestamp).transpose()?;

    let count = |column: &str| -> usize {
        let value: i64 = row.get(column);
        value.max(0) as usize
    };

    Ok(Some(SyncRun {
        run_id,
        state,
        summary: RunSummary {
            sources_total: count("sources_total"),
            sources_failed: count("sources_failed"),
            records_dropped: count("records_dropped"),
            conflicts: count("conflicts"),
            upserted: count("upserted"),
            soft_removed: count("soft_removed"),
        },
        error: row.get("error"),
        started_at,
        ended_at,
    }))
}

fn parse_timestamp(value: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repdir_common::db::init::create_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_save_and_load_run() {
        let pool = setup_test_db().await;

        let mut run = SyncRun::new();
        save_run(&pool, &run).await.unwrap();

        run.summary.upserted = 12;
        run.summary.sources_failed = 1;
        run.transition_to(RunState::Completed);
        save_run(&pool, &run).await.unwrap();

        let loaded = load_run(&pool, run.run_id).await.unwrap().unwrap();
        assert_eq!(loaded.state, RunState::Completed);
        assert_eq!(loaded.summary.upserted, 12);
        assert_eq!(loaded.summary.sources_failed, 1);
        assert!(loaded.ended_at.is_some());
        assert!(loaded.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_run_keeps_error() {
        let pool = setup_test_db().await;

        let mut run = SyncRun::new();
        run.fail("disk I/O error");
        save_run(&pool, &run).await.unwrap();

        let loaded = load_run(&pool, run.run_id).await.unwrap().unwrap();
        assert_eq!(loaded.state, RunState::Failed);
        assert_eq!(loaded.error.as_deref(), Some("disk I/O error"));
    }

    #[tokio::test]
    async fn test_unknown_run_is_none() {
        let pool = setup_test_db().await;
        assert!(load_run(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }
}
