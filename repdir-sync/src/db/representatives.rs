//! Representative row operations
//!
//! Rows are addressed by `(name_key, position_key)`. Write operations take a
//! connection so the caller can group them in one transaction.

use crate::types::SourceKind;
use repdir_common::{IdentityKey, Representative, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Representative row as stored, with provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRepresentative {
    pub guid: Uuid,
    pub representative: Representative,
    pub last_confirmed_run: Option<String>,
    pub last_confirmed_source: Option<String>,
    pub soft_removed: bool,
}

/// Insert or overwrite a representative by identity key
///
/// An existing row keeps its guid and created_at; every other attribute is
/// replaced and the row becomes active again.
pub async fn upsert_representative(
    conn: &mut SqliteConnection,
    rep: &Representative,
    source: SourceKind,
    run_id: Uuid,
) -> Result<()> {
    let key = rep.identity_key();

    sqlx::query(
        r#"
        INSERT INTO representatives (
            guid, name, position, name_key, position_key,
            state, party, phone, email, website,
            cong_district, state_senate_district, state_assembly_district, county,
            last_confirmed_run, last_confirmed_source, soft_removed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        ON CONFLICT(name_key, position_key) DO UPDATE SET
            name = excluded.name,
            position = excluded.position,
            state = excluded.state,
            party = excluded.party,
            phone = excluded.phone,
            email = excluded.email,
            website = excluded.website,
            cong_district = excluded.cong_district,
            state_senate_district = excluded.state_senate_district,
            state_assembly_district = excluded.state_assembly_district,
            county = excluded.county,
            last_confirmed_run = excluded.last_confirmed_run,
            last_confirmed_source = excluded.last_confirmed_source,
            soft_removed_at = NULL,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&rep.name)
    .bind(&rep.position)
    .bind(key.name())
    .bind(key.position())
    .bind(&rep.state)
    .bind(&rep.party)
    .bind(&rep.phone)
    .bind(&rep.email)
    .bind(&rep.website)
    .bind(&rep.congressional_district)
    .bind(&rep.state_senate_district)
    .bind(&rep.state_assembly_district)
    .bind(&rep.county)
    .bind(run_id.to_string())
    .bind(source.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Null the contact fields of one identity and mark it soft-removed
///
/// Identity, party, districts and county are left as they were. Returns the
/// number of rows touched (0 when the key is unknown).
pub async fn soft_clear(conn: &mut SqliteConnection, key: &IdentityKey) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE representatives SET
            phone = NULL,
            email = NULL,
            website = NULL,
            soft_removed_at = COALESCE(soft_removed_at, CURRENT_TIMESTAMP),
            updated_at = CURRENT_TIMESTAMP
        WHERE name_key = ? AND position_key = ?
        "#,
    )
    .bind(key.name())
    .bind(key.position())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Identity keys of every active (not soft-removed) row
pub async fn load_active_keys(pool: &SqlitePool) -> Result<BTreeSet<IdentityKey>> {
    let rows = sqlx::query(
        "SELECT name_key, position_key FROM representatives WHERE soft_removed_at IS NULL",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| IdentityKey::from_stored(row.get("name_key"), row.get("position_key")))
        .collect())
}

/// Load one row by identity key
pub async fn load_representative(
    pool: &SqlitePool,
    key: &IdentityKey,
) -> Result<Option<StoredRepresentative>> {
    let row = sqlx::query(
        r#"
        SELECT guid, name, position, state, party, phone, email, website,
               cong_district, state_senate_district, state_assembly_district, county,
               last_confirmed_run, last_confirmed_source,
               soft_removed_at IS NOT NULL AS soft_removed
        FROM representatives
        WHERE name_key = ? AND position_key = ?
        "#,
    )
    .bind(key.name())
    .bind(key.position())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let guid: String = row.get("guid");
    let guid = Uuid::parse_str(&guid).map_err(|e| {
        repdir_common::Error::Internal(format!("Invalid guid '{}': {}", guid, e))
    })?;

    let representative = Representative {
        name: row.get("name"),
        position: row.get("position"),
        state: row.get("state"),
        party: row.get("party"),
        phone: row.get("phone"),
        email: row.get("email"),
        website: row.get("website"),
        congressional_district: row.get("cong_district"),
        state_senate_district: row.get("state_senate_district"),
        state_assembly_district: row.get("state_assembly_district"),
        county: row.get("county"),
    };

    Ok(Some(StoredRepresentative {
        guid,
        representative,
        last_confirmed_run: row.get("last_confirmed_run"),
        last_confirmed_source: row.get("last_confirmed_source"),
        soft_removed: row.get("soft_removed"),
    }))
}

/// Total rows, active or not
pub async fn count_representatives(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM representatives")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
