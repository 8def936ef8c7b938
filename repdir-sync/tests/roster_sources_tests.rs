// File-backed source integration tests
//
// Builds adapters from TOML the way the binary does, points them at roster
// files in a temp dir, and runs full reconciliations.

mod helpers;

use helpers::{create_test_db, load};
use repdir_common::config::{TomlConfig, OPENSTATES_KEY_ENV_VAR};
use repdir_sync::config::build_adapters;
use repdir_sync::{run_sync, RunStatus, SqliteStore, StoreGateway, SyncConfig};
use serial_test::serial;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const HOUSE: &str = r#"[
    {"name": "Jane Doe", "cong_district": "NY-12", "party": "D", "phone": "202-555-0112"},
    {"name": "Zoë Martínez", "district": "NY-7", "party": "D"}
]"#;

const ATTORNEYS_GENERAL: &str = r#"[
    {"name": "Lee Chan", "state": "NY", "website": "https://ag.ny.gov"},
    {"state": "NJ"}
]"#;

const COUNTY: &str = r#"{
    "Albany": {
        "county_wide": [{"name": "Dana Kim", "position": "County Executive", "party": "D"}],
        "legislature": [{"name": "Kim Park", "district": 5, "party": "R"}]
    }
}"#;

fn write_rosters(dir: &Path) -> TomlConfig {
    std::fs::write(dir.join("house.json"), HOUSE).unwrap();
    std::fs::write(dir.join("ag.json"), ATTORNEYS_GENERAL).unwrap();
    std::fs::write(dir.join("county.json"), COUNTY).unwrap();

    let toml_text = format!(
        r#"
        [sync]
        adapter_timeout_secs = 5

        [sources.county_roster]
        enabled = true
        path = "{dir}/county.json"

        [[sources.static_roster]]
        name = "attorneys_general"
        kind = "attorneys_general"
        path = "{dir}/ag.json"

        [[sources.static_roster]]
        name = "house"
        kind = "house_roster"
        path = "{dir}/house.json"
        "#,
        dir = dir.display()
    );
    toml::from_str(&toml_text).unwrap()
}

#[tokio::test]
async fn test_rosters_populate_directory() {
    let (dir, pool) = create_test_db().await;
    let toml_config = write_rosters(dir.path());

    let adapters = build_adapters(&toml_config).unwrap();
    let store: Arc<dyn StoreGateway> = Arc::new(SqliteStore::new(pool.clone()));
    let outcome = run_sync(
        SyncConfig::from_toml(&toml_config),
        adapters,
        store,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.summary.sources_total, 3);
    assert_eq!(outcome.summary.sources_failed, 0);
    assert_eq!(outcome.summary.records_dropped, 1);
    assert_eq!(outcome.summary.upserted, 5);

    let jane = load(&pool, "Jane Doe", "U.S. Representative").await;
    assert_eq!(jane.representative.congressional_district.as_deref(), Some("NY-12"));
    assert_eq!(jane.last_confirmed_source.as_deref(), Some("house_roster"));

    // Accents folded to ASCII
    load(&pool, "Zoe Martinez", "U.S. Representative").await;

    let ag = load(&pool, "Lee Chan", "Attorney General").await;
    assert_eq!(ag.representative.website.as_deref(), Some("https://ag.ny.gov"));

    let legislator = load(&pool, "Kim Park", "County Legislature District 5").await;
    assert_eq!(legislator.representative.county.as_deref(), Some("Albany"));

    let executive = load(&pool, "Dana Kim", "County Executive").await;
    assert_eq!(executive.representative.party.as_deref(), Some("D"));
}

#[tokio::test]
async fn test_missing_roster_file_counts_as_failed_source() {
    let (dir, pool) = create_test_db().await;
    let toml_config = write_rosters(dir.path());

    let store: Arc<dyn StoreGateway> = Arc::new(SqliteStore::new(pool.clone()));
    run_sync(
        SyncConfig::from_toml(&toml_config),
        build_adapters(&toml_config).unwrap(),
        store.clone(),
        &CancellationToken::new(),
    )
    .await;

    std::fs::remove_file(dir.path().join("county.json")).unwrap();

    let outcome = run_sync(
        SyncConfig::from_toml(&toml_config),
        build_adapters(&toml_config).unwrap(),
        store,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.summary.sources_failed, 1);
    assert_eq!(outcome.summary.soft_removed, 2);

    let legislator = load(&pool, "Kim Park", "County Legislature District 5").await;
    assert!(legislator.soft_removed);
    assert_eq!(legislator.representative.county.as_deref(), Some("Albany"));
    assert!(!load(&pool, "Jane Doe", "U.S. Representative").await.soft_removed);
}

#[tokio::test]
#[serial]
async fn test_openstates_without_key_is_reported_as_failed() {
    std::env::remove_var(OPENSTATES_KEY_ENV_VAR);
    let (dir, pool) = create_test_db().await;
    let mut toml_config = write_rosters(dir.path());
    toml_config.sources.openstates.enabled = true;
    toml_config.sources.openstates.api_key = None;

    let store: Arc<dyn StoreGateway> = Arc::new(SqliteStore::new(pool.clone()));
    let outcome = run_sync(
        SyncConfig::from_toml(&toml_config),
        build_adapters(&toml_config).unwrap(),
        store,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.summary.sources_total, 4);
    assert_eq!(outcome.summary.sources_failed, 1);
    assert_eq!(outcome.summary.upserted, 5);

    let openstates = outcome
        .sources
        .iter()
        .find(|report| report.adapter == "openstates")
        .unwrap();
    assert!(openstates.failed());
}
