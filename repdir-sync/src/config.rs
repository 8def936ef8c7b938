//! Run configuration for repdir-sync
//!
//! Settings come from the shared TOML file (see `repdir_common::config`) and
//! are passed into the run explicitly; nothing here is global.

use crate::sources::{
    CountyRosterAdapter, OpenStatesAdapter, SourceAdapter, StaticRosterAdapter,
    UnavailableAdapter,
};
use crate::types::SourceKind;
use repdir_common::config::{resolve_openstates_api_key, TomlConfig};
use repdir_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Settings for one reconciliation run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Per-adapter timeout
    pub adapter_timeout: Duration,
    /// District identifiers longer than this are truncated
    pub max_district_len: usize,
    /// Compute and report the plan without writing it
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(30),
            max_district_len: 10,
            dry_run: false,
        }
    }
}

impl SyncConfig {
    pub fn from_toml(toml_config: &TomlConfig) -> Self {
        Self {
            adapter_timeout: Duration::from_secs(toml_config.sync.adapter_timeout_secs.max(1)),
            max_district_len: toml_config.sync.max_district_len.max(1),
            dry_run: false,
        }
    }
}

/// Build every enabled adapter, in invocation order
///
/// An enabled source with unusable settings (unknown kind, missing file path)
/// is a configuration error. OpenStates without an API key still takes part
/// in the run and is reported as a failed source.
pub fn build_adapters(toml_config: &TomlConfig) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let sources = &toml_config.sources;
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    for entry in &sources.static_roster {
        let kind: SourceKind = entry.kind.parse().map_err(|e| {
            Error::Config(format!("static roster '{}': {}", entry.name, e))
        })?;
        adapters.push(Arc::new(StaticRosterAdapter::new(
            entry.name.clone(),
            kind,
            entry.path.clone(),
        )));
    }

    if sources.openstates.enabled {
        match resolve_openstates_api_key(toml_config) {
            Some(api_key) => {
                let adapter = OpenStatesAdapter::new(&sources.openstates, api_key)
                    .map_err(|e| Error::Config(format!("openstates: {}", e)))?;
                adapters.push(Arc::new(adapter));
            }
            None => {
                warn!("OpenStates source enabled but no API key configured, it will fail");
                adapters.push(Arc::new(UnavailableAdapter::new(
                    "openstates",
                    SourceKind::OpenStates,
                    "no API key configured",
                )));
            }
        }
    }

    if sources.county_roster.enabled {
        let path = sources.county_roster.path.clone().ok_or_else(|| {
            Error::Config("county_roster enabled without a path".to_string())
        })?;
        adapters.push(Arc::new(CountyRosterAdapter::new(
            path,
            sources.county_roster.state.clone(),
        )));
    }

    adapters.sort_by_key(|a| a.kind());

    info!(
        adapters = ?adapters.iter().map(|a| a.name().to_string()).collect::<Vec<_>>(),
        "Configured source adapters"
    );

    Ok(adapters)
}
