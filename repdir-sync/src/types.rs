// Shared types and data contracts between the sync stages
//
// Stage contracts:
//   adapters       -> Vec<RawRecord>           (per source, may fail)
//   aggregator     -> ObservedBatch            (normalized, in source order)
//   resolver       -> ResolvedBatch            (one record per identity)
//   reconciler     -> ReconciliationPlan       (upserts + soft removals)
//   store gateway  <- ReconciliationPlan       (applied atomically)

use repdir_common::{IdentityKey, Representative};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Sources
// ============================================================================

/// Kind of upstream source a record came from
///
/// The declaration order is the fixed invocation order. When two sources
/// report the same identity with different attributes, the source invoked
/// later wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// house.gov roster (U.S. Representatives)
    HouseRoster,
    /// senate.gov contact feed (U.S. Senators)
    SenateRoster,
    /// OpenStates people API (state legislature and executive officers)
    OpenStates,
    /// NAAG attorney general listing
    AttorneysGeneral,
    /// Ballotpedia comptroller listing
    Comptrollers,
    /// Verified county officials roster
    CountyRoster,
}

impl SourceKind {
    /// All kinds in invocation order
    pub const INVOCATION_ORDER: [SourceKind; 6] = [
        SourceKind::HouseRoster,
        SourceKind::SenateRoster,
        SourceKind::OpenStates,
        SourceKind::AttorneysGeneral,
        SourceKind::Comptrollers,
        SourceKind::CountyRoster,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HouseRoster => "house_roster",
            Self::SenateRoster => "senate_roster",
            Self::OpenStates => "openstates",
            Self::AttorneysGeneral => "attorneys_general",
            Self::Comptrollers => "comptrollers",
            Self::CountyRoster => "county_roster",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::INVOCATION_ORDER
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown source kind '{}'", s))
    }
}

/// Record exactly as an adapter extracted it, before normalization
///
/// Field names accept the aliases used by exported roster files
/// (`position`, `cong_district`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub name: Option<String>,
    /// Free-text title as published by the source
    #[serde(alias = "position")]
    pub title: Option<String>,
    /// Chamber classification ("upper" / "lower") when the source has one
    pub org_classification: Option<String>,
    #[serde(
        alias = "cong_district",
        alias = "state_senate_district",
        alias = "state_assembly_district"
    )]
    pub district: Option<String>,
    pub state: Option<String>,
    pub party: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub county: Option<String>,
}

/// Normalized record tagged with the source that observed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRecord {
    pub representative: Representative,
    pub source: SourceKind,
}

impl ObservedRecord {
    pub fn identity_key(&self) -> IdentityKey {
        self.representative.identity_key()
    }
}

/// How one adapter call settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceStatus {
    Succeeded,
    Failed { error: String },
    TimedOut { after_ms: u64 },
}

/// Per-adapter outcome of one collection pass
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub adapter: String,
    pub source: SourceKind,
    pub status: SourceStatus,
    pub records_received: usize,
    pub records_normalized: usize,
    pub records_dropped: usize,
}

impl SourceReport {
    pub fn failed(&self) -> bool {
        !matches!(self.status, SourceStatus::Succeeded)
    }
}

/// Every normalized record produced by one run, in adapter order
///
/// Not persisted; lives for one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ObservedBatch {
    pub records: Vec<ObservedRecord>,
    pub reports: Vec<SourceReport>,
}

impl ObservedBatch {
    pub fn sources_total(&self) -> usize {
        self.reports.len()
    }

    pub fn sources_failed(&self) -> usize {
        self.reports.iter().filter(|r| r.failed()).count()
    }

    pub fn records_dropped(&self) -> usize {
        self.reports.iter().map(|r| r.records_dropped).sum()
    }
}

// ============================================================================
// Identity resolution
// ============================================================================

/// Two or more in-batch records shared an identity but disagreed on attributes
///
/// Resolved deterministically (last-seen wins); reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionConflict {
    pub key: IdentityKey,
    /// Source of the surviving record
    pub kept_source: SourceKind,
    /// Sources of every record seen for this key, in arrival order
    pub sources: Vec<SourceKind>,
    /// Number of distinct attribute sets observed
    pub variants: usize,
    /// Attribute names that disagreed
    pub fields: Vec<&'static str>,
}

/// Output of the identity resolver: one record per key plus conflicts
#[derive(Debug, Clone, Default)]
pub struct ResolvedBatch {
    pub records: BTreeMap<IdentityKey, ObservedRecord>,
    pub conflicts: Vec<ResolutionConflict>,
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Writes a run intends to make
///
/// Upserts are always applied before soft removals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub upserts: Vec<ObservedRecord>,
    pub soft_removals: Vec<IdentityKey>,
}

impl ReconciliationPlan {
    /// Reject plans that would write one identity twice or both upsert and clear it
    pub fn validate(&self) -> SyncResult<()> {
        let mut upserted = HashSet::with_capacity(self.upserts.len());
        for record in &self.upserts {
            let key = record.identity_key();
            if !upserted.insert(key.clone()) {
                return Err(SyncError::InvalidPlan(format!("duplicate upsert for {}", key)));
            }
        }

        let mut removed = HashSet::with_capacity(self.soft_removals.len());
        for key in &self.soft_removals {
            if upserted.contains(key) {
                return Err(SyncError::InvalidPlan(format!(
                    "{} is both upserted and soft-removed",
                    key
                )));
            }
            if !removed.insert(key) {
                return Err(SyncError::InvalidPlan(format!("duplicate soft removal for {}", key)));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Run results
// ============================================================================

/// Counters reported for every run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub sources_total: usize,
    pub sources_failed: usize,
    pub records_dropped: usize,
    pub conflicts: usize,
    pub upserted: usize,
    pub soft_removed: usize,
}

/// Final status of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// Aborted before the apply phase; nothing was written
    Cancelled,
    Failed { error: String },
}

/// What a run hands back to its caller
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: uuid::Uuid,
    pub status: RunStatus,
    pub summary: RunSummary,
    pub sources: Vec<SourceReport>,
    pub conflicts: Vec<ResolutionConflict>,
    /// True when the plan was computed but deliberately not applied
    pub dry_run: bool,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Per-source failure; the source contributes zero records
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Adapter not available: {0}")]
    NotAvailable(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => AdapterError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None if e.is_decode() => AdapterError::Parse(e.to_string()),
            None => AdapterError::Network(e.to_string()),
        }
    }
}

/// Per-record failure; the record is dropped and counted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("record has no usable name")]
    MissingName,

    #[error("record has no usable position")]
    MissingPosition,
}

/// Errors that end a run
#[derive(Debug, Error)]
pub enum SyncError {
    /// Store read or transactional write failed
    #[error("Store error: {0}")]
    Store(#[from] repdir_common::Error),

    /// Reconciliation produced an inconsistent plan
    #[error("Invalid reconciliation plan: {0}")]
    InvalidPlan(String),

    #[error("Run cancelled")]
    Cancelled,
}

pub type SyncResult<T> = Result<T, SyncError>;
