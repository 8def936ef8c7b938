//! Source adapters and the aggregator that runs them
//!
//! Each adapter pulls raw officeholder records from one upstream feed. The
//! aggregator fans out to every adapter at once, gives each call its own
//! timeout, waits for all of them to settle, and only then normalizes the
//! results into one `ObservedBatch` in fixed source order.
//!
//! # Adapters
//! 1. **openstates** - OpenStates people API (paginated JSON, rate limited)
//! 2. **county_roster** - verified county officials JSON file
//! 3. **static_roster** - JSON array of raw records for any source kind
//!
//! `UnavailableAdapter` stands in for an enabled source that is missing a
//! required setting.

pub mod county_roster;
pub mod openstates;
pub mod static_roster;

pub use county_roster::CountyRosterAdapter;
pub use openstates::OpenStatesAdapter;
pub use static_roster::StaticRosterAdapter;

use crate::normalizer::Normalizer;
use crate::types::{
    AdapterError, ObservedBatch, ObservedRecord, RawRecord, SourceKind, SourceReport, SourceStatus,
};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// One upstream feed of officeholder records
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter name for logs and provenance
    fn name(&self) -> &str;

    /// Source kind, which fixes the adapter's place in the invocation order
    fn kind(&self) -> SourceKind;

    /// Retrieve every record the source currently publishes
    ///
    /// Called once per run. Errors are contained by the aggregator.
    async fn fetch(&self) -> Result<Vec<RawRecord>, AdapterError>;
}

/// Stand-in for an enabled source that cannot run with the current settings
///
/// Every fetch fails, so the run reports the source as failed instead of
/// silently leaving it out of the source count.
pub struct UnavailableAdapter {
    name: String,
    kind: SourceKind,
    reason: String,
}

impl UnavailableAdapter {
    pub fn new(name: impl Into<String>, kind: SourceKind, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for UnavailableAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, AdapterError> {
        Err(AdapterError::NotAvailable(self.reason.clone()))
    }
}

/// How a single adapter call ended, before normalization
enum Settled {
    Records(Vec<RawRecord>),
    Failed(String),
    TimedOut,
}

/// Concurrent collector over all configured adapters
pub struct SourceAggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    normalizer: Normalizer,
    timeout: Duration,
}

impl SourceAggregator {
    /// Adapters are ordered by `SourceKind`; adapters of the same kind keep
    /// the order they were given in.
    pub fn new(
        mut adapters: Vec<Arc<dyn SourceAdapter>>,
        normalizer: Normalizer,
        timeout: Duration,
    ) -> Self {
        adapters.sort_by_key(|a| a.kind());
        Self {
            adapters,
            normalizer,
            timeout,
        }
    }

    pub fn count(&self) -> usize {
        self.adapters.len()
    }

    /// Invoke every adapter and fold the results into one batch
    ///
    /// Never fails: an adapter that errors, panics or exceeds the timeout
    /// contributes no records and is reported as failed. Dropping the
    /// returned future aborts every adapter call still in flight.
    pub async fn collect(&self) -> ObservedBatch {
        let timeout = self.timeout;
        let mut tasks = JoinSet::new();
        for (index, adapter) in self.adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            tasks.spawn(async move {
                let call = AssertUnwindSafe(tokio::time::timeout(timeout, adapter.fetch()));
                let settled = match call.catch_unwind().await {
                    Ok(Ok(Ok(records))) => Settled::Records(records),
                    Ok(Ok(Err(e))) => Settled::Failed(e.to_string()),
                    Ok(Err(_elapsed)) => Settled::TimedOut,
                    Err(panic) => Settled::Failed(format!(
                        "adapter panicked: {}",
                        panic_message(&*panic)
                    )),
                };
                (index, settled)
            });
        }

        // Barrier: nothing is normalized until every call has settled
        let mut settled: Vec<Option<Settled>> = self.adapters.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => settled[index] = Some(outcome),
                Err(join_error) => {
                    warn!(error = %join_error, "Adapter task ended without a result")
                }
            }
        }

        let mut batch = ObservedBatch::default();
        for (adapter, outcome) in self.adapters.iter().zip(settled) {
            let outcome =
                outcome.unwrap_or_else(|| Settled::Failed("adapter task aborted".to_string()));
            let report = self.fold(adapter.as_ref(), outcome, &mut batch.records);
            batch.reports.push(report);
        }

        info!(
            sources = batch.sources_total(),
            failed = batch.sources_failed(),
            records = batch.records.len(),
            dropped = batch.records_dropped(),
            "Source collection complete"
        );

        batch
    }

    fn fold(
        &self,
        adapter: &dyn SourceAdapter,
        outcome: Settled,
        out: &mut Vec<ObservedRecord>,
    ) -> SourceReport {
        let name = adapter.name().to_string();
        let source = adapter.kind();

        let records = match outcome {
            Settled::Records(records) => records,
            Settled::Failed(error) => {
                warn!(
                    adapter = %name,
                    source = %source,
                    error = %error,
                    "Source failed, contributing no records"
                );
                return SourceReport {
                    adapter: name,
                    source,
                    status: SourceStatus::Failed { error },
                    records_received: 0,
                    records_normalized: 0,
                    records_dropped: 0,
                };
            }
            Settled::TimedOut => {
                let after_ms = self.timeout.as_millis() as u64;
                warn!(
                    adapter = %name,
                    source = %source,
                    error = %AdapterError::Timeout { after_ms },
                    "Source failed, contributing no records"
                );
                return SourceReport {
                    adapter: name,
                    source,
                    status: SourceStatus::TimedOut { after_ms },
                    records_received: 0,
                    records_normalized: 0,
                    records_dropped: 0,
                };
            }
        };

        if records.is_empty() {
            warn!(adapter = %name, source = %source, "Source returned no records");
        }

        let received = records.len();
        let mut dropped = 0;
        for raw in &records {
            match self.normalizer.normalize(raw, source) {
                Ok(representative) => out.push(ObservedRecord {
                    representative,
                    source,
                }),
                Err(e) => {
                    dropped += 1;
                    debug!(
                        adapter = %name,
                        name = ?raw.name,
                        title = ?raw.title,
                        error = %e,
                        "Dropped record"
                    );
                }
            }
        }

        if dropped > 0 {
            warn!(adapter = %name, dropped, received, "Records dropped during normalization");
        } else {
            debug!(adapter = %name, received, "Source collected");
        }

        SourceReport {
            adapter: name,
            source,
            status: SourceStatus::Succeeded,
            records_received: received,
            records_normalized: received - dropped,
            records_dropped: dropped,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

// ============================================================================
// Mock Adapter for Testing
// ============================================================================
