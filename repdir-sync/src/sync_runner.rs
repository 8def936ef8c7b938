// Reconciliation run orchestration
//
// Concept: One invocation = one run: snapshot → collect → resolve → reconcile → apply
//
// This runner manages the full run lifecycle:
// - Run state transitions (mirrored to sync_runs, best effort)
// - Fan-out/fan-in over source adapters via SourceAggregator
// - Cancellation up to the start of the apply phase
// - Folding every recoverable anomaly into the summary counters
//
// Only store failures end a run as FAILED.

use crate::config::SyncConfig;
use crate::identity_resolver::IdentityResolver;
use crate::models::{RunState, StateTransition, SyncRun};
use crate::normalizer::Normalizer;
use crate::reconciler::Reconciler;
use crate::sources::{SourceAdapter, SourceAggregator};
use crate::store::StoreGateway;
use crate::types::{
    ResolutionConflict, RunOutcome, RunStatus, SourceReport, SyncError, SyncResult,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-run detail handed back alongside the summary
#[derive(Default)]
struct RunDetails {
    sources: Vec<SourceReport>,
    conflicts: Vec<ResolutionConflict>,
}

/// Runs reconciliations against one store with one set of adapters
pub struct SyncRunner {
    config: SyncConfig,
    aggregator: SourceAggregator,
    resolver: IdentityResolver,
    reconciler: Reconciler,
    store: Arc<dyn StoreGateway>,
}

impl SyncRunner {
    pub fn new(
        config: SyncConfig,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn StoreGateway>,
    ) -> Self {
        let aggregator = SourceAggregator::new(
            adapters,
            Normalizer::new(config.max_district_len),
            config.adapter_timeout,
        );

        Self {
            config,
            aggregator,
            resolver: IdentityResolver::new(),
            reconciler: Reconciler::new(),
            store,
        }
    }

    /// Execute one complete run
    ///
    /// Never returns an error: the outcome carries an explicit status. A
    /// cancelled or failed run has written nothing to the representatives
    /// table.
    pub async fn execute(&self, cancel: &CancellationToken) -> RunOutcome {
        let mut run = SyncRun::new();
        let mut details = RunDetails::default();

        tracing::info!(
            run_id = %run.run_id,
            sources = self.aggregator.count(),
            dry_run = self.config.dry_run,
            "Starting reconciliation run"
        );
        self.persist(&run).await;

        let status = match self.run_phases(&mut run, &mut details, cancel).await {
            Ok(()) => {
                log_transition(&run.transition_to(RunState::Completed));
                tracing::info!(
                    run_id = %run.run_id,
                    upserted = run.summary.upserted,
                    soft_removed = run.summary.soft_removed,
                    conflicts = run.summary.conflicts,
                    sources_failed = run.summary.sources_failed,
                    records_dropped = run.summary.records_dropped,
                    "Reconciliation run completed"
                );
                RunStatus::Succeeded
            }
            Err(SyncError::Cancelled) => {
                log_transition(&run.transition_to(RunState::Cancelled));
                tracing::warn!(run_id = %run.run_id, "Reconciliation run cancelled before apply");
                RunStatus::Cancelled
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(
                    run_id = %run.run_id,
                    state = run.state.as_str(),
                    error = %error,
                    "Reconciliation run failed"
                );
                log_transition(&run.fail(error.clone()));
                RunStatus::Failed { error }
            }
        };
        self.persist(&run).await;

        RunOutcome {
            run_id: run.run_id,
            status,
            summary: run.summary,
            sources: details.sources,
            conflicts: details.conflicts,
            dry_run: self.config.dry_run,
        }
    }

    async fn run_phases(
        &self,
        run: &mut SyncRun,
        details: &mut RunDetails,
        cancel: &CancellationToken,
    ) -> SyncResult<()> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        // Point-in-time view; no other writer is expected during the run
        let snapshot = self.store.snapshot().await?;
        tracing::debug!(run_id = %run.run_id, known = snapshot.len(), "Store snapshot read");

        // Phase 1: COLLECTING
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            batch = self.aggregator.collect() => batch,
        };
        run.summary.sources_total = batch.sources_total();
        run.summary.sources_failed = batch.sources_failed();
        run.summary.records_dropped = batch.records_dropped();
        details.sources = batch.reports.clone();

        // Phase 2: RESOLVING
        self.advance(run, RunState::Resolving).await;
        let resolved = self.resolver.resolve(&batch);
        run.summary.conflicts = resolved.conflicts.len();
        details.conflicts = resolved.conflicts.clone();

        // Phase 3: RECONCILING
        self.advance(run, RunState::Reconciling).await;
        let plan = self.reconciler.reconcile(&resolved, &snapshot)?;

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        if self.config.dry_run {
            run.summary.upserted = plan.upserts.len();
            run.summary.soft_removed = plan.soft_removals.len();
            tracing::info!(
                run_id = %run.run_id,
                upserts = plan.upserts.len(),
                soft_removals = plan.soft_removals.len(),
                "Dry run, plan not applied"
            );
            return Ok(());
        }

        // Phase 4: APPLYING (not cancellable; one transaction)
        self.advance(run, RunState::Applying).await;
        let report = self.store.apply(run.run_id, &plan).await?;
        run.summary.upserted = report.upserted;
        run.summary.soft_removed = report.soft_removed;

        Ok(())
    }

    async fn advance(&self, run: &mut SyncRun, state: RunState) {
        log_transition(&run.transition_to(state));
        self.persist(run).await;
    }

    /// Run bookkeeping is observability only; a failed write is logged and ignored
    async fn persist(&self, run: &SyncRun) {
        if self.config.dry_run {
            return;
        }
        if let Err(e) = self.store.record_run(run).await {
            tracing::warn!(run_id = %run.run_id, error = %e, "Failed to record run state");
        }
    }
}

fn log_transition(transition: &StateTransition) {
    tracing::debug!(
        run_id = %transition.run_id,
        from = transition.old_state.as_str(),
        to = transition.new_state.as_str(),
        at = %transition.transitioned_at,
        "Run state changed"
    );
}

/// Run one reconciliation with the given adapters and store
pub async fn run_sync(
    config: SyncConfig,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn StoreGateway>,
    cancel: &CancellationToken,
) -> RunOutcome {
    SyncRunner::new(config, adapters, store).execute(cancel).await
}
