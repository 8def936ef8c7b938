//! Reconciliation engine
//!
//! Given the resolved observations of one run and the identities the store
//! currently holds, decide what to write:
//!
//! - every observed record is upserted (unconditionally, the store upsert is
//!   idempotent and overwrites fields)
//! - every known identity that no source confirmed is soft-removed
//!
//! Pure computation; the resulting plan is applied by the store gateway with
//! upserts ahead of soft removals.

use crate::types::{ReconciliationPlan, ResolvedBatch, SyncResult};
use repdir_common::IdentityKey;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// Compute the plan for one run
    ///
    /// Upserts come out in identity-key order; soft removals are exactly
    /// `snapshot - observed`, also in key order. The only failure is a plan
    /// that violates its own invariants, which cannot happen for a resolved
    /// batch.
    pub fn reconcile(
        &self,
        observed: &ResolvedBatch,
        snapshot: &BTreeSet<IdentityKey>,
    ) -> SyncResult<ReconciliationPlan> {
        let upserts = observed.records.values().cloned().collect();

        let soft_removals = snapshot
            .iter()
            .filter(|key| !observed.records.contains_key(key))
            .cloned()
            .collect();

        let plan = ReconciliationPlan {
            upserts,
            soft_removals,
        };
        plan.validate()?;

        debug!(
            upserts = plan.upserts.len(),
            soft_removals = plan.soft_removals.len(),
            known = snapshot.len(),
            "Reconciliation plan computed"
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObservedRecord, SourceKind};
    use repdir_common::Representative;

    fn resolved(records: &[(&str, &str, &str)]) -> ResolvedBatch {
        let mut batch = ResolvedBatch::default();
        for (name, position, party) in records {
            let mut rep = Representative::new(*name, *position);
            rep.party = Some(party.to_string());
            batch.records.insert(
                rep.identity_key(),
                ObservedRecord {
                    representative: rep,
                    source: SourceKind::OpenStates,
                },
            );
        }
        batch
    }

    fn snapshot(keys: &[(&str, &str)]) -> BTreeSet<IdentityKey> {
        keys.iter().map(|(n, p)| IdentityKey::new(n, p)).collect()
    }

    #[test]
    fn test_upserts_observed_and_removes_unconfirmed() {
        let observed = resolved(&[
            ("Jane Doe", "State Senator", "D"),
            ("Amy Lee", "Assembly Member", "R"),
        ]);
        let known = snapshot(&[("Jane Doe", "State Senator"), ("John Roe", "Assembly Member")]);

        let plan = Reconciler::new().reconcile(&observed, &known).unwrap();

        let upserted: Vec<_> = plan
            .upserts
            .iter()
            .map(|r| r.representative.name.as_str())
            .collect();
        assert_eq!(upserted, vec!["Amy Lee", "Jane Doe"]);
        assert_eq!(
            plan.soft_removals,
            vec![IdentityKey::new("John Roe", "Assembly Member")]
        );
    }

    #[test]
    fn test_empty_snapshot_removes_nothing() {
        let observed = resolved(&[("Jane Doe", "State Senator", "D")]);
        let plan = Reconciler::new()
            .reconcile(&observed, &BTreeSet::new())
            .unwrap();

        assert_eq!(plan.upserts.len(), 1);
        assert!(plan.soft_removals.is_empty());
    }

    #[test]
    fn test_nothing_observed_removes_everything_known() {
        let known = snapshot(&[("Jane Doe", "State Senator"), ("John Roe", "Assembly Member")]);
        let plan = Reconciler::new()
            .reconcile(&ResolvedBatch::default(), &known)
            .unwrap();

        assert!(plan.upserts.is_empty());
        assert_eq!(plan.soft_removals.len(), 2);
    }

    #[test]
    fn test_removal_matches_normalized_keys() {
        let observed = resolved(&[("JANE DOE", "state senator", "D")]);
        let known = snapshot(&[("Jane Doe", "State Senator")]);

        let plan = Reconciler::new().reconcile(&observed, &known).unwrap();
        assert!(plan.soft_removals.is_empty());
    }
}
