// Identity resolution
//
// Concept: Collapse an observed batch to one record per identity key
// Synchronization: Accepts ObservedBatch (adapter order), outputs ResolvedBatch
//
// Algorithm:
// 1. Compute the identity key of every record (normalized name + position)
// 2. Group records by key, preserving arrival order
// 3. Keep the last-seen record per key
// 4. If a key saw more than one distinct attribute set, report one conflict

use crate::types::{ObservedBatch, ObservedRecord, ResolutionConflict, ResolvedBatch, SourceKind};
use repdir_common::{IdentityKey, Representative};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Identity resolver
///
/// Pure logic, no I/O. Given the same batch in the same order it always keeps
/// the same surviving records.
#[derive(Debug, Default, Clone)]
pub struct IdentityResolver;

/// Everything seen for one key during a batch
struct KeyGroup {
    kept: ObservedRecord,
    sources: Vec<SourceKind>,
    /// Distinct attribute sets, first occurrence order
    variants: Vec<Representative>,
}

impl KeyGroup {
    fn new(record: ObservedRecord) -> Self {
        Self {
            sources: vec![record.source],
            variants: vec![record.representative.clone()],
            kept: record,
        }
    }

    fn observe(&mut self, record: ObservedRecord) {
        self.sources.push(record.source);
        if !self
            .variants
            .iter()
            .any(|v| v.same_attributes(&record.representative))
        {
            self.variants.push(record.representative.clone());
        }
        self.kept = record;
    }

    fn conflict(&self, key: &IdentityKey) -> Option<ResolutionConflict> {
        if self.variants.len() < 2 {
            return None;
        }

        let mut fields: Vec<&'static str> = Vec::new();
        for variant in &self.variants {
            for field in variant.differing_attributes(&self.kept.representative) {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }

        Some(ResolutionConflict {
            key: key.clone(),
            kept_source: self.kept.source,
            sources: self.sources.clone(),
            variants: self.variants.len(),
            fields,
        })
    }
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a batch to one record per identity key
    ///
    /// Records with equal keys and equal attributes collapse silently. Records
    /// with equal keys and differing attributes keep the last-seen one and
    /// yield exactly one `ResolutionConflict` for that key.
    pub fn resolve(&self, batch: &ObservedBatch) -> ResolvedBatch {
        let mut groups: BTreeMap<IdentityKey, KeyGroup> = BTreeMap::new();

        for record in &batch.records {
            let key = record.identity_key();
            match groups.get_mut(&key) {
                Some(group) => group.observe(record.clone()),
                None => {
                    groups.insert(key, KeyGroup::new(record.clone()));
                }
            }
        }

        let mut resolved = ResolvedBatch::default();
        for (key, group) in groups {
            if let Some(conflict) = group.conflict(&key) {
                warn!(
                    key = %conflict.key,
                    kept_source = %conflict.kept_source,
                    variants = conflict.variants,
                    fields = ?conflict.fields,
                    "Resolution conflict, keeping last-seen record"
                );
                resolved.conflicts.push(conflict);
            }
            resolved.records.insert(key, group.kept);
        }

        debug!(
            observed = batch.records.len(),
            resolved = resolved.records.len(),
            conflicts = resolved.conflicts.len(),
            "Identity resolution complete"
        );

        resolved
    }
}
