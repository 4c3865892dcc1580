//! # Suppression Ledger
//!
//! Reconciles one computed dependency set against what the descriptor
//! already declares and the persisted overrides.
//!
//! ## Collect, then allow
//!
//! 1. Effective suppressions: the persisted set, or in update mode the
//!    persisted set plus every drift between computed and declared entries
//! 2. Written = (computed minus effective) plus preserved declarations
//! 3. One usage per computed entry that was suppressed
//! 4. One usage per declared entry that would be removed but is suppressed
//!
//! A declared entry that would be removed and is not suppressed is reported
//! as an unexplained removal and left to validators.

use crate::suppression::usage::{SuppressionType, SuppressionUsage};
use std::collections::BTreeSet;

/// Inputs of one ledger pass.
#[derive(Debug, Clone, Copy)]
pub struct LedgerInput<'a, T: Ord> {
    pub computed: &'a BTreeSet<T>,
    pub existing: &'a BTreeSet<T>,
    pub persisted: &'a BTreeSet<T>,
    pub update_mode: bool,
}

/// Result of one ledger pass. All sets are sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOutcome<T: Ord> {
    /// Suppressions in force for this pass.
    pub effective: BTreeSet<T>,
    /// What ends up in the descriptor.
    pub written: BTreeSet<T>,
    /// Computed entries withheld by a suppression.
    pub suppressed_computed: BTreeSet<T>,
    /// Declared entries the graph no longer explains, kept by a suppression.
    pub preserved: BTreeSet<T>,
    /// Declared entries the graph no longer explains and nothing suppresses.
    pub unexplained_removals: BTreeSet<T>,
}

/// Stateless ledger operations.
pub struct SuppressionLedger;

impl SuppressionLedger {
    /// Run one pass.
    ///
    /// In update mode a persisted entry that is both computed and declared is
    /// no longer drift and is dropped from the effective set, so the pass
    /// freezes the descriptor exactly as declared.
    pub fn apply<T: Ord + Clone>(input: LedgerInput<'_, T>) -> LedgerOutcome<T> {
        let LedgerInput {
            computed,
            existing,
            persisted,
            update_mode,
        } = input;

        let effective: BTreeSet<T> = if update_mode {
            let agreed: BTreeSet<&T> = computed.intersection(existing).collect();
            persisted
                .iter()
                .filter(|entry| !agreed.contains(entry))
                .chain(computed.symmetric_difference(existing))
                .cloned()
                .collect()
        } else {
            persisted.clone()
        };

        let suppressed_computed: BTreeSet<T> = computed.intersection(&effective).cloned().collect();
        let (preserved, unexplained_removals): (BTreeSet<T>, BTreeSet<T>) = existing
            .difference(computed)
            .cloned()
            .partition(|entry| effective.contains(entry));
        let written: BTreeSet<T> = computed
            .difference(&effective)
            .chain(preserved.iter())
            .cloned()
            .collect();

        LedgerOutcome {
            effective,
            written,
            suppressed_computed,
            preserved,
            unexplained_removals,
        }
    }
}

impl<T: Ord + AsRef<str>> LedgerOutcome<T> {
    /// One usage per exercised suppression, sorted by dependency.
    pub fn usages(&self, source: &str, kind: SuppressionType) -> Vec<SuppressionUsage> {
        self.suppressed_computed
            .union(&self.preserved)
            .map(|dependency| SuppressionUsage::new(source, dependency, kind))
            .collect()
    }

    /// Usages of a follow-up pass over a wider view of the same entity.
    ///
    /// Every entry the narrower pass already reported, computed or
    /// preserved, is skipped, so each exercised suppression yields one usage.
    pub fn usages_outside(
        &self,
        source: &str,
        kind: SuppressionType,
        narrower: &LedgerOutcome<T>,
    ) -> Vec<SuppressionUsage> {
        self.suppressed_computed
            .union(&self.preserved)
            .filter(|dependency| {
                !narrower.suppressed_computed.contains(*dependency)
                    && !narrower.preserved.contains(*dependency)
            })
            .map(|dependency| SuppressionUsage::new(source, dependency, kind))
            .collect()
    }
}
