//! Bulk reconciliation: mirror an entire dataset between stores.
//!
//! A reconciliation pass walks the source store one kind at a time, in
//! dependency order, copies every row into the destination and rewrites
//! foreign keys through a run-scoped [`TranslationMap`]. Each copied row
//! remembers where it came from: its `global_id` is set to the source
//! row's identifier, so incremental sync can find the pairing later.
//!
//! The pass is one-shot and forward-only. A failure mid-kind aborts the
//! run with the error; rows already written stay written. Re-running
//! against a non-empty destination duplicates rows, so callers gate the
//! pass on an empty destination (the seeding binary does exactly that).

use crate::copy::ShallowCopy;
use crate::entity::EntityKind;
use crate::error::{Error, Result};
use crate::store::EntityStore;
use crate::translate::TranslationMap;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Per-kind iteration order within a reconciliation pass.
///
/// The kind-level dependency order is fixed; this only controls the row
/// order inside each kind. `Shuffled` exists for tests: correctness must
/// not depend on row order, and a seeded shuffle makes that checkable
/// reproducibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOrder {
    /// Rows sorted by source identifier.
    Stable,
    /// Rows permuted by a deterministic seeded shuffle.
    Shuffled(u64),
}

impl Default for CopyOrder {
    fn default() -> Self {
        CopyOrder::Stable
    }
}

/// What a completed reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    copied: BTreeMap<EntityKind, usize>,
}

impl ReconcileReport {
    /// Rows copied for one kind.
    pub fn copied(&self, kind: EntityKind) -> usize {
        self.copied.get(&kind).copied().unwrap_or(0)
    }

    /// Rows copied across all kinds.
    pub fn total(&self) -> usize {
        self.copied.values().sum()
    }

    /// Per-kind counts in dependency order.
    pub fn by_kind(&self) -> impl Iterator<Item = (EntityKind, usize)> + '_ {
        EntityKind::DEPENDENCY_ORDER
            .into_iter()
            .map(|kind| (kind, self.copied(kind)))
    }
}

/// One-shot dependency-ordered copy of every row from a source store
/// into a destination store.
pub struct BulkReconciler<S, D> {
    source: S,
    dest: D,
    order: CopyOrder,
}

impl<S, D> BulkReconciler<S, D>
where
    S: EntityStore,
    D: EntityStore,
{
    pub fn new(source: S, dest: D) -> Self {
        Self {
            source,
            dest,
            order: CopyOrder::Stable,
        }
    }

    pub fn with_order(mut self, order: CopyOrder) -> Self {
        self.order = order;
        self
    }

    /// Run the pass. Consumes the reconciler; the translation map it
    /// builds is scoped to this one run and dropped with it.
    pub async fn run(self) -> Result<ReconcileReport> {
        if !self.source.can_connect().await || !self.dest.can_connect().await {
            return Err(Error::Unavailable);
        }

        let mut map = TranslationMap::new();
        let mut report = ReconcileReport::default();

        for kind in EntityKind::DEPENDENCY_ORDER {
            let mut rows = self.source.query(kind).await?;
            match self.order {
                CopyOrder::Stable => {
                    rows.sort_by_key(|row| row.meta().id);
                }
                CopyOrder::Shuffled(seed) => {
                    let mut rng = SmallRng::seed_from_u64(seed);
                    rows.shuffle(&mut rng);
                }
            }

            let mut copied = 0;
            for row in &rows {
                let source_id = row.meta().id.ok_or(Error::MissingId)?;

                let mut copy = row.shallow_copy();
                // The copy keeps the source's audit trail and points back
                // at the row it mirrors.
                copy.meta_mut().created_at = row.meta().created_at;
                copy.meta_mut().global_id = Some(source_id);
                map.rewrite_refs(&mut copy)?;

                let dest_id = self.dest.insert(&mut copy).await?;
                map.put(kind, source_id, dest_id);
                copied += 1;
            }

            tracing::debug!(%kind, copied, "kind reconciled");
            report.copied.insert(kind, copied);
        }

        tracing::info!(total = report.total(), "reconciliation pass complete");
        Ok(report)
    }
}
