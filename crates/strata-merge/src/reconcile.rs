//! Reconcile an edited collection against its stored baseline.

use std::mem;

use strata_types::{Entity, EntityState, LockMode};
use tracing::debug;

use crate::error::{MergeError, MergeResult};

/// Outcome counts of one [`reconcile`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Matched entries whose content was unchanged; the baseline instance
    /// was kept.
    pub kept: usize,
    /// Matched entries whose content differed; now `Changed`.
    pub updated: usize,
    /// Entries with no baseline match; now `New`.
    pub inserted: usize,
    /// Baseline entries with no match; now `Deleted`.
    pub deleted: usize,
    /// Unmatched baseline entries that were never stored and were dropped.
    pub dropped: usize,
}

impl ReconcileReport {
    /// Returns `true` if the reconciled collection differs from the baseline.
    pub fn changed(&self) -> bool {
        self.updated + self.inserted + self.deleted + self.dropped > 0
    }
}

/// Reconcile `old` in place against `new`.
///
/// Each entry of `new` is matched against the remaining baseline entries
/// with `same_identity` (e.g. a business key):
///
/// - matched and `differs` reports no change: the baseline instance is kept
///   untouched;
/// - matched and changed: the baseline instance takes over the new content
///   under [`LockMode::Locked`], keeping its id and becoming `Changed`;
/// - unmatched: the entry is added as a `New` row. An entry already `New`
///   is taken verbatim; any other is copied and detached from its id.
///
/// Baseline entries left unmatched are marked `Deleted` and appended, except
/// `New` ones, which were never stored and are dropped.
///
/// `same_identity` must match each entry of `new` to at most one baseline
/// entry. `old` must not contain `Deleted` entries; it is left untouched if
/// it does.
pub fn reconcile<E, I, D>(
    old: &mut Vec<E>,
    new: &[E],
    mut same_identity: I,
    mut differs: D,
) -> MergeResult<ReconcileReport>
where
    E: Entity + Clone,
    I: FnMut(&E, &E) -> bool,
    D: FnMut(&E, &E) -> bool,
{
    if let Some((index, entry)) = old
        .iter()
        .enumerate()
        .find(|(_, e)| e.state() == EntityState::Deleted)
    {
        return Err(MergeError::InvalidBaseline {
            index,
            state: entry.state(),
        });
    }

    let mut pool: Vec<Option<E>> = mem::take(old).into_iter().map(Some).collect();
    let mut result = Vec::with_capacity(new.len() + pool.len());
    let mut report = ReconcileReport::default();

    for incoming in new {
        let matched = pool
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|e| same_identity(e, incoming)))
            .and_then(|index| pool[index].take());

        match matched {
            Some(existing) if !differs(&existing, incoming) => {
                report.kept += 1;
                result.push(existing);
            }
            Some(mut existing) => {
                existing.assign_with(incoming, LockMode::Locked);
                report.updated += 1;
                result.push(existing);
            }
            None => {
                let mut entry = incoming.clone_with(LockMode::Unlocked);
                if entry.state() != EntityState::New {
                    entry.persistent_mut().detach();
                }
                report.inserted += 1;
                result.push(entry);
            }
        }
    }

    for mut leftover in pool.into_iter().flatten() {
        if leftover.state() == EntityState::New {
            report.dropped += 1;
            continue;
        }
        leftover.persistent_mut().mark_deleted();
        report.deleted += 1;
        result.push(leftover);
    }

    *old = result;
    debug!(
        kept = report.kept,
        updated = report.updated,
        inserted = report.inserted,
        deleted = report.deleted,
        dropped = report.dropped,
        "collection reconciled"
    );
    Ok(report)
}
