use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a persistent entity.
///
/// The write path keys off this state: `New` rows are inserted, `Changed`
/// rows are updated, `Deleted` rows are removed, and `Ok` rows are skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityState {
    /// Never written; has no stored rows.
    #[default]
    New,
    /// In sync with storage.
    Ok,
    /// Stored, with in-memory modifications pending.
    Changed,
    /// Stored, scheduled for removal.
    Deleted,
}

impl EntityState {
    /// All states, in declaration order.
    pub const ALL: [Self; 4] = [Self::New, Self::Ok, Self::Changed, Self::Deleted];

    /// Transition function: the state reached when `requested` is applied to
    /// `self`.
    ///
    /// - `New` absorbs every request; only re-initialization leaves it.
    /// - Requesting `Ok` launders any stored state back to `Ok`.
    /// - Requesting `Deleted` wins over every stored state.
    /// - Requesting `New` or `Changed` on a stored entity yields `Changed`.
    pub const fn next(self, requested: Self) -> Self {
        match (self, requested) {
            (Self::New, _) => Self::New,
            (_, Self::Ok) => Self::Ok,
            (_, Self::Deleted) => Self::Deleted,
            (_, Self::New | Self::Changed) => Self::Changed,
        }
    }

    /// Returns `true` if a write would touch storage for this state.
    pub const fn is_dirty(self) -> bool {
        !matches!(self, Self::Ok)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Ok => "ok",
            Self::Changed => "changed",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::EntityState;
    use super::EntityState::{Changed, Deleted, New};
    use proptest::prelude::*;

    // Rows: old state. Columns: requested Ok, New, Changed, Deleted.
    const TABLE: [(EntityState, [EntityState; 4]); 4] = [
        (EntityState::Ok, [EntityState::Ok, Changed, Changed, Deleted]),
        (New, [New, New, New, New]),
        (Changed, [EntityState::Ok, Changed, Changed, Deleted]),
        (Deleted, [EntityState::Ok, Changed, Changed, Deleted]),
    ];
    const REQUESTED: [EntityState; 4] = [EntityState::Ok, New, Changed, Deleted];

    #[test]
    fn transition_table_matches() {
        for (old, row) in TABLE {
            for (requested, expected) in REQUESTED.iter().zip(row) {
                assert_eq!(
                    old.next(*requested),
                    expected,
                    "next({old:?}, {requested:?})"
                );
            }
        }
    }

    #[test]
    fn default_is_new() {
        assert_eq!(EntityState::default(), New);
    }

    #[test]
    fn display_names() {
        assert_eq!(Changed.to_string(), "changed");
        assert_eq!(Deleted.to_string(), "deleted");
    }

    fn any_state() -> impl Strategy<Value = EntityState> {
        proptest::sample::select(EntityState::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn new_absorbs_any_request_sequence(
            requests in proptest::collection::vec(any_state(), 0..16)
        ) {
            let end = requests.iter().fold(New, |s, r| s.next(*r));
            prop_assert_eq!(end, New);
        }

        #[test]
        fn ok_request_launders_stored_states(old in any_state()) {
            prop_assume!(old != New);
            prop_assert_eq!(old.next(EntityState::Ok), EntityState::Ok);
        }

        #[test]
        fn deleted_request_wins_on_stored_states(old in any_state()) {
            prop_assume!(old != New);
            prop_assert_eq!(old.next(Deleted), Deleted);
        }
    }
}
