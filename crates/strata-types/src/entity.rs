use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::id::EntityId;
use crate::lock::{IdentityLock, LockMode};
use crate::state::EntityState;

/// Identity and lifecycle record embedded in every persistent type.
///
/// A freshly constructed record is `New` with no id. The id is assigned
/// once, by the write path, and afterwards only changes through an
/// [`LockMode::Unlocked`] copy or an explicit [`detach`](Self::detach).
///
/// `Clone` follows the ambient [`IdentityLock`] mode: unlocked clones copy
/// id and state, locked clones start out as a fresh record.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persistent {
    id: EntityId,
    state: EntityState,
    /// Relation rows of a `New` entity already inserted by an interrupted
    /// write. A retried write resumes after them.
    tables_written: usize,
}

impl Persistent {
    /// A new, never-written record.
    pub const fn new() -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            state: EntityState::New,
            tables_written: 0,
        }
    }

    /// A record for an entity just read from storage.
    pub const fn loaded(id: EntityId) -> Self {
        Self {
            id,
            state: EntityState::Ok,
            tables_written: 0,
        }
    }

    pub const fn id(&self) -> EntityId {
        self.id
    }

    pub const fn state(&self) -> EntityState {
        self.state
    }

    pub const fn tables_written(&self) -> usize {
        self.tables_written
    }

    /// Apply [`EntityState::next`] and return the resulting state.
    pub fn request(&mut self, requested: EntityState) -> EntityState {
        self.state = self.state.next(requested);
        self.state
    }

    /// Request `Changed`.
    pub fn touch(&mut self) -> EntityState {
        self.request(EntityState::Changed)
    }

    /// Request `Deleted`.
    pub fn mark_deleted(&mut self) -> EntityState {
        self.request(EntityState::Deleted)
    }

    /// Store `value` into `slot`, requesting `Changed` only if it differs.
    ///
    /// Returns `true` if the slot changed.
    pub fn update<T: PartialEq>(&mut self, slot: &mut T, value: T) -> bool {
        if *slot == value {
            return false;
        }
        *slot = value;
        self.touch();
        true
    }

    /// Assign the row identity handed out by an id source.
    ///
    /// Re-assigning the same id is a no-op; replacing an existing id fails.
    pub fn assign_id(&mut self, id: EntityId) -> TypeResult<()> {
        if self.id.is_assigned() && self.id != id {
            return Err(TypeError::IdAlreadyAssigned {
                current: self.id,
                requested: id,
            });
        }
        self.id = id;
        Ok(())
    }

    /// Forget the stored identity: the entity becomes `New` again and the
    /// next write inserts fresh rows.
    pub fn detach(&mut self) {
        *self = Self::new();
    }

    /// Record that one more relation row of a `New` entity was inserted.
    pub fn record_table_written(&mut self) {
        self.tables_written += 1;
    }

    /// Re-initialize to `Ok` after a successful write.
    ///
    /// This is the only way out of `New` besides [`detach`](Self::detach).
    pub fn mark_stored(&mut self) {
        self.state = EntityState::Ok;
        self.tables_written = 0;
    }

    /// Record that the entity's rows were removed from storage. The id is
    /// cleared and the state stays `Deleted`, so a repeated write is a no-op.
    pub fn mark_removed(&mut self) {
        self.id = EntityId::UNASSIGNED;
        self.state = EntityState::Deleted;
        self.tables_written = 0;
    }

    /// Copy-construct under an explicit mode.
    ///
    /// Unlocked copies carry id and state over. Locked modes yield a fresh
    /// record: the copy has no prior identity of its own to keep.
    ///
    /// A `Locked` copy is therefore `New`, not `Changed`: `New` absorbs the
    /// `Changed` request, and a copy that came out `Changed` without an id
    /// would be updated against a row that does not exist. Only assignment
    /// ([`assigned_from`](Self::assigned_from)) has a prior identity to force
    /// to `Changed`.
    pub fn copied_with(&self, mode: LockMode) -> Self {
        match mode {
            LockMode::Unlocked => self.raw_copy(),
            LockMode::Locked | LockMode::LockedPreserveState => Self::new(),
        }
    }

    /// The record `self` holds after being assigned from `source` under
    /// `mode`.
    pub fn assigned_from(&self, source: &Self, mode: LockMode) -> Self {
        match mode {
            LockMode::Unlocked => source.raw_copy(),
            LockMode::Locked => Self {
                id: self.id,
                state: self.state.next(EntityState::Changed),
                tables_written: self.tables_written,
            },
            LockMode::LockedPreserveState => self.raw_copy(),
        }
    }

    fn raw_copy(&self) -> Self {
        Self {
            id: self.id,
            state: self.state,
            tables_written: self.tables_written,
        }
    }
}

impl Default for Persistent {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Persistent {
    fn clone(&self) -> Self {
        self.copied_with(IdentityLock::current())
    }
}

/// A value with an embedded [`Persistent`] record.
///
/// Types that extend another persistent type by embedding it delegate to
/// the embedded value's record, so the whole lineage shares one identity.
pub trait Entity {
    fn persistent(&self) -> &Persistent;

    fn persistent_mut(&mut self) -> &mut Persistent;

    fn id(&self) -> EntityId {
        self.persistent().id()
    }

    fn state(&self) -> EntityState {
        self.persistent().state()
    }

    /// Clone under an explicit mode, leaving the ambient lock untouched.
    fn clone_with(&self, mode: LockMode) -> Self
    where
        Self: Clone + Sized,
    {
        let mut copy = self.clone();
        *copy.persistent_mut() = self.persistent().copied_with(mode);
        copy
    }

    /// Exact copy of the whole value, nested entities included, taken
    /// `Unlocked` whatever the ambient mode. Used to restore a graph after
    /// a failed write.
    fn snapshot(&self) -> Self
    where
        Self: Clone + Sized,
    {
        IdentityLock::with_mode(LockMode::Unlocked, || self.clone())
    }

    /// Take over `source`'s content; identity follows `mode`.
    fn assign_with(&mut self, source: &Self, mode: LockMode)
    where
        Self: Clone + Sized,
    {
        let record = self.persistent().assigned_from(source.persistent(), mode);
        *self = source.clone();
        *self.persistent_mut() = record;
    }

    /// Take over `source`'s content under the ambient lock mode.
    fn assign_from(&mut self, source: &Self)
    where
        Self: Clone + Sized,
    {
        self.assign_with(source, IdentityLock::current());
    }
}
