//! The identity lock: how copies and assignments treat entity identity.
//!
//! Copying an entity normally copies its id and state. Under a lock the
//! target keeps its own identity instead, so a loaded entity used as a
//! template cannot hijack the row of the entity it came from.
//!
//! The ambient mode is one value per thread, not a stack. A guard sets it
//! on construction and unconditionally resets it to [`LockMode::Unlocked`]
//! on drop, so guards must never overlap: create at most one at a time and
//! drop it before creating the next. Sharing locked copies across threads
//! is unsupported. Code that needs a specific mode without touching ambient
//! state should call [`Persistent::copied_with`] or
//! [`Entity::assign_with`] directly.
//!
//! [`Persistent::copied_with`]: crate::Persistent::copied_with
//! [`Entity::assign_with`]: crate::Entity::assign_with

use std::cell::Cell;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Copy/assignment semantics for entity identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
    /// The target adopts the source's id and state.
    #[default]
    Unlocked,
    /// The target keeps its own id; its state becomes `Changed`.
    Locked,
    /// The target keeps its own id and its own state.
    LockedPreserveState,
}

impl LockMode {
    /// Returns `true` for either locked mode.
    pub const fn is_locked(self) -> bool {
        !matches!(self, Self::Unlocked)
    }
}

thread_local! {
    static AMBIENT: Cell<LockMode> = const { Cell::new(LockMode::Unlocked) };
}

/// Scoped guard setting the ambient [`LockMode`] for the current thread.
///
/// While the guard lives, `Clone` on [`Persistent`] and
/// [`Entity::assign_from`] follow its mode. Dropping it resets the mode to
/// `Unlocked` regardless of what was active before.
///
/// [`Persistent`]: crate::Persistent
/// [`Entity::assign_from`]: crate::Entity::assign_from
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct IdentityLock {
    mode: LockMode,
    // The ambient mode is per thread; keep the guard there too.
    _not_send: PhantomData<*const ()>,
}

impl IdentityLock {
    /// Activate `mode` until the returned guard is dropped.
    pub fn new(mode: LockMode) -> Self {
        AMBIENT.with(|m| m.set(mode));
        Self {
            mode,
            _not_send: PhantomData,
        }
    }

    /// Shorthand for `IdentityLock::new(LockMode::Locked)`.
    pub fn locked() -> Self {
        Self::new(LockMode::Locked)
    }

    /// The mode this guard activated.
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// The ambient mode of the current thread.
    pub fn current() -> LockMode {
        AMBIENT.with(Cell::get)
    }

    /// Run `f` under `mode`, then restore whatever mode was active before.
    ///
    /// Unlike a guard this nests: it never leaves the thread `Unlocked`
    /// when a caller's guard is still alive.
    pub fn with_mode<R>(mode: LockMode, f: impl FnOnce() -> R) -> R {
        struct Restore(LockMode);

        impl Drop for Restore {
            fn drop(&mut self) {
                AMBIENT.with(|m| m.set(self.0));
            }
        }

        let _restore = Restore(AMBIENT.with(|m| m.replace(mode)));
        f()
    }
}

impl Drop for IdentityLock {
    fn drop(&mut self) {
        AMBIENT.with(|m| m.set(LockMode::Unlocked));
    }
}
