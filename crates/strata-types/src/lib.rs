//! Foundation types for Strata.
//!
//! Strata maps in-memory object graphs onto rows of named relations. This
//! crate holds the vocabulary every other Strata crate shares: the identity
//! and lifecycle record carried by each persistent value, the state machine
//! that drives it, the identity lock governing copies, and the scalar
//! representation exchanged with storage backends.
//!
//! # Key Types
//!
//! - [`EntityId`] -- 64-bit row identity, `0` meaning "not yet assigned"
//! - [`EntityState`] -- lifecycle state with the transition function [`EntityState::next`]
//! - [`Persistent`] -- per-entity identity/state record embedded in user types
//! - [`Entity`] -- trait exposing the embedded [`Persistent`] record
//! - [`LockMode`] / [`IdentityLock`] -- copy and assignment semantics for entities
//! - [`Value`] / [`StoreType`] -- stored scalar representation

pub mod entity;
pub mod error;
pub mod id;
pub mod lock;
pub mod state;
pub mod value;

pub use entity::{Entity, Persistent};
pub use error::{TypeError, TypeResult};
pub use id::EntityId;
pub use lock::{IdentityLock, LockMode};
pub use state::EntityState;
pub use value::{StoreType, Value};
