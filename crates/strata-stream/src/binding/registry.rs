//! Process-wide cache of binding chains, keyed by type.
//!
//! A chain is built on first use, checked for cycles, and then leaked so
//! every later lookup hands out the same `&'static` chain. The lock is
//! never held while a chain is built: building may recurse into child
//! types' chains.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use tracing::debug;

use crate::binding::chain::{BindingChain, ChainBuilder, Persist};
use crate::error::BindError;

type Slot = &'static (dyn Any + Send + Sync);

static REGISTRY: OnceLock<RwLock<HashMap<TypeId, Slot>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<TypeId, Slot>> {
    REGISTRY.get_or_init(Default::default)
}

fn downcast<E: Persist>(slot: Slot) -> Result<&'static BindingChain<E>, BindError> {
    slot.downcast_ref::<BindingChain<E>>()
        .ok_or(BindError::Registry {
            entity: type_name::<E>(),
        })
}

fn build<E: Persist>() -> Result<BindingChain<E>, BindError> {
    let mut builder = ChainBuilder::<E>::new();
    E::describe(&mut builder);
    builder.build()
}

/// The registered chain of `E`, building and validating it on first use.
pub(crate) fn chain<E: Persist>() -> Result<&'static BindingChain<E>, BindError> {
    let key = TypeId::of::<E>();
    let cached = registry()
        .read()
        .expect("lock poisoned")
        .get(&key)
        .copied();
    if let Some(slot) = cached {
        return downcast::<E>(slot);
    }

    let built = build::<E>()?;
    let mut path = vec![(key, type_name::<E>())];
    built.check_acyclic(&mut path)?;
    debug!(
        entity = type_name::<E>(),
        depth = built.depth(),
        relations = ?built.relations(),
        "binding chain registered"
    );

    // Another thread may have registered the same type meanwhile; the first
    // entry wins and this one is dropped.
    let slot = *registry()
        .write()
        .expect("lock poisoned")
        .entry(key)
        .or_insert_with(|| {
            let leaked: &'static BindingChain<E> = Box::leak(Box::new(built));
            leaked as Slot
        });
    downcast::<E>(slot)
}

/// Run `f` against the chain of `C` without registering it.
///
/// Used while validating another chain: registering `C` here would start
/// its own cycle check and recurse forever on a cyclic graph.
pub(crate) fn with_chain<C: Persist, R>(
    f: impl FnOnce(&BindingChain<C>) -> R,
) -> Result<R, BindError> {
    let cached = registry()
        .read()
        .expect("lock poisoned")
        .get(&TypeId::of::<C>())
        .copied();
    match cached {
        Some(slot) => Ok(f(downcast::<C>(slot)?)),
        None => Ok(f(&build::<C>()?)),
    }
}

/// Whether the chain of `E` has been built and cached.
pub fn is_registered<E: Persist>() -> bool {
    registry()
        .read()
        .expect("lock poisoned")
        .contains_key(&TypeId::of::<E>())
}
