//! The stream engine: writes and reads whole object graphs through a
//! [`Backend`].
//!
//! Writing walks a type's binding chain, emits one row per relation keyed by
//! the entity's id, then recurses into every collection with the parent id
//! stamped onto each child row. Reading runs the same walk in reverse,
//! instantiating children through their [`CollectionFilter`]s.
//!
//! [`CollectionFilter`]: crate::binding::CollectionFilter

mod read;
mod write;

use std::any::type_name;

use strata_store::{Backend, ChildQuery, IdSource, Row};
use strata_types::{EntityId, Value};
use tracing::{debug, warn};

use crate::binding::chain::{BindingChain, Persist, Segment};
use crate::binding::collection::LinkSpec;
use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};

/// Drives one backend for a sequence of `put`/`get` calls.
///
/// A stream holds its backend exclusively; one operation runs at a time.
/// Ids come from the backend's own [`Backend::next_id`] unless an external
/// [`IdSource`] is attached.
pub struct Stream<'a> {
    backend: &'a mut dyn Backend,
    ids: Option<&'a mut dyn IdSource>,
    config: StreamConfig,
}

impl<'a> Stream<'a> {
    pub fn new(backend: &'a mut dyn Backend) -> Self {
        Self {
            backend,
            ids: None,
            config: StreamConfig::default(),
        }
    }

    /// Draw fresh ids from `ids` instead of the backend.
    pub fn with_id_source(mut self, ids: &'a mut dyn IdSource) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Run `f` inside a backend transaction.
    ///
    /// Commits if `f` succeeds and rolls back if it fails. Only the backend
    /// is rolled back: entities mutated by `f` keep the ids and states the
    /// failed call gave them, so they no longer describe storage. Discard
    /// them, or use [`atomically_with`](Self::atomically_with) or
    /// [`put_atomic`](Self::put_atomic), which restore the entity too.
    pub fn atomically<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> StreamResult<R>,
    ) -> StreamResult<R> {
        self.backend.begin()?;
        match f(self) {
            Ok(value) => {
                self.backend.commit()?;
                debug!("stream transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.backend.rollback() {
                    warn!(error = %rollback, "rollback after failed operation also failed");
                }
                debug!(error = %err, "stream transaction rolled back");
                Err(err)
            }
        }
    }

    /// Run `f` on `entity` inside a backend transaction. On rollback the
    /// whole graph of `entity` is restored to what it was before the call,
    /// so a retry starts from scratch against the restored backend.
    pub fn atomically_with<E, R>(
        &mut self,
        entity: &mut E,
        f: impl FnOnce(&mut Self, &mut E) -> StreamResult<R>,
    ) -> StreamResult<R>
    where
        E: Persist + Clone,
    {
        let saved = entity.snapshot();
        let result = self.atomically(|stream| f(stream, entity));
        if result.is_err() {
            *entity = saved;
            debug!(entity = type_name::<E>(), "entity restored after rollback");
        }
        result
    }

    /// [`put`](Self::put) inside a transaction; on failure neither storage
    /// nor `entity` keeps any trace of the call.
    pub fn put_atomic<E: Persist + Clone>(&mut self, entity: &mut E) -> StreamResult<()> {
        self.atomically_with(entity, |stream, e| stream.put(e))
    }

    fn next_id(&mut self, root_relation: &str) -> StreamResult<EntityId> {
        let id = match &mut self.ids {
            Some(ids) => ids.next_id(root_relation)?,
            None => self.backend.next_id(root_relation)?,
        };
        debug!(relation = root_relation, %id, "id assigned");
        Ok(id)
    }

    fn parent_link(&self, link: &LinkSpec, parent: EntityId) -> ParentLink {
        ParentLink {
            foreign_key: link
                .foreign_key
                .map_or_else(|| self.config.foreign_key.clone(), str::to_owned),
            parent,
            collection: link
                .collection_id
                .map(|cid| (self.config.collection_id_column.clone(), cid)),
            relation: link.relation,
        }
    }
}

impl std::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("external_ids", &self.ids.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// How a child's rows hang off its parent, resolved against the config.
#[derive(Clone, Debug)]
struct ParentLink {
    foreign_key: String,
    parent: EntityId,
    collection: Option<(String, u32)>,
    relation: Option<&'static str>,
}

impl ParentLink {
    /// Write the link columns into a child's outermost row.
    fn stamp(&self, row: &mut Row) -> StreamResult<()> {
        let parent = self
            .parent
            .to_value()
            .map_err(|e| StreamError::Misuse(e.to_string()))?;
        row.set(&self.foreign_key, parent);
        if let Some((column, cid)) = &self.collection {
            row.set(column, Value::Int(i64::from(*cid)));
        }
        Ok(())
    }

    fn query(&self) -> ChildQuery<'_> {
        let query = ChildQuery::new(&self.foreign_key, self.parent);
        match &self.collection {
            Some((column, cid)) => query.in_collection(column, *cid),
            None => query,
        }
    }
}

/// The relation a segment is stored in; a collection's relation override
/// replaces the outermost one.
fn segment_relation(
    index: usize,
    segment: &Segment,
    relation_override: Option<&'static str>,
) -> &'static str {
    match relation_override {
        Some(relation) if index == 0 => relation,
        _ => segment.relation,
    }
}

fn outer_relation<E>(chain: &BindingChain<E>) -> StreamResult<&'static str> {
    chain.outer_relation().ok_or(StreamError::UnnamedRelation {
        entity: chain.entity_name(),
    })
}
