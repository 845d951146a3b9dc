use std::any::type_name;

use strata_store::Row;
use strata_types::{EntityId, EntityState};
use tracing::{debug, warn};

use super::{segment_relation, ParentLink, Stream};
use crate::binding::chain::{BindingChain, Persist};
use crate::binding::collection::LinkSpec;
use crate::binding::filter::CollectionFilter;
use crate::error::{StreamError, StreamResult};

impl Stream<'_> {
    /// Write `entity` and everything reachable through its collections.
    ///
    /// `New` entities are inserted under a fresh id, `Changed` ones updated,
    /// `Deleted` ones removed. `Ok` entities skip their own rows but their
    /// children are still visited. Every written entity ends up `Ok`.
    ///
    /// Rows written before a failure stay written; use
    /// [`put_atomic`](Self::put_atomic) to undo them together with the
    /// in-memory changes. A `New` entity remembers how many of its rows were
    /// inserted, so a retried `put` resumes where the failed one stopped.
    /// A row is only skipped on resume if the backend still holds it.
    pub fn put<E: Persist>(&mut self, entity: &mut E) -> StreamResult<()> {
        self.write_entity(entity, None)
    }

    /// Mark `entity` deleted and remove its rows.
    ///
    /// An entity that was never stored is left untouched.
    pub fn remove<E: Persist>(&mut self, entity: &mut E) -> StreamResult<()> {
        if entity.state() == EntityState::New {
            debug!(entity = type_name::<E>(), "remove of unstored entity ignored");
            return Ok(());
        }
        entity.persistent_mut().mark_deleted();
        self.write_entity(entity, None)
    }

    pub(crate) fn put_children<C: Persist>(
        &mut self,
        children: &mut dyn CollectionFilter<C>,
        link: &LinkSpec,
        parent: EntityId,
    ) -> StreamResult<()> {
        let parent_link = self.parent_link(link, parent);
        for child in children.iter_existing() {
            self.write_entity(child, Some(&parent_link))?;
        }
        children.prune_removed();
        Ok(())
    }

    /// Remove every stored child of `parent` in one collection, following
    /// their own collections down.
    pub(crate) fn delete_children<C: Persist>(
        &mut self,
        children: &mut dyn CollectionFilter<C>,
        link: &LinkSpec,
        parent: EntityId,
    ) -> StreamResult<()> {
        let parent_link = self.parent_link(link, parent);
        // Storage may hold children the in-memory collection never loaded.
        let mut stored: Vec<C> = Vec::new();
        self.get_children(&mut stored, link, parent)?;
        for child in &mut stored {
            child.persistent_mut().mark_deleted();
            self.write_entity(child, Some(&parent_link))?;
        }
        for child in children.iter_existing() {
            if child.id().is_assigned() {
                child.persistent_mut().mark_removed();
            }
        }
        children.prune_removed();
        Ok(())
    }

    fn write_entity<E: Persist>(
        &mut self,
        entity: &mut E,
        link: Option<&ParentLink>,
    ) -> StreamResult<()> {
        let chain = E::binding()?;
        match entity.state() {
            EntityState::Ok => {}
            EntityState::Deleted => return self.delete_entity(chain, entity, link),
            EntityState::New | EntityState::Changed => self.write_rows(chain, entity, link)?,
        }

        let id = entity.id();
        for collection in chain.collections() {
            collection.put(self, entity, id)?;
        }
        entity.persistent_mut().mark_stored();
        Ok(())
    }

    fn write_rows<E: Persist>(
        &mut self,
        chain: &BindingChain<E>,
        entity: &mut E,
        link: Option<&ParentLink>,
    ) -> StreamResult<()> {
        let root = chain.root_relation().ok_or(StreamError::UnnamedRelation {
            entity: chain.entity_name(),
        })?;
        if !entity.id().is_assigned() {
            let id = self.next_id(root)?;
            entity
                .persistent_mut()
                .assign_id(id)
                .map_err(|e| StreamError::Misuse(e.to_string()))?;
        }

        let id = entity.id();
        let inserting = entity.state() == EntityState::New;
        let resume_after = entity.persistent().tables_written();

        for (index, segment) in chain.segments().iter().enumerate() {
            let relation = segment_relation(index, segment, link.and_then(|l| l.relation));
            if inserting && index < resume_after {
                if self.backend.fetch(relation, id)?.is_some() {
                    debug!(relation, %id, "row already inserted, skipping");
                    continue;
                }
                warn!(relation, %id, "row recorded as inserted is missing, inserting again");
            }

            let mut row = Row::new();
            for &table in &segment.tables {
                for field in chain.tables()[table].fields() {
                    row.set(field.name(), field.to_value(entity));
                }
            }
            if let (0, Some(link)) = (index, link) {
                link.stamp(&mut row)?;
            }

            if inserting {
                let stored = self.backend.insert(relation, id, &row)?;
                if stored != id {
                    return Err(StreamError::IdMismatch {
                        relation: relation.to_owned(),
                        expected: id,
                        stored,
                    });
                }
                entity.persistent_mut().record_table_written();
            } else if self.backend.update(relation, id, &row)? == 0 {
                return Err(StreamError::MissingRow {
                    relation: relation.to_owned(),
                    id,
                });
            }
            debug!(
                relation,
                %id,
                state = %entity.state(),
                fields = row.len(),
                "row written"
            );
        }
        Ok(())
    }

    fn delete_entity<E: Persist>(
        &mut self,
        chain: &BindingChain<E>,
        entity: &mut E,
        link: Option<&ParentLink>,
    ) -> StreamResult<()> {
        let id = entity.id();
        if !id.is_assigned() {
            return Ok(());
        }
        if chain.segments().is_empty() {
            return Err(StreamError::UnnamedRelation {
                entity: chain.entity_name(),
            });
        }

        if self.config.cascade_deletes {
            for collection in chain.collections() {
                collection.delete(self, entity, id)?;
            }
        }
        for (index, segment) in chain.segments().iter().enumerate() {
            let relation = segment_relation(index, segment, link.and_then(|l| l.relation));
            let removed = self.backend.delete(relation, id)?;
            debug!(relation, %id, removed, "row deleted");
        }
        entity.persistent_mut().mark_removed();
        Ok(())
    }
}
