use strata_store::{Criteria, Row};
use strata_types::{EntityId, Persistent};
use tracing::{debug, warn};

use super::{outer_relation, segment_relation, Stream};
use crate::binding::chain::{BindingChain, Persist};
use crate::binding::collection::LinkSpec;
use crate::binding::filter::{CollectionFilter, Shape};
use crate::error::{StreamError, StreamResult};

impl Stream<'_> {
    /// Load the first entity whose outermost row matches `criteria`.
    ///
    /// Returns `Ok(None)` when nothing matches. A failure anywhere in the
    /// graph discards the partially loaded value.
    pub fn get<E: Persist>(&mut self, criteria: &Criteria) -> StreamResult<Option<E>> {
        let chain = E::binding()?;
        let relation = outer_relation(chain)?;
        let first = self.backend.find(relation, criteria)?.into_iter().next();
        match first {
            Some((id, row)) => self.load(chain, id, row).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_by_id<E: Persist>(&mut self, id: impl Into<EntityId>) -> StreamResult<Option<E>> {
        self.get(&Criteria::id(id))
    }

    /// Load every entity whose outermost row matches `criteria`, in id
    /// order.
    pub fn select<E: Persist>(&mut self, criteria: &Criteria) -> StreamResult<Vec<E>> {
        let chain = E::binding()?;
        let relation = outer_relation(chain)?;
        let rows = self.backend.find(relation, criteria)?;
        let mut loaded = Vec::with_capacity(rows.len());
        for (id, row) in rows {
            loaded.push(self.load(chain, id, row)?);
        }
        debug!(relation, count = loaded.len(), "entities selected");
        Ok(loaded)
    }

    /// Replace `target` with the entity matching `criteria`.
    ///
    /// `target` is only touched once the whole graph has loaded. Returns
    /// `false`, leaving `target` as it was, when nothing matches.
    pub fn load_into<E: Persist>(
        &mut self,
        target: &mut E,
        criteria: &Criteria,
    ) -> StreamResult<bool> {
        match self.get::<E>(criteria)? {
            Some(loaded) => {
                *target = loaded;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn get_children<C: Persist>(
        &mut self,
        children: &mut dyn CollectionFilter<C>,
        link: &LinkSpec,
        parent: EntityId,
    ) -> StreamResult<()> {
        let chain = C::binding()?;
        let relation = link.relation.unwrap_or(outer_relation(chain)?);
        let parent_link = self.parent_link(link, parent);
        let rows = self.backend.query_children(relation, &parent_link.query())?;
        children.reset();

        match children.shape() {
            Shape::Single => {
                let mut rows = rows.into_iter();
                let Some((id, row)) = rows.next() else {
                    if self.config.strict_single {
                        return Err(StreamError::MissingChild {
                            relation: relation.to_owned(),
                            parent,
                        });
                    }
                    // Stands for "no stored child": a write skips it.
                    children.create_child();
                    if let Some(child) = children.current_child() {
                        child.persistent_mut().mark_removed();
                    }
                    return Ok(());
                };
                let surplus = rows.count();
                if surplus > 0 {
                    warn!(
                        relation,
                        %parent,
                        surplus,
                        "single child has surplus rows, using the first"
                    );
                }
                self.read_child(chain, children, id, row, link.relation)
            }
            Shape::Many => {
                for (id, row) in rows {
                    self.read_child(chain, children, id, row, link.relation)?;
                }
                Ok(())
            }
        }
    }

    fn load<E: Persist>(
        &mut self,
        chain: &BindingChain<E>,
        id: EntityId,
        row: Row,
    ) -> StreamResult<E> {
        let mut entity = E::default();
        self.read_entity(chain, &mut entity, id, row, None)?;
        Ok(entity)
    }

    fn read_child<C: Persist>(
        &mut self,
        chain: &BindingChain<C>,
        children: &mut dyn CollectionFilter<C>,
        id: EntityId,
        row: Row,
        relation_override: Option<&'static str>,
    ) -> StreamResult<()> {
        children.create_child();
        let child = children
            .current_child()
            .ok_or_else(|| StreamError::Misuse("collection filter has no current child".into()))?;
        self.read_entity(chain, child, id, row, relation_override)
    }

    /// Populate `entity` from its outermost row, the rows of its remaining
    /// relations, and its children.
    fn read_entity<E: Persist>(
        &mut self,
        chain: &BindingChain<E>,
        entity: &mut E,
        id: EntityId,
        outer: Row,
        relation_override: Option<&'static str>,
    ) -> StreamResult<()> {
        let mut outer = Some(outer);
        for (index, segment) in chain.segments().iter().enumerate() {
            let relation = segment_relation(index, segment, relation_override);
            let row = match outer.take() {
                Some(row) => row,
                None => self
                    .backend
                    .fetch(relation, id)?
                    .ok_or_else(|| StreamError::MissingRow {
                        relation: relation.to_owned(),
                        id,
                    })?,
            };
            for &table in &segment.tables {
                for field in chain.tables()[table].fields() {
                    field
                        .from_value(entity, row.get_or_null(field.name()))
                        .map_err(|source| StreamError::Conversion {
                            relation: relation.to_owned(),
                            field: field.name().to_owned(),
                            source,
                        })?;
                }
            }
            debug!(relation, %id, "row loaded");
        }

        for collection in chain.collections() {
            collection.get(self, entity, id)?;
        }
        *entity.persistent_mut() = Persistent::loaded(id);
        Ok(())
    }
}
