//! Container shapes for child entities.
//!
//! The stream engine never sees the concrete container of a collection. It
//! asks a [`CollectionFilter`] to create children while reading, to hand
//! out the slot being populated, and to enumerate existing children while
//! writing. Two shapes exist: a plain child member ([`Shape::Single`]) and
//! an ordered `Vec` of children ([`Shape::Many`]).

use std::iter;

use strata_types::{Entity, EntityState};

/// Container shape behind a [`CollectionFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Exactly one child, held directly.
    Single,
    /// An ordered collection of children.
    Many,
}

/// Uniform access to the children of one collection member.
pub trait CollectionFilter<C> {
    fn shape(&self) -> Shape;

    /// Make room for a freshly constructed child; it becomes the current
    /// child.
    fn create_child(&mut self);

    /// The child currently being populated.
    fn current_child(&mut self) -> Option<&mut C>;

    /// Every existing child, in order.
    fn iter_existing(&mut self) -> Box<dyn Iterator<Item = &mut C> + '_>;

    /// Forget all children before a read repopulates the container.
    fn reset(&mut self);

    /// Drop children whose rows were removed by the last write.
    fn prune_removed(&mut self);
}

fn is_removed<C: Entity>(child: &C) -> bool {
    child.state() == EntityState::Deleted && !child.id().is_assigned()
}

impl<C: Entity + Default> CollectionFilter<C> for Vec<C> {
    fn shape(&self) -> Shape {
        Shape::Many
    }

    fn create_child(&mut self) {
        self.push(C::default());
    }

    fn current_child(&mut self) -> Option<&mut C> {
        self.last_mut()
    }

    fn iter_existing(&mut self) -> Box<dyn Iterator<Item = &mut C> + '_> {
        Box::new(self.iter_mut())
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn prune_removed(&mut self) {
        self.retain(|child| !is_removed(child));
    }
}

/// Filter over a single child member.
pub struct SingleFilter<'a, C> {
    slot: &'a mut C,
}

impl<'a, C> SingleFilter<'a, C> {
    pub fn new(slot: &'a mut C) -> Self {
        Self { slot }
    }
}

impl<C: Entity + Default> CollectionFilter<C> for SingleFilter<'_, C> {
    fn shape(&self) -> Shape {
        Shape::Single
    }

    fn create_child(&mut self) {
        *self.slot = C::default();
    }

    fn current_child(&mut self) -> Option<&mut C> {
        Some(&mut *self.slot)
    }

    fn iter_existing(&mut self) -> Box<dyn Iterator<Item = &mut C> + '_> {
        Box::new(iter::once(&mut *self.slot))
    }

    fn reset(&mut self) {}

    // The member itself stays; a removed child is recognisable by its state.
    fn prune_removed(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::{EntityId, Persistent};

    #[derive(Clone, Debug, Default)]
    struct Leaf {
        record: Persistent,
        n: u32,
    }

    impl Entity for Leaf {
        fn persistent(&self) -> &Persistent {
            &self.record
        }
        fn persistent_mut(&mut self) -> &mut Persistent {
            &mut self.record
        }
    }

    #[test]
    fn many_creates_and_exposes_last() {
        let mut leaves: Vec<Leaf> = Vec::new();
        let filter: &mut dyn CollectionFilter<Leaf> = &mut leaves;
        assert_eq!(filter.shape(), Shape::Many);
        assert!(filter.current_child().is_none());

        filter.create_child();
        filter.current_child().unwrap().n = 1;
        filter.create_child();
        filter.current_child().unwrap().n = 2;

        let ns: Vec<u32> = filter.iter_existing().map(|l| l.n).collect();
        assert_eq!(ns, vec![1, 2]);

        filter.reset();
        assert!(leaves.is_empty());
    }

    #[test]
    fn many_prunes_removed_children_only() {
        let mut removed = Leaf::default();
        removed.record = Persistent::loaded(EntityId::new(3));
        removed.record.mark_deleted();
        removed.record.mark_removed();

        let mut pending_delete = Leaf::default();
        pending_delete.record = Persistent::loaded(EntityId::new(4));
        pending_delete.record.mark_deleted();

        let mut leaves = vec![Leaf::default(), removed, pending_delete];
        leaves.prune_removed();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1].id(), EntityId::new(4));
    }

    #[test]
    fn single_recreates_in_place() {
        let mut leaf = Leaf {
            record: Persistent::loaded(EntityId::new(1)),
            n: 5,
        };
        {
            let mut filter = SingleFilter::new(&mut leaf);
            assert_eq!(filter.shape(), Shape::Single);
            assert_eq!(filter.iter_existing().count(), 1);
            filter.create_child();
            filter.current_child().unwrap().n = 6;
        }
        assert_eq!(leaf.n, 6);
        assert_eq!(leaf.state(), EntityState::New);
    }
}
