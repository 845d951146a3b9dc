use std::any::{type_name, TypeId};
use std::fmt;

use strata_types::EntityId;

use crate::binding::chain::Persist;
use crate::binding::filter::{CollectionFilter, Shape, SingleFilter};
use crate::binding::registry;
use crate::error::{BindError, StreamResult};
use crate::stream::Stream;

/// How child rows of one collection are linked back to their parent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LinkSpec {
    pub(crate) member: &'static str,
    pub(crate) foreign_key: Option<&'static str>,
    pub(crate) collection_id: Option<u32>,
    pub(crate) relation: Option<&'static str>,
}

/// Maps one member of `E` holding child entities onto a child relation.
///
/// Children are linked to the parent by a foreign-key field holding the
/// parent's id. When one type has two collections of the same child type,
/// each needs its own collection id so the rows can be told apart.
pub struct CollectionBinding<E> {
    spec: LinkSpec,
    shape: Shape,
    child_type: TypeId,
    child_name: &'static str,
    link: Box<dyn ChildLink<E>>,
}

impl<E: 'static> CollectionBinding<E> {
    /// Bind a `Vec` of children.
    pub fn many<C: Persist>(member: &'static str, access: fn(&mut E) -> &mut Vec<C>) -> Self {
        Self::with_slot(member, Shape::Many, Slot::Many(access))
    }

    /// Bind a single child member.
    pub fn single<C: Persist>(member: &'static str, access: fn(&mut E) -> &mut C) -> Self {
        Self::with_slot(member, Shape::Single, Slot::Single(access))
    }

    fn with_slot<C: Persist>(member: &'static str, shape: Shape, slot: Slot<E, C>) -> Self {
        Self {
            spec: LinkSpec {
                member,
                ..LinkSpec::default()
            },
            shape,
            child_type: TypeId::of::<C>(),
            child_name: type_name::<C>(),
            link: Box::new(TypedLink { slot }),
        }
    }

    /// Name the field linking child rows to the parent.
    pub fn foreign_key(mut self, field: &'static str) -> Self {
        self.spec.foreign_key = Some(field);
        self
    }

    /// Tag child rows with a collection id.
    pub fn collection_id(mut self, id: u32) -> Self {
        self.spec.collection_id = Some(id);
        self
    }

    /// Store children in `relation` instead of the child type's own
    /// outermost relation.
    pub fn relation(mut self, relation: &'static str) -> Self {
        self.spec.relation = Some(relation);
        self
    }

    /// Lift into a type that embeds `E`.
    pub(crate) fn lift<O: 'static>(self, get_mut: fn(&mut O) -> &mut E) -> CollectionBinding<O> {
        CollectionBinding {
            spec: self.spec,
            shape: self.shape,
            child_type: self.child_type,
            child_name: self.child_name,
            link: Box::new(LiftedLink {
                inner: self.link,
                get_mut,
            }),
        }
    }

    pub(crate) fn put(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        id: EntityId,
    ) -> StreamResult<()> {
        self.link.put(stream, parent, &self.spec, id)
    }

    pub(crate) fn get(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        id: EntityId,
    ) -> StreamResult<()> {
        self.link.get(stream, parent, &self.spec, id)
    }

    pub(crate) fn delete(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        id: EntityId,
    ) -> StreamResult<()> {
        self.link.delete(stream, parent, &self.spec, id)
    }
}

impl<E> CollectionBinding<E> {
    pub fn member(&self) -> &'static str {
        self.spec.member
    }

    pub fn foreign_key_name(&self) -> Option<&'static str> {
        self.spec.foreign_key
    }

    pub fn collection_id_value(&self) -> Option<u32> {
        self.spec.collection_id
    }

    pub fn relation_override(&self) -> Option<&'static str> {
        self.spec.relation
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn child_type(&self) -> TypeId {
        self.child_type
    }

    pub fn child_type_name(&self) -> &'static str {
        self.child_name
    }

    pub(crate) fn check_acyclic(
        &self,
        path: &mut Vec<(TypeId, &'static str)>,
    ) -> Result<(), BindError> {
        self.link.check_acyclic(path)
    }
}

impl<E> fmt::Debug for CollectionBinding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionBinding")
            .field("member", &self.spec.member)
            .field("child", &self.child_name)
            .field("shape", &self.shape)
            .field("foreign_key", &self.spec.foreign_key)
            .field("collection_id", &self.spec.collection_id)
            .field("relation", &self.spec.relation)
            .finish()
    }
}

/// Type-erased bridge from a parent type to the engine's generic child
/// traversal.
trait ChildLink<E>: Send + Sync {
    fn put(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()>;

    fn get(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()>;

    fn delete(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()>;

    fn check_acyclic(&self, path: &mut Vec<(TypeId, &'static str)>) -> Result<(), BindError>;
}

enum Slot<E, C> {
    Single(fn(&mut E) -> &mut C),
    Many(fn(&mut E) -> &mut Vec<C>),
}

struct TypedLink<E, C> {
    slot: Slot<E, C>,
}

impl<E, C: Persist> TypedLink<E, C> {
    fn with_filter<R>(
        &self,
        parent: &mut E,
        f: impl FnOnce(&mut dyn CollectionFilter<C>) -> R,
    ) -> R {
        match &self.slot {
            Slot::Single(access) => f(&mut SingleFilter::new(access(parent))),
            Slot::Many(access) => f(access(parent)),
        }
    }
}

impl<E: 'static, C: Persist> ChildLink<E> for TypedLink<E, C> {
    fn put(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()> {
        self.with_filter(parent, |children| stream.put_children(children, spec, id))
    }

    fn get(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()> {
        self.with_filter(parent, |children| stream.get_children(children, spec, id))
    }

    fn delete(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut E,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()> {
        self.with_filter(parent, |children| stream.delete_children(children, spec, id))
    }

    fn check_acyclic(&self, path: &mut Vec<(TypeId, &'static str)>) -> Result<(), BindError> {
        let child = TypeId::of::<C>();
        if path.iter().any(|(seen, _)| *seen == child) {
            let mut names: Vec<&str> = path.iter().map(|(_, name)| *name).collect();
            names.push(type_name::<C>());
            return Err(BindError::Cycle {
                path: names.join(" -> "),
            });
        }
        path.push((child, type_name::<C>()));
        registry::with_chain::<C, _>(|chain| chain.check_acyclic(path))??;
        path.pop();
        Ok(())
    }
}

struct LiftedLink<O, E> {
    inner: Box<dyn ChildLink<E>>,
    get_mut: fn(&mut O) -> &mut E,
}

impl<O: 'static, E: 'static> ChildLink<O> for LiftedLink<O, E> {
    fn put(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut O,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()> {
        self.inner.put(stream, (self.get_mut)(parent), spec, id)
    }

    fn get(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut O,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()> {
        self.inner.get(stream, (self.get_mut)(parent), spec, id)
    }

    fn delete(
        &self,
        stream: &mut Stream<'_>,
        parent: &mut O,
        spec: &LinkSpec,
        id: EntityId,
    ) -> StreamResult<()> {
        self.inner.delete(stream, (self.get_mut)(parent), spec, id)
    }

    fn check_acyclic(&self, path: &mut Vec<(TypeId, &'static str)>) -> Result<(), BindError> {
        self.inner.check_acyclic(path)
    }
}
