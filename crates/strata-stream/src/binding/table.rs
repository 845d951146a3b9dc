use std::fmt;

use crate::binding::collection::CollectionBinding;
use crate::binding::field::FieldBinding;
use crate::binding::scalar::Scalar;

/// One link of a binding chain: the slice of a type stored in one relation.
///
/// A descriptor without a relation name shares the relation of its nearest
/// named ancestor in the chain.
pub struct TableDescriptor<E> {
    relation: Option<&'static str>,
    fields: Vec<FieldBinding<E>>,
    collections: Vec<CollectionBinding<E>>,
}

impl<E: 'static> TableDescriptor<E> {
    /// A descriptor stored in `relation`.
    pub fn named(relation: &'static str) -> Self {
        Self {
            relation: Some(relation),
            fields: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// A descriptor stored in its nearest named ancestor's relation.
    pub fn unnamed() -> Self {
        Self {
            relation: None,
            fields: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Bind a scalar member under `name`.
    pub fn field<T>(
        self,
        name: &'static str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self
    where
        T: Scalar + 'static,
    {
        self.bind(FieldBinding::new(name, get, get_mut))
    }

    /// Add a prepared field binding.
    pub fn bind(mut self, field: FieldBinding<E>) -> Self {
        self.fields.push(field);
        self
    }

    /// Flatten the fields of an embedded sub-object into this table.
    pub fn embed<S: 'static>(
        mut self,
        get: fn(&E) -> &S,
        get_mut: fn(&mut E) -> &mut S,
        fields: Vec<FieldBinding<S>>,
    ) -> Self {
        self.fields
            .extend(fields.into_iter().map(|f| f.embed(get, get_mut)));
        self
    }

    /// Add a collection of child entities.
    pub fn collection(mut self, collection: CollectionBinding<E>) -> Self {
        self.collections.push(collection);
        self
    }

    /// Re-target every binding at a type embedding `E`.
    pub(crate) fn lift<O: 'static>(
        self,
        get: fn(&O) -> &E,
        get_mut: fn(&mut O) -> &mut E,
    ) -> TableDescriptor<O> {
        TableDescriptor {
            relation: self.relation,
            fields: self
                .fields
                .into_iter()
                .map(|f| f.embed(get, get_mut))
                .collect(),
            collections: self
                .collections
                .into_iter()
                .map(|c| c.lift(get_mut))
                .collect(),
        }
    }
}

impl<E> TableDescriptor<E> {
    /// The relation name declared on this descriptor itself.
    pub fn relation(&self) -> Option<&'static str> {
        self.relation
    }

    pub fn fields(&self) -> &[FieldBinding<E>] {
        &self.fields
    }

    pub fn collections(&self) -> &[CollectionBinding<E>] {
        &self.collections
    }
}

impl<E> fmt::Debug for TableDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDescriptor")
            .field("relation", &self.relation)
            .field("fields", &self.fields)
            .field("collections", &self.collections)
            .finish()
    }
}
