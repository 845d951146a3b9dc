use std::fmt;

use strata_types::{StoreType, TypeResult, Value};

use crate::binding::scalar::{ConvSpec, Scalar};

type ReadFn<E> = Box<dyn Fn(&E, &ConvSpec) -> Value + Send + Sync>;
type WriteFn<E> = Box<dyn Fn(&mut E, &ConvSpec, &Value) -> TypeResult<()> + Send + Sync>;

/// Maps one member of `E` onto one stored field.
///
/// The member is reached through accessor functions fixed at registration,
/// so the binding stays valid whatever the layout of `E`.
pub struct FieldBinding<E> {
    name: &'static str,
    store_type: StoreType,
    spec: ConvSpec,
    read: ReadFn<E>,
    write: WriteFn<E>,
}

impl<E: 'static> FieldBinding<E> {
    /// Bind the member reached by `get`/`get_mut` to the field `name`.
    pub fn new<T>(name: &'static str, get: fn(&E) -> &T, get_mut: fn(&mut E) -> &mut T) -> Self
    where
        T: Scalar + 'static,
    {
        Self {
            name,
            store_type: T::STORE_TYPE,
            spec: ConvSpec::default(),
            read: Box::new(move |entity: &E, spec: &ConvSpec| get(entity).to_value(spec)),
            write: Box::new(move |entity: &mut E, spec: &ConvSpec, value: &Value| {
                *get_mut(entity) = T::from_value(spec, value)?;
                Ok(())
            }),
        }
    }

    /// Attach a conversion format (e.g. a date layout).
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.spec = ConvSpec::with_format(format);
        self
    }

    /// Lift this binding into a type that embeds `E`, so the field lands in
    /// the outer type's table.
    pub fn embed<O: 'static>(
        self,
        get: fn(&O) -> &E,
        get_mut: fn(&mut O) -> &mut E,
    ) -> FieldBinding<O> {
        let read = self.read;
        let write = self.write;
        FieldBinding {
            name: self.name,
            store_type: self.store_type,
            spec: self.spec,
            read: Box::new(move |outer: &O, spec: &ConvSpec| read(get(outer), spec)),
            write: Box::new(move |outer: &mut O, spec: &ConvSpec, value: &Value| {
                write(get_mut(outer), spec, value)
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn store_type(&self) -> StoreType {
        self.store_type
    }

    pub fn spec(&self) -> &ConvSpec {
        &self.spec
    }

    /// Stored representation of the member's current value.
    pub fn to_value(&self, entity: &E) -> Value {
        (self.read)(entity, &self.spec)
    }

    /// Overwrite the member from a stored value.
    pub fn from_value(&self, entity: &mut E, value: &Value) -> TypeResult<()> {
        (self.write)(entity, &self.spec, value)
    }
}

impl<E> fmt::Debug for FieldBinding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("store_type", &self.store_type)
            .field("spec", &self.spec)
            .finish()
    }
}
