//! Object-to-storage mapping for Strata.
//!
//! This crate holds the binding model, which describes how a type's members
//! map onto named relations, and the stream engine, which walks those
//! descriptions to write and read whole object graphs against a
//! [`Backend`](strata_store::Backend).
//!
//! # Binding
//!
//! - [`Persist`] -- implemented once per persistent type; describes its chain
//! - [`TableDescriptor`] -- one link of a chain: relation name, fields, collections
//! - [`FieldBinding`] -- one scalar member, converted through [`Scalar`]
//! - [`CollectionBinding`] -- child entities, held as a `Vec` or a single member
//! - [`BindingChain`] -- the built, cached, immutable chain of a type
//!
//! # Streaming
//!
//! - [`Stream::put`] / [`Stream::remove`] -- write a graph according to entity states
//! - [`Stream::get`] / [`Stream::select`] / [`Stream::load_into`] -- read graphs back
//! - [`Stream::atomically`] -- wrap operations in a backend transaction
//!
//! # Design Rules
//!
//! 1. A chain is built once per type and never changes afterwards.
//! 2. Every row of one entity carries the same id, scoped to the root relation.
//! 3. Children are written after the parent's rows, with the parent id stamped in.
//! 4. A failed read never hands out a partially loaded value.
//! 5. The engine never rolls back on its own; use [`Stream::atomically`].

pub mod binding;
pub mod config;
pub mod error;
pub mod stream;

pub use binding::{
    BindingChain, ChainBuilder, CollectionBinding, CollectionFilter, ConvSpec, FieldBinding,
    Persist, Scalar, Shape, SingleFilter, TableDescriptor,
};
pub use config::StreamConfig;
pub use error::{BindError, ErrorKind, StreamError, StreamResult};
pub use stream::Stream;
