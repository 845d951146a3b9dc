//! The binding model: how a type's members map onto relations and fields.
//!
//! A type implementing [`Persist`] describes its chain once. Each table of
//! the chain binds scalar members through [`FieldBinding`]s and child
//! entities through [`CollectionBinding`]s. Chains are built lazily and
//! cached process-wide.

pub mod chain;
pub mod collection;
pub mod field;
pub mod filter;
pub mod registry;
pub mod scalar;
pub mod table;

pub use chain::{BindingChain, ChainBuilder, Persist};
pub use collection::CollectionBinding;
pub use field::FieldBinding;
pub use filter::{CollectionFilter, Shape, SingleFilter};
pub use scalar::{ConvSpec, Scalar, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT};
pub use table::TableDescriptor;
