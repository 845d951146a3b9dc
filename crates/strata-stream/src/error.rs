//! Error types for binding registration and stream operations.

use strata_store::StoreError;
use strata_types::{EntityId, TypeError};

/// Errors raised while building a binding chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// The type graph reachable through collection bindings loops back.
    #[error("cyclic binding graph: {path}")]
    Cycle { path: String },

    /// Two collections of one child type cannot be told apart in storage.
    #[error(
        "collections {first:?} and {second:?} of {entity} share child relation {relation:?}; \
         give them distinct collection ids"
    )]
    AmbiguousCollection {
        entity: &'static str,
        relation: String,
        first: &'static str,
        second: &'static str,
    },

    /// A type described no tables at all.
    #[error("{entity} describes no tables")]
    EmptyChain { entity: &'static str },

    /// The registry held a chain of the wrong type.
    #[error("registry entry for {entity} has the wrong type")]
    Registry { entity: &'static str },
}

/// Broad class of a [`StreamError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Stored data or bindings do not have the expected shape.
    Data,
    /// An operation was invoked in the wrong sequence or state.
    Misuse,
    /// A stored value could not be converted into a field.
    Conversion,
    /// The backend failed.
    Backend,
}

/// Errors from stream operations. Every error aborts the enclosing call.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// No table in the chain carries a relation name.
    #[error("no relation name anywhere in the binding chain of {entity}")]
    UnnamedRelation { entity: &'static str },

    /// One relation row of a multi-table entity is missing.
    #[error("row {id} missing from relation {relation:?}")]
    MissingRow { relation: String, id: EntityId },

    /// A single-child collection found no stored child.
    #[error("required child of {parent} missing from relation {relation:?}")]
    MissingChild { relation: String, parent: EntityId },

    /// The backend stored a row under a different id than the one handed in.
    #[error("relation {relation:?} stored row under {stored}, expected {expected}")]
    IdMismatch {
        relation: String,
        expected: EntityId,
        stored: EntityId,
    },

    /// Binding chain construction failed.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// The stream was used wrongly.
    #[error("invalid use: {0}")]
    Misuse(String),

    /// The backend rejected the operation as unsupported or not allowed.
    #[error("backend refused operation: {0}")]
    Refused(#[source] StoreError),

    /// A stored value could not be converted into its field.
    #[error("cannot convert field {field:?} of relation {relation:?}: {source}")]
    Conversion {
        relation: String,
        field: String,
        #[source]
        source: TypeError,
    },

    /// The backend failed.
    #[error("backend error: {0}")]
    Backend(#[source] StoreError),

    /// The stream configuration could not be parsed.
    #[error("invalid stream config: {0}")]
    Config(String),
}

impl StreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnnamedRelation { .. }
            | Self::MissingRow { .. }
            | Self::MissingChild { .. }
            | Self::IdMismatch { .. }
            | Self::Bind(_) => ErrorKind::Data,
            Self::Misuse(_) | Self::Refused(_) | Self::Config(_) => ErrorKind::Misuse,
            Self::Conversion { .. } => ErrorKind::Conversion,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }
}

impl From<StoreError> for StreamError {
    fn from(err: StoreError) -> Self {
        if err.is_misuse() {
            Self::Refused(err)
        } else {
            Self::Backend(err)
        }
    }
}

/// Convenience alias for stream results.
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_classified() {
        let refused: StreamError = StoreError::ReadOnly.into();
        assert_eq!(refused.kind(), ErrorKind::Misuse);

        let failed: StreamError = StoreError::Serialization("bad".into()).into();
        assert_eq!(failed.kind(), ErrorKind::Backend);
    }

    #[test]
    fn conversion_message_names_field_and_relation() {
        let err = StreamError::Conversion {
            relation: "person".into(),
            field: "age".into(),
            source: TypeError::NullNotAllowed {
                expected: strata_types::StoreType::Integer,
            },
        };
        assert_eq!(err.kind(), ErrorKind::Conversion);
        let msg = err.to_string();
        assert!(msg.contains("\"age\""));
        assert!(msg.contains("\"person\""));
    }

    #[test]
    fn bind_errors_are_data_errors() {
        let err = StreamError::from(BindError::EmptyChain { entity: "X" });
        assert_eq!(err.kind(), ErrorKind::Data);
    }
}
