use strata_types::EntityId;

/// Errors from storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend does not offer this capability.
    #[error("operation not supported by this backend: {op}")]
    Unsupported { op: &'static str },

    /// Storage backend is read-only.
    #[error("store is read-only")]
    ReadOnly,

    /// Commit or rollback without an open transaction.
    #[error("no transaction in progress")]
    NoTransaction,

    /// Begin while a transaction is already open.
    #[error("a transaction is already in progress")]
    TransactionActive,

    /// Insert of a row whose id is already present in the relation.
    #[error("duplicate row {id} in relation {relation:?}")]
    DuplicateRow { relation: String, id: EntityId },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` if the error means the caller used the backend
    /// wrongly rather than the backend failing.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::Unsupported { .. }
                | Self::ReadOnly
                | Self::NoTransaction
                | Self::TransactionActive
        )
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
