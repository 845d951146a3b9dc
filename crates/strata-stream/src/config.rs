use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};

/// Configuration for a [`Stream`](crate::Stream).
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes:
///
/// ```toml
/// foreign_key = "owner_id"
/// strict_single = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Column linking child rows to their parent when a collection binding
    /// names none.
    pub foreign_key: String,
    /// Column holding the collection id of child rows.
    pub collection_id_column: String,
    /// Deleting a parent also deletes its stored children.
    pub cascade_deletes: bool,
    /// A single-child collection with no stored child is an error. When
    /// `false` the child is left at its default value, marked removed so a
    /// later write skips it.
    pub strict_single: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            foreign_key: "parent_id".into(),
            collection_id_column: "collection_id".into(),
            cascade_deletes: true,
            strict_single: true,
        }
    }
}

impl StreamConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> StreamResult<Self> {
        toml::from_str(s).map_err(|e| StreamError::Config(e.to_string()))
    }
}
