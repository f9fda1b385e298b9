//! Persisted schema state.
//!
//! The snapshot of the last schema the tool believes has been applied to a
//! real database. It is produced by re-deriving from a declared schema
//! after a successful generation (or by the replayer during import) and
//! replaced wholesale; it is never hand-edited or partially mutated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnType, ForeignKey, Schema};

/// Current on-disk format version.
pub const STATE_VERSION: u32 = 1;

fn is_false(b: &bool) -> bool {
    !*b
}

/// A column as recorded in the persisted snapshot.
///
/// Mirrors [`crate::schema::Column`] but normalizes nullability: an absent
/// flag means nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateColumn {
    /// Column type.
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// Whether this column is the primary key.
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    /// Whether this column carries a UNIQUE constraint.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Nullability flag; `None` means nullable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Normalized default expression, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Single-column foreign key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
}

impl StateColumn {
    /// Effective nullability: absent means nullable.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(true)
    }
}

/// A table as recorded in the persisted snapshot. Columns are keyed by
/// name; the sorted key order is the snapshot's canonical column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTable {
    /// Columns keyed by name.
    #[serde(default)]
    pub columns: BTreeMap<String, StateColumn>,
    /// Optional table-level primary key column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

impl StateTable {
    /// Resolves the effective primary key column: the explicit field wins,
    /// otherwise the first flagged column in key order.
    #[must_use]
    pub fn resolved_primary_key(&self) -> Option<&str> {
        if let Some(ref pk) = self.primary_key {
            return Some(pk.as_str());
        }
        self.columns
            .iter()
            .find(|(_, c)| c.primary_key)
            .map(|(name, _)| name.as_str())
    }
}

/// The persisted snapshot of the whole schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Format version.
    pub version: u32,
    /// Tables keyed by name.
    #[serde(default)]
    pub tables: BTreeMap<String, StateTable>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistedState {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            tables: BTreeMap::new(),
        }
    }

    /// Re-derives a snapshot from a declared schema. This is the only way
    /// a snapshot is produced on the forward path; it replaces the old one
    /// wholesale after a successful generation.
    #[must_use]
    pub fn from_schema(schema: &Schema) -> Self {
        let mut tables = BTreeMap::new();
        for table in &schema.tables {
            let mut columns = BTreeMap::new();
            for col in &table.columns {
                let nullable = if col.nullable { None } else { Some(false) };
                columns.insert(
                    col.name.clone(),
                    StateColumn {
                        ty: col.ty.clone(),
                        primary_key: col.primary_key,
                        unique: col.unique,
                        nullable,
                        default: col.default.clone(),
                        foreign_key: col.foreign_key.clone(),
                    },
                );
            }
            tables.insert(
                table.name.clone(),
                StateTable {
                    columns,
                    primary_key: table.primary_key.clone(),
                },
            );
        }
        Self {
            version: STATE_VERSION,
            tables,
        }
    }

    /// Serializes the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a snapshot from JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
