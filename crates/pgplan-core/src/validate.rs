//! Schema validation and type-change classification.
//!
//! Structural validation runs before diffing and is fatal; the diff and
//! codegen cores rely on it having passed and carry no defensive error
//! handling of their own. The type-change classifier runs over the diffed
//! operations and grades every `ColumnTypeChanged` by how destructive the
//! conversion is.

use std::collections::HashSet;

use crate::error::StructuralError;
use crate::ops::Operation;
use crate::schema::{ColumnType, Schema};

/// Validates the declared schema's structure.
///
/// # Errors
///
/// Returns the first [`StructuralError`] found: duplicate table or column
/// names, conflicting primary keys, dangling foreign keys, or unknown
/// column types.
pub fn validate_schema(schema: &Schema) -> Result<(), StructuralError> {
    let mut table_names: HashSet<&str> = HashSet::new();
    for table in &schema.tables {
        if !table_names.insert(&table.name) {
            return Err(StructuralError::DuplicateTable {
                table: table.name.clone(),
            });
        }
    }

    for table in &schema.tables {
        let mut column_names: HashSet<&str> = HashSet::new();
        let mut flagged_pk: Option<&str> = None;

        for col in &table.columns {
            if !column_names.insert(&col.name) {
                return Err(StructuralError::DuplicateColumn {
                    table: table.name.clone(),
                    column: col.name.clone(),
                });
            }
            if col.primary_key {
                if let Some(first) = flagged_pk {
                    return Err(StructuralError::ConflictingPrimaryKeys {
                        table: table.name.clone(),
                        first: first.to_string(),
                        second: col.name.clone(),
                    });
                }
                flagged_pk = Some(&col.name);
            }
            if !col.ty.is_known() {
                return Err(StructuralError::UnknownColumnType {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    ty: col.ty.as_str().to_string(),
                });
            }
            if let Some(ref fk) = col.foreign_key {
                let Some(target) = schema.get_table(&fk.table) else {
                    return Err(StructuralError::DanglingForeignKeyTable {
                        table: table.name.clone(),
                        column: col.name.clone(),
                        target: fk.table.clone(),
                    });
                };
                if target.get_column(&fk.column).is_none() {
                    return Err(StructuralError::DanglingForeignKeyColumn {
                        table: table.name.clone(),
                        column: col.name.clone(),
                        target_table: fk.table.clone(),
                        target_column: fk.column.clone(),
                    });
                }
            }
        }

        // Both primary key mechanisms must agree when used together.
        if let Some(ref declared) = table.primary_key {
            if table.get_column(declared).is_none() {
                return Err(StructuralError::UnknownPrimaryKeyColumn {
                    table: table.name.clone(),
                    column: declared.clone(),
                });
            }
            if let Some(flagged) = flagged_pk {
                if flagged != declared {
                    return Err(StructuralError::PrimaryKeyMismatch {
                        table: table.name.clone(),
                        declared: declared.clone(),
                        flagged: flagged.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// How destructive a column type conversion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeChangeSeverity {
    /// The new type holds every value of the old one; safe.
    Widened,
    /// The new type holds fewer values; data loss possible.
    Narrowed,
    /// The new type may cut values short; data loss possible.
    MayTruncate,
    /// Unrelated types; the conversion is not checked.
    Unchecked,
}

impl TypeChangeSeverity {
    /// Whether this change should block generation (without a force flag).
    #[must_use]
    pub fn is_destructive(self) -> bool {
        matches!(self, Self::Narrowed | Self::MayTruncate)
    }
}

/// A graded column type change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeChange {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Previous type.
    pub from: ColumnType,
    /// New type.
    pub to: ColumnType,
    /// Severity grade.
    pub severity: TypeChangeSeverity,
}

impl std::fmt::Display for TypeChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let grade = match self.severity {
            TypeChangeSeverity::Widened => "widened",
            TypeChangeSeverity::Narrowed => "narrowed",
            TypeChangeSeverity::MayTruncate => "may truncate",
            TypeChangeSeverity::Unchecked => "unchecked",
        };
        write!(
            f,
            "{}.{}: {} -> {} ({grade})",
            self.table, self.column, self.from, self.to
        )
    }
}

/// Grades every `ColumnTypeChanged` operation in the sequence.
#[must_use]
pub fn classify_type_changes(ops: &[Operation]) -> Vec<TypeChange> {
    ops.iter()
        .filter_map(|op| match op {
            Operation::ColumnTypeChanged {
                table,
                column,
                from,
                to,
            } => Some(TypeChange {
                table: table.clone(),
                column: column.clone(),
                from: from.clone(),
                to: to.clone(),
                severity: classify(from, to),
            }),
            _ => None,
        })
        .collect()
}

/// Width rank of the integer family.
fn int_rank(base: &str) -> Option<u8> {
    match base {
        "smallint" => Some(1),
        "int" => Some(2),
        "bigint" => Some(3),
        _ => None,
    }
}

fn classify(from: &ColumnType, to: &ColumnType) -> TypeChangeSeverity {
    let (from_base, to_base) = (from.base(), to.base());

    if let (Some(from_rank), Some(to_rank)) = (int_rank(from_base), int_rank(to_base)) {
        return if to_rank > from_rank {
            TypeChangeSeverity::Widened
        } else {
            TypeChangeSeverity::Narrowed
        };
    }

    match (from_base, to_base) {
        ("varchar", "text") => TypeChangeSeverity::Widened,
        ("text", "varchar") => match to.params() {
            // A length-limited target may cut values short; bare varchar
            // is unbounded and safe.
            Some(_) => TypeChangeSeverity::MayTruncate,
            None => TypeChangeSeverity::Widened,
        },
        ("varchar", "varchar") => match (varchar_len(from), varchar_len(to)) {
            (_, None) => TypeChangeSeverity::Widened,
            (None, Some(_)) => TypeChangeSeverity::MayTruncate,
            (Some(old), Some(new)) if new >= old => TypeChangeSeverity::Widened,
            _ => TypeChangeSeverity::MayTruncate,
        },
        ("numeric", "numeric") => match (numeric_params(from), numeric_params(to)) {
            (_, None) => TypeChangeSeverity::Widened,
            (None, Some(_)) => TypeChangeSeverity::MayTruncate,
            (Some((op, os)), Some((np, ns))) if np >= op && ns >= os => {
                TypeChangeSeverity::Widened
            }
            _ => TypeChangeSeverity::MayTruncate,
        },
        _ => TypeChangeSeverity::Unchecked,
    }
}

fn varchar_len(ty: &ColumnType) -> Option<u32> {
    ty.params().and_then(|p| p.first().copied())
}

fn numeric_params(ty: &ColumnType) -> Option<(u32, u32)> {
    let params = ty.params()?;
    match params.as_slice() {
        [p, s] => Some((*p, *s)),
        _ => None,
    }
}
