//! Migration operations.
//!
//! The closed vocabulary of validated, schema-level structural deltas.
//! An ordered sequence of these is the sole contract between the diff
//! engine and the SQL code generator; both sides match exhaustively so a
//! new kind is a compile-time-checked change.

use crate::schema::{Column, ColumnType, Table};

/// A single schema-level structural delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a new table with all of its columns.
    CreateTable {
        /// The full declared table.
        table: Table,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        name: String,
    },

    /// Add a column to an existing table.
    AddColumn {
        /// Table name.
        table: String,
        /// The column to add.
        column: Column,
    },

    /// Drop a column from an existing table.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column's type changed.
    ColumnTypeChanged {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Previous type.
        from: ColumnType,
        /// New type.
        to: ColumnType,
    },

    /// A column's nullability changed.
    ColumnNullabilityChanged {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Previous nullability.
        from: bool,
        /// New nullability.
        to: bool,
    },

    /// A column's default expression was added, removed or modified.
    ColumnDefaultChanged {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Previous default, if any.
        from: Option<String>,
        /// New default, if any.
        to: Option<String>,
    },

    /// A column's UNIQUE constraint was added or removed.
    ColumnUniqueChanged {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Previous unique flag.
        from: bool,
        /// New unique flag.
        to: bool,
    },

    /// Add a primary-key constraint on a single column.
    AddPrimaryKeyConstraint {
        /// Table name.
        table: String,
        /// The primary key column.
        column: String,
    },

    /// Drop a table's primary-key constraint.
    DropPrimaryKeyConstraint {
        /// Table name.
        table: String,
    },
}

impl Operation {
    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("Create table '{}'", table.name),
            Self::DropTable { name } => format!("Drop table '{name}'"),
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{table}'", column.name)
            }
            Self::DropColumn { table, column } => {
                format!("Drop column '{column}' from table '{table}'")
            }
            Self::ColumnTypeChanged {
                table,
                column,
                from,
                to,
            } => format!("Change type of '{table}.{column}' from {from} to {to}"),
            Self::ColumnNullabilityChanged {
                table, column, to, ..
            } => {
                if *to {
                    format!("Allow NULL on '{table}.{column}'")
                } else {
                    format!("Forbid NULL on '{table}.{column}'")
                }
            }
            Self::ColumnDefaultChanged {
                table, column, to, ..
            } => match to {
                Some(expr) => format!("Set default of '{table}.{column}' to {expr}"),
                None => format!("Drop default of '{table}.{column}'"),
            },
            Self::ColumnUniqueChanged {
                table, column, to, ..
            } => {
                if *to {
                    format!("Add unique constraint on '{table}.{column}'")
                } else {
                    format!("Drop unique constraint on '{table}.{column}'")
                }
            }
            Self::AddPrimaryKeyConstraint { table, column } => {
                format!("Add primary key on '{table}.{column}'")
            }
            Self::DropPrimaryKeyConstraint { table } => {
                format!("Drop primary key of table '{table}'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_name_the_target() {
        let op = Operation::ColumnTypeChanged {
            table: "users".to_string(),
            column: "age".to_string(),
            from: ColumnType::new("int"),
            to: ColumnType::new("bigint"),
        };
        assert_eq!(
            op.description(),
            "Change type of 'users.age' from int to bigint"
        );

        let op = Operation::DropPrimaryKeyConstraint {
            table: "users".to_string(),
        };
        assert_eq!(op.description(), "Drop primary key of table 'users'");
    }
}
