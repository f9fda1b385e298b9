//! Error and warning types for the schema engine.

/// Structural problems in a declared schema.
///
/// These are fatal: a schema that fails structural validation is never
/// diffed. Every variant carries enough context to locate the offending
/// table or column.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// Two tables share the same name.
    #[error("duplicate table '{table}'")]
    DuplicateTable {
        /// The duplicated table name.
        table: String,
    },

    /// Two columns in the same table share the same name.
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn {
        /// Table containing the duplicate.
        table: String,
        /// The duplicated column name.
        column: String,
    },

    /// More than one column in a table is flagged as the primary key.
    #[error("table '{table}' has conflicting primary keys '{first}' and '{second}'")]
    ConflictingPrimaryKeys {
        /// Table with the conflict.
        table: String,
        /// First flagged column.
        first: String,
        /// Second flagged column.
        second: String,
    },

    /// The table-level primary key field and a flagged column disagree.
    #[error(
        "table '{table}' declares primary key '{declared}' but column '{flagged}' is marked pk"
    )]
    PrimaryKeyMismatch {
        /// Table with the mismatch.
        table: String,
        /// Column named by the table-level field.
        declared: String,
        /// Column carrying the pk flag.
        flagged: String,
    },

    /// The table-level primary key field names a column that does not exist.
    #[error("table '{table}' declares primary key on unknown column '{column}'")]
    UnknownPrimaryKeyColumn {
        /// Table with the bad reference.
        table: String,
        /// The missing column name.
        column: String,
    },

    /// A foreign key references a table that does not exist.
    #[error("foreign key on '{table}.{column}' references unknown table '{target}'")]
    DanglingForeignKeyTable {
        /// Table containing the foreign key.
        table: String,
        /// Column carrying the foreign key.
        column: String,
        /// The missing target table.
        target: String,
    },

    /// A foreign key references a column that does not exist on its target.
    #[error(
        "foreign key on '{table}.{column}' references unknown column '{target_table}.{target_column}'"
    )]
    DanglingForeignKeyColumn {
        /// Table containing the foreign key.
        table: String,
        /// Column carrying the foreign key.
        column: String,
        /// Target table (exists).
        target_table: String,
        /// The missing target column.
        target_column: String,
    },

    /// A column uses a type outside the supported set.
    #[error("column '{table}.{column}' has unknown type '{ty}'")]
    UnknownColumnType {
        /// Table containing the column.
        table: String,
        /// The offending column.
        column: String,
        /// The unrecognized type string.
        ty: String,
    },
}

/// A syntax error in the declarative schema text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct DslError {
    /// 1-based line number of the offending line.
    pub line: usize,
    /// Human-readable description of the problem.
    pub message: String,
}

impl DslError {
    /// Creates a new syntax error for the given 1-based line.
    #[must_use]
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A non-fatal problem encountered while interpreting SQL.
///
/// One statement that cannot be parsed, or one constraint the replayer
/// cannot represent, becomes a warning; it never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// The statement (or a rendered description of the operation) that
    /// triggered the warning.
    pub statement: String,
    /// Why it could not be interpreted.
    pub reason: String,
}

impl ParseWarning {
    /// Creates a new warning.
    #[must_use]
    pub fn new(statement: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_error_messages_carry_context() {
        let err = StructuralError::UnknownColumnType {
            table: "users".to_string(),
            column: "age".to_string(),
            ty: "intger".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("users"));
        assert!(msg.contains("age"));
        assert!(msg.contains("intger"));
    }

    #[test]
    fn dsl_error_reports_line() {
        let err = DslError::new(7, "expected column type");
        assert_eq!(err.to_string(), "line 7: expected column type");
    }

    #[test]
    fn warning_display() {
        let w = ParseWarning::new("CREATE INDEX idx ON users(email)", "Unsupported statement");
        assert!(w.to_string().starts_with("Unsupported statement"));
    }
}
