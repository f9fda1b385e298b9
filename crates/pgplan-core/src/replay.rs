//! Schema reconstruction from DDL operations.
//!
//! Folds an ordered [`SqlOp`] sequence into a declared-schema-shaped
//! structure, for the import workflow. Constructs that cannot be
//! represented faithfully (multi-column constraints, unclassifiable
//! constraint names) become warnings; references to tables or columns the
//! history never created are ignored, since the source SQL presumably
//! targets state we never saw.

use tracing::debug;

use crate::ddl::{ConstraintKind, SqlOp, TableConstraint};
use crate::error::ParseWarning;
use crate::schema::{Column, Schema, Table};

/// Replays an ordered operation sequence into a reconstructed schema.
#[must_use]
pub fn replay(ops: &[SqlOp]) -> (Schema, Vec<ParseWarning>) {
    let mut schema = Schema::new();
    let mut warnings = Vec::new();

    for op in ops {
        apply(&mut schema, op, &mut warnings);
    }
    debug!(
        tables = schema.tables.len(),
        warnings = warnings.len(),
        "replayed migration history"
    );
    (schema, warnings)
}

fn apply(schema: &mut Schema, op: &SqlOp, warnings: &mut Vec<ParseWarning>) {
    match op {
        SqlOp::CreateTable {
            table,
            columns,
            constraints,
        } => {
            // Re-creation replaces whatever an earlier statement built.
            schema.remove_table(table);
            let mut t = Table::new(table);
            for col in columns {
                push_column(&mut t, col.clone());
            }
            for constraint in constraints {
                apply_constraint(&mut t, constraint, op, warnings);
            }
            schema.tables.push(t);
        }

        SqlOp::AddColumn { table, column } => {
            let Some(t) = schema.get_table_mut(table) else {
                debug!(%table, "ignoring ADD COLUMN on unknown table");
                return;
            };
            // Replace by name when the history re-adds a column.
            t.columns.retain(|c| c.name != column.name);
            push_column(t, column.clone());
        }

        SqlOp::AlterColumnType { table, column, ty } => {
            if let Some(col) = column_mut(schema, table, column) {
                col.ty = ty.clone();
            }
        }

        SqlOp::SetNotNull { table, column } => {
            if let Some(col) = column_mut(schema, table, column) {
                col.nullable = false;
            }
        }

        SqlOp::DropNotNull { table, column } => {
            if let Some(col) = column_mut(schema, table, column) {
                col.nullable = true;
            }
        }

        SqlOp::SetDefault {
            table,
            column,
            expr,
        } => {
            if let Some(col) = column_mut(schema, table, column) {
                col.default = Some(expr.clone());
            }
        }

        SqlOp::DropDefault { table, column } => {
            if let Some(col) = column_mut(schema, table, column) {
                col.default = None;
            }
        }

        SqlOp::AddConstraint {
            table,
            kind,
            name,
            columns,
        } => {
            let Some(t) = schema.get_table_mut(table) else {
                debug!(%table, "ignoring ADD CONSTRAINT on unknown table");
                return;
            };
            let constraint = TableConstraint {
                kind: *kind,
                name: name.clone(),
                columns: columns.clone(),
            };
            apply_constraint(t, &constraint, op, warnings);
        }

        SqlOp::DropConstraint { table, name } => {
            let Some(t) = schema.get_table_mut(table) else {
                debug!(%table, "ignoring DROP CONSTRAINT on unknown table");
                return;
            };
            drop_constraint_by_name(t, name, op, warnings);
        }

        SqlOp::DropColumn { table, column } => {
            let Some(t) = schema.get_table_mut(table) else {
                debug!(%table, "ignoring DROP COLUMN on unknown table");
                return;
            };
            t.columns.retain(|c| c.name != *column);
            if t.primary_key.as_deref() == Some(column.as_str()) {
                t.primary_key = None;
            }
        }

        SqlOp::DropTable { table } => {
            schema.remove_table(table);
        }
    }
}

/// Appends a column, promoting it to table primary key when marked.
fn push_column(table: &mut Table, column: Column) {
    if column.primary_key {
        table.primary_key = Some(column.name.clone());
    }
    table.columns.push(column);
}

fn column_mut<'a>(schema: &'a mut Schema, table: &str, column: &str) -> Option<&'a mut Column> {
    match schema.get_table_mut(table) {
        Some(t) => match t.get_column_mut(column) {
            Some(col) => Some(col),
            None => {
                debug!(%table, %column, "ignoring alteration of unknown column");
                None
            }
        },
        None => {
            debug!(%table, "ignoring alteration on unknown table");
            None
        }
    }
}

/// Applies a single-column PRIMARY KEY or UNIQUE constraint; anything
/// wider is recorded as a warning and otherwise ignored.
fn apply_constraint(
    table: &mut Table,
    constraint: &TableConstraint,
    op: &SqlOp,
    warnings: &mut Vec<ParseWarning>,
) {
    if constraint.columns.len() != 1 {
        warnings.push(ParseWarning::new(
            op.describe(),
            format!(
                "Unsupported multi-column {} constraint on table '{}'",
                constraint.kind, table.name
            ),
        ));
        return;
    }
    let column_name = &constraint.columns[0];
    if table.get_column(column_name).is_none() {
        warnings.push(ParseWarning::new(
            op.describe(),
            format!(
                "Unsupported constraint on unknown column '{}.{column_name}'",
                table.name
            ),
        ));
        return;
    }
    let Some(col) = table.get_column_mut(column_name) else {
        return;
    };
    match constraint.kind {
        ConstraintKind::PrimaryKey => {
            col.primary_key = true;
            col.nullable = false;
            table.primary_key = Some(column_name.clone());
        }
        ConstraintKind::Unique => col.unique = true,
    }
}

/// Maps a bare constraint name back to its effect using the naming
/// convention: `*_pkey` / `pk_*` are primary-key drops, `*_key` / `uq_*`
/// are unique drops. The heuristic is lossy by construction; a unique drop
/// cannot recover which column was constrained, so every unique flag on
/// the table is cleared.
fn drop_constraint_by_name(
    table: &mut Table,
    name: &str,
    op: &SqlOp,
    warnings: &mut Vec<ParseWarning>,
) {
    if name.ends_with("_pkey") || name.starts_with("pk_") {
        table.primary_key = None;
        for col in &mut table.columns {
            col.primary_key = false;
        }
    } else if name.ends_with("_key") || name.starts_with("uq_") {
        let mut cleared = 0;
        for col in &mut table.columns {
            if col.unique {
                col.unique = false;
                cleared += 1;
            }
        }
        if cleared > 1 {
            warnings.push(ParseWarning::new(
                op.describe(),
                format!(
                    "Unsupported ambiguous unique drop: cleared {cleared} unique flags on '{}'",
                    table.name
                ),
            ));
        }
    } else {
        warnings.push(ParseWarning::new(
            op.describe(),
            format!("Unsupported constraint name '{name}': cannot classify"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::parse_sql;

    fn replay_sql(sql: &str) -> (Schema, Vec<ParseWarning>) {
        let (ops, parse_warnings) = parse_sql(sql);
        let (schema, mut warnings) = replay(&ops);
        let mut all = parse_warnings;
        all.append(&mut warnings);
        (schema, all)
    }

    #[test]
    fn create_and_extend_table() {
        let (schema, warnings) = replay_sql(
            "CREATE TABLE users (id uuid PRIMARY KEY);\n\
             ALTER TABLE users ADD COLUMN email varchar(255) UNIQUE;",
        );
        assert!(warnings.is_empty());
        let users = schema.get_table("users").unwrap();
        assert_eq!(users.columns.len(), 2);
        assert_eq!(users.resolved_primary_key(), Some("id"));
        assert!(users.get_column("email").unwrap().unique);
    }

    #[test]
    fn alter_ops_mutate_in_place() {
        let (schema, warnings) = replay_sql(
            "CREATE TABLE users (age int, email text);\n\
             ALTER TABLE users ALTER COLUMN age TYPE bigint;\n\
             ALTER TABLE users ALTER COLUMN email SET NOT NULL;\n\
             ALTER TABLE users ALTER COLUMN email SET DEFAULT 'none';\n",
        );
        assert!(warnings.is_empty());
        let users = schema.get_table("users").unwrap();
        assert_eq!(users.get_column("age").unwrap().ty.as_str(), "bigint");
        let email = users.get_column("email").unwrap();
        assert!(!email.nullable);
        assert_eq!(email.default.as_deref(), Some("'none'"));
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let (schema, warnings) = replay_sql(
            "ALTER TABLE ghosts ALTER COLUMN x TYPE bigint;\n\
             ALTER TABLE ghosts DROP COLUMN x;",
        );
        assert!(schema.tables.is_empty());
        // Conservative: no warnings either, the history may target state
        // we never saw.
        assert!(warnings.is_empty());
    }

    #[test]
    fn multi_column_constraint_warns_and_is_ignored() {
        let (schema, warnings) = replay_sql(
            "CREATE TABLE t (a int, b int, CONSTRAINT t_ab_key UNIQUE (a, b));",
        );
        let t = schema.get_table("t").unwrap();
        assert!(!t.columns.iter().any(|c| c.unique));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].reason.contains("Unsupported"));
        assert!(warnings[0].reason.contains("multi-column"));
    }

    #[test]
    fn add_constraint_promotes_primary_key() {
        let (schema, warnings) = replay_sql(
            "CREATE TABLE t (id uuid);\n\
             ALTER TABLE t ADD CONSTRAINT pk_t PRIMARY KEY (id);",
        );
        assert!(warnings.is_empty());
        let t = schema.get_table("t").unwrap();
        assert_eq!(t.resolved_primary_key(), Some("id"));
        assert!(!t.get_column("id").unwrap().nullable);
    }

    #[test]
    fn drop_constraint_pkey_heuristic() {
        let (schema, warnings) = replay_sql(
            "CREATE TABLE t (id uuid PRIMARY KEY);\n\
             ALTER TABLE t DROP CONSTRAINT t_pkey;",
        );
        assert!(warnings.is_empty());
        let t = schema.get_table("t").unwrap();
        assert_eq!(t.resolved_primary_key(), None);
    }

    #[test]
    fn drop_constraint_unique_heuristic_clears_all_flags() {
        let (schema, warnings) = replay_sql(
            "CREATE TABLE t (a text UNIQUE, b text UNIQUE);\n\
             ALTER TABLE t DROP CONSTRAINT t_a_key;",
        );
        let t = schema.get_table("t").unwrap();
        assert!(!t.get_column("a").unwrap().unique);
        assert!(!t.get_column("b").unwrap().unique);
        // Two flags cleared by a single drop is worth telling the user.
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].reason.contains("unique"));
    }

    #[test]
    fn drop_constraint_unknown_name_warns() {
        let (_, warnings) = replay_sql(
            "CREATE TABLE t (id uuid);\n\
             ALTER TABLE t DROP CONSTRAINT mystery_constraint;",
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].reason.contains("cannot classify"));
    }

    #[test]
    fn drop_column_clears_primary_key_bookkeeping() {
        let (schema, _) = replay_sql(
            "CREATE TABLE t (id uuid PRIMARY KEY, name text);\n\
             ALTER TABLE t DROP COLUMN id;",
        );
        let t = schema.get_table("t").unwrap();
        assert_eq!(t.resolved_primary_key(), None);
        assert_eq!(t.columns.len(), 1);
    }

    #[test]
    fn drop_table_removes_it() {
        let (schema, _) = replay_sql("CREATE TABLE t (id uuid);\nDROP TABLE t;");
        assert!(schema.tables.is_empty());
    }

    #[test]
    fn create_index_produces_warning_only() {
        let (schema, warnings) = replay_sql("CREATE INDEX idx ON users(email);");
        assert!(schema.tables.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].reason.contains("Unsupported"));
    }

    #[test]
    fn add_column_replaces_existing_by_name() {
        let (schema, _) = replay_sql(
            "CREATE TABLE t (a int);\n\
             ALTER TABLE t ADD COLUMN a bigint;",
        );
        let t = schema.get_table("t").unwrap();
        assert_eq!(t.columns.len(), 1);
        assert_eq!(t.get_column("a").unwrap().ty.as_str(), "bigint");
    }
}
