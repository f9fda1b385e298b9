//! SQL code generation.
//!
//! Renders an operation sequence into SQL text. The diff engine's
//! ordering is authoritative and is never re-sorted here; every operation
//! becomes one statement block, blocks are newline-separated.
//!
//! Constraint names are derived purely from table and column identifiers,
//! so the same input always yields the same name, independent of
//! generation history. Constraint drops additionally emit the legacy
//! convention name (`<table>_<column>_key`, `<table>_pkey`) behind
//! `IF EXISTS`, so migrations stay safe against databases whose
//! constraints predate the deterministic-naming scheme.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ops::Operation;
use crate::schema::{Column, Table};

/// Target SQL platform profile. Only default-value generation differs
/// between providers; the statement shapes are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// Plain PostgreSQL.
    #[default]
    Postgres,
    /// Supabase-flavoured PostgreSQL.
    Supabase,
}

impl Provider {
    /// Returns the provider's canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Supabase => "supabase",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized provider names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider '{0}', expected 'postgres' or 'supabase'")]
pub struct UnknownProvider(pub String);

impl std::str::FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "supabase" => Ok(Self::Supabase),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Optional SQL generation defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SqlConfig {
    /// Implicit default expressions keyed by normalized column type,
    /// applied to newly created columns that declare none
    /// (e.g. `"timestamptz" -> "now()"`).
    pub column_defaults: BTreeMap<String, String>,
}

/// Renders operations into provider-specific SQL.
#[derive(Debug, Clone, Default)]
pub struct SqlGenerator {
    provider: Provider,
    config: SqlConfig,
}

impl SqlGenerator {
    /// Creates a generator for the given provider and defaults config.
    #[must_use]
    pub fn new(provider: Provider, config: SqlConfig) -> Self {
        Self { provider, config }
    }

    /// Renders the full operation sequence, one statement block per
    /// operation, in input order.
    #[must_use]
    pub fn generate(&self, ops: &[Operation]) -> String {
        let blocks: Vec<String> = ops.iter().map(|op| self.render(op)).collect();
        let mut sql = blocks.join("\n\n");
        if !sql.is_empty() {
            sql.push('\n');
        }
        sql
    }

    fn render(&self, op: &Operation) -> String {
        match op {
            Operation::CreateTable { table } => self.create_table(table),

            Operation::DropTable { name } => format!("DROP TABLE {name};"),

            // The primary key is never rendered inline here: the diff
            // engine emits a separate add-primary-key operation after the
            // column exists.
            Operation::AddColumn { table, column } => format!(
                "ALTER TABLE {table} ADD COLUMN {};",
                self.column_definition(column, false)
            ),

            Operation::DropColumn { table, column } => {
                format!("ALTER TABLE {table} DROP COLUMN {column};")
            }

            Operation::ColumnTypeChanged {
                table, column, to, ..
            } => format!(
                "ALTER TABLE {table} ALTER COLUMN {column} TYPE {to} USING {column}::{to};"
            ),

            Operation::ColumnNullabilityChanged {
                table, column, to, ..
            } => {
                if *to {
                    format!("ALTER TABLE {table} ALTER COLUMN {column} DROP NOT NULL;")
                } else {
                    format!("ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL;")
                }
            }

            Operation::ColumnDefaultChanged {
                table, column, to, ..
            } => match to {
                Some(expr) => {
                    format!("ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {expr};")
                }
                None => format!("ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT;"),
            },

            Operation::ColumnUniqueChanged {
                table, column, to, ..
            } => {
                if *to {
                    format!(
                        "ALTER TABLE {table} ADD CONSTRAINT {} UNIQUE ({column});",
                        unique_constraint_name(table, column)
                    )
                } else {
                    // Drop both the deterministic name and the legacy
                    // convention name; only one of them can exist.
                    format!(
                        "ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {};\n\
                         ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {};",
                        unique_constraint_name(table, column),
                        legacy_unique_name(table, column)
                    )
                }
            }

            Operation::AddPrimaryKeyConstraint { table, column } => format!(
                "ALTER TABLE {table} ADD CONSTRAINT {} PRIMARY KEY ({column});",
                primary_key_name(table)
            ),

            Operation::DropPrimaryKeyConstraint { table } => format!(
                "ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {};\n\
                 ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {};",
                primary_key_name(table),
                legacy_primary_key_name(table)
            ),
        }
    }

    fn create_table(&self, table: &Table) -> String {
        let resolved_pk = table.resolved_primary_key().map(str::to_string);
        let defs: Vec<String> = table
            .columns
            .iter()
            .map(|col| {
                let is_primary = resolved_pk.as_deref() == Some(col.name.as_str());
                self.column_definition(col, is_primary)
            })
            .collect();
        format!("CREATE TABLE {} (\n  {}\n);", table.name, defs.join(",\n  "))
    }

    /// Renders one column definition:
    /// `name type [references t(c)] [primary key] [unique] [not null]
    /// [default expr]`.
    fn column_definition(&self, column: &Column, is_primary: bool) -> String {
        let mut sql = format!("{} {}", column.name, column.ty);

        if let Some(ref fk) = column.foreign_key {
            sql.push_str(&format!(" references {}({})", fk.table, fk.column));
        }
        if is_primary {
            sql.push_str(" primary key");
        }
        if column.unique {
            sql.push_str(" unique");
        }
        if !column.nullable && !is_primary {
            sql.push_str(" not null");
        }
        if let Some(default) = self.effective_default(column, is_primary) {
            sql.push_str(&format!(" default {default}"));
        }
        sql
    }

    /// The default expression actually rendered: the declared one, else a
    /// configured per-type default, else the provider's implicit default
    /// (`gen_random_uuid()` for uuid primary keys on supabase).
    fn effective_default(&self, column: &Column, is_primary: bool) -> Option<String> {
        if let Some(ref default) = column.default {
            return Some(default.clone());
        }
        if let Some(configured) = self.config.column_defaults.get(column.ty.as_str()) {
            return Some(configured.clone());
        }
        if self.provider == Provider::Supabase && is_primary && column.ty.base() == "uuid" {
            return Some("gen_random_uuid()".to_string());
        }
        None
    }
}

/// Normalizes an identifier to `[a-z0-9]+` runs joined by single
/// underscores, for deterministic constraint naming.
fn constraint_ident(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Deterministic unique constraint name: `uq_<table>_<column>`.
#[must_use]
pub fn unique_constraint_name(table: &str, column: &str) -> String {
    format!("uq_{}_{}", constraint_ident(table), constraint_ident(column))
}

/// Legacy convention unique name: `<table>_<column>_key`.
#[must_use]
pub fn legacy_unique_name(table: &str, column: &str) -> String {
    format!("{}_{}_key", constraint_ident(table), constraint_ident(column))
}

/// Deterministic primary key name: `pk_<table>`.
#[must_use]
pub fn primary_key_name(table: &str) -> String {
    format!("pk_{}", constraint_ident(table))
}

/// Legacy convention primary key name: `<table>_pkey`.
#[must_use]
pub fn legacy_primary_key_name(table: &str) -> String {
    format!("{}_pkey", constraint_ident(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn generator(provider: Provider) -> SqlGenerator {
        SqlGenerator::new(provider, SqlConfig::default())
    }

    #[test]
    fn add_column_matches_expected_shape() {
        let op = Operation::AddColumn {
            table: "users".to_string(),
            column: Column::new("email", "varchar").unique(),
        };
        let sql = generator(Provider::Postgres).generate(&[op]);
        assert_eq!(sql, "ALTER TABLE users ADD COLUMN email varchar unique;\n");
    }

    #[test]
    fn create_table_renders_columns_in_order() {
        let table = Table::new("users")
            .column(Column::new("id", "uuid").primary_key())
            .column(Column::new("email", "varchar(255)").unique().not_null())
            .column(Column::new("org_id", "uuid").references("orgs", "id"));
        let sql = generator(Provider::Postgres).generate(&[Operation::CreateTable { table }]);

        assert!(sql.starts_with("CREATE TABLE users (\n"));
        assert!(sql.contains("  id uuid primary key,\n"));
        assert!(sql.contains("  email varchar(255) unique not null,\n"));
        assert!(sql.contains("  org_id uuid references orgs(id)\n"));
        assert!(sql.ends_with(");\n"));
    }

    #[test]
    fn supabase_uuid_primary_key_gets_implicit_default() {
        let table = Table::new("users").column(Column::new("id", "uuid").primary_key());
        let op = Operation::CreateTable { table };

        let supabase = generator(Provider::Supabase).generate(&[op.clone()]);
        assert!(supabase.contains("id uuid primary key default gen_random_uuid()"));

        let postgres = generator(Provider::Postgres).generate(&[op]);
        assert!(!postgres.contains("gen_random_uuid"));
    }

    #[test]
    fn explicit_default_wins_over_implicit() {
        let table = Table::new("users")
            .column(Column::new("id", "uuid").primary_key().default("uuid_generate_v4()"));
        let sql = generator(Provider::Supabase).generate(&[Operation::CreateTable { table }]);
        assert!(sql.contains("default uuid_generate_v4()"));
        assert!(!sql.contains("gen_random_uuid"));
    }

    #[test]
    fn configured_type_default_applies() {
        let mut config = SqlConfig::default();
        config
            .column_defaults
            .insert("timestamptz".to_string(), "now()".to_string());
        let gen = SqlGenerator::new(Provider::Postgres, config);

        let op = Operation::AddColumn {
            table: "events".to_string(),
            column: Column::new("at", "timestamptz").not_null(),
        };
        let sql = gen.generate(&[op]);
        assert_eq!(
            sql,
            "ALTER TABLE events ADD COLUMN at timestamptz not null default now();\n"
        );
    }

    #[test]
    fn type_change_uses_cast() {
        let op = Operation::ColumnTypeChanged {
            table: "users".to_string(),
            column: "age".to_string(),
            from: ColumnType::new("int"),
            to: ColumnType::new("bigint"),
        };
        let sql = generator(Provider::Postgres).generate(&[op]);
        assert_eq!(
            sql,
            "ALTER TABLE users ALTER COLUMN age TYPE bigint USING age::bigint;\n"
        );
    }

    #[test]
    fn nullability_changes() {
        let set = Operation::ColumnNullabilityChanged {
            table: "t".to_string(),
            column: "c".to_string(),
            from: true,
            to: false,
        };
        let drop = Operation::ColumnNullabilityChanged {
            table: "t".to_string(),
            column: "c".to_string(),
            from: false,
            to: true,
        };
        let sql = generator(Provider::Postgres).generate(&[set, drop]);
        assert!(sql.contains("ALTER TABLE t ALTER COLUMN c SET NOT NULL;"));
        assert!(sql.contains("ALTER TABLE t ALTER COLUMN c DROP NOT NULL;"));
    }

    #[test]
    fn default_changes() {
        let set = Operation::ColumnDefaultChanged {
            table: "t".to_string(),
            column: "c".to_string(),
            from: None,
            to: Some("now()".to_string()),
        };
        let drop = Operation::ColumnDefaultChanged {
            table: "t".to_string(),
            column: "c".to_string(),
            from: Some("now()".to_string()),
            to: None,
        };
        let sql = generator(Provider::Postgres).generate(&[set, drop]);
        assert!(sql.contains("SET DEFAULT now();"));
        assert!(sql.contains("DROP DEFAULT;"));
    }

    #[test]
    fn unique_removal_emits_both_names() {
        // Scenario: unique removed from a table previously migrated under
        // the legacy naming convention.
        let op = Operation::ColumnUniqueChanged {
            table: "users".to_string(),
            column: "email".to_string(),
            from: true,
            to: false,
        };
        let sql = generator(Provider::Postgres).generate(&[op]);
        assert!(sql.contains("DROP CONSTRAINT IF EXISTS uq_users_email;"));
        assert!(sql.contains("DROP CONSTRAINT IF EXISTS users_email_key;"));
    }

    #[test]
    fn unique_addition_uses_deterministic_name() {
        let op = Operation::ColumnUniqueChanged {
            table: "users".to_string(),
            column: "email".to_string(),
            from: false,
            to: true,
        };
        let sql = generator(Provider::Postgres).generate(&[op]);
        assert_eq!(
            sql,
            "ALTER TABLE users ADD CONSTRAINT uq_users_email UNIQUE (email);\n"
        );
    }

    #[test]
    fn primary_key_constraint_statements() {
        let add = Operation::AddPrimaryKeyConstraint {
            table: "users".to_string(),
            column: "uid".to_string(),
        };
        let drop = Operation::DropPrimaryKeyConstraint {
            table: "users".to_string(),
        };
        let sql = generator(Provider::Postgres).generate(&[drop, add]);
        assert!(sql.contains("DROP CONSTRAINT IF EXISTS pk_users;"));
        assert!(sql.contains("DROP CONSTRAINT IF EXISTS users_pkey;"));
        assert!(sql.contains("ADD CONSTRAINT pk_users PRIMARY KEY (uid);"));
    }

    #[test]
    fn constraint_names_are_sanitized() {
        assert_eq!(unique_constraint_name("User Table", "E-Mail"), "uq_user_table_e_mail");
        assert_eq!(primary_key_name("users"), "pk_users");
        assert_eq!(legacy_primary_key_name("users"), "users_pkey");
    }

    #[test]
    fn empty_operation_list_renders_nothing() {
        assert_eq!(generator(Provider::Postgres).generate(&[]), "");
    }

    #[test]
    fn provider_parsing() {
        assert_eq!("postgres".parse::<Provider>().unwrap(), Provider::Postgres);
        assert_eq!("Supabase".parse::<Provider>().unwrap(), Provider::Supabase);
        assert!("mysql".parse::<Provider>().is_err());
    }
}
