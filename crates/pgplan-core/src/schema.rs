//! Declared schema value types.
//!
//! These types describe the desired shape of the database as declared in
//! the schema source. They carry no behavior beyond construction helpers
//! and lookups; the diff engine, replayer and code generator all consume
//! them.

use serde::{Deserialize, Serialize};

use crate::normalize;

/// Base column types understood by the tool, in their normalized form.
///
/// `varchar` and `numeric` may additionally carry parameters
/// (`varchar(255)`, `numeric(10,2)`).
pub const KNOWN_BASE_TYPES: &[&str] = &[
    "uuid",
    "text",
    "varchar",
    "int",
    "bigint",
    "smallint",
    "boolean",
    "timestamp",
    "timestamptz",
    "date",
    "time",
    "numeric",
    "real",
    "jsonb",
    "bytea",
];

/// A column type, stored as a normalized lowercase string with no internal
/// whitespace (e.g. `"varchar(255)"`). The string form is the equality key
/// used everywhere in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType(String);

impl ColumnType {
    /// Creates a column type from raw SQL text, normalizing it.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(normalize::type_name(raw))
    }

    /// Returns the normalized string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the base type name, without parameters
    /// (`"varchar(255)"` → `"varchar"`).
    #[must_use]
    pub fn base(&self) -> &str {
        match self.0.find('(') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Returns the parenthesized parameters as integers, if present and
    /// well-formed (`"numeric(10,2)"` → `[10, 2]`).
    #[must_use]
    pub fn params(&self) -> Option<Vec<u32>> {
        let open = self.0.find('(')?;
        let inner = self.0.get(open + 1..self.0.len().checked_sub(1)?)?;
        if !self.0.ends_with(')') {
            return None;
        }
        inner
            .split(',')
            .map(|p| p.parse::<u32>().ok())
            .collect::<Option<Vec<u32>>>()
    }

    /// Returns `true` if this type belongs to the supported set.
    #[must_use]
    pub fn is_known(&self) -> bool {
        if !KNOWN_BASE_TYPES.contains(&self.base()) {
            return false;
        }
        if self.0.contains('(') {
            // Only varchar and numeric take parameters.
            let params = match self.params() {
                Some(p) => p,
                None => return false,
            };
            match self.base() {
                "varchar" => params.len() == 1,
                "numeric" => params.len() == 2,
                _ => false,
            }
        } else {
            true
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnType {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// A single-column foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
}

impl ForeignKey {
    /// Creates a foreign key reference, normalizing both identifiers.
    #[must_use]
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: normalize::ident(table),
            column: normalize::ident(column),
        }
    }
}

/// A declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name (normalized).
    pub name: String,
    /// Column type.
    pub ty: ColumnType,
    /// Whether this column is the table's primary key.
    pub primary_key: bool,
    /// Whether this column carries a UNIQUE constraint.
    pub unique: bool,
    /// Whether the column accepts NULL. Defaults to `true` unless
    /// explicitly declared otherwise.
    pub nullable: bool,
    /// Normalized default expression, if any.
    pub default: Option<String>,
    /// Single-column foreign key, if any.
    pub foreign_key: Option<ForeignKey>,
}

impl Column {
    /// Creates a new nullable column with no constraints.
    #[must_use]
    pub fn new(name: &str, ty: impl Into<ColumnType>) -> Self {
        Self {
            name: normalize::ident(name),
            ty: ty.into(),
            primary_key: false,
            unique: false,
            nullable: true,
            default: None,
            foreign_key: None,
        }
    }

    /// Marks the column as the primary key. Primary keys are non-nullable.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default expression, normalizing it.
    #[must_use]
    pub fn default(mut self, expr: &str) -> Self {
        self.default = Some(normalize::default_expr(expr));
        self
    }

    /// Sets a single-column foreign key.
    #[must_use]
    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.foreign_key = Some(ForeignKey::new(table, column));
        self
    }
}

/// A declared table. Column order is semantically meaningful: it controls
/// the generated column order in `CREATE TABLE` and the order of
/// `ADD COLUMN` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name (normalized).
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Optional table-level primary key column name. When absent, a column
    /// flagged `primary_key` resolves the primary key instead.
    pub primary_key: Option<String>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize::ident(name),
            columns: Vec::new(),
            primary_key: None,
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the table-level primary key column.
    #[must_use]
    pub fn with_primary_key(mut self, column: &str) -> Self {
        self.primary_key = Some(normalize::ident(column));
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column by name, mutably.
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Resolves the effective primary key column: the explicit table-level
    /// field wins, otherwise the first column flagged `primary_key`.
    #[must_use]
    pub fn resolved_primary_key(&self) -> Option<&str> {
        if let Some(ref pk) = self.primary_key {
            return Some(pk.as_str());
        }
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name.as_str())
    }
}

/// The complete declared schema. Tables are kept in declaration order, but
/// table order carries no meaning; the diff engine only ever iterates a
/// sorted view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// All declared tables.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Looks up a table by name, mutably.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Removes a table by name, returning it if present.
    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        let idx = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(idx))
    }

    /// Returns the tables sorted lexicographically by name. Used wherever
    /// deterministic table iteration is required.
    #[must_use]
    pub fn sorted_tables(&self) -> Vec<&Table> {
        let mut tables: Vec<&Table> = self.tables.iter().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }
}
