//! Schema diff and migration engine for declarative PostgreSQL schemas.
//!
//! `pgplan-core` turns a declarative table-schema description into
//! ordered, deterministic SQL migration statements, and can also
//! reverse-engineer that description from existing SQL migration history.
//!
//! # Architecture
//!
//! Forward direction (author workflow):
//!
//! ```text
//! schema text -> dsl -> Schema -> diff (vs PersistedState)
//!             -> Operations -> codegen -> migration SQL
//! ```
//!
//! Reverse direction (import workflow):
//!
//! ```text
//! .sql files -> splitter -> statements -> ddl -> SqlOps (+warnings)
//!            -> replay -> Schema (+warnings) -> dsl::render_schema
//! ```
//!
//! The two directions share one schema model and are deliberately split
//! into two operation vocabularies: [`ops::Operation`] is the validated
//! schema-level delta between diff and codegen, while [`ddl::SqlOp`]
//! models raw SQL intent (possibly unnamed, possibly multi-column)
//! between the DDL parser and the replayer.
//!
//! Everything in this crate is pure: no filesystem access, no database
//! connections. File handling lives in the `pgplan` binary.
//!
//! # Example
//!
//! ```rust
//! use pgplan_core::prelude::*;
//!
//! let old = PersistedState::new();
//! let new = parse_schema("table users {\n  id uuid pk\n}\n").unwrap();
//! validate_schema(&new).unwrap();
//!
//! let ops = diff(&old, &new);
//! let sql = SqlGenerator::new(Provider::Postgres, SqlConfig::default()).generate(&ops);
//! assert!(sql.contains("CREATE TABLE users"));
//! ```

pub mod codegen;
pub mod ddl;
pub mod diff;
pub mod dsl;
pub mod error;
pub mod normalize;
pub mod ops;
pub mod replay;
pub mod schema;
pub mod splitter;
pub mod state;
pub mod validate;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::codegen::{Provider, SqlConfig, SqlGenerator};
    pub use crate::ddl::{parse_sql, parse_statement, SqlOp};
    pub use crate::diff::diff;
    pub use crate::dsl::{parse_schema, render_schema};
    pub use crate::error::{DslError, ParseWarning, StructuralError};
    pub use crate::ops::Operation;
    pub use crate::replay::replay;
    pub use crate::schema::{Column, ColumnType, ForeignKey, Schema, Table};
    pub use crate::splitter::split_statements;
    pub use crate::state::{PersistedState, StateColumn, StateTable, STATE_VERSION};
    pub use crate::validate::{
        classify_type_changes, validate_schema, TypeChange, TypeChangeSeverity,
    };
}
