//! Schema diff engine.
//!
//! Compares the persisted snapshot against a newly declared schema and
//! emits the ordered operations needed to migrate. The engine runs in
//! fixed, named phases; the phase order itself encodes the safety
//! invariant that generated SQL never references a column or constraint
//! that does not yet exist, and never drops something still referenced.
//!
//! Determinism contract: for the same `(old, new)` pair the emitted
//! sequence is byte-identical across invocations and across any
//! reordering of the inputs' internal map representations. Tables are
//! therefore only ever iterated over sorted views; columns follow the new
//! schema's declared order (which is semantic), except for drops, which
//! follow the snapshot's key order.

use tracing::debug;

use crate::ops::Operation;
use crate::schema::Schema;
use crate::state::PersistedState;

/// Compares `old` (persisted snapshot) and `new` (declared schema) and
/// returns the operations transforming one into the other.
///
/// Total over well-formed inputs; validation happens before diffing.
#[must_use]
pub fn diff(old: &PersistedState, new: &Schema) -> Vec<Operation> {
    let mut ops = Vec::new();
    let new_sorted = new.sorted_tables();

    // Phase 1: create tables present only in the new schema.
    for table in &new_sorted {
        if !old.tables.contains_key(&table.name) {
            ops.push(Operation::CreateTable {
                table: (*table).clone(),
            });
        }
    }

    // Phase 2: per-column type, nullability and default changes for
    // columns present on both sides, in the new table's declared order.
    for table in &new_sorted {
        let Some(old_table) = old.tables.get(&table.name) else {
            continue;
        };
        for col in &table.columns {
            let Some(old_col) = old_table.columns.get(&col.name) else {
                continue;
            };
            if old_col.ty != col.ty {
                ops.push(Operation::ColumnTypeChanged {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    from: old_col.ty.clone(),
                    to: col.ty.clone(),
                });
            }
            if old_col.is_nullable() != col.nullable {
                ops.push(Operation::ColumnNullabilityChanged {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    from: old_col.is_nullable(),
                    to: col.nullable,
                });
            }
            if old_col.default != col.default {
                ops.push(Operation::ColumnDefaultChanged {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    from: old_col.default.clone(),
                    to: col.default.clone(),
                });
            }
        }
    }

    // Phase 3: drop the primary-key constraint wherever the resolved
    // primary key column changed or was removed.
    for table in &new_sorted {
        let Some(old_table) = old.tables.get(&table.name) else {
            continue;
        };
        let old_pk = old_table.resolved_primary_key();
        let new_pk = table.resolved_primary_key();
        if old_pk.is_some() && old_pk != new_pk {
            ops.push(Operation::DropPrimaryKeyConstraint {
                table: table.name.clone(),
            });
        }
    }

    // Phase 4: unique flag changes on existing columns, schema order.
    for table in &new_sorted {
        let Some(old_table) = old.tables.get(&table.name) else {
            continue;
        };
        for col in &table.columns {
            let Some(old_col) = old_table.columns.get(&col.name) else {
                continue;
            };
            if old_col.unique != col.unique {
                ops.push(Operation::ColumnUniqueChanged {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    from: old_col.unique,
                    to: col.unique,
                });
            }
        }
    }

    // Phase 5: add columns present only in the new schema, declared order.
    for table in &new_sorted {
        let Some(old_table) = old.tables.get(&table.name) else {
            continue;
        };
        for col in &table.columns {
            if !old_table.columns.contains_key(&col.name) {
                ops.push(Operation::AddColumn {
                    table: table.name.clone(),
                    column: col.clone(),
                });
            }
        }
    }

    // Phase 6: add the primary-key constraint wherever the resolved
    // primary key is new or changed. Runs after phase 5 so the target
    // column is guaranteed to exist.
    for table in &new_sorted {
        let Some(old_table) = old.tables.get(&table.name) else {
            continue;
        };
        let old_pk = old_table.resolved_primary_key();
        let new_pk = table.resolved_primary_key();
        if let Some(new_pk) = new_pk {
            if old_pk != Some(new_pk) {
                ops.push(Operation::AddPrimaryKeyConstraint {
                    table: table.name.clone(),
                    column: new_pk.to_string(),
                });
            }
        }
    }

    // Phase 7: drop columns present only in the snapshot, in the
    // snapshot's key order (the new schema has no opinion about a column
    // it no longer has).
    for (table_name, old_table) in &old.tables {
        let Some(table) = new.get_table(table_name) else {
            continue;
        };
        for column_name in old_table.columns.keys() {
            if table.get_column(column_name).is_none() {
                ops.push(Operation::DropColumn {
                    table: table_name.clone(),
                    column: column_name.clone(),
                });
            }
        }
    }

    // Phase 8: drop tables absent from the new schema, sorted
    // lexicographically (the snapshot's key order already is).
    for table_name in old.tables.keys() {
        if new.get_table(table_name).is_none() {
            ops.push(Operation::DropTable {
                name: table_name.clone(),
            });
        }
    }

    debug!(operations = ops.len(), "schema diff complete");
    ops
}
