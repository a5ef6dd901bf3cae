//! Update-or-insert of one row keyed by a string column.
//!
//! The whole table is read, rebuilt, and written back. The rebuilt schema is
//! the union of the existing columns and the supplied fields; cells with no
//! prior value default to `0.0` (numeric) or `""` (text).

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};
use crate::store::TableStore;
use crate::table::{Column, EventTable};

/// Key column used for per-method result logs.
pub const DEFAULT_KEY_COLUMN: &str = "Method";

/// What [`upsert_by_key`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// The table did not exist and was created with one row.
    Created,
    /// No row had the key; a row was appended.
    Inserted,
    /// Existing row(s) with the key were overwritten.
    Updated,
}

/// Update the row whose `key_column` equals `key`, or append one.
///
/// Fields not in `values` keep their prior value on update. Later entries in
/// `values` win over earlier ones with the same name.
pub fn upsert_by_key(
    store: &TableStore,
    table: &str,
    key_column: &str,
    key: &str,
    values: &[(String, f64)],
) -> Result<UpsertOutcome> {
    if key_column.is_empty() {
        return Err(TableError::Invalid("key column name must be non-empty".into()));
    }
    if values.iter().any(|(name, _)| name == key_column) {
        return Err(TableError::Invalid(format!(
            "field '{key_column}' is the key column and cannot be set as a value"
        )));
    }

    if !store.has_table(table) {
        let mut columns = vec![(key_column.to_string(), Column::Text(vec![key.to_string()]))];
        for (name, value) in values {
            match columns.iter_mut().find(|(n, _)| n == name) {
                Some((_, col)) => *col = Column::Float(vec![*value]),
                None => columns.push((name.clone(), Column::Float(vec![*value]))),
            }
        }
        store.write_table(&EventTable::from_columns(table, columns)?)?;
        tracing::info!(table, key_column, key, "created table with first entry");
        return Ok(UpsertOutcome::Created);
    }

    let existing = store.read_table(table)?;
    let keys = match existing.column(key_column)? {
        Column::Text(k) => k.clone(),
        Column::Float(_) => {
            return Err(TableError::ColumnType {
                table: table.to_string(),
                column: key_column.to_string(),
            });
        }
    };
    let n_old = existing.n_rows();
    let matches: Vec<usize> = (0..n_old).filter(|&i| keys[i] == key).collect();
    let outcome = if matches.is_empty() { UpsertOutcome::Inserted } else { UpsertOutcome::Updated };
    let n_new = if matches.is_empty() { n_old + 1 } else { n_old };

    // Union schema, existing order first.
    let mut columns: Vec<(String, Column)> = Vec::new();
    for (name, col) in existing.columns() {
        let mut col = col.clone();
        if n_new > n_old {
            match &mut col {
                Column::Float(v) => v.push(0.0),
                Column::Text(v) => {
                    v.push(if name == key_column { key.to_string() } else { String::new() })
                }
            }
        }
        columns.push((name.to_string(), col));
    }

    let targets: Vec<usize> = if matches.is_empty() { vec![n_old] } else { matches };
    for (name, value) in values {
        let idx = match columns.iter().position(|(n, _)| n == name) {
            Some(i) => i,
            None => {
                columns.push((name.clone(), Column::Float(vec![0.0; n_new])));
                columns.len() - 1
            }
        };
        let Column::Float(cells) = &mut columns[idx].1 else {
            return Err(TableError::ColumnType { table: table.to_string(), column: name.clone() });
        };
        for &row in &targets {
            cells[row] = *value;
        }
    }

    store.write_table(&EventTable::from_columns(table, columns)?)?;
    match outcome {
        UpsertOutcome::Updated => tracing::info!(table, key_column, key, "updated entry"),
        _ => tracing::info!(table, key_column, key, "added entry"),
    }
    Ok(outcome)
}

/// Row of a keyed table as `(field, value)` pairs, excluding the key column.
///
/// Returns `None` when no row carries `key`.
pub fn lookup_by_key(
    table: &EventTable,
    key_column: &str,
    key: &str,
) -> Result<Option<Vec<(String, f64)>>> {
    let Column::Text(keys) = table.column(key_column)? else {
        return Err(TableError::ColumnType {
            table: table.name().to_string(),
            column: key_column.to_string(),
        });
    };
    let Some(row) = keys.iter().position(|k| k == key) else {
        return Ok(None);
    };
    Ok(Some(
        table
            .columns()
            .filter_map(|(name, col)| match col {
                Column::Float(v) if name != key_column => Some((name.to_string(), v[row])),
                _ => None,
            })
            .collect(),
    ))
}
