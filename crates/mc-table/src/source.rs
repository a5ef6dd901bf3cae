//! Resolve an input path to an event table.

use std::path::Path;

use crate::csv_io::{delimiter_for, read_csv};
use crate::error::{Result, TableError};
use crate::store::{TableStore, read_parquet_file};
use crate::table::EventTable;

/// Load events from a store directory, a Parquet file, or a CSV/TSV file.
///
/// For a store directory `table` selects the table; for single files it only
/// names the returned table.
pub fn load_events(path: &Path, table: &str) -> Result<EventTable> {
    if !path.exists() {
        return Err(TableError::SourceNotFound(path.to_path_buf()));
    }
    if path.is_dir() {
        return TableStore::open(path)?.read_table(table);
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let events = match ext.as_str() {
        "parquet" | "pq" => read_parquet_file(path)?.renamed(table),
        "csv" | "tsv" | "txt" => read_csv(path, table, delimiter_for(path))?,
        _ => {
            return Err(TableError::Invalid(format!(
                "unsupported input '{}': expected a store directory, .parquet, .csv or .tsv",
                path.display()
            )));
        }
    };
    tracing::info!(input = %path.display(), rows = events.n_rows(), "loaded events");
    Ok(events)
}
