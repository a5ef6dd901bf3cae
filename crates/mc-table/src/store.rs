//! Parquet-backed table store.
//!
//! A store is a directory holding one `<table>.parquet` file per named table.
//! Tables in one store may have different schemas.
//!
//! # Parquet key-value metadata
//!
//! | Key                     | Value                    |
//! |-------------------------|--------------------------|
//! | `mvacut.schema_version` | `"mvacut_table_v1"`      |
//! | `mvacut.table`          | table name               |
//!
//! Numeric columns are written as `Float64` and text columns as `Utf8`.
//! On read, every integer, float and boolean column widens to `f64`.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray, new_empty_array};
use arrow::datatypes::{
    DataType, Field, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, Schema,
    UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{Result, TableError};
use crate::table::{Column, EventTable};

/// Schema version string embedded in Parquet key-value metadata.
pub const TABLE_SCHEMA_V1: &str = "mvacut_table_v1";

/// Parquet metadata key for the schema version.
pub const META_KEY_SCHEMA_VERSION: &str = "mvacut.schema_version";

/// Parquet metadata key for the table name.
pub const META_KEY_TABLE: &str = "mvacut.table";

const TABLE_EXT: &str = "parquet";

/// How [`TableStore::create`] treats an existing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Remove every table already in the store.
    Recreate,
    /// Keep existing tables; writes replace only the table they name.
    Update,
}

/// Directory of named Parquet tables.
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    /// Open an existing store directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(TableError::SourceNotFound(root));
        }
        Ok(Self { root })
    }

    /// Open a store for writing, creating the directory if needed.
    pub fn create(path: impl AsRef<Path>, mode: WriteMode) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if root.as_os_str().is_empty() {
            return Err(TableError::Invalid("output store path must be non-empty".into()));
        }
        std::fs::create_dir_all(&root)?;
        let store = Self { root };
        if mode == WriteMode::Recreate {
            for name in store.table_names()? {
                std::fs::remove_file(store.table_path(&name))?;
            }
            tracing::debug!(store = %store.root.display(), "recreated table store");
        }
        Ok(store)
    }

    /// Store directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// File backing a table.
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.{TABLE_EXT}"))
    }

    /// `true` if the table exists.
    pub fn has_table(&self, table: &str) -> bool {
        self.table_path(table).is_file()
    }

    /// Names of all tables, sorted.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(TABLE_EXT)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read a whole table.
    pub fn read_table(&self, table: &str) -> Result<EventTable> {
        if !self.has_table(table) {
            return Err(TableError::MissingTable {
                store: self.root.clone(),
                table: table.to_string(),
            });
        }
        let t = read_parquet_file(&self.table_path(table))?.renamed(table);
        tracing::debug!(store = %self.root.display(), table, rows = t.n_rows(), "read table");
        Ok(t)
    }

    /// Write a table under its own name, replacing any previous version.
    ///
    /// The file is written next to its destination and renamed into place.
    pub fn write_table(&self, table: &EventTable) -> Result<()> {
        validate_table_name(table.name())?;
        let dest = self.table_path(table.name());
        let tmp = self.root.join(format!(".{}.{TABLE_EXT}.tmp", table.name()));
        write_parquet_file(table, &tmp)?;
        std::fs::rename(&tmp, &dest)?;
        tracing::debug!(
            store = %self.root.display(),
            table = table.name(),
            rows = table.n_rows(),
            "wrote table"
        );
        Ok(())
    }
}

fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(TableError::Invalid(format!("invalid table name '{name}'")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// EventTable ↔ RecordBatch
// ---------------------------------------------------------------------------

/// Build an Arrow [`RecordBatch`] from an [`EventTable`].
pub fn table_to_record_batch(table: &EventTable) -> Result<RecordBatch> {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for (name, col) in table.columns() {
        match col {
            Column::Float(v) => {
                fields.push(Field::new(name, DataType::Float64, false));
                arrays.push(Arc::new(Float64Array::from(v.clone())));
            }
            Column::Text(v) => {
                fields.push(Field::new(name, DataType::Utf8, false));
                arrays.push(Arc::new(StringArray::from(v.clone())));
            }
        }
    }

    let metadata = HashMap::from([
        (META_KEY_SCHEMA_VERSION.to_string(), TABLE_SCHEMA_V1.to_string()),
        (META_KEY_TABLE.to_string(), table.name().to_string()),
    ]);
    let schema = Arc::new(Schema::new(fields).with_metadata(metadata));

    if arrays.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Convert one Arrow column into a table column.
///
/// Returns `None` for Arrow types with no table representation.
fn arrow_to_column(array: &dyn Array) -> Option<Column> {
    fn widen<I: Iterator<Item = Option<f64>>>(it: I) -> Column {
        Column::Float(it.map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    let col = match array.data_type() {
        DataType::Float64 => widen(array.as_primitive::<Float64Type>().iter()),
        DataType::Float32 => {
            widen(array.as_primitive::<Float32Type>().iter().map(|v| v.map(f64::from)))
        }
        DataType::Int8 => widen(array.as_primitive::<Int8Type>().iter().map(|v| v.map(f64::from))),
        DataType::Int16 => {
            widen(array.as_primitive::<Int16Type>().iter().map(|v| v.map(f64::from)))
        }
        DataType::Int32 => {
            widen(array.as_primitive::<Int32Type>().iter().map(|v| v.map(f64::from)))
        }
        DataType::Int64 => {
            widen(array.as_primitive::<Int64Type>().iter().map(|v| v.map(|x| x as f64)))
        }
        DataType::UInt8 => {
            widen(array.as_primitive::<UInt8Type>().iter().map(|v| v.map(f64::from)))
        }
        DataType::UInt16 => {
            widen(array.as_primitive::<UInt16Type>().iter().map(|v| v.map(f64::from)))
        }
        DataType::UInt32 => {
            widen(array.as_primitive::<UInt32Type>().iter().map(|v| v.map(f64::from)))
        }
        DataType::UInt64 => {
            widen(array.as_primitive::<UInt64Type>().iter().map(|v| v.map(|x| x as f64)))
        }
        DataType::Boolean => {
            widen(array.as_boolean().iter().map(|v| v.map(|b| if b { 1.0 } else { 0.0 })))
        }
        DataType::Utf8 => Column::Text(
            array.as_string::<i32>().iter().map(|s| s.unwrap_or_default().to_string()).collect(),
        ),
        DataType::LargeUtf8 => Column::Text(
            array.as_string::<i64>().iter().map(|s| s.unwrap_or_default().to_string()).collect(),
        ),
        _ => return None,
    };
    Some(col)
}

/// Build an [`EventTable`] from Arrow record batches sharing one schema.
///
/// Columns of unsupported Arrow types are skipped with a warning.
pub fn table_from_record_batches(
    name: &str,
    schema: &Schema,
    batches: &[RecordBatch],
) -> Result<EventTable> {
    let mut table = EventTable::new(name);
    for (idx, field) in schema.fields().iter().enumerate() {
        let mut merged: Option<Column> = None;
        for batch in batches {
            let Some(col) = arrow_to_column(batch.column(idx).as_ref()) else {
                merged = None;
                break;
            };
            match merged.as_mut() {
                None => merged = Some(col),
                Some(acc) => {
                    if !acc.extend(&col) {
                        return Err(TableError::ColumnType {
                            table: name.to_string(),
                            column: field.name().clone(),
                        });
                    }
                }
            }
        }
        if batches.is_empty() {
            merged = arrow_to_column(new_empty_array(field.data_type()).as_ref());
        }
        match merged {
            Some(col) => table.push_column(field.name().clone(), col)?,
            None => tracing::warn!(
                table = name,
                column = field.name().as_str(),
                data_type = %field.data_type(),
                "skipping column of unsupported type"
            ),
        }
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Parquet files
// ---------------------------------------------------------------------------

/// Write a table to a single Parquet file (Snappy compressed).
pub fn write_parquet_file(table: &EventTable, path: &Path) -> Result<()> {
    let batch = table_to_record_batch(table)?;
    let file = File::create(path)?;
    let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Read a single Parquet file into a table.
///
/// The table name comes from the `mvacut.table` metadata key when present,
/// else from the file stem.
pub fn read_parquet_file(path: &Path) -> Result<EventTable> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TableError::SourceNotFound(path.to_path_buf()),
        _ => TableError::Io(e),
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    // Capture the schema (with key-value metadata) before building the reader.
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    let name = schema
        .metadata()
        .get(META_KEY_TABLE)
        .cloned()
        .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .unwrap_or_default();
    table_from_record_batches(&name, &schema, &batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Int32Array};

    fn tmp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("mc_table_store_{tag}_{}_{nanos}", std::process::id()))
    }

    fn sample(name: &str) -> EventTable {
        EventTable::from_columns(
            name,
            [
                ("score".to_string(), Column::Float(vec![0.1, 0.7, -0.3])),
                ("label".to_string(), Column::Text(vec!["s".into(), "b".into(), "s".into()])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn record_batch_widens_integer_and_boolean() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("pdg", DataType::Int32, false),
            Field::new("cc", DataType::Boolean, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(vec![14, -12])),
                Arc::new(BooleanArray::from(vec![Some(true), None])),
            ],
        )
        .unwrap();
        let t = table_from_record_batches("t", &schema, &[batch]).unwrap();
        assert_eq!(t.f64_column("pdg").unwrap(), &[14.0, -12.0]);
        let cc = t.f64_column("cc").unwrap();
        assert_eq!(cc[0], 1.0);
        assert!(cc[1].is_nan());
    }

    #[test]
    fn batches_are_concatenated() {
        let schema = Arc::new(Schema::new(vec![Field::new("pdg", DataType::Int32, false)]));
        let batch = |v: Vec<i32>| {
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(v))]).unwrap()
        };
        let t = table_from_record_batches("t", &schema, &[batch(vec![14]), batch(vec![-14, 12])])
            .unwrap();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.f64_column("pdg").unwrap(), &[14.0, -14.0, 12.0]);
    }

    #[test]
    fn recreate_then_update() {
        let dir = tmp_dir("modes");
        let store = TableStore::create(&dir, WriteMode::Recreate).unwrap();
        store.write_table(&sample("Signal")).unwrap();
        store.write_table(&sample("Stale")).unwrap();

        let store = TableStore::create(&dir, WriteMode::Recreate).unwrap();
        assert!(store.table_names().unwrap().is_empty());
        store.write_table(&sample("Signal")).unwrap();

        let store = TableStore::create(&dir, WriteMode::Update).unwrap();
        store.write_table(&sample("Background")).unwrap();
        assert_eq!(store.table_names().unwrap(), ["Background", "Signal"]);

        let back = store.read_table("Signal").unwrap();
        assert_eq!(back, sample("Signal"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_table_and_store() {
        let dir = tmp_dir("missing");
        assert!(matches!(TableStore::open(&dir), Err(TableError::SourceNotFound(_))));
        let store = TableStore::create(&dir, WriteMode::Update).unwrap();
        let err = store.read_table("Signal").unwrap_err();
        assert!(matches!(err, TableError::MissingTable { .. }));
        assert!(err.to_string().contains("Signal"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_table_keeps_schema() {
        let dir = tmp_dir("empty");
        let store = TableStore::create(&dir, WriteMode::Recreate).unwrap();
        let empty = sample("Background").filter_mask(&[false, false, false]).unwrap();
        store.write_table(&empty).unwrap();
        let back = store.read_table("Background").unwrap();
        assert_eq!(back.n_rows(), 0);
        assert_eq!(back.column_names(), ["score", "label"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_path_like_table_names() {
        let dir = tmp_dir("names");
        let store = TableStore::create(&dir, WriteMode::Recreate).unwrap();
        assert!(store.write_table(&sample("../evil")).is_err());
        assert!(store.write_table(&sample("")).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
