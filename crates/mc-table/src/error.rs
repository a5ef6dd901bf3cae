//! Error type for table storage and expression evaluation.

use std::path::PathBuf;

/// Errors raised by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Input path does not exist or cannot be accessed.
    #[error("input source does not exist or cannot be accessed: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Named table absent from an otherwise readable store.
    #[error("table '{table}' not found in {}", .store.display())]
    MissingTable {
        /// Store path.
        store: PathBuf,
        /// Requested table.
        table: String,
    },

    /// Column absent from a table.
    #[error("column '{column}' not found in table '{table}'")]
    MissingColumn {
        /// Table name.
        table: String,
        /// Requested column.
        column: String,
    },

    /// Column exists but has the wrong type for the requested use.
    #[error("column '{column}' in table '{table}' is not numeric")]
    ColumnType {
        /// Table name.
        table: String,
        /// Offending column.
        column: String,
    },

    /// Columns of one table disagree on row count.
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RowCount {
        /// Offending column.
        column: String,
        /// Row count of the table.
        expected: usize,
        /// Row count of the column.
        actual: usize,
    },

    /// Expression failed to parse.
    #[error("expression error: {0}")]
    Expression(String),

    /// Invalid argument (empty names, bad binning, ...).
    #[error("invalid argument: {0}")]
    Invalid(String),

    /// Arrow conversion error.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet read/write error.
    #[error("Parquet read/write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, TableError>;

impl From<TableError> for mc_core::Error {
    fn from(e: TableError) -> Self {
        match e {
            TableError::SourceNotFound(_) | TableError::Expression(_) | TableError::Invalid(_) => {
                mc_core::Error::Config(e.to_string())
            }
            TableError::Io(io) => mc_core::Error::Io(io),
            other => mc_core::Error::Data(other.to_string()),
        }
    }
}
