//! In-memory columnar event table.

use crate::error::{Result, TableError};
use crate::expr::{Expression, truthy};

/// One column of an [`EventTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric column (integers and booleans are widened on read).
    Float(Vec<f64>),
    /// String column.
    Text(Vec<String>),
}

impl Column {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    /// `true` if the column has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric values, or `None` for a text column.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Float(v) => Column::Float(rows.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Append `other`'s values; `false` if the kinds differ.
    pub(crate) fn extend(&mut self, other: &Column) -> bool {
        match (self, other) {
            (Column::Float(a), Column::Float(b)) => a.extend_from_slice(b),
            (Column::Text(a), Column::Text(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }
}

/// Named table of equal-length columns.
///
/// Column order is preserved; it is the order used when writing to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTable {
    name: String,
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl EventTable {
    /// Empty table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), names: Vec::new(), columns: Vec::new(), n_rows: 0 }
    }

    /// Build a table from `(name, column)` pairs. All columns must have the
    /// same length and distinct names.
    pub fn from_columns(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (String, Column)>,
    ) -> Result<Self> {
        let mut table = Self::new(name);
        for (col_name, col) in columns {
            if table.has_column(&col_name) {
                return Err(TableError::Invalid(format!(
                    "duplicate column '{col_name}' in table '{}'",
                    table.name
                )));
            }
            table.push_column(col_name, col)?;
        }
        Ok(table)
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same table under a different name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Column names, in order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// `true` if a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Iterate `(name, column)` pairs in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.names.iter().position(|n| n == name).map(|i| &self.columns[i]).ok_or_else(|| {
            TableError::MissingColumn { table: self.name.clone(), column: name.to_string() }
        })
    }

    /// Numeric column by name.
    pub fn f64_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name)?.as_f64().ok_or_else(|| TableError::ColumnType {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Add a column, replacing any existing column of the same name in place.
    ///
    /// The first column of an empty table fixes the row count.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(TableError::Invalid("column name must be non-empty".into()));
        }
        if self.columns.is_empty() {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            return Err(TableError::RowCount {
                column: name,
                expected: self.n_rows,
                actual: column.len(),
            });
        }
        match self.names.iter().position(|n| *n == name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Evaluate an expression on every row.
    pub fn evaluate(&self, expr: &Expression) -> Result<Vec<f64>> {
        let inputs =
            expr.columns().iter().map(|c| self.f64_column(c)).collect::<Result<Vec<_>>>()?;
        Ok(expr.eval_columns(&inputs, self.n_rows))
    }

    /// Per-row truth value of an expression.
    pub fn mask(&self, expr: &Expression) -> Result<Vec<bool>> {
        Ok(self.evaluate(expr)?.into_iter().map(truthy).collect())
    }

    /// Number of rows for which `expr` is true.
    pub fn count_where(&self, expr: &Expression) -> Result<usize> {
        Ok(self.mask(expr)?.into_iter().filter(|&b| b).count())
    }

    /// Rows selected by a boolean mask (must have `n_rows` entries).
    pub fn filter_mask(&self, mask: &[bool]) -> Result<EventTable> {
        if mask.len() != self.n_rows {
            return Err(TableError::RowCount {
                column: "<mask>".into(),
                expected: self.n_rows,
                actual: mask.len(),
            });
        }
        let rows: Vec<usize> = mask.iter().enumerate().filter(|(_, m)| **m).map(|(i, _)| i).collect();
        Ok(self.take(&rows))
    }

    /// Rows for which `expr` is true.
    pub fn filter(&self, expr: &Expression) -> Result<EventTable> {
        self.filter_mask(&self.mask(expr)?)
    }

    /// Rows whose `column` value lies in the half-open interval `[lo, hi)`.
    pub fn filter_range(&self, column: &str, lo: f64, hi: f64) -> Result<EventTable> {
        let mask: Vec<bool> = self.f64_column(column)?.iter().map(|&v| v >= lo && v < hi).collect();
        self.filter_mask(&mask)
    }

    /// Keep only the named columns, in the given order.
    pub fn project<S: AsRef<str>>(&self, keep: &[S]) -> Result<EventTable> {
        let mut out = EventTable::new(self.name.clone());
        for name in keep {
            let name = name.as_ref();
            if out.has_column(name) {
                continue;
            }
            out.push_column(name, self.column(name)?.clone())?;
        }
        // A projection onto zero columns still knows how many rows it has.
        if keep.is_empty() {
            out.n_rows = self.n_rows;
        }
        Ok(out)
    }

    /// Add (or replace) a numeric column computed from an expression.
    pub fn define(&mut self, name: &str, expr: &Expression) -> Result<()> {
        let values = self.evaluate(expr)?;
        self.push_column(name, Column::Float(values))
    }

    fn take(&self, rows: &[usize]) -> EventTable {
        EventTable {
            name: self.name.clone(),
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            n_rows: rows.len(),
        }
    }
}
