//! CSV/TSV import and export for event tables.

use std::path::Path;

use crate::error::{Result, TableError};
use crate::table::{Column, EventTable};

fn parse_cell(s: &str) -> Option<f64> {
    if s.is_empty() {
        Some(f64::NAN)
    } else if s.eq_ignore_ascii_case("true") {
        Some(1.0)
    } else if s.eq_ignore_ascii_case("false") {
        Some(0.0)
    } else {
        s.parse::<f64>().ok()
    }
}

/// Read a delimited file with a header row into a table.
///
/// Rows are read as strings first; a column whose every cell parses as a
/// number (or `true`/`false`, or is empty) becomes numeric, otherwise text.
/// Empty numeric cells read as NaN.
pub fn read_csv(path: &Path, name: &str, delimiter: u8) -> Result<EventTable> {
    if !path.is_file() {
        return Err(TableError::SourceNotFound(path.to_path_buf()));
    }
    let mut rdr = csv::ReaderBuilder::new().delimiter(delimiter).has_headers(true).from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.is_empty() {
        return Err(TableError::Invalid(format!("{} has no columns", path.display())));
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (cells, field) in raw.iter_mut().zip(record.iter()) {
            cells.push(field.trim().to_string());
        }
    }

    let columns = headers.into_iter().zip(raw).map(|(header, cells)| {
        let numeric: Option<Vec<f64>> = cells.iter().map(|s| parse_cell(s)).collect();
        let col = match numeric {
            Some(v) => Column::Float(v),
            None => Column::Text(cells),
        };
        (header, col)
    });
    let table = EventTable::from_columns(name, columns)?;
    tracing::debug!(path = %path.display(), rows = table.n_rows(), "read CSV");
    Ok(table)
}

/// Delimiter implied by a file extension (`tsv` → tab, else comma).
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Write a table as CSV with a header row.
pub fn write_csv(table: &EventTable, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.column_names())?;
    let cols: Vec<&Column> = table.columns().map(|(_, c)| c).collect();
    let mut record = Vec::with_capacity(cols.len());
    for i in 0..table.n_rows() {
        record.clear();
        for col in &cols {
            record.push(match col {
                Column::Float(v) => v[i].to_string(),
                Column::Text(v) => v[i].clone(),
            });
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(tag: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("mc_table_csv_{tag}_{}_{nanos}.csv", std::process::id()))
    }

    #[test]
    fn detects_numeric_and_text() {
        let path = tmp_file("detect");
        std::fs::write(&path, "TrueNuPdg,IsCC,name,E\n14,true,a,1.5\n-12,false,b,\n").unwrap();
        let t = read_csv(&path, "events", b',').unwrap();
        assert_eq!(t.f64_column("TrueNuPdg").unwrap(), &[14.0, -12.0]);
        assert_eq!(t.f64_column("IsCC").unwrap(), &[1.0, 0.0]);
        assert!(t.f64_column("name").is_err());
        assert!(t.f64_column("E").unwrap()[1].is_nan());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn write_then_read() {
        let path = tmp_file("rw");
        let t = EventTable::from_columns(
            "x",
            [
                ("a".to_string(), Column::Float(vec![0.25, -3.0])),
                ("b".to_string(), Column::Text(vec!["u".into(), "v".into()])),
            ],
        )
        .unwrap();
        write_csv(&t, &path).unwrap();
        let back = read_csv(&path, "x", b',').unwrap();
        assert_eq!(back, t);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file() {
        let err = read_csv(Path::new("/nonexistent/events.csv"), "e", b',').unwrap_err();
        assert!(matches!(err, TableError::SourceNotFound(_)));
    }
}
