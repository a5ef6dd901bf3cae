//! `mvacut convert`: CSV ↔ table store.

use anyhow::{Context, Result};
use std::path::Path;

use mc_table::{TableStore, WriteMode, csv_io};

pub fn cmd_import_csv(input: &Path, tree: &str, output: &Path) -> Result<()> {
    let table = csv_io::read_csv(input, tree, csv_io::delimiter_for(input))
        .with_context(|| format!("failed to read {}", input.display()))?;
    let store = TableStore::create(output, WriteMode::Update)?;
    store.write_table(&table)?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        table = tree,
        rows = table.n_rows(),
        columns = table.column_names().len(),
        "imported CSV"
    );
    print_summary(output, tree, table.n_rows(), table.column_names())
}

pub fn cmd_export_csv(input: &Path, tree: &str, output: &Path) -> Result<()> {
    let store = TableStore::open(input)
        .with_context(|| format!("failed to open store {}", input.display()))?;
    let table = store.read_table(tree)?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    csv_io::write_csv(&table, output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(output = %output.display(), table = tree, rows = table.n_rows(), "exported CSV");
    print_summary(output, tree, table.n_rows(), table.column_names())
}

fn print_summary(output: &Path, table: &str, rows: usize, columns: &[String]) -> Result<()> {
    let summary = serde_json::json!({
        "output": output,
        "table": table,
        "rows": rows,
        "columns": columns,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
