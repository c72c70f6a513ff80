//! File formats at the edges of the pipeline.
//!
//! Facts arrive as CSV with the warehouse headers, the BI lineage document
//! and the combined document as JSON. Flattened rows go out as CSV or JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bi::BiLineageDocument;
use crate::document::CombinedDocument;
use crate::error::LineageError;
use crate::facts::{normalize, FactTable, LineageFact, NormalizeOptions};
use crate::flatten::FlatRow;

/// Errors that can occur while reading or writing lineage files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Lineage(#[from] LineageError),
}

pub type ExportResult<T> = Result<T, ExportError>;

// =============================================================================
// Readers
// =============================================================================

/// Read raw facts from CSV. Columns are matched by header name.
pub fn read_facts<R: Read>(reader: R) -> ExportResult<Vec<LineageFact>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut facts = Vec::new();
    for record in reader.deserialize() {
        facts.push(record?);
    }
    Ok(facts)
}

pub fn read_facts_file(path: impl AsRef<Path>) -> ExportResult<Vec<LineageFact>> {
    read_facts(open(path.as_ref())?)
}

/// Read and normalize a fact CSV in one step.
pub fn load_fact_table(path: impl AsRef<Path>, options: NormalizeOptions) -> ExportResult<FactTable> {
    let facts = read_facts_file(path)?;
    Ok(normalize(facts, options)?)
}

pub fn read_bi_document(path: impl AsRef<Path>) -> ExportResult<BiLineageDocument> {
    read_json(path.as_ref())
}

pub fn read_combined_document(path: impl AsRef<Path>) -> ExportResult<CombinedDocument> {
    read_json(path.as_ref())
}

/// Read flattened rows back from CSV written by [`write_rows_csv`].
pub fn read_rows_csv<R: Read>(reader: R, delimiter: u8) -> ExportResult<Vec<FlatRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ExportResult<T> {
    let reader = BufReader::new(open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn open(path: &Path) -> ExportResult<File> {
    File::open(path).map_err(|source| ExportError::File {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// Writers
// =============================================================================

pub fn write_json<W: Write, T: Serialize + ?Sized>(
    mut writer: W,
    value: &T,
    pretty: bool,
) -> ExportResult<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write rows as CSV with the stable header row.
///
/// The header is written even when there are no rows.
pub fn write_rows_csv<W: Write>(writer: W, rows: &[FlatRow], delimiter: u8) -> ExportResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(crate::flatten::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Create `path` for writing, creating missing parent directories.
pub fn create_file(path: impl AsRef<Path>) -> ExportResult<BufWriter<File>> {
    let path = path.as_ref();
    let with_path = |source| ExportError::File {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(with_path)?;
    }
    let file = File::create(path).map_err(with_path)?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    const FACTS: &str = "\
UNIQUE_KEY,TABLE_NAME,COLUMN_NAME,NAME,COLUMN_DESCRIPTION,UPSTREAM_TABLE,UPSTREAM_COLUMN
orders.total, model.jaffle.orders ,total,orders,Order total,\"order_items, order_items\",\"price, quantity\"
order_items.price,model.jaffle.order_items,price,order_items,Unit price,,
";

    fn row(level: usize, upstream_column: &str) -> FlatRow {
        FlatRow {
            dashboard: "Sales".into(),
            dashboard_column: "Revenue".into(),
            data_source: "jaffle".into(),
            table: "orders".into(),
            column: "total".into(),
            upstream_table: "order_items".into(),
            upstream_column: upstream_column.into(),
            level,
            lineage_type: "Database Side Lineage".into(),
            ..FlatRow::default()
        }
    }

    #[test]
    fn test_read_facts_by_header() {
        let facts = read_facts(FACTS.as_bytes()).unwrap();

        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].table, "model.jaffle.orders");
        assert_eq!(facts[0].upstream_column_list, "price, quantity");
        assert_eq!(facts[0].sql_text, "");
        assert_eq!(facts[1].model_name(), "order_items");
    }

    #[test]
    fn test_read_facts_normalizes() {
        let table = normalize(read_facts(FACTS.as_bytes()).unwrap(), NormalizeOptions::default())
            .unwrap();
        let total = table.lookup("ORDERS", "Total").unwrap();
        assert_eq!(total.upstream.len(), 2);
        assert_eq!(total.description, "Order total");
    }

    #[test]
    fn test_write_rows_csv() {
        let mut out = Vec::new();
        write_rows_csv(&mut out, &[row(1, "price"), row(1, "quantity")], b',').unwrap();

        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        Dashboard Name,Column Name on Dashboard,Data Source Name,Table Name,Column Name in Table,Upstream Table Name,Upstream Column Name,Level,Formula,Description,Reasoning,Lineage Type
        Sales,Revenue,jaffle,orders,total,order_items,price,1,,,,Database Side Lineage
        Sales,Revenue,jaffle,orders,total,order_items,quantity,1,,,,Database Side Lineage
        ");
    }

    #[test]
    fn test_empty_export_has_header() {
        let mut out = Vec::new();
        write_rows_csv(&mut out, &[], b';').unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Dashboard Name;Column Name on Dashboard;"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_rows_csv_read_back() {
        let rows = vec![row(1, "price"), row(2, "quantity")];
        let mut out = Vec::new();
        write_rows_csv(&mut out, &rows, b'\t').unwrap();

        assert_eq!(read_rows_csv(out.as_slice(), b'\t').unwrap(), rows);
    }

    #[test]
    fn test_write_json_compact() {
        let mut out = Vec::new();
        write_json(&mut out, &vec![1, 2], false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[1,2]\n");
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = read_bi_document("/nonexistent/bi.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bi.json"));
    }
}
