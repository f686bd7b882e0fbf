//! Writer layer for serializing tables back to disk

mod arrow;
mod csv;
mod parquet;

use std::path::Path;

use anyhow::{bail, Result};

use crate::model::Table;

pub use self::arrow::table_to_record_batch;
pub use self::csv::write_csv;
pub use self::parquet::{writer_properties, ParquetSerializer};

/// Serializes a contiguous row range of a table to one file.
///
/// This is the only thing the partitioner knows about the on-disk format:
/// serialize a range, get back the resulting byte size. Implementations
/// must overwrite the target path if it already exists, since the
/// hard-limit shrink loop rewrites the same file in place.
pub trait PartSerializer {
    /// File extension (without dot) for files this serializer produces
    fn extension(&self) -> &'static str;

    /// Serialize rows `[start, end)` to `path` and return the file size in bytes
    fn write_range(&self, table: &Table, start: usize, end: usize, path: &Path) -> Result<u64>;
}

/// Write a whole table to a single file, picking the format by extension
pub fn write_table(table: &Table, path: &Path) -> Result<u64> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "parquet" | "pq" => ParquetSerializer.write_range(table, 0, table.row_count(), path),
        "csv" => csv::write_csv(table, path),
        other => bail!("Unsupported output format: {}", other),
    }
}
