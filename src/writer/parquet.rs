//! Parquet serialization with size-conscious writer settings

use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::model::Table;

use super::arrow::table_to_record_batch;
use super::PartSerializer;

/// Shared writer properties: dictionary encoding plus Snappy compression
/// keeps part files compact without slowing writes down much.
pub fn writer_properties() -> &'static WriterProperties {
    static PROPERTIES: OnceLock<WriterProperties> = OnceLock::new();
    PROPERTIES.get_or_init(|| {
        WriterProperties::builder()
            .set_dictionary_enabled(true)
            .set_compression(Compression::SNAPPY)
            .set_max_row_group_size(64 * 1024)
            .build()
    })
}

/// Parquet part serializer used by the partitioner and single-file conversion
pub struct ParquetSerializer;

impl PartSerializer for ParquetSerializer {
    fn extension(&self) -> &'static str {
        "parquet"
    }

    fn write_range(&self, table: &Table, start: usize, end: usize, path: &Path) -> Result<u64> {
        let batch = table_to_record_batch(table, start, end)?;

        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        let mut writer =
            ArrowWriter::try_new(file, batch.schema(), Some(writer_properties().clone()))
                .context("Failed to create Parquet writer")?;
        writer.write(&batch).context("Failed to write Parquet data")?;
        writer.close().context("Failed to finalize Parquet file")?;

        let size = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat output file: {}", path.display()))?
            .len();
        Ok(size)
    }
}
