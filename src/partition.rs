//! Bounded-size table partitioner.
//!
//! Splits a table into contiguous row-range files, each close to a target
//! byte size and never above a hard ceiling, using an adaptive bytes-per-row
//! estimate so the whole table is serialized only once (plus a small
//! calibration sample and the occasional shrink retry).

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::PackConfig;
use crate::model::Table;
use crate::writer::PartSerializer;

/// One emitted part: the row range it covers and its size on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartReport {
    /// Part index, starting at 0
    pub index: usize,
    /// First row (inclusive)
    pub start: usize,
    /// Last row (exclusive)
    pub end: usize,
    /// Serialized file size in bytes
    pub bytes: u64,
}

/// Split `table` into part files under `<target_root>/<name>/`.
///
/// Parts cover the table contiguously and in order; every part except an
/// unsplittable single row stays within `config.hard_limit_bytes`. An empty
/// table writes nothing and is not an error.
pub fn partition(
    table: &Table,
    name: &str,
    target_root: &Path,
    config: &PackConfig,
    serializer: &dyn PartSerializer,
) -> Result<Vec<PartReport>> {
    let target_dir = target_root.join(name);
    std::fs::create_dir_all(&target_dir)
        .with_context(|| format!("Failed to create output directory: {}", target_dir.display()))?;

    let total_rows = table.row_count();
    if total_rows == 0 {
        if !config.quiet {
            println!("No rows to package for: {}", name);
        }
        return Ok(Vec::new());
    }

    // Calibration: serialize a window centered on the table midpoint to
    // estimate bytes per row without serializing everything. Centering
    // avoids bias from atypical rows at either end.
    let s_rows = config.sample_rows.min(total_rows).max(1);
    let s_start = (total_rows / 2).saturating_sub(s_rows / 2);
    let tmp = target_dir.join(format!("_sample_tmp.{}", serializer.extension()));
    let sample_size = serializer.write_range(table, s_start, s_start + s_rows, &tmp)?;
    let bytes_per_row = (sample_size as f64 / s_rows as f64).max(1.0);
    std::fs::remove_file(&tmp)
        .with_context(|| format!("Failed to remove calibration file: {}", tmp.display()))?;

    let mut rows_est = ((config.hard_limit_bytes as f64 / bytes_per_row).floor() as usize).max(1);

    let mut reports = Vec::new();
    let mut start = 0usize;
    let mut part = 0usize;
    while start < total_rows {
        let end_guess = total_rows.min(start + rows_est);
        let out_path = target_dir.join(format!("part_{}.{}", part, serializer.extension()));
        let (end_final, written_bytes) = write_bounded(
            table,
            start,
            end_guess,
            &out_path,
            config.hard_limit_bytes,
            serializer,
        )?;

        if !config.quiet {
            let actual_mb = written_bytes as f64 / (1024.0 * 1024.0);
            println!("   {} part {}: {:.2} MB", name, part, actual_mb);
        }

        // Re-estimate from what this part actually weighed, so the row
        // estimate tracks density changes across the table.
        if written_bytes > 0 {
            let ratio = config.target_bytes as f64 / written_bytes as f64;
            rows_est = (((end_final - start) as f64 * ratio).round() as usize).max(1);
        }

        reports.push(PartReport {
            index: part,
            start,
            end: end_final,
            bytes: written_bytes,
        });
        start = end_final;
        part += 1;
    }

    if !config.quiet {
        println!("Packages written to: {}", target_dir.display());
    }
    Ok(reports)
}

/// Write rows `[start, end)` to `out_path`, shrinking the range until the
/// file fits under `hard_limit_bytes`.
///
/// Returns the end index actually used and the resulting file size. A
/// single row that alone exceeds the limit is written anyway: the limit is
/// a best-effort ceiling, and one row cannot be split further.
fn write_bounded(
    table: &Table,
    start: usize,
    end: usize,
    out_path: &Path,
    hard_limit_bytes: u64,
    serializer: &dyn PartSerializer,
) -> Result<(usize, u64)> {
    let mut end = end.max(start + 1);

    loop {
        let size = serializer.write_range(table, start, end, out_path)?;

        if size <= hard_limit_bytes {
            return Ok((end, size));
        }

        let rows = end - start;
        if rows <= 1 {
            return Ok((end, size));
        }

        // Shrink with a safety factor: serialization overhead is not linear
        // in row count, and 0.98 keeps the retry from landing just over the
        // limit again.
        let shrink_ratio = (hard_limit_bytes as f64 / size as f64) * 0.98;
        let new_rows = ((rows as f64 * shrink_ratio).floor() as usize).max(1);
        end = start + new_rows;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellType, CellValue, Column};
    use crate::parser::ParserFactory;
    use crate::writer::ParquetSerializer;
    use std::cell::{Cell, RefCell};

    /// Serializer with a synthetic size function; records every write so
    /// tests can observe the ranges and retry counts the algorithm produces.
    struct MockSerializer<F: Fn(usize) -> u64> {
        size_of_rows: F,
        writes: Cell<usize>,
        ranges: RefCell<Vec<(usize, usize)>>,
    }

    impl<F: Fn(usize) -> u64> MockSerializer<F> {
        fn new(size_of_rows: F) -> Self {
            Self {
                size_of_rows,
                writes: Cell::new(0),
                ranges: RefCell::new(Vec::new()),
            }
        }
    }

    impl<F: Fn(usize) -> u64> PartSerializer for MockSerializer<F> {
        fn extension(&self) -> &'static str {
            "bin"
        }

        fn write_range(
            &self,
            _table: &Table,
            start: usize,
            end: usize,
            path: &Path,
        ) -> Result<u64> {
            self.writes.set(self.writes.get() + 1);
            self.ranges.borrow_mut().push((start, end));
            std::fs::write(path, b"mock")?;
            Ok((self.size_of_rows)(end - start))
        }
    }

    fn int_table(rows: usize) -> Table {
        let mut table = Table::new(vec![Column::with_type("id", 0, CellType::Int)]);
        for i in 0..rows {
            table.add_row(vec![CellValue::Int(i as i64)], i + 2);
        }
        table
    }

    fn quiet_config(bytes: u64) -> PackConfig {
        PackConfig::new(bytes).with_quiet(true)
    }

    fn assert_contiguous(reports: &[PartReport], total_rows: usize) {
        assert_eq!(reports[0].start, 0);
        assert_eq!(reports.last().unwrap().end, total_rows);
        for pair in reports.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.index, i);
            assert!(report.end > report.start);
        }
    }

    #[test]
    fn test_contiguity_and_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let table = int_table(10_000);
        let serializer = MockSerializer::new(|rows| rows as u64 * 100);

        let reports =
            partition(&table, "train", dir.path(), &quiet_config(64_000), &serializer).unwrap();

        assert_contiguous(&reports, 10_000);
        for report in &reports {
            assert!(report.bytes <= 64_000);
        }
    }

    #[test]
    fn test_calibration_window_is_centered_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let table = int_table(10_000);
        let serializer = MockSerializer::new(|rows| rows as u64 * 100);
        let config = quiet_config(64_000).with_sample_rows(1_000);

        partition(&table, "train", dir.path(), &config, &serializer).unwrap();

        // First write is the calibration sample, centered on the midpoint
        assert_eq!(serializer.ranges.borrow()[0], (4_500, 5_500));
        assert!(!dir.path().join("train").join("_sample_tmp.bin").exists());
    }

    #[test]
    fn test_empty_table_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let table = int_table(0);
        let serializer = MockSerializer::new(|rows| rows as u64 * 100);

        let reports =
            partition(&table, "empty", dir.path(), &quiet_config(64_000), &serializer).unwrap();

        assert!(reports.is_empty());
        assert_eq!(serializer.writes.get(), 0);
        let files: Vec<_> = std::fs::read_dir(dir.path().join("empty"))
            .unwrap()
            .collect();
        assert!(files.is_empty());
    }

    #[test]
    fn test_shrink_converges_quickly_on_overshoot() {
        // The caller believes 100 bytes/row; the serializer produces 120.
        // A 100 KiB-ish limit is overshot by 20% on the first write and
        // must converge within a handful of retries, not oscillate.
        let dir = tempfile::tempdir().unwrap();
        let table = int_table(2_000);
        let serializer = MockSerializer::new(|rows| rows as u64 * 120);
        let out = dir.path().join("part_0.bin");

        let (end, size) =
            write_bounded(&table, 0, 1_000, &out, 100_000, &serializer).unwrap();

        assert!(serializer.writes.get() <= 5, "took {} writes", serializer.writes.get());
        assert!(size <= 100_000);
        assert_eq!(end, 816); // floor(1000 * (100000/120000) * 0.98)
    }

    #[test]
    fn test_single_oversized_row_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let table = int_table(1);
        // Even one row serializes over the limit
        let serializer = MockSerializer::new(|rows| rows as u64 * 5_000);

        let reports =
            partition(&table, "wide", dir.path(), &quiet_config(1_024), &serializer).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!((reports[0].start, reports[0].end), (0, 1));
        assert!(reports[0].bytes > 1_024);
    }

    #[test]
    fn test_oversized_rows_inside_larger_table() {
        // Every row is over the limit: each part degrades to a single row,
        // and the loop still terminates with full coverage.
        let dir = tempfile::tempdir().unwrap();
        let table = int_table(4);
        let serializer = MockSerializer::new(|rows| rows as u64 * 5_000);

        let reports =
            partition(&table, "wide", dir.path(), &quiet_config(1_024), &serializer).unwrap();

        assert_eq!(reports.len(), 4);
        assert_contiguous(&reports, 4);
        for report in &reports {
            assert_eq!(report.end - report.start, 1);
        }
    }

    #[test]
    fn test_scenario_uniform_half_million_rows() {
        // 500k rows at 210 bytes/row is just over one 99 MiB part.
        let dir = tempfile::tempdir().unwrap();
        let table = int_table(500_000);
        let serializer = MockSerializer::new(|rows| rows as u64 * 210);
        let config = PackConfig::default().with_quiet(true);

        let reports = partition(&table, "train", dir.path(), &config, &serializer).unwrap();

        assert_eq!(reports.len(), 2);
        assert_contiguous(&reports, 500_000);
        for report in &reports {
            assert!(report.bytes <= config.hard_limit_bytes);
        }
    }

    #[test]
    fn test_parquet_parts_respect_hard_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::new(vec![
            Column::with_type("id", 0, CellType::Int),
            Column::with_type("payload", 1, CellType::String),
        ]);
        // Varied payloads so compression cannot collapse the data
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        for i in 0..400usize {
            let mut payload = String::new();
            for _ in 0..64 {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                payload.push_str(&format!("{:x}", state));
            }
            table.add_row(vec![CellValue::Int(i as i64), CellValue::from(payload)], i + 2);
        }

        let config = quiet_config(64 * 1024);
        let reports =
            partition(&table, "train", dir.path(), &config, &ParquetSerializer).unwrap();

        assert!(reports.len() > 1);
        assert_contiguous(&reports, 400);
        for report in &reports {
            // The hard limit may only be exceeded by an unsplittable single row
            assert!(
                report.bytes <= config.hard_limit_bytes || report.end - report.start == 1,
                "part {} is {} bytes over {} rows",
                report.index,
                report.bytes,
                report.end - report.start
            );
            let path = dir
                .path()
                .join("train")
                .join(format!("part_{}.parquet", report.index));
            assert_eq!(std::fs::metadata(&path).unwrap().len(), report.bytes);
        }
    }

    #[test]
    fn test_package_reads_back_identical() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::new(vec![
            Column::with_type("date", 0, CellType::Date),
            Column::with_type("store_nbr", 1, CellType::Int),
            Column::with_type("unit_sales", 2, CellType::Float),
            Column::with_type("family", 3, CellType::String),
        ]);
        for i in 0..2_000i64 {
            let day = chrono::NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()
                + chrono::Duration::days(i % 365);
            let sales = if i % 97 == 0 {
                CellValue::Null
            } else {
                CellValue::Float(i as f64 * 0.25)
            };
            table.add_row(
                vec![
                    CellValue::Date(day),
                    CellValue::Int(i % 54),
                    sales,
                    CellValue::from(format!("family_{}", i % 33)),
                ],
                i as usize + 2,
            );
        }

        let reports = partition(
            &table,
            "train",
            dir.path(),
            &quiet_config(16 * 1024),
            &ParquetSerializer,
        )
        .unwrap();
        assert!(reports.len() > 1);

        let back = ParserFactory::new()
            .parse(&dir.path().join("train"))
            .unwrap();
        assert_eq!(back.row_count(), table.row_count());
        for (orig, read) in table.rows.iter().zip(back.rows.iter()) {
            assert_eq!(orig.cells, read.cells);
        }
    }
}
