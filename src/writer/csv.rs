//! CSV output for aggregate results

use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{CellValue, Table};

/// Write a whole table as CSV. Nulls become empty fields.
pub fn write_csv(table: &Table, path: &Path) -> Result<u64> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    let header: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    writer.write_record(&header).context("Failed to write CSV header")?;

    for row in &table.rows {
        let record: Vec<String> = row
            .cells
            .iter()
            .map(|cell| match cell {
                CellValue::Null => String::new(),
                other => other.display().into_owned(),
            })
            .collect();
        writer.write_record(&record).context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV output")?;

    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat output file: {}", path.display()))?
        .len();
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellType, Column};
    use crate::parser::{CsvParser, Parser};

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agg.csv");

        let mut table = Table::new(vec![
            Column::with_type("store", 0, CellType::Int),
            Column::with_type("unit_sales_sum", 1, CellType::Float),
        ]);
        table.add_row(vec![CellValue::Int(1), CellValue::Float(12.5)], 2);
        table.add_row(vec![CellValue::Int(2), CellValue::Null], 3);

        write_csv(&table, &path).unwrap();

        let back = CsvParser.parse(&path).unwrap();
        assert_eq!(back.row_count(), 2);
        assert_eq!(back.rows[0].cells[1], CellValue::Float(12.5));
        assert_eq!(back.rows[1].cells[1], CellValue::Null);
    }
}
