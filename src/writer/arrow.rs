//! Table to Arrow RecordBatch conversion

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, RecordBatch, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::Schema;
use chrono::Datelike;

use crate::model::{CellType, CellValue, Row, Table};

/// Convert rows `[start, end)` of a table into an Arrow record batch.
///
/// Column types follow each column's inferred type; cells that do not fit
/// the column type (possible only in mixed columns, which map to Utf8)
/// are written as their display strings.
pub fn table_to_record_batch(table: &Table, start: usize, end: usize) -> Result<RecordBatch> {
    let fields: Vec<_> = table.columns.iter().map(|c| c.to_arrow_field()).collect();
    let schema = Arc::new(Schema::new(fields));

    let rows = table.row_range(start, end);
    let arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .map(|col| build_array(col.inferred_type, col.index, rows))
        .collect();

    RecordBatch::try_new(schema, arrays).context("Failed to build Arrow record batch")
}

fn build_array(cell_type: CellType, col_idx: usize, rows: &[Row]) -> ArrayRef {
    match cell_type {
        CellType::Bool => {
            let values: Vec<Option<bool>> = rows
                .iter()
                .map(|row| match row.get(col_idx) {
                    Some(CellValue::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Arc::new(BooleanArray::from(values))
        }
        CellType::Int => {
            let values: Vec<Option<i64>> = rows
                .iter()
                .map(|row| match row.get(col_idx) {
                    Some(CellValue::Int(i)) => Some(*i),
                    _ => None,
                })
                .collect();
            Arc::new(Int64Array::from(values))
        }
        CellType::Float => {
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|row| row.get(col_idx).and_then(|c| c.as_f64()))
                .collect();
            Arc::new(Float64Array::from(values))
        }
        CellType::Date => {
            let values: Vec<Option<i32>> = rows
                .iter()
                .map(|row| match row.get(col_idx) {
                    // Date32 counts days since the Unix epoch
                    Some(CellValue::Date(d)) => Some(d.num_days_from_ce() - 719163),
                    _ => None,
                })
                .collect();
            Arc::new(Date32Array::from(values))
        }
        CellType::DateTime => {
            let values: Vec<Option<i64>> = rows
                .iter()
                .map(|row| match row.get(col_idx) {
                    Some(CellValue::DateTime(dt)) => Some(dt.and_utc().timestamp_micros()),
                    Some(CellValue::Date(d)) => d
                        .and_hms_opt(0, 0, 0)
                        .map(|dt| dt.and_utc().timestamp_micros()),
                    _ => None,
                })
                .collect();
            Arc::new(TimestampMicrosecondArray::from(values))
        }
        CellType::Null | CellType::String | CellType::Mixed => {
            let values: StringArray = rows
                .iter()
                .map(|row| match row.get(col_idx) {
                    None | Some(CellValue::Null) => None,
                    Some(cell) => Some(cell.display().into_owned()),
                })
                .collect();
            Arc::new(values)
        }
    }
}
