//! Grouped time aggregation over tables

use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use thiserror::Error;

use crate::model::{CellType, CellValue, Table};

/// Errors raised while building an aggregation
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column {0} is not numeric")]
    NotNumeric(String),
    #[error("column {0} does not contain dates")]
    NotDate(String),
    #[error("nothing to group by: need group columns or a time grain")]
    EmptyGrouping,
}

/// Time bucket for date-based grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGrain {
    Daily,
    Weekly,
    Monthly,
}

impl TimeGrain {
    /// Bucket a date to the start of its period: the day itself, the
    /// week's Monday, or the first of the month.
    pub fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            TimeGrain::Daily => date,
            TimeGrain::Weekly => {
                date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            TimeGrain::Monthly => {
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
            }
        }
    }
}

/// Aggregation function applied to one metric column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl AggFunc {
    fn suffix(self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Count => "count",
        }
    }
}

/// One requested metric: a column and the function applied to it
#[derive(Debug, Clone)]
pub struct Metric {
    pub column: String,
    pub func: AggFunc,
}

impl Metric {
    pub fn new(column: impl Into<String>, func: AggFunc) -> Self {
        Self {
            column: column.into(),
            func,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MetricAcc {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    all_int: bool,
}

impl MetricAcc {
    fn new() -> Self {
        Self {
            all_int: true,
            ..Default::default()
        }
    }

    fn update(&mut self, cell: &CellValue) {
        let value = match cell {
            CellValue::Int(i) => *i as f64,
            CellValue::Float(f) => {
                self.all_int = false;
                *f
            }
            _ => return, // nulls and non-numeric values are skipped
        };
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    fn finish(&self, func: AggFunc) -> CellValue {
        let int_or_float = |v: f64| {
            if self.all_int {
                CellValue::Int(v as i64)
            } else {
                CellValue::Float(v)
            }
        };
        match func {
            AggFunc::Count => CellValue::Int(self.count as i64),
            AggFunc::Sum => int_or_float(self.sum),
            AggFunc::Mean if self.count == 0 => CellValue::Null,
            AggFunc::Mean => CellValue::Float(self.sum / self.count as f64),
            AggFunc::Min if self.count == 0 => CellValue::Null,
            AggFunc::Min => int_or_float(self.min),
            AggFunc::Max if self.count == 0 => CellValue::Null,
            AggFunc::Max => int_or_float(self.max),
        }
    }
}

/// Derive calendar columns (`year`, `month`, `week`, `dow`) from a date
/// column, appending them to the table. `month` is `YYYY-MM`, `week` the
/// ISO week label `YYYY-Www`, `dow` the weekday with Monday = 0.
pub fn add_calendar_columns(table: &mut Table, date_col: &str) -> Result<(), AggregateError> {
    let idx = table
        .column_index(date_col)
        .ok_or_else(|| AggregateError::UnknownColumn(date_col.to_string()))?;
    let col_type = table.columns[idx].inferred_type;
    if !matches!(col_type, CellType::Date | CellType::DateTime) {
        return Err(AggregateError::NotDate(date_col.to_string()));
    }

    let date_of = |cell: Option<&CellValue>| -> Option<NaiveDate> {
        match cell {
            Some(CellValue::Date(d)) => Some(*d),
            Some(CellValue::DateTime(dt)) => Some(dt.date()),
            _ => None,
        }
    };

    table.add_column("year", CellType::Int, |row| {
        date_of(row.get(idx)).map(|d| d.year() as i64).into()
    });
    table.add_column("month", CellType::String, |row| {
        date_of(row.get(idx))
            .map(|d| format!("{:04}-{:02}", d.year(), d.month()))
            .into()
    });
    table.add_column("week", CellType::String, |row| {
        date_of(row.get(idx))
            .map(|d| {
                let iso = d.iso_week();
                format!("{:04}-W{:02}", iso.year(), iso.week())
            })
            .into()
    });
    table.add_column("dow", CellType::Int, |row| {
        date_of(row.get(idx))
            .map(|d| d.weekday().num_days_from_monday() as i64)
            .into()
    });
    Ok(())
}

/// Group a table and aggregate metric columns.
///
/// Groups on `group_by` columns plus, when given, a date column bucketed to
/// the requested grain. Rows with a null in any group key are dropped, and
/// nulls inside metric columns are skipped. The result carries the group
/// columns first, then one column per metric named `<column>_<func>`, and
/// is sorted by the group columns.
pub fn aggregate(
    table: &Table,
    group_by: &[String],
    date: Option<(&str, TimeGrain)>,
    metrics: &[Metric],
) -> Result<Table, AggregateError> {
    if group_by.is_empty() && date.is_none() {
        return Err(AggregateError::EmptyGrouping);
    }

    let group_indices: Vec<usize> = group_by
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| AggregateError::UnknownColumn(name.clone()))
        })
        .collect::<Result<_, _>>()?;

    let date_spec = match date {
        Some((name, grain)) => {
            let idx = table
                .column_index(name)
                .ok_or_else(|| AggregateError::UnknownColumn(name.to_string()))?;
            let col_type = table.columns[idx].inferred_type;
            if !matches!(col_type, CellType::Date | CellType::DateTime) {
                return Err(AggregateError::NotDate(name.to_string()));
            }
            Some((name, idx, grain))
        }
        None => None,
    };

    let mut metric_indices = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let idx = table
            .column_index(&metric.column)
            .ok_or_else(|| AggregateError::UnknownColumn(metric.column.clone()))?;
        if metric.func != AggFunc::Count && !table.columns[idx].inferred_type.is_numeric() {
            return Err(AggregateError::NotNumeric(metric.column.clone()));
        }
        metric_indices.push(idx);
    }

    // Accumulate per group key, in first-seen order
    let mut groups: IndexMap<Vec<CellValue>, Vec<MetricAcc>> = IndexMap::new();
    'rows: for row in &table.rows {
        let mut key = Vec::with_capacity(group_indices.len() + 1);
        for &idx in &group_indices {
            match row.get(idx) {
                Some(cell) if !cell.is_null() => key.push(cell.clone()),
                _ => continue 'rows,
            }
        }
        if let Some((_, idx, grain)) = date_spec {
            let day = match row.get(idx) {
                Some(CellValue::Date(d)) => *d,
                Some(CellValue::DateTime(dt)) => dt.date(),
                _ => continue 'rows,
            };
            key.push(CellValue::Date(grain.bucket(day)));
        }

        let accs = groups
            .entry(key)
            .or_insert_with(|| vec![MetricAcc::new(); metrics.len()]);
        for (acc, &idx) in accs.iter_mut().zip(&metric_indices) {
            if let Some(cell) = row.get(idx) {
                acc.update(cell);
            }
        }
    }

    // Build the output table: group columns, date bucket, then metrics
    let mut columns = Vec::new();
    let mut sort_names = Vec::new();
    for (pos, (&idx, name)) in group_indices.iter().zip(group_by).enumerate() {
        columns.push(crate::model::Column::with_type(
            name.clone(),
            pos,
            table.columns[idx].inferred_type,
        ));
        sort_names.push(name.clone());
    }
    if let Some((name, _, _)) = date_spec {
        columns.push(crate::model::Column::with_type(
            name,
            columns.len(),
            CellType::Date,
        ));
        sort_names.push(name.to_string());
    }
    for (metric, &idx) in metrics.iter().zip(&metric_indices) {
        let out_type = match metric.func {
            AggFunc::Count => CellType::Int,
            AggFunc::Mean => CellType::Float,
            _ => table.columns[idx].inferred_type,
        };
        columns.push(crate::model::Column::with_type(
            format!("{}_{}", metric.column, metric.func.suffix()),
            columns.len(),
            out_type,
        ));
    }

    let mut result = Table::new(columns);
    for (line, (key, accs)) in groups.into_iter().enumerate() {
        let mut cells = key;
        for (acc, metric) in accs.iter().zip(metrics) {
            cells.push(acc.finish(metric.func));
        }
        result.add_row(cells, line + 2);
    }
    result.sort_by_columns(&sort_names);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sales_table() -> Table {
        let mut table = Table::new(vec![
            Column::with_type("date", 0, CellType::Date),
            Column::with_type("store_nbr", 1, CellType::Int),
            Column::with_type("unit_sales", 2, CellType::Float),
        ]);
        let rows = [
            (date(2017, 8, 14), 1, Some(2.0)), // Monday
            (date(2017, 8, 15), 1, Some(3.0)),
            (date(2017, 8, 15), 2, Some(4.5)),
            (date(2017, 8, 20), 1, Some(1.0)), // Sunday, same ISO week
            (date(2017, 8, 21), 1, None),      // next week, null sales
        ];
        for (i, (d, store, sales)) in rows.into_iter().enumerate() {
            table.add_row(
                vec![
                    CellValue::Date(d),
                    CellValue::Int(store),
                    sales.map(CellValue::Float).unwrap_or(CellValue::Null),
                ],
                i + 2,
            );
        }
        table
    }

    #[test]
    fn test_time_grain_buckets() {
        let sunday = date(2017, 8, 20);
        assert_eq!(TimeGrain::Daily.bucket(sunday), sunday);
        assert_eq!(TimeGrain::Weekly.bucket(sunday), date(2017, 8, 14));
        assert_eq!(TimeGrain::Monthly.bucket(sunday), date(2017, 8, 1));
    }

    #[test]
    fn test_weekly_sum_by_store() {
        let table = sales_table();
        let result = aggregate(
            &table,
            &["store_nbr".to_string()],
            Some(("date", TimeGrain::Weekly)),
            &[Metric::new("unit_sales", AggFunc::Sum)],
        )
        .unwrap();

        let names: Vec<_> = result.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["store_nbr", "date", "unit_sales_sum"]);

        // store 1 week of Aug 14: 2.0 + 3.0 + 1.0; store 1 week of Aug 21:
        // all-null metric sums to 0; store 2 week of Aug 14: 4.5
        assert_eq!(result.row_count(), 3);
        assert_eq!(
            result.rows[0].cells,
            vec![
                CellValue::Int(1),
                CellValue::Date(date(2017, 8, 14)),
                CellValue::Float(6.0)
            ]
        );
        assert_eq!(
            result.rows[1].cells,
            vec![
                CellValue::Int(1),
                CellValue::Date(date(2017, 8, 21)),
                CellValue::Float(0.0)
            ]
        );
        assert_eq!(
            result.rows[2].cells,
            vec![
                CellValue::Int(2),
                CellValue::Date(date(2017, 8, 14)),
                CellValue::Float(4.5)
            ]
        );
    }

    #[test]
    fn test_mean_and_count_skip_nulls() {
        let table = sales_table();
        let result = aggregate(
            &table,
            &["store_nbr".to_string()],
            None,
            &[
                Metric::new("unit_sales", AggFunc::Mean),
                Metric::new("unit_sales", AggFunc::Count),
            ],
        )
        .unwrap();

        assert_eq!(result.row_count(), 2);
        // store 1: mean over the three non-null values
        assert_eq!(result.rows[0].cells[1], CellValue::Float(2.0));
        assert_eq!(result.rows[0].cells[2], CellValue::Int(3));
    }

    #[test]
    fn test_int_metrics_stay_int() {
        let mut table = Table::new(vec![
            Column::with_type("store_nbr", 0, CellType::Int),
            Column::with_type("transactions", 1, CellType::Int),
        ]);
        for (store, tx) in [(1, 10), (1, 20), (2, 5)] {
            table.add_row(vec![CellValue::Int(store), CellValue::Int(tx)], 2);
        }
        let result = aggregate(
            &table,
            &["store_nbr".to_string()],
            None,
            &[
                Metric::new("transactions", AggFunc::Sum),
                Metric::new("transactions", AggFunc::Max),
            ],
        )
        .unwrap();
        assert_eq!(result.rows[0].cells[1], CellValue::Int(30));
        assert_eq!(result.rows[0].cells[2], CellValue::Int(20));
    }

    #[test]
    fn test_errors() {
        let table = sales_table();
        assert!(matches!(
            aggregate(&table, &["nope".to_string()], None, &[]),
            Err(AggregateError::UnknownColumn(_))
        ));
        assert!(matches!(
            aggregate(
                &table,
                &["store_nbr".to_string()],
                None,
                &[Metric::new("date", AggFunc::Sum)]
            ),
            Err(AggregateError::NotNumeric(_))
        ));
        assert!(matches!(
            aggregate(&table, &[], None, &[]),
            Err(AggregateError::EmptyGrouping)
        ));
    }

    #[test]
    fn test_add_calendar_columns() {
        let mut table = sales_table();
        add_calendar_columns(&mut table, "date").unwrap();

        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["date", "store_nbr", "unit_sales", "year", "month", "week", "dow"]
        );
        // 2017-08-20 is a Sunday in ISO week 33
        let row = &table.rows[3];
        assert_eq!(row.cells[3], CellValue::Int(2017));
        assert_eq!(row.cells[4], CellValue::from("2017-08"));
        assert_eq!(row.cells[5], CellValue::from("2017-W33"));
        assert_eq!(row.cells[6], CellValue::Int(6));
    }
}
