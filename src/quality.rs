//! Data-quality checks over a table

use indexmap::IndexSet;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::model::{CellType, CellValue, Table};

const MAX_ROWS_WITH_MISSING: usize = 20;
const MAX_DUPLICATE_EXAMPLES: usize = 10;
const MAX_VALUE_EXAMPLES: usize = 5;
const MAX_CATEGORICAL_CARDINALITY: usize = 50;
const MAX_CATEGORICAL_SAMPLE: usize = 10;

/// Missing-value share of one column
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing_pct: f64,
}

/// Missing-value share of one row (identified by its source line)
#[derive(Debug, Clone, Serialize)]
pub struct RowMissing {
    pub row: usize,
    pub missing_pct: f64,
}

/// Column name and its inferred type
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDtype {
    pub column: String,
    pub dtype: String,
}

/// String column with whitespace problems
#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousStrings {
    pub column: String,
    pub leading_trailing_space: bool,
    pub empty_after_trim: bool,
    pub examples: Vec<String>,
}

/// Low-cardinality string column where trim+lowercase would merge values
#[derive(Debug, Clone, Serialize)]
pub struct CategoricalIssue {
    pub column: String,
    pub unique_count: usize,
    pub original_sample: Vec<String>,
    pub normalized_sample: Vec<String>,
}

/// String column that is only partially parseable as dates — a hint at
/// mixed formats or dirty date data
#[derive(Debug, Clone, Serialize)]
pub struct DateLikeColumn {
    pub column: String,
    pub parseable_ratio: f64,
    pub examples: Vec<String>,
}

/// Result of all quality checks over one table
#[derive(Debug, Serialize)]
pub struct QualityReport {
    pub rows: usize,
    pub columns: usize,
    pub missing_by_column: Vec<ColumnMissing>,
    pub rows_with_missing: Vec<RowMissing>,
    pub duplicate_count: usize,
    pub duplicate_examples: Vec<usize>,
    pub dtypes: Vec<ColumnDtype>,
    pub suspicious_strings: Vec<SuspiciousStrings>,
    pub categorical_issues: Vec<CategoricalIssue>,
    pub date_like_columns: Vec<DateLikeColumn>,
}

impl QualityReport {
    /// Whether any check found something worth a look
    pub fn has_issues(&self) -> bool {
        !self.missing_by_column.is_empty()
            || self.duplicate_count > 0
            || !self.suspicious_strings.is_empty()
            || !self.categorical_issues.is_empty()
            || !self.date_like_columns.is_empty()
    }
}

#[derive(Default)]
struct ColumnScan {
    missing: Option<ColumnMissing>,
    suspicious: Option<SuspiciousStrings>,
    categorical: Option<CategoricalIssue>,
    date_like: Option<DateLikeColumn>,
}

/// Run all quality checks over a table
pub fn build_quality_report(table: &Table) -> QualityReport {
    // Column scans are independent; fan them out
    let scans: Vec<ColumnScan> = (0..table.column_count())
        .into_par_iter()
        .map(|idx| scan_column(table, idx))
        .collect();

    let mut missing_by_column: Vec<ColumnMissing> = scans
        .iter()
        .filter_map(|s| s.missing.clone())
        .collect();
    missing_by_column.sort_by(|a, b| {
        b.missing_pct
            .partial_cmp(&a.missing_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let (duplicate_count, duplicate_examples) = find_duplicates(table);

    QualityReport {
        rows: table.row_count(),
        columns: table.column_count(),
        missing_by_column,
        rows_with_missing: rows_with_missing(table),
        duplicate_count,
        duplicate_examples,
        dtypes: table
            .columns
            .iter()
            .map(|c| ColumnDtype {
                column: c.name.clone(),
                dtype: c.inferred_type.to_string(),
            })
            .collect(),
        suspicious_strings: scans.iter().filter_map(|s| s.suspicious.clone()).collect(),
        categorical_issues: scans.iter().filter_map(|s| s.categorical.clone()).collect(),
        date_like_columns: scans.iter().filter_map(|s| s.date_like.clone()).collect(),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn scan_column(table: &Table, idx: usize) -> ColumnScan {
    let column = &table.columns[idx];
    let total = table.row_count();

    let mut missing = 0usize;
    let mut space_examples: Vec<String> = Vec::new();
    let mut empty_after_trim = false;
    let mut uniques: IndexSet<&str> = IndexSet::new();
    let mut any_unnormalized = false;
    let mut non_null_strings = 0usize;
    let mut date_parseable = 0usize;
    let mut date_examples: Vec<String> = Vec::new();

    for row in &table.rows {
        match row.get(idx) {
            None | Some(CellValue::Null) => missing += 1,
            Some(CellValue::String(s)) => {
                non_null_strings += 1;
                let trimmed = s.trim();
                if trimmed != s.as_ref() {
                    if space_examples.len() < MAX_VALUE_EXAMPLES {
                        space_examples.push(s.to_string());
                    }
                }
                if trimmed.is_empty() {
                    empty_after_trim = true;
                }
                uniques.insert(s.as_ref());
                if trimmed != s.as_ref() || trimmed.chars().any(|c| c.is_uppercase()) {
                    any_unnormalized = true;
                }
                if parses_as_date(trimmed) {
                    date_parseable += 1;
                } else if date_examples.len() < MAX_VALUE_EXAMPLES {
                    date_examples.push(s.to_string());
                }
            }
            // Cells the CSV reader already recognized as dates count toward
            // the parseable share of a mixed column
            Some(CellValue::Date(_)) | Some(CellValue::DateTime(_)) => {
                non_null_strings += 1;
                date_parseable += 1;
            }
            Some(_) => {}
        }
    }

    let mut scan = ColumnScan::default();

    if missing > 0 && total > 0 {
        scan.missing = Some(ColumnMissing {
            column: column.name.clone(),
            missing_pct: round2(missing as f64 / total as f64 * 100.0),
        });
    }

    if !space_examples.is_empty() || empty_after_trim {
        scan.suspicious = Some(SuspiciousStrings {
            column: column.name.clone(),
            leading_trailing_space: !space_examples.is_empty(),
            empty_after_trim,
            examples: space_examples,
        });
    }

    let unique_count = uniques.len();
    if unique_count > 0 && unique_count <= MAX_CATEGORICAL_CARDINALITY && any_unnormalized {
        let normalized: IndexSet<String> = uniques
            .iter()
            .map(|v| v.trim().to_lowercase())
            .collect();
        // Only flag when normalizing would actually merge distinct values
        if normalized.len() < unique_count {
            scan.categorical = Some(CategoricalIssue {
                column: column.name.clone(),
                unique_count,
                original_sample: uniques
                    .iter()
                    .take(MAX_CATEGORICAL_SAMPLE)
                    .map(|v| v.to_string())
                    .collect(),
                normalized_sample: normalized
                    .iter()
                    .take(MAX_CATEGORICAL_SAMPLE)
                    .cloned()
                    .collect(),
            });
        }
    }

    if matches!(column.inferred_type, CellType::String | CellType::Mixed) && non_null_strings > 0 {
        let ratio = date_parseable as f64 / non_null_strings as f64;
        if ratio > 0.3 && ratio < 0.95 {
            scan.date_like = Some(DateLikeColumn {
                column: column.name.clone(),
                parseable_ratio: (ratio * 1000.0).round() / 1000.0,
                examples: date_examples,
            });
        }
    }

    scan
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

fn parses_as_date(s: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| chrono::NaiveDate::parse_from_str(s, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).is_ok())
}

fn rows_with_missing(table: &Table) -> Vec<RowMissing> {
    let columns = table.column_count();
    if columns == 0 {
        return Vec::new();
    }

    let mut rows: Vec<RowMissing> = table
        .rows
        .iter()
        .filter_map(|row| {
            let missing = row.cells.iter().filter(|c| c.is_null()).count();
            if missing == 0 {
                return None;
            }
            Some(RowMissing {
                row: row.source_line,
                missing_pct: round2(missing as f64 / columns as f64 * 100.0),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.missing_pct
            .partial_cmp(&a.missing_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(MAX_ROWS_WITH_MISSING);
    rows
}

fn find_duplicates(table: &Table) -> (usize, Vec<usize>) {
    let mut seen: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
    let mut count = 0usize;
    let mut examples = Vec::new();

    for (idx, row) in table.rows.iter().enumerate() {
        let hash = row.content_hash();
        let earlier = seen.entry(hash).or_default();
        // Verify cell equality to rule out hash collisions
        let is_dup = earlier
            .iter()
            .any(|&other| table.rows[other].cells == row.cells);
        if is_dup {
            count += 1;
            if examples.len() < MAX_DUPLICATE_EXAMPLES {
                examples.push(row.source_line);
            }
        }
        earlier.push(idx);
    }

    (count, examples)
}
