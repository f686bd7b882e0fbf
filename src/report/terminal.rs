//! Plain terminal output for quality reports

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use termcolor::ColorChoice;

use crate::quality::QualityReport;

use super::ReportFormatter;

/// Terminal report output
pub struct TerminalReport {
    #[allow(dead_code)]
    color_choice: ColorChoice,
}

impl TerminalReport {
    pub fn new() -> Self {
        Self {
            color_choice: ColorChoice::Auto,
        }
    }

    pub fn with_color_choice(color_choice: ColorChoice) -> Self {
        Self { color_choice }
    }

    fn write_header(&self, writer: &mut dyn Write, source: &Path) -> Result<()> {
        writeln!(
            writer,
            "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
        )?;
        writeln!(writer, " data quality: {}", source.display())?;
        writeln!(
            writer,
            "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
        )?;
        writeln!(writer)?;
        Ok(())
    }

    fn write_section(
        &self,
        writer: &mut dyn Write,
        title: &str,
        data: &[Vec<String>],
    ) -> Result<()> {
        if data.len() <= 1 {
            return Ok(());
        }
        writeln!(writer, "{}:", title)?;
        writeln!(writer, "{}", build_table(data))?;
        Ok(())
    }
}

impl Default for TerminalReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for TerminalReport {
    fn render(
        &self,
        report: &QualityReport,
        source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()> {
        self.write_header(writer, source)?;

        writeln!(
            writer,
            "Rows: {}   Columns: {}   Duplicate rows: {}",
            report.rows, report.columns, report.duplicate_count
        )?;
        writeln!(writer)?;

        if !report.has_issues() {
            writeln!(writer, "No quality issues found.")?;
            return Ok(());
        }

        let mut missing = vec![vec!["column".to_string(), "missing_%".to_string()]];
        missing.extend(
            report
                .missing_by_column
                .iter()
                .map(|m| vec![m.column.clone(), format!("{:.2}", m.missing_pct)]),
        );
        self.write_section(writer, "Missing values by column", &missing)?;

        let mut rows = vec![vec!["row".to_string(), "missing_%".to_string()]];
        rows.extend(
            report
                .rows_with_missing
                .iter()
                .map(|r| vec![r.row.to_string(), format!("{:.2}", r.missing_pct)]),
        );
        self.write_section(writer, "Rows with missing values", &rows)?;

        if report.duplicate_count > 0 {
            let examples: Vec<String> = report
                .duplicate_examples
                .iter()
                .map(|r| r.to_string())
                .collect();
            writeln!(
                writer,
                "Duplicate rows: {} (example rows: {})",
                report.duplicate_count,
                examples.join(", ")
            )?;
            writeln!(writer)?;
        }

        let mut suspicious = vec![vec![
            "column".to_string(),
            "space_issue".to_string(),
            "empty_after_trim".to_string(),
            "examples".to_string(),
        ]];
        suspicious.extend(report.suspicious_strings.iter().map(|s| {
            vec![
                s.column.clone(),
                s.leading_trailing_space.to_string(),
                s.empty_after_trim.to_string(),
                format!("{:?}", s.examples),
            ]
        }));
        self.write_section(writer, "Suspicious strings", &suspicious)?;

        let mut categorical = vec![vec![
            "column".to_string(),
            "unique".to_string(),
            "would merge to".to_string(),
        ]];
        categorical.extend(report.categorical_issues.iter().map(|c| {
            vec![
                c.column.clone(),
                c.unique_count.to_string(),
                c.normalized_sample.join(", "),
            ]
        }));
        self.write_section(writer, "Categorical inconsistencies", &categorical)?;

        let mut dates = vec![vec![
            "column".to_string(),
            "parseable_ratio".to_string(),
            "examples".to_string(),
        ]];
        dates.extend(report.date_like_columns.iter().map(|d| {
            vec![
                d.column.clone(),
                format!("{:.3}", d.parseable_ratio),
                format!("{:?}", d.examples),
            ]
        }));
        self.write_section(writer, "Partially date-like columns", &dates)?;

        let mut dtypes = vec![vec!["column".to_string(), "dtype".to_string()]];
        dtypes.extend(
            report
                .dtypes
                .iter()
                .map(|d| vec![d.column.clone(), d.dtype.clone()]),
        );
        self.write_section(writer, "Column dtypes", &dtypes)?;

        Ok(())
    }
}

/// Build a formatted table from data (first row is the header)
pub fn build_table(data: &[Vec<String>]) -> String {
    if data.is_empty() || data[0].is_empty() {
        return String::new();
    }

    let col_count = data[0].len();

    // Build column-aligned output manually
    let mut col_widths: Vec<usize> = vec![0; col_count];
    for row in data {
        for (i, cell) in row.iter().enumerate() {
            if i < col_widths.len() {
                col_widths[i] = col_widths[i].max(cell.chars().count());
            }
        }
    }

    let mut output = String::new();

    // Top border
    output.push('┌');
    for (i, width) in col_widths.iter().enumerate() {
        output.push_str(&"─".repeat(*width + 2));
        if i < col_widths.len() - 1 {
            output.push('┬');
        }
    }
    output.push_str("┐\n");

    // Header row
    if let Some(header) = data.first() {
        output.push('│');
        for (i, cell) in header.iter().enumerate() {
            let width = col_widths.get(i).copied().unwrap_or(0);
            output.push_str(&format!(" {:width$} │", cell, width = width));
        }
        output.push('\n');
    }

    // Header separator
    output.push('├');
    for (i, width) in col_widths.iter().enumerate() {
        output.push_str(&"─".repeat(*width + 2));
        if i < col_widths.len() - 1 {
            output.push('┼');
        }
    }
    output.push_str("┤\n");

    // Data rows
    for row in data.iter().skip(1) {
        output.push('│');
        for (i, cell) in row.iter().enumerate() {
            let width = col_widths.get(i).copied().unwrap_or(0);
            output.push_str(&format!(" {:width$} │", cell, width = width));
        }
        output.push('\n');
    }

    // Bottom border
    output.push('└');
    for (i, width) in col_widths.iter().enumerate() {
        output.push_str(&"─".repeat(*width + 2));
        if i < col_widths.len() - 1 {
            output.push('┴');
        }
    }
    output.push_str("┘\n");

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_table_alignment() {
        let data = vec![
            vec!["column".to_string(), "missing_%".to_string()],
            vec!["onpromotion".to_string(), "17.2".to_string()],
        ];
        let rendered = build_table(&data);
        assert!(rendered.contains("│ column      │ missing_% │"));
        assert!(rendered.contains("│ onpromotion │ 17.2      │"));
    }
}
