//! Standalone HTML report output

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use anyhow::Result;

use crate::quality::QualityReport;

use super::ReportFormatter;

/// HTML report output
pub struct HtmlReport;

impl HtmlReport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for HtmlReport {
    fn render(
        &self,
        report: &QualityReport,
        source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()> {
        writeln!(writer, "<!DOCTYPE html>")?;
        writeln!(writer, "<html lang=\"en\">")?;
        writeln!(writer, "<head>")?;
        writeln!(writer, "  <meta charset=\"UTF-8\">")?;
        writeln!(
            writer,
            "  <title>Data Quality Report: {}</title>",
            html_escape(source.display().to_string())
        )?;
        writeln!(writer, "  <style>")?;
        writeln!(writer, "{}", CSS_STYLES)?;
        writeln!(writer, "  </style>")?;
        writeln!(writer, "</head>")?;
        writeln!(writer, "<body>")?;

        writeln!(writer, "  <h1>Data Quality Report</h1>")?;
        writeln!(
            writer,
            "  <p class=\"meta\">{}</p>",
            html_escape(source.display().to_string())
        )?;
        writeln!(writer, "  <div class=\"badges\">")?;
        writeln!(writer, "    <span>Rows: {}</span>", report.rows)?;
        writeln!(writer, "    <span>Columns: {}</span>", report.columns)?;
        writeln!(
            writer,
            "    <span class=\"{}\">Duplicate rows: {}</span>",
            if report.duplicate_count > 0 { "warn" } else { "" },
            report.duplicate_count
        )?;
        writeln!(writer, "  </div>")?;

        if !report.has_issues() {
            writeln!(
                writer,
                "  <div class=\"card\"><p><em>No quality issues found.</em></p></div>"
            )?;
        }

        write_card(
            writer,
            "Missing values by column",
            &["column", "missing_%"],
            report
                .missing_by_column
                .iter()
                .map(|m| vec![m.column.clone(), format!("{:.2}", m.missing_pct)]),
        )?;

        write_card(
            writer,
            "Rows with missing values (top 20)",
            &["row", "missing_%"],
            report
                .rows_with_missing
                .iter()
                .map(|r| vec![r.row.to_string(), format!("{:.2}", r.missing_pct)]),
        )?;

        write_card(
            writer,
            "Suspicious strings",
            &["column", "space_issue", "empty_after_trim", "examples"],
            report.suspicious_strings.iter().map(|s| {
                vec![
                    s.column.clone(),
                    s.leading_trailing_space.to_string(),
                    s.empty_after_trim.to_string(),
                    format!("{:?}", s.examples),
                ]
            }),
        )?;

        write_card(
            writer,
            "Categorical inconsistencies",
            &["column", "unique", "original sample", "normalized sample"],
            report.categorical_issues.iter().map(|c| {
                vec![
                    c.column.clone(),
                    c.unique_count.to_string(),
                    c.original_sample.join(", "),
                    c.normalized_sample.join(", "),
                ]
            }),
        )?;

        write_card(
            writer,
            "Partially date-like columns",
            &["column", "parseable_ratio", "examples"],
            report.date_like_columns.iter().map(|d| {
                vec![
                    d.column.clone(),
                    format!("{:.3}", d.parseable_ratio),
                    format!("{:?}", d.examples),
                ]
            }),
        )?;

        write_card(
            writer,
            "Column dtypes",
            &["column", "dtype"],
            report
                .dtypes
                .iter()
                .map(|d| vec![d.column.clone(), d.dtype.clone()]),
        )?;

        writeln!(writer, "</body>")?;
        writeln!(writer, "</html>")?;
        Ok(())
    }
}

fn write_card<I>(
    writer: &mut dyn Write,
    title: &str,
    headers: &[&str],
    rows: I,
) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    let rows: Vec<Vec<String>> = rows.collect();
    if rows.is_empty() {
        return Ok(());
    }

    writeln!(writer, "  <div class=\"card\">")?;
    writeln!(writer, "    <h2>{}</h2>", html_escape(title))?;
    writeln!(writer, "    <table>")?;
    write!(writer, "      <tr>")?;
    for header in headers {
        write!(writer, "<th>{}</th>", html_escape(*header))?;
    }
    writeln!(writer, "</tr>")?;
    for row in rows {
        write!(writer, "      <tr>")?;
        for cell in row {
            write!(writer, "<td>{}</td>", html_escape(cell))?;
        }
        writeln!(writer, "</tr>")?;
    }
    writeln!(writer, "    </table>")?;
    writeln!(writer, "  </div>")?;
    Ok(())
}

fn html_escape<'a>(input: impl Into<Cow<'a, str>>) -> String {
    input
        .into()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const CSS_STYLES: &str = r#"    body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Arial, sans-serif; margin: 24px; line-height: 1.35; }
    h1 { margin: 0 0 8px; }
    h2 { margin: 0 0 10px; font-size: 18px; }
    .meta { color: #444; margin-bottom: 18px; }
    .badges span { display: inline-block; padding: 4px 10px; border-radius: 999px; background: #f3f4f6; margin-right: 6px; }
    .warn { background: #fff3cd !important; }
    .card { border: 1px solid #e5e7eb; border-radius: 12px; padding: 16px; margin: 14px 0; }
    table { border-collapse: collapse; width: 100%; }
    th, td { text-align: left; padding: 8px; border-bottom: 1px solid #eee; vertical-align: top; }
    th { background: #fafafa; }"#;
