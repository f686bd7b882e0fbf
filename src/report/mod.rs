//! Output formatting for quality reports

mod html;
mod json;
mod terminal;

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use crate::config::ReportFormat;
use crate::quality::QualityReport;

pub use html::HtmlReport;
pub use json::JsonReport;
pub use terminal::{build_table, TerminalReport};

/// Trait for quality-report formatters
pub trait ReportFormatter {
    /// Render a quality report to a writer
    fn render(
        &self,
        report: &QualityReport,
        source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()>;
}

/// Factory for creating report formatters
pub struct ReportFactory;

impl ReportFactory {
    /// Create a formatter for the requested format
    pub fn create(format: ReportFormat) -> Box<dyn ReportFormatter> {
        match format {
            ReportFormat::Terminal => Box::new(TerminalReport::new()),
            ReportFormat::Json => Box::new(JsonReport::new()),
            ReportFormat::Html => Box::new(HtmlReport::new()),
        }
    }
}

/// Render a quality report to stdout
pub fn render_to_stdout(
    report: &QualityReport,
    source: &Path,
    format: ReportFormat,
) -> Result<()> {
    let formatter = ReportFactory::create(format);
    let mut stdout = std::io::stdout();
    formatter.render(report, source, &mut stdout)
}
