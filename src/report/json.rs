//! JSON output for quality reports

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::quality::QualityReport;

use super::ReportFormatter;

/// JSON report formatter
pub struct JsonReport {
    pretty: bool,
}

impl JsonReport {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonQualityOutput<'a> {
    source: String,
    #[serde(flatten)]
    report: &'a QualityReport,
}

impl ReportFormatter for JsonReport {
    fn render(
        &self,
        report: &QualityReport,
        source: &Path,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let output = JsonQualityOutput {
            source: source.display().to_string(),
            report,
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &output)?;
        } else {
            serde_json::to_writer(&mut *writer, &output)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}
