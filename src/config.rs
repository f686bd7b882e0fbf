//! Configuration handling for tablepack

/// Default target and hard-limit size for a part file: 99 MiB
pub const DEFAULT_PART_BYTES: u64 = 99 * 1024 * 1024;

/// Default cap on the calibration sample, in rows
pub const DEFAULT_SAMPLE_ROWS: usize = 200_000;

/// Output format for quality reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
    Html,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(ReportFormat::Terminal),
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Configuration for the bounded-size partitioner
#[derive(Debug, Clone)]
pub struct PackConfig {
    /// Desired part size; subsequent row estimates steer toward this
    pub target_bytes: u64,
    /// Ceiling a part may not exceed (except an unsplittable single row)
    pub hard_limit_bytes: u64,
    /// Cap on the number of rows serialized during calibration
    pub sample_rows: usize,
    /// Suppress per-part progress output
    pub quiet: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            target_bytes: DEFAULT_PART_BYTES,
            hard_limit_bytes: DEFAULT_PART_BYTES,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            quiet: false,
        }
    }
}

impl PackConfig {
    /// Create a config with target and hard limit both set to `bytes`
    pub fn new(bytes: u64) -> Self {
        Self {
            target_bytes: bytes,
            hard_limit_bytes: bytes,
            ..Default::default()
        }
    }

    /// Set the target part size
    pub fn with_target_bytes(mut self, bytes: u64) -> Self {
        self.target_bytes = bytes;
        self
    }

    /// Set the hard part-size ceiling
    pub fn with_hard_limit_bytes(mut self, bytes: u64) -> Self {
        self.hard_limit_bytes = bytes;
        self
    }

    /// Set the calibration sample cap
    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows;
        self
    }

    /// Suppress progress output
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}
