//! The known tables of the retail sales dataset and the batch pipeline

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::PackConfig;
use crate::parser::ParserFactory;
use crate::partition::partition;
use crate::writer::{write_table, ParquetSerializer};

/// One of the raw dataset tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Oil,
    Items,
    HolidaysEvents,
    Stores,
    Transactions,
    Train,
    Test,
}

impl Dataset {
    /// All known tables, in preparation order
    pub const ALL: [Dataset; 7] = [
        Dataset::Oil,
        Dataset::Items,
        Dataset::HolidaysEvents,
        Dataset::Stores,
        Dataset::Transactions,
        Dataset::Train,
        Dataset::Test,
    ];

    /// Table name as used in file names
    pub fn name(self) -> &'static str {
        match self {
            Dataset::Oil => "oil",
            Dataset::Items => "items",
            Dataset::HolidaysEvents => "holidays_events",
            Dataset::Stores => "stores",
            Dataset::Transactions => "transactions",
            Dataset::Train => "train",
            Dataset::Test => "test",
        }
    }

    /// Whether this table is split into bounded-size packages.
    ///
    /// Only `train` is large enough to need splitting; the rest fit
    /// comfortably in a single Parquet file.
    pub fn is_partitioned(self) -> bool {
        matches!(self, Dataset::Train)
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::ALL
            .into_iter()
            .find(|d| d.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown dataset: {}", s))
    }
}

/// Prepare raw CSV tables into Parquet under `out_dir`.
///
/// Each dataset is read from `<raw_dir>/<name>.csv`; partitioned tables
/// become a `<out_dir>/<name>/` package, everything else a single
/// `<out_dir>/<name>.parquet`.
pub fn prepare(
    raw_dir: &Path,
    out_dir: &Path,
    datasets: &[Dataset],
    config: &PackConfig,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let factory = ParserFactory::new();
    for dataset in datasets {
        let input = raw_dir.join(format!("{}.csv", dataset.name()));
        let table = factory
            .parse(&input)
            .with_context(|| format!("Failed to load dataset: {}", input.display()))?;

        if dataset.is_partitioned() {
            partition(&table, dataset.name(), out_dir, config, &ParquetSerializer)?;
        } else {
            let out = out_dir.join(format!("{}.parquet", dataset.name()));
            let bytes = write_table(&table, &out)?;
            if !config.quiet {
                println!(
                    "   {}: {:.2} MB",
                    dataset.name(),
                    bytes as f64 / (1024.0 * 1024.0)
                );
            }
        }
    }
    Ok(())
}
