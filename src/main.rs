//! tablepack - Bounded-size Parquet packaging for tabular data

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use tablepack::aggregate::{add_calendar_columns, aggregate, AggFunc, Metric, TimeGrain};
use tablepack::config::{PackConfig, ReportFormat, DEFAULT_SAMPLE_ROWS};
use tablepack::dataset::{self, Dataset};
use tablepack::parser::ParserFactory;
use tablepack::partition::partition;
use tablepack::quality::build_quality_report;
use tablepack::report::{build_table, render_to_stdout, ReportFactory, ReportFormatter};
use tablepack::writer::{write_table, ParquetSerializer};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliReportFormat {
    Terminal,
    Json,
    Html,
}

impl From<CliReportFormat> for ReportFormat {
    fn from(f: CliReportFormat) -> Self {
        match f {
            CliReportFormat::Terminal => ReportFormat::Terminal,
            CliReportFormat::Json => ReportFormat::Json,
            CliReportFormat::Html => ReportFormat::Html,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliGrain {
    Daily,
    Weekly,
    Monthly,
}

impl From<CliGrain> for TimeGrain {
    fn from(g: CliGrain) -> Self {
        match g {
            CliGrain::Daily => TimeGrain::Daily,
            CliGrain::Weekly => TimeGrain::Weekly,
            CliGrain::Monthly => TimeGrain::Monthly,
        }
    }
}

/// Bounded-size Parquet packaging, aggregation, and data-quality checks
/// for tabular data (CSV, Parquet)
#[derive(Parser, Debug)]
#[command(name = "tablepack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a table into bounded-size Parquet parts
    Pack {
        /// Table to split (CSV or Parquet)
        input: PathBuf,

        /// Package name; defaults to the input file stem
        #[arg(short, long)]
        name: Option<String>,

        /// Directory the package directory is created under
        #[arg(short, long)]
        out: PathBuf,

        /// Target part size in MiB
        #[arg(long, default_value_t = 99.0)]
        target_mb: f64,

        /// Hard part-size ceiling in MiB; defaults to the target
        #[arg(long)]
        hard_limit_mb: Option<f64>,

        /// Calibration sample cap in rows
        #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
        sample_rows: usize,
    },

    /// Convert a table to a single Parquet or CSV file
    Convert {
        /// Input table (CSV, Parquet file, or package directory)
        input: PathBuf,

        /// Output file (.parquet or .csv)
        output: PathBuf,

        /// Derive year/month/week/dow columns from this date column first
        #[arg(long)]
        calendar: Option<String>,
    },

    /// Run the batch pipeline over the raw dataset tables
    Prepare {
        /// Directory holding the raw <name>.csv files
        #[arg(long)]
        raw_dir: PathBuf,

        /// Directory the prepared Parquet lands in
        #[arg(long)]
        out_dir: PathBuf,

        /// Only prepare these datasets (comma-separated); all by default
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Target part size in MiB for partitioned tables
        #[arg(long, default_value_t = 99.0)]
        target_mb: f64,
    },

    /// Group a table and aggregate metric columns
    Aggregate {
        /// Input table (CSV, Parquet file, or package directory)
        input: PathBuf,

        /// Columns to group by (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        group: Vec<String>,

        /// Date column to bucket by the time grain
        #[arg(long)]
        date_col: Option<String>,

        /// Time grain; requires --date-col
        #[arg(long, value_enum)]
        grain: Option<CliGrain>,

        /// Columns to sum (comma-separated)
        #[arg(long, value_delimiter = ',')]
        sum: Vec<String>,

        /// Columns to average (comma-separated)
        #[arg(long, value_delimiter = ',')]
        mean: Vec<String>,

        /// Columns to take the minimum of (comma-separated)
        #[arg(long, value_delimiter = ',')]
        min: Vec<String>,

        /// Columns to take the maximum of (comma-separated)
        #[arg(long, value_delimiter = ',')]
        max: Vec<String>,

        /// Columns to count non-null values of (comma-separated)
        #[arg(long, value_delimiter = ',')]
        count: Vec<String>,

        /// Write the result here (.parquet or .csv) instead of previewing
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Preview row limit when printing to stdout
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Check a table for data-quality issues
    Quality {
        /// Input table (CSV, Parquet file, or package directory)
        input: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: CliReportFormat,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1) // Quality issues found
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    let factory = ParserFactory::new();

    match cli.command {
        Command::Pack {
            input,
            name,
            out,
            target_mb,
            hard_limit_mb,
            sample_rows,
        } => {
            let name = match name {
                Some(name) => name,
                None => input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
                    .context("Cannot derive a package name from the input path; use --name")?,
            };
            let config = PackConfig::new(mib_to_bytes(target_mb)?)
                .with_hard_limit_bytes(mib_to_bytes(hard_limit_mb.unwrap_or(target_mb))?)
                .with_sample_rows(sample_rows)
                .with_quiet(cli.quiet);

            let table = factory
                .parse(&input)
                .with_context(|| format!("Failed to load table: {}", input.display()))?;
            partition(&table, &name, &out, &config, &ParquetSerializer)?;
            Ok(true)
        }

        Command::Convert {
            input,
            output,
            calendar,
        } => {
            let mut table = factory
                .parse(&input)
                .with_context(|| format!("Failed to load table: {}", input.display()))?;
            if let Some(date_col) = calendar {
                add_calendar_columns(&mut table, &date_col)?;
            }
            let bytes = write_table(&table, &output)?;
            if !cli.quiet {
                println!(
                    "Wrote {} rows ({:.2} MB) to {}",
                    table.row_count(),
                    bytes as f64 / (1024.0 * 1024.0),
                    output.display()
                );
            }
            Ok(true)
        }

        Command::Prepare {
            raw_dir,
            out_dir,
            only,
            target_mb,
        } => {
            let datasets: Vec<Dataset> = if only.is_empty() {
                Dataset::ALL.to_vec()
            } else {
                only.iter()
                    .map(|name| name.parse().map_err(anyhow::Error::msg))
                    .collect::<Result<_>>()?
            };
            let config = PackConfig::new(mib_to_bytes(target_mb)?).with_quiet(cli.quiet);
            dataset::prepare(&raw_dir, &out_dir, &datasets, &config)?;
            Ok(true)
        }

        Command::Aggregate {
            input,
            group,
            date_col,
            grain,
            sum,
            mean,
            min,
            max,
            count,
            out,
            limit,
        } => {
            let mut metrics = Vec::new();
            for (columns, func) in [
                (&sum, AggFunc::Sum),
                (&mean, AggFunc::Mean),
                (&min, AggFunc::Min),
                (&max, AggFunc::Max),
                (&count, AggFunc::Count),
            ] {
                metrics.extend(columns.iter().map(|c| Metric::new(c.clone(), func)));
            }
            if metrics.is_empty() {
                bail!("No metrics requested; use --sum/--mean/--min/--max/--count");
            }

            let date = match (&date_col, grain) {
                (Some(col), grain) => {
                    Some((col.as_str(), grain.map_or(TimeGrain::Daily, Into::into)))
                }
                (None, Some(_)) => bail!("--grain requires --date-col"),
                (None, None) => None,
            };

            let table = factory
                .parse(&input)
                .with_context(|| format!("Failed to load table: {}", input.display()))?;
            let result = aggregate(&table, &group, date, &metrics)?;

            match out {
                Some(path) => {
                    write_table(&result, &path)?;
                    if !cli.quiet {
                        println!("Wrote {} groups to {}", result.row_count(), path.display());
                    }
                }
                None => print_preview(&result, limit),
            }
            Ok(true)
        }

        Command::Quality { input, format, out } => {
            let table = factory
                .parse(&input)
                .with_context(|| format!("Failed to load table: {}", input.display()))?;
            let report = build_quality_report(&table);

            match out {
                Some(path) => {
                    let mut file = std::fs::File::create(&path).with_context(|| {
                        format!("Failed to create report file: {}", path.display())
                    })?;
                    ReportFactory::create(format.into()).render(&report, &input, &mut file)?;
                    if !cli.quiet {
                        println!("Report written to {}", path.display());
                    }
                }
                None => render_to_stdout(&report, &input, format.into())?,
            }
            Ok(!report.has_issues())
        }
    }
}

fn mib_to_bytes(mib: f64) -> Result<u64> {
    if mib <= 0.0 {
        bail!("Size in MiB must be positive, got {}", mib);
    }
    Ok((mib * 1024.0 * 1024.0) as u64)
}

fn print_preview(table: &tablepack::Table, limit: usize) {
    let mut data = vec![table
        .columns
        .iter()
        .map(|c| c.name.clone())
        .collect::<Vec<_>>()];
    for row in table.rows.iter().take(limit) {
        data.push(row.cells.iter().map(|c| c.display().into_owned()).collect());
    }
    print!("{}", build_table(&data));
    if table.row_count() > limit {
        println!("({} of {} groups shown)", limit, table.row_count());
    }
}
