//! Discrete sampling geometry converter.
//!
//! Classifies CF datasets, expands them into CSV tables and compacts CSV
//! tables back into orthogonal multidimensional timeseries datasets.
//! Datasets are JSON files, or netCDF files when built with the `netcdf`
//! feature.

mod csv_io;

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use cf_dataset::Dataset;
use clap::{Parser, Subcommand};
use dsg::{AttributeConfig, Diagnostics, DsgConfig, Geometry};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "dsg-convert")]
#[command(about = "Classify and convert CF discrete sampling geometry datasets")]
struct Args {
    /// Configuration file path (YAML); DSG_* environment variables override it
    #[arg(short, long, env = "DSG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the geometry of a dataset
    Classify {
        /// Dataset file (.json, or .nc with the netcdf feature)
        input: PathBuf,
    },

    /// Expand a dataset into a CSV table
    Expand {
        /// Dataset file (.json, or .nc with the netcdf feature)
        input: PathBuf,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Geometry to use instead of detecting it
        #[arg(short, long)]
        geometry: Option<String>,

        /// Drop columns whose cells are all missing
        #[arg(long)]
        clean_cols: Option<bool>,

        /// Drop rows without any data values
        #[arg(long)]
        clean_rows: Option<bool>,

        /// Write diagnostics as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Compact a CSV table into a dataset
    Compact {
        /// Input CSV file
        input: PathBuf,

        /// Output dataset file (.json, or .nc with the netcdf feature)
        #[arg(short, long)]
        output: PathBuf,

        /// Target geometry
        #[arg(short, long, default_value = "orthogonal_multidimensional_timeseries")]
        geometry: String,

        /// JSON attribute file: {"global": {...}, "<variable>": {...}}
        #[arg(short, long)]
        attributes: Option<PathBuf>,

        /// Write diagnostics as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Classify { input } => classify(&input),
        Command::Expand {
            input,
            output,
            geometry,
            clean_cols,
            clean_rows,
            report,
        } => {
            let mut config = config;
            config.clean_cols = clean_cols.or(config.clean_cols);
            config.clean_rows = clean_rows.or(config.clean_rows);
            expand(&config, &input, output.as_deref(), geometry.as_deref(), report.as_deref())
        }
        Command::Compact {
            input,
            output,
            geometry,
            attributes,
            report,
        } => compact(
            &config,
            &input,
            &output,
            &geometry,
            attributes.as_deref(),
            report.as_deref(),
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<DsgConfig> {
    let mut config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            DsgConfig::from_yaml_file(path)?
        }
        None => DsgConfig::default(),
    };
    config.apply_env();
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {}", e))?;
    Ok(config)
}

fn classify(input: &Path) -> Result<()> {
    let ds = read_dataset(input)?;
    let matching = Geometry::matching(&ds);
    info!(input = %input.display(), matches = matching.len(), "Classified dataset");

    if matching.is_empty() {
        bail!("{}: no supported geometry matches", input.display());
    }
    for geometry in matching {
        println!("{}", geometry);
    }
    Ok(())
}

fn expand(
    config: &DsgConfig,
    input: &Path,
    output: Option<&Path>,
    geometry: Option<&str>,
    report: Option<&Path>,
) -> Result<()> {
    let ds = read_dataset(input)?;
    let geometry = match geometry {
        Some(name) => name.parse::<Geometry>()?,
        None => Geometry::detect(&ds)?,
    };
    let options = config.expand_options(&geometry.default_expand_options());
    info!(
        geometry = %geometry,
        clean_cols = options.clean_cols,
        clean_rows = options.clean_rows,
        "Expanding dataset"
    );

    let expanded = geometry.to_dataframe(&ds, &options)?;
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            csv_io::write_frame(&expanded.frame, BufWriter::new(file))?;
        }
        None => csv_io::write_frame(&expanded.frame, io::stdout().lock())?,
    }

    info!(
        rows = expanded.frame.len(),
        columns = expanded.frame.width(),
        diagnostics = expanded.diagnostics.len(),
        "Expansion complete"
    );
    write_report(report, &expanded.diagnostics)
}

fn compact(
    config: &DsgConfig,
    input: &Path,
    output: &Path,
    geometry: &str,
    attributes: Option<&Path>,
    report: Option<&Path>,
) -> Result<()> {
    let geometry = geometry.parse::<Geometry>()?;
    let attributes = match attributes {
        Some(path) => AttributeConfig::from_json_file(path)
            .with_context(|| format!("loading attributes from {}", path.display()))?,
        None => AttributeConfig::default(),
    };
    let options = config.compact_options(attributes)?;

    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let frame = csv_io::read_frame(BufReader::new(file))?;
    info!(geometry = %geometry, rows = frame.len(), "Compacting table");

    let compacted = geometry.from_dataframe(&frame, &options)?;
    write_dataset(&compacted.dataset, output)?;

    info!(
        output = %output.display(),
        variables = compacted.dataset.variables().len(),
        diagnostics = compacted.diagnostics.len(),
        "Compaction complete"
    );
    write_report(report, &compacted.diagnostics)
}

fn write_report(path: Option<&Path>, diagnostics: &Diagnostics) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), diagnostics)?;
    Ok(())
}

fn is_netcdf(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("nc" | "nc4" | "cdf")
    )
}

fn read_dataset(path: &Path) -> Result<Dataset> {
    if is_netcdf(path) {
        return read_netcdf(path);
    }
    Dataset::read_json(path).with_context(|| format!("reading {}", path.display()))
}

fn write_dataset(ds: &Dataset, path: &Path) -> Result<()> {
    if is_netcdf(path) {
        return write_netcdf(ds, path);
    }
    ds.write_json(path)
        .with_context(|| format!("writing {}", path.display()))
}

#[cfg(feature = "netcdf")]
fn read_netcdf(path: &Path) -> Result<Dataset> {
    cf_dataset::read_netcdf(path).with_context(|| format!("reading {}", path.display()))
}

#[cfg(feature = "netcdf")]
fn write_netcdf(ds: &Dataset, path: &Path) -> Result<()> {
    cf_dataset::write_netcdf(ds, path).with_context(|| format!("writing {}", path.display()))
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf(path: &Path) -> Result<Dataset> {
    tracing::warn!(path = %path.display(), "netCDF support not compiled in");
    bail!("{}: rebuild with --features netcdf to read netCDF files", path.display())
}

#[cfg(not(feature = "netcdf"))]
fn write_netcdf(_ds: &Dataset, path: &Path) -> Result<()> {
    tracing::warn!(path = %path.display(), "netCDF support not compiled in");
    bail!("{}: rebuild with --features netcdf to write netCDF files", path.display())
}
