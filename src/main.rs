//! carelink-trend - Carelink CGM export reader
//!
//! Ingests a Carelink CSV export, classifies sensor, bolus and fingerstick
//! events, and optionally prints the per-day glucose moving average.
//!
//! # Usage
//!
//! ```bash
//! # Summary of an export
//! carelink-trend export.csv
//!
//! # Entries and 6-hour moving averages as JSON
//! carelink-trend export.csv --averages --window-hours 6 --format json
//! ```
//!
//! # Environment Variables
//!
//! - `CARELINK_CONFIG`: Path to a TOML config file (default: ./carelink.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use carelink_trend::config::AppConfig;
use carelink_trend::pipeline::{self, Ingested};
use carelink_trend::types::{DailyAverages, LogEntry};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "carelink-trend")]
#[command(about = "Carelink CGM export ingestion and glucose trend")]
#[command(version)]
struct CliArgs {
    /// Carelink CSV export to read
    file: PathBuf,

    /// Config file (overrides CARELINK_CONFIG and ./carelink.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Moving-average window in hours
    #[arg(long, value_name = "H")]
    window_hours: Option<f64>,

    /// Also compute per-day moving averages of sensor glucose
    #[arg(long)]
    averages: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load(),
    };
    if let Some(hours) = args.window_hours {
        config.trend.window_hours = hours;
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let engine = config.trend.engine().context("Invalid moving-average settings")?;

    let ingested = pipeline::ingest_file(&args.file, &config.ingest)
        .await
        .with_context(|| format!("Failed to ingest {}", args.file.display()))?;

    let averages = args.averages.then(|| engine.compute(&ingested.entries));
    if let Some(averages) = &averages {
        info!(
            dates = averages.len(),
            window_hours = config.trend.window_hours,
            "Moving averages computed"
        );
    }

    match args.format {
        OutputFormat::Text => print_text(&ingested, averages.as_ref()),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "stats": ingested.stats,
                "entries": ingested.entries,
                "averages": averages,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn print_text(ingested: &Ingested, averages: Option<&DailyAverages>) {
    let stats = &ingested.stats;
    println!("Lines read:      {}", stats.lines_read);
    println!("Skipped lines:   {}", stats.skipped_lines);
    println!("Records:         {}", stats.records);
    println!("Sensor readings: {}", stats.sensor_entries);
    println!("Boluses:         {}", stats.bolus_entries);
    println!("Measured BG:     {}", stats.measured_entries);
    if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
        println!("Span:            {first} .. {last}");
    }

    if let Some(LogEntry::SensorBg { timestamp, bg_value }) =
        ingested.entries.iter().find(|e| matches!(e, LogEntry::SensorBg { .. }))
    {
        println!("Latest sensor:   {bg_value} mg/dL at {timestamp}");
    }

    let Some(averages) = averages else {
        return;
    };
    for (date, points) in averages {
        println!();
        println!("{date} ({} points)", points.len());
        for point in points {
            println!("  {}  {:>6.1}", point.timestamp.format("%H:%M"), point.value);
        }
    }
}
