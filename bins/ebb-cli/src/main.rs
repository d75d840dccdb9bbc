//! ebb-cli: operator tooling for the Ebb contribution engine.
//!
//! Inspects the rate curve of a campaign configuration and replays
//! contribution scripts against an in-memory campaign.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ebb_campaign::CampaignConfig;
use ebb_curve::RateCurve;
use tracing::info;

mod script;
mod units;

use script::Script;
use units::{format_units, parse_units};

/// Ebb campaign operator CLI.
#[derive(Parser, Debug)]
#[command(name = "ebb-cli", version, about = "Decaying-rate contribution engine tooling")]
struct Cli {
    /// Campaign config file (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rate of a batch index.
    Rate(RateArgs),
    /// Average rate over a cumulative-volume range.
    Average(AverageArgs),
    /// Volume at which the rate first drops below a floor.
    Cap(CapArgs),
    /// Replay a JSON script and print a JSON report.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
struct RateArgs {
    /// Batch index.
    #[arg(short, long)]
    batch: u64,
}

#[derive(Args, Debug)]
struct AverageArgs {
    /// Range start in units (e.g. 31 or 31.5).
    #[arg(short, long)]
    start: String,

    /// Range end in units, exclusive.
    #[arg(short, long)]
    end: String,
}

#[derive(Args, Debug)]
struct CapArgs {
    /// Minimum acceptable rate (e.g. 98.5).
    #[arg(short, long)]
    min_rate: String,

    /// Cumulative volume to search from, in units.
    #[arg(short, long, default_value = "0")]
    from: String,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Path to the script file.
    #[arg(short, long)]
    script: PathBuf,

    /// Abort on the first failing step.
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = match &cli.config {
        Some(path) => CampaignConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CampaignConfig::default(),
    };

    match cli.command {
        Commands::Rate(args) => cmd_rate(&config, args),
        Commands::Average(args) => cmd_average(&config, args),
        Commands::Cap(args) => cmd_cap(&config, args),
        Commands::Simulate(args) => cmd_simulate(&config, args),
    }
}

fn curve(config: &CampaignConfig) -> Result<RateCurve> {
    RateCurve::new(config.rate).context("Invalid rate parameters")
}

fn cmd_rate(config: &CampaignConfig, args: RateArgs) -> Result<()> {
    let curve = curve(config)?;
    let rate = curve.rate_at(args.batch)?;
    let start = curve.batch_start(args.batch)?;
    println!("Batch:       {}", args.batch);
    println!("Batch start: {} units", format_units(start));
    println!("Rate:        {} ({rate})", format_units(rate));
    Ok(())
}

fn cmd_average(config: &CampaignConfig, args: AverageArgs) -> Result<()> {
    let curve = curve(config)?;
    let start = parse_units(&args.start)?;
    let end = parse_units(&args.end)?;
    let average = curve.average_rate(start, end)?;
    println!("Range:   [{}, {}) units", format_units(start), format_units(end));
    println!("Average: {} ({average})", format_units(average));
    Ok(())
}

fn cmd_cap(config: &CampaignConfig, args: CapArgs) -> Result<()> {
    let curve = curve(config)?;
    let min_rate = parse_units(&args.min_rate)?;
    let from = parse_units(&args.from)?;
    match curve.volume_cap_for_rate(min_rate, from)? {
        Some(cap) => println!("Cap: {} units ({cap})", format_units(cap)),
        None => println!("Cap: none (rate never drops below {})", format_units(min_rate)),
    }
    Ok(())
}

fn cmd_simulate(config: &CampaignConfig, args: SimulateArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let script = Script::from_json_str(&raw)?;

    info!(script = %args.script.display(), steps = script.steps.len(), "Replaying script");
    let report = script.run(config, args.strict)?;
    info!(failures = report.failures(), "Replay finished");

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Initialize the tracing subscriber with level filter and format.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    // Logs go to stderr so reports on stdout stay machine-readable.
    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
