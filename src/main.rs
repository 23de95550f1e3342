//! Crossstat - monthly border crossing statistics
//!
//! A CLI tool that sums crossing counts per border, measure and month
//! and reports each month alongside the average of its earlier months.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (bad arguments, unreadable input, malformed rows, write failure)

mod cli;
mod config;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use crossstat::models::RunSummary;
use crossstat::{compute, reader, report};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config() {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Config is loaded before logging so [general] verbose can raise the level
    let (config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&args, &config) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }

    info!("Crossstat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    if let Err(e) = run(&args, config) {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Handle --init-config: generate a default .crossstat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize date formats, delimiter, output and shards.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration from file or use defaults, then apply CLI overrides.
///
/// Also returns the file the settings came from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    let (mut config, source) = match args.config {
        Some(ref config_path) => (Config::load(config_path)?, Some(config_path.clone())),
        None => match Config::load_default()? {
            Some(config) => (config, Some(PathBuf::from(CONFIG_FILE))),
            None => (Config::default(), None),
        },
    };

    config.merge_with_args(args);
    config.validate(args.input_path())?;
    Ok((config, source))
}

/// Run the read, aggregate, report workflow.
fn run(args: &Args, config: Config) -> Result<()> {
    let start_time = Instant::now();
    let loud = !args.quiet;
    let input = args.input_path();

    // Step 1: Read records
    if loud {
        println!("📥 Reading records: {}", input.display());
    }
    let options = config.input.reader_options(loud)?;
    let records = reader::read_records(input, &options)?;

    // Step 2: Aggregate and compute averages
    if loud {
        println!("🔬 Aggregating ({} shard(s))...", config.aggregation.shards);
    }
    let stats = compute(&records, config.aggregation.shards)
        .with_context(|| format!("Failed to compute statistics for {}", input.display()))?;

    // Handle --dry-run: summarize and exit
    if args.dry_run {
        print_dry_run(&stats.summary, stats.rows.len());
        return Ok(());
    }

    // Step 3: Write the report
    let output = PathBuf::from(&config.output.path);
    if loud {
        println!("📝 Writing {} report...", config.output.format.extension());
    }
    report::write_report(&stats.rows, &output, config.output.format)?;

    let duration = start_time.elapsed().as_secs_f64();

    if loud {
        println!("\n📊 Run Summary:");
        println!("   Records read: {}", stats.summary.records);
        println!("   Values skipped: {}", stats.summary.skipped_values);
        println!("   Groups: {}", stats.summary.groups);
        println!("   Series: {}", stats.summary.series);
        println!("   Rows written: {}", stats.rows.len());
        println!("   Duration: {:.1}s", duration);
        println!("\n✅ Done! Report saved to: {}", output.display());
    }

    Ok(())
}

/// Handle --dry-run: print what would be written, write nothing.
fn print_dry_run(summary: &RunSummary, rows: usize) {
    println!("\n🔍 Dry run: no report written.\n");
    println!("   Records read: {}", summary.records);
    println!("   Values skipped: {}", summary.skipped_values);
    println!("   Groups: {}", summary.groups);
    println!("   Series: {}", summary.series);
    println!("   Rows that would be written: {}", rows);

    if summary.period_counts.0.is_empty() {
        println!("   No periods found.");
    } else {
        println!("\n   Periods per measure:");
        for (measure, count) in &summary.period_counts.0 {
            println!("     📅 {}: {}", measure, count);
        }
        if summary.period_counts.uniform().is_none() {
            println!("   ⚠️  Measures cover different numbers of periods.");
        }
    }

    println!("\n✅ Dry run complete.");
}
