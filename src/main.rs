//! Logo Generator CLI - padded icon sets from a single source image
//!
//! Reads one 1080x1080 logo and writes every image of a dimension catalog,
//! skipping outputs already produced for the same input path.

use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use logo_generator::{
    init_with_config, CompletionCache, DimensionCatalog, LoggingConfig, LogoPipeline,
    PipelineConfig, ProcessingOutcome, ProgressUpdate, RunReport,
};

/// Logo Generator - padded icon sets from a single source image
#[derive(Parser)]
#[command(
    name = "logo-generator",
    version,
    about = "Generate every icon size of a catalog from one 1080x1080 logo",
    long_about = "Logo Generator scales a square 1080x1080 PNG, JPEG or GIF logo into every size \
                  listed in a dimension catalog. Each output keeps the logo's aspect ratio and is \
                  centered on a transparent canvas of exactly the requested size. Outputs already \
                  produced for the same input path are skipped.",
    arg_required_else_help = false
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Source image (1080x1080 PNG, JPEG or GIF)
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    output: PathBuf,

    /// Dimension catalog file (.json, .yaml, .yml or .toml)
    #[arg(short, long, value_name = "FILE", default_value = "config/dimensions.json", global = true)]
    config: PathBuf,

    /// Use the built-in app icon catalog instead of a file
    #[arg(long, global = true)]
    builtin: bool,

    /// Deadline for starting every target (e.g. "90s", "2m")
    #[arg(short, long, value_name = "DURATION", default_value = "2m", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Number of targets processed at once (default: auto-detect)
    #[arg(short = 'j', long, value_name = "COUNT")]
    concurrency: Option<usize>,

    /// Root directory for completion markers
    #[arg(long, value_name = "DIR", default_value = "cache", global = true)]
    cache_dir: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Print the resolved dimension catalog
    Catalog {
        /// Print as JSON, in the catalog file format
        #[arg(long)]
        json: bool,
    },
    /// Remove the completion markers recorded for an input
    CleanCache {
        /// Source image whose markers should be removed
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.quiet {
            "error"
        } else if cli.verbose {
            "debug"
        } else {
            "info"
        }
        .to_string()
    });

    let logging = LoggingConfig {
        level,
        json_format: cli.json_logs,
    };

    if let Err(e) = init_with_config(&logging) {
        eprintln!("{}: Failed to initialize logging: {}",
                 style("Error").red().bold(), e.user_message());
        process::exit(1);
    }

    // Handle subcommands
    if let Some(ref command) = cli.command {
        if let Err(e) = handle_subcommand(command, &cli) {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
        return;
    }

    // Validate required arguments for main operation
    let Some(input_path) = cli.input.clone() else {
        eprintln!("{}: --input <PATH> is required",
                 style("Error").red().bold());
        eprintln!("Run with --help for usage information");
        process::exit(1);
    };

    let mut config = PipelineConfig::default()
        .output_dir(&cli.output)
        .cache_root(&cli.cache_dir)
        .timeout(cli.timeout);
    if let Some(concurrency) = cli.concurrency {
        config = config.concurrency(concurrency);
    }

    if let Err(e) = config.validate() {
        eprintln!("{}: {}", style("Error").red().bold(), e.user_message());
        process::exit(1);
    }

    let catalog = match load_catalog(&cli) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("{}: {}", style("Error").red().bold(), e.user_message());
            process::exit(1);
        }
    };

    let start_time = Instant::now();
    match run_generation(&cli, config, &input_path, &catalog).await {
        Ok(report) => {
            print_summary(&report, start_time.elapsed(), cli.quiet);
            if let Err(e) = report.into_result() {
                eprintln!("{}: {}", style("Error").red().bold(), e.user_message());
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", style("Error").red().bold(), e.user_message());
            process::exit(1);
        }
    }
}

/// Handle subcommands
fn handle_subcommand(command: &Commands, cli: &Cli) -> anyhow::Result<()> {
    match command {
        Commands::Catalog { json } => {
            let catalog = load_catalog(cli).map_err(|e| anyhow::anyhow!(e.user_message()))?;
            show_catalog(&catalog, *json)?;
        }
        Commands::CleanCache { input } => {
            let cache = CompletionCache::for_input(&cli.cache_dir, input);
            cache
                .clear()
                .with_context(|| format!("Failed to clean cache for {}", input.display()))?;

            println!("{}: Removed completion markers in {}",
                     style("Success").green().bold(),
                     cache.dir().display());
        }
    }
    Ok(())
}

/// Resolve the catalog from `--builtin` or `--config`
fn load_catalog(cli: &Cli) -> logo_generator::Result<DimensionCatalog> {
    if cli.builtin {
        debug!("Using built-in app icon catalog");
        return Ok(DimensionCatalog::app_icons());
    }

    let catalog = DimensionCatalog::from_file(&cli.config)?;
    debug!("Loaded {} dimensions from {:?}", catalog.len(), cli.config);
    Ok(catalog)
}

/// Load the source, then generate every target with a progress bar
async fn run_generation(
    cli: &Cli,
    config: PipelineConfig,
    input_path: &Path,
    catalog: &DimensionCatalog,
) -> logo_generator::Result<RunReport> {
    let pipeline = LogoPipeline::new(config);
    let deadline = pipeline.deadline();

    info!("Input: {:?}", input_path);
    info!("Output: {:?}", pipeline.config().output_dir);

    let source = pipeline.load_source(input_path, catalog).await?;

    // Set up progress bar
    let progress_task = if cli.quiet {
        None
    } else {
        let pb = ProgressBar::new(catalog.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-")
        );
        let receiver = pipeline.progress().subscribe();
        Some(tokio::spawn(drive_progress_bar(pb, receiver)))
    };

    let result = pipeline.process_with_report(source, catalog, deadline).await;

    // Dropping the pipeline closes the channel once every update is delivered
    drop(pipeline);
    if let Some(task) = progress_task {
        let _ = task.await;
    }

    result
}

async fn drive_progress_bar(
    pb: ProgressBar,
    mut receiver: tokio::sync::broadcast::Receiver<ProgressUpdate>,
) {
    loop {
        match receiver.recv().await {
            Ok(ProgressUpdate::Started { total_targets }) => pb.set_length(total_targets as u64),
            Ok(ProgressUpdate::TargetStarted { name }) => pb.set_message(name),
            Ok(ProgressUpdate::TargetProduced { .. } | ProgressUpdate::TargetSkipped { .. }) => pb.inc(1),
            Ok(ProgressUpdate::TargetFailed { name, .. }) => {
                pb.set_message(format!("failed: {}", name));
                pb.inc(1);
            }
            Ok(ProgressUpdate::Finished { .. }) => {
                pb.finish_with_message("Generation complete");
                break;
            }
            Err(RecvError::Lagged(skipped)) => debug!("Progress bar skipped {} updates", skipped),
            Err(RecvError::Closed) => {
                pb.abandon();
                break;
            }
        }
    }
}

/// Print the resolved catalog
fn show_catalog(catalog: &DimensionCatalog, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog).context("Failed to serialize catalog")?);
        return Ok(());
    }

    println!("{}", style("Dimension Catalog:").bold());
    println!();

    for spec in catalog {
        println!("  {:>5}x{:<5} {}", spec.width, spec.height, style(&spec.name).cyan());
    }

    println!();
    println!("{} targets", style(catalog.len()).bold());
    Ok(())
}

/// Print processing summary
fn print_summary(report: &RunReport, duration: Duration, quiet: bool) {
    if quiet {
        return;
    }

    println!();
    println!("{}", style("Generation Summary:").bold());
    println!("  {}: {}", style("Produced").green(), report.produced());
    println!("  {}: {}", style("Cached").cyan(), report.skipped());
    if report.failed() > 0 {
        println!("  {}: {}", style("Failed").red(), report.failed());
        for (name, outcome) in &report.outcomes {
            if let ProcessingOutcome::Failed(e) = outcome {
                println!("    {} {}", style(name).red(), style(e.root().user_message()).dim());
            }
        }
    }
    println!("  {}: {:.2}s", style("Duration").blue(), duration.as_secs_f64());
}
