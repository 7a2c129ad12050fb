//! Logo Generator - padded icon sets from a single source image
//!
//! Takes one square 1080x1080 logo (PNG, JPEG or GIF) and produces every
//! image listed in a dimension catalog. Each output has exactly the requested
//! size: the logo is scaled to fit, aspect ratio preserved, and centered on a
//! transparent canvas.
//!
//! # Features
//!
//! - **Concurrent**: targets are rendered on a bounded worker pool
//! - **Incremental**: completed outputs are recorded per input path and
//!   skipped on later runs
//! - **Catalogs**: JSON, YAML or TOML files, or the built-in app icon set
//! - **Output formats**: PNG, JPEG and GIF, chosen by file extension
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use logo_generator::{DimensionCatalog, LogoPipeline, PipelineConfig};
//!
//! # async fn example() -> logo_generator::Result<()> {
//! let catalog = DimensionCatalog::from_file("config/dimensions.json")?;
//! let pipeline = LogoPipeline::new(PipelineConfig::default().output_dir("output"));
//!
//! pipeline.run("logo.png", &catalog, pipeline.deadline()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod processing;
pub mod parallel;

// Re-export commonly used types
pub use config::{DimensionCatalog, DimensionSpec, LoggingConfig, PipelineConfig};
pub use error::{Result, LogoError};
pub use processing::{CompletionCache, OutputFormat, ProcessingEngine, ResizeCompositor, SourceImage, SourceLoader};
pub use parallel::{LogoPipeline, ProcessingOutcome, ProgressTracker, ProgressUpdate, RunReport};

use tracing::debug;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from `RUST_LOG`
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() -> Result<()> {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish()
    ).is_ok() {
        debug!("Logo generator v{} initialized", VERSION);
    }

    log_capabilities();

    Ok(())
}

/// Initialize logging with an explicit level and output format
pub fn init_with_config(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| LogoError::config(format!("Invalid log level {:?}: {}", config.level, e)))?;

    let installed = if config.json_format {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    };

    if installed {
        debug!("Logo generator v{} initialized with custom config", VERSION);
    }

    log_capabilities();

    Ok(())
}

fn log_capabilities() {
    debug!("Worker threads available: {}", num_cpus::get());
    debug!("Image format support:");
    debug!("  JPEG: {}", image::ImageFormat::Jpeg.can_read());
    debug!("  PNG: {}", image::ImageFormat::Png.can_read());
    debug!("  GIF: {}", image::ImageFormat::Gif.can_read());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_init() {
        // Should not fail on multiple calls
        let _ = init();
        let _ = init();
        assert!(init_with_config(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_init_rejects_bad_filter() {
        let config = LoggingConfig {
            level: "logo_generator=loud".to_string(),
            json_format: false,
        };
        assert!(matches!(init_with_config(&config), Err(LogoError::ConfigError { .. })));
    }
}
