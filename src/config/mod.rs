//! Configuration management for the logo generator

use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{Result, LogoError};

pub mod catalog;
pub use catalog::*;

/// Default timeout for launching every target
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory the generated images are written to
    pub output_dir: PathBuf,

    /// Root under which per-input completion markers are kept
    pub cache_root: PathBuf,

    /// Maximum number of targets processed at once
    pub concurrency: usize,

    /// Deadline for launching workers, measured from the start of the run
    pub timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            cache_root: PathBuf::from("cache"),
            // Use number of logical CPUs, but cap at 16 to avoid excessive memory usage
            concurrency: num_cpus::get().min(16),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output directory
    pub fn output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the cache root directory
    pub fn cache_root<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cache_root = dir.as_ref().to_path_buf();
        self
    }

    /// Set the worker pool size
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the launch deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(LogoError::config("Concurrency must be greater than 0"));
        }

        if self.timeout.is_zero() {
            return Err(LogoError::config("Timeout must be greater than 0"));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(LogoError::config("Output directory must not be empty"));
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full `EnvFilter` directive
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.cache_root, PathBuf::from("cache"));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.concurrency > 0 && config.concurrency <= 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::new()
            .output_dir("icons")
            .cache_root("/tmp/logo-cache")
            .concurrency(3)
            .timeout(Duration::from_secs(5));

        assert_eq!(config.output_dir, PathBuf::from("icons"));
        assert_eq!(config.cache_root, PathBuf::from("/tmp/logo-cache"));
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_config() {
        assert!(PipelineConfig::new().concurrency(0).validate().is_err());
        assert!(PipelineConfig::new().timeout(Duration::ZERO).validate().is_err());
        assert!(PipelineConfig::new().output_dir("").validate().is_err());
    }
}
