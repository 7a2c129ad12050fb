//! Error types and handling for the logo generator

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for logo generator operations
pub type Result<T> = std::result::Result<T, LogoError>;

/// Main error type for logo generator operations
#[derive(Debug, Error)]
pub enum LogoError {
    /// Dimension catalog unreadable, malformed or empty
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Source bytes could not be parsed as an image
    #[error("Failed to decode image {path:?}: {source}")]
    DecodeError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Source decoded but its format is not PNG, JPEG or GIF
    #[error("Unsupported image format: {format} (file: {path:?})")]
    UnsupportedFormat { format: String, path: PathBuf },

    /// Source is not the required square size
    #[error("Image dimensions must be {expected}x{expected}, got {width}x{height} (file: {path:?})")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: u32,
        path: PathBuf,
    },

    /// Output file extension has no encoder
    #[error("Unsupported output format: {extension:?} (file: {path:?})")]
    UnsupportedOutputFormat { extension: String, path: PathBuf },

    /// Encoder failed while writing an output file
    #[error("Failed to encode {path:?}: {source}")]
    EncodeError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// File create/read/write or mkdir failure
    #[error("{operation} failed for {path:?}: {source}")]
    IoError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Deadline elapsed before every worker could be launched
    #[error("Processing timed out after launching {launched} of {total} targets")]
    Timeout { launched: usize, total: usize },

    /// A single target failed to resize or encode
    #[error("Failed to produce {name}: {source}")]
    TargetFailed {
        name: String,
        #[source]
        source: Box<LogoError>,
    },

    /// Worker task panicked or was aborted
    #[error("Parallel processing error: {message}")]
    ParallelError { message: String },
}

impl LogoError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new I/O error tagged with the operation that failed
    pub fn io<P: Into<PathBuf>>(operation: &'static str, path: P, source: std::io::Error) -> Self {
        Self::IoError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create a new unsupported output format error
    pub fn unsupported_output<S: Into<String>, P: Into<PathBuf>>(extension: S, path: P) -> Self {
        Self::UnsupportedOutputFormat {
            extension: extension.into(),
            path: path.into(),
        }
    }

    /// Create a new parallel processing error
    pub fn parallel<S: Into<String>>(message: S) -> Self {
        Self::ParallelError {
            message: message.into(),
        }
    }

    /// Wrap a worker failure with the name of the target it was producing
    pub fn target<S: Into<String>>(name: S, source: LogoError) -> Self {
        Self::TargetFailed {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Check if this error was caused by the source image or the catalog,
    /// i.e. it aborted the run before any worker started
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. }
                | Self::DecodeError { .. }
                | Self::UnsupportedFormat { .. }
                | Self::DimensionMismatch { .. }
        )
    }

    /// Innermost error of a `TargetFailed` chain, or `self`
    pub fn root(&self) -> &LogoError {
        match self {
            Self::TargetFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigError { message } => message.clone(),
            Self::DimensionMismatch {
                width,
                height,
                expected,
                ..
            } => format!(
                "The source image is {}x{}. Provide a square {}x{} PNG, JPEG or GIF.",
                width, height, expected, expected
            ),
            Self::UnsupportedFormat { format, .. } => format!(
                "Unsupported source format: {}. Supported formats: PNG, JPEG, GIF",
                format
            ),
            Self::UnsupportedOutputFormat { extension, .. } => format!(
                "Cannot write {:?} files. Output names must end in .png, .jpg, .jpeg or .gif",
                extension
            ),
            Self::Timeout { launched, total } => format!(
                "Processing took too long: only {} of {} targets were started. Try a longer --timeout.",
                launched, total
            ),
            Self::TargetFailed { name, source } => {
                format!("{}: {}", name, source.user_message())
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for LogoError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(format!("JSON parsing error: {}", err))
    }
}

impl From<toml::de::Error> for LogoError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for LogoError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::config(format!("YAML parsing error: {}", err))
    }
}

/// Error context extension for attaching a path and operation to I/O failures
pub trait IoContext<T> {
    /// Tag an `io::Error` with the failing operation and path
    fn io_context<P: Into<PathBuf>>(self, operation: &'static str, path: P) -> Result<T>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context<P: Into<PathBuf>>(self, operation: &'static str, path: P) -> Result<T> {
        self.map_err(|e| LogoError::io(operation, path, e))
    }
}
