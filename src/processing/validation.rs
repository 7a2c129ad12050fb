//! Source image validation

use std::path::Path;
use tracing::debug;

use crate::error::{Result, LogoError};

/// Side length every source image must have
pub const REQUIRED_SOURCE_SIDE: u32 = 1080;

/// Validator for the decoded source image
#[derive(Debug, Clone)]
pub struct SourceValidator {
    required_side: u32,
}

impl SourceValidator {
    /// Create a validator that requires a 1080x1080 source
    pub fn new() -> Self {
        Self {
            required_side: REQUIRED_SOURCE_SIDE,
        }
    }

    /// Create a validator requiring a different square side
    pub fn with_side(required_side: u32) -> Self {
        Self { required_side }
    }

    pub fn required_side(&self) -> u32 {
        self.required_side
    }

    /// Reject formats other than PNG, JPEG and GIF
    pub fn validate_format(&self, format: image::ImageFormat, path: &Path) -> Result<()> {
        match format {
            image::ImageFormat::Png | image::ImageFormat::Jpeg | image::ImageFormat::Gif => Ok(()),
            other => Err(LogoError::UnsupportedFormat {
                format: format_name(other),
                path: path.to_path_buf(),
            }),
        }
    }

    /// Require the exact square size
    pub fn validate_dimensions(&self, width: u32, height: u32, path: &Path) -> Result<()> {
        debug!("Validating source dimensions {}x{} for {:?}", width, height, path);

        if width != self.required_side || height != self.required_side {
            return Err(LogoError::DimensionMismatch {
                width,
                height,
                expected: self.required_side,
                path: path.to_path_buf(),
            });
        }

        Ok(())
    }
}

impl Default for SourceValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase name of an image crate format, e.g. "png" or "tif"
pub fn format_name(format: image::ImageFormat) -> String {
    format
        .extensions_str()
        .first()
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| format!("{:?}", format).to_lowercase())
}
