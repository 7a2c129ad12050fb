//! Output format detection and encoding

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use image::buffer::ConvertBuffer;
use image::{DynamicImage, ImageOutputFormat, RgbImage, RgbaImage};
use tracing::debug;

use crate::error::{Result, LogoError, IoContext};

/// Fixed JPEG quality for generated images
pub const JPEG_QUALITY: u8 = 90;

/// Formats the encoder can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless, alpha preserved
    Png,
    /// Quality 90, alpha dropped
    Jpeg,
    /// Default palette quantization
    Gif,
}

impl OutputFormat {
    /// Pick the format from the file extension, case-insensitively
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            _ => Err(LogoError::unsupported_output(extension, path)),
        }
    }

    /// Whether the encoded file keeps the alpha channel
    pub fn supports_alpha(self) -> bool {
        matches!(self, Self::Png | Self::Gif)
    }

    fn image_output_format(self) -> ImageOutputFormat {
        match self {
            Self::Png => ImageOutputFormat::Png,
            Self::Jpeg => ImageOutputFormat::Jpeg(JPEG_QUALITY),
            Self::Gif => ImageOutputFormat::Gif,
        }
    }
}

/// Encode `canvas` to `path` in the format its extension names
///
/// An unrecognised extension fails before the file is created. Writes are not
/// atomic: a failure mid-write leaves a partial file behind.
pub fn encode_to_path<P: AsRef<Path>>(canvas: &RgbaImage, path: P) -> Result<OutputFormat> {
    let path = path.as_ref();
    let format = OutputFormat::from_path(path)?;

    debug!("Encoding {}x{} canvas as {:?} to {:?}", canvas.width(), canvas.height(), format, path);

    // Without an alpha channel transparent pixels flatten to black
    let image = if format.supports_alpha() {
        DynamicImage::ImageRgba8(canvas.clone())
    } else {
        let rgb: RgbImage = canvas.convert();
        DynamicImage::ImageRgb8(rgb)
    };

    let file = File::create(path).io_context("create output file", path)?;
    let mut writer = BufWriter::new(file);

    image
        .write_to(&mut writer, format.image_output_format())
        .map_err(|source| LogoError::EncodeError {
            path: path.to_path_buf(),
            source,
        })?;

    writer.flush().io_context("write output file", path)?;

    Ok(format)
}
