//! Loading and validating the single source image

use std::io::Cursor;
use std::path::{Path, PathBuf};
use image::DynamicImage;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, LogoError, IoContext};
use crate::processing::validation::{format_name, SourceValidator};

/// The decoded, validated source image
///
/// Shared read-only between all workers of a run.
#[derive(Debug, Clone)]
pub struct SourceImage {
    path: PathBuf,
    image: DynamicImage,
    format: image::ImageFormat,
}

impl SourceImage {
    /// Wrap an already decoded image, bypassing file I/O
    pub fn from_image<P: Into<PathBuf>>(path: P, image: DynamicImage, format: image::ImageFormat) -> Self {
        Self {
            path: path.into(),
            image,
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn format(&self) -> image::ImageFormat {
        self.format
    }

    /// Detected format as a lowercase name ("png", "jpg", "gif")
    pub fn format_name(&self) -> String {
        format_name(self.format)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Reads, decodes and validates the source image
#[derive(Debug, Clone, Default)]
pub struct SourceLoader {
    validator: SourceValidator,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(validator: SourceValidator) -> Self {
        Self { validator }
    }

    /// Load the image at `path`, detecting its format from content
    pub async fn load<P: AsRef<Path>>(&self, path: P) -> Result<SourceImage> {
        let path = path.as_ref().to_path_buf();
        debug!("Loading source image: {:?}", path);

        let data = fs::read(&path).await
            .io_context("read source image", &path)?;

        let validator = self.validator.clone();
        let source = tokio::task::spawn_blocking(move || decode_source(&validator, path, &data))
            .await
            .map_err(|e| LogoError::parallel(format!("Task join error: {}", e)))??;

        info!(
            "Loaded source image {:?} ({}, {}x{})",
            source.path(),
            source.format_name(),
            source.width(),
            source.height()
        );

        Ok(source)
    }
}

/// Decode then validate, in that order: structure, format, dimensions
pub fn decode_source(validator: &SourceValidator, path: PathBuf, data: &[u8]) -> Result<SourceImage> {
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .io_context("detect source format", &path)?;

    let detected = reader.format();
    let image = reader
        .decode()
        .map_err(|source| LogoError::DecodeError {
            path: path.clone(),
            source,
        })?;

    let format = detected.ok_or_else(|| LogoError::UnsupportedFormat {
        format: "unknown".to_string(),
        path: path.clone(),
    })?;
    validator.validate_format(format, &path)?;
    validator.validate_dimensions(image.width(), image.height(), &path)?;

    Ok(SourceImage { path, image, format })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageOutputFormat, Rgba};
    use tempfile::TempDir;

    fn encoded(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([200u8, 30, 30, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_valid_png() {
        let data = encoded(1080, 1080, ImageOutputFormat::Png);
        let source = decode_source(&SourceValidator::new(), PathBuf::from("logo.png"), &data).unwrap();

        assert_eq!(source.format(), image::ImageFormat::Png);
        assert_eq!(source.format_name(), "png");
        assert_eq!((source.width(), source.height()), (1080, 1080));
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode_source(&SourceValidator::new(), PathBuf::from("x.png"), b"definitely not an image");
        assert!(matches!(result, Err(LogoError::DecodeError { .. })));
    }

    #[test]
    fn test_decode_unsupported_format() {
        let data = encoded(1080, 1080, ImageOutputFormat::Tiff);
        let result = decode_source(&SourceValidator::new(), PathBuf::from("logo.tiff"), &data);
        assert!(matches!(result, Err(LogoError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_format_checked_before_dimensions() {
        let data = encoded(20, 20, ImageOutputFormat::Bmp);
        let result = decode_source(&SourceValidator::new(), PathBuf::from("small.bmp"), &data);
        assert!(matches!(result, Err(LogoError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_decode_wrong_size() {
        let data = encoded(64, 64, ImageOutputFormat::Png);
        let result = decode_source(&SourceValidator::new(), PathBuf::from("small.png"), &data);
        assert!(matches!(result, Err(LogoError::DimensionMismatch { width: 64, height: 64, .. })));

        let source = decode_source(&SourceValidator::with_side(64), PathBuf::from("small.png"), &data);
        assert!(source.is_ok());
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logo.gif");
        std::fs::write(&path, encoded(32, 32, ImageOutputFormat::Gif)).unwrap();

        let loader = SourceLoader::with_validator(SourceValidator::with_side(32));
        let source = loader.load(&path).await.unwrap();
        assert_eq!(source.format(), image::ImageFormat::Gif);
        assert_eq!(source.path(), path.as_path());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = SourceLoader::new().load("does/not/exist.png").await;
        assert!(matches!(result, Err(LogoError::IoError { .. })));
    }
}
