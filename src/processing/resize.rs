//! Aspect-preserving scale-and-pad composition

use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use crate::error::{Result, LogoError};

/// Available resize filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Nearest neighbor (fastest, lowest quality)
    Nearest,
    /// Triangle (linear interpolation)
    Triangle,
    /// Catmull-Rom cubic spline
    CatmullRom,
    /// Lanczos with radius 3 (high quality, recommended for logo edges)
    Lanczos3,
}

impl Default for FilterType {
    fn default() -> Self {
        Self::Lanczos3
    }
}

impl From<FilterType> for image::imageops::FilterType {
    fn from(filter: FilterType) -> Self {
        match filter {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Triangle => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Scales a source to fit a target and centers it on a transparent canvas
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeCompositor {
    filter: FilterType,
}

impl ResizeCompositor {
    /// Create a compositor using Lanczos3
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compositor with a custom filter
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Produce a `width` x `height` canvas holding the scaled, centered source
    ///
    /// The result always has exactly the requested bounds. Areas not covered
    /// by the source stay fully transparent.
    pub fn compose(&self, source: &DynamicImage, width: u32, height: u32) -> Result<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(LogoError::config(format!(
                "Target dimensions must be greater than 0 (got {}x{})",
                width, height
            )));
        }

        let (scaled_width, scaled_height) =
            fit_dimensions(source.width(), source.height(), width, height);
        let (offset_x, offset_y) = center_offset(width, height, scaled_width, scaled_height);

        debug!(
            "Composing {}x{} -> {}x{} at ({}, {}) on {}x{} using {:?}",
            source.width(),
            source.height(),
            scaled_width,
            scaled_height,
            offset_x,
            offset_y,
            width,
            height,
            self.filter
        );

        let scaled = if (scaled_width, scaled_height) == (source.width(), source.height()) {
            source.to_rgba8()
        } else {
            source
                .resize_exact(scaled_width, scaled_height, self.filter.into())
                .to_rgba8()
        };

        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        image::imageops::overlay(&mut canvas, &scaled, i64::from(offset_x), i64::from(offset_y));

        Ok(canvas)
    }
}

/// Size of the source once scaled to fit inside the target
///
/// The axis on which the source is relatively larger is clamped to the
/// target; the other is derived from the aspect ratio (rounded half up,
/// never below 1) and never exceeds the target.
pub fn fit_dimensions(source_width: u32, source_height: u32, width: u32, height: u32) -> (u32, u32) {
    let (sw, sh) = (u64::from(source_width.max(1)), u64::from(source_height.max(1)));
    let (tw, th) = (u64::from(width), u64::from(height));

    if sw * th > sh * tw {
        let derived = (2 * sh * tw + sw) / (2 * sw);
        (width, (derived as u32).max(1))
    } else {
        let derived = (2 * sw * th + sh) / (2 * sh);
        ((derived as u32).max(1), height)
    }
}

/// Top-left position that centers `scaled` on `canvas`
///
/// Integer division: when the leftover is odd the extra pixel goes to the
/// right/bottom margin.
pub fn center_offset(canvas_width: u32, canvas_height: u32, scaled_width: u32, scaled_height: u32) -> (u32, u32) {
    (
        canvas_width.saturating_sub(scaled_width) / 2,
        canvas_height.saturating_sub(scaled_height) / 2,
    )
}
