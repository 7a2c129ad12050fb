//! Core image processing functionality

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::DimensionSpec;
use crate::error::Result;

pub mod cache;
pub mod formats;
pub mod resize;
pub mod source;
pub mod validation;

pub use cache::*;
pub use formats::*;
pub use resize::*;
pub use source::*;
pub use validation::*;

/// Renders one target from the shared source image
#[derive(Debug, Clone, Default)]
pub struct ProcessingEngine {
    compositor: ResizeCompositor,
}

impl ProcessingEngine {
    /// Create a new processing engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom compositor
    pub fn with_compositor(compositor: ResizeCompositor) -> Self {
        Self { compositor }
    }

    /// Compose and encode `spec` into `output_dir`
    ///
    /// CPU bound and blocking; run it off the async executor.
    pub fn render_target(
        &self,
        source: &SourceImage,
        spec: &DimensionSpec,
        output_dir: &Path,
    ) -> Result<RenderedTarget> {
        let start_time = Instant::now();
        let output_path = output_dir.join(&spec.name);

        // Fail on an unknown extension before spending time on the resize
        OutputFormat::from_path(&output_path)?;

        let canvas = self.compositor.compose(source.image(), spec.width, spec.height)?;
        let format = encode_to_path(&canvas, &output_path)?;

        let rendered = RenderedTarget {
            output_path,
            width: canvas.width(),
            height: canvas.height(),
            format,
            processing_time: start_time.elapsed(),
        };

        debug!(
            "Rendered {:?} ({}x{}, {:?}) in {:.1}ms",
            rendered.output_path,
            rendered.width,
            rendered.height,
            rendered.format,
            rendered.processing_time.as_secs_f64() * 1000.0
        );

        Ok(rendered)
    }
}

/// An output file written by [`ProcessingEngine::render_target`]
#[derive(Debug, Clone)]
pub struct RenderedTarget {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub processing_time: Duration,
}
