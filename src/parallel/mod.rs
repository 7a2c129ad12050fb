//! Concurrent per-target processing of one source image

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::{DimensionCatalog, DimensionSpec, PipelineConfig};
use crate::error::{IoContext, LogoError, Result};
use crate::processing::{CompletionCache, ProcessingEngine, RenderedTarget, SourceImage, SourceLoader};

pub mod progress;

pub use progress::*;

/// What happened to one target during a run
#[derive(Debug)]
pub enum ProcessingOutcome {
    /// A completion marker already existed; nothing was written
    Skipped,
    /// The output was resized, encoded and written
    Produced(RenderedTarget),
    /// Resizing or encoding failed
    Failed(LogoError),
}

impl ProcessingOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-target outcomes of a run, in catalog order
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<(String, ProcessingOutcome)>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn produced(&self) -> usize {
        self.count(|o| matches!(o, ProcessingOutcome::Produced(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ProcessingOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(ProcessingOutcome::is_failed)
    }

    fn count(&self, predicate: impl Fn(&ProcessingOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }

    /// First failure in catalog order
    pub fn first_error(&self) -> Option<&LogoError> {
        self.outcomes.iter().find_map(|(_, outcome)| match outcome {
            ProcessingOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    /// `Ok(())` if every target succeeded, else the first failure in catalog order
    pub fn into_result(self) -> Result<()> {
        match self
            .outcomes
            .into_iter()
            .find_map(|(_, outcome)| match outcome {
                ProcessingOutcome::Failed(e) => Some(e),
                _ => None,
            }) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Generates every target of a catalog from one source image
pub struct LogoPipeline {
    config: PipelineConfig,
    engine: Arc<ProcessingEngine>,
    loader: SourceLoader,
    progress_tracker: Arc<ProgressTracker>,
}

impl LogoPipeline {
    /// Create a pipeline with the default engine and loader
    pub fn new(config: PipelineConfig) -> Self {
        info!(
            "Initializing logo pipeline with {} concurrent workers",
            config.concurrency
        );

        Self {
            config,
            engine: Arc::new(ProcessingEngine::new()),
            loader: SourceLoader::new(),
            progress_tracker: Arc::new(ProgressTracker::new()),
        }
    }

    /// Replace the processing engine
    pub fn with_engine(mut self, engine: ProcessingEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    /// Replace the source loader
    pub fn with_loader(mut self, loader: SourceLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared progress tracker, for subscribing to updates
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress_tracker)
    }

    /// Deadline for a run starting now
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.config.timeout
    }

    /// Cache holding the completion markers for `input_path`
    pub fn cache_for<P: AsRef<Path>>(&self, input_path: P) -> CompletionCache {
        CompletionCache::for_input(&self.config.cache_root, input_path)
    }

    /// Load the source image and generate every target
    ///
    /// Catalog and source problems abort before any directory is created.
    pub async fn run<P: AsRef<Path>>(
        &self,
        input_path: P,
        catalog: &DimensionCatalog,
        deadline: Instant,
    ) -> Result<()> {
        let source = self.load_source(input_path, catalog).await?;
        self.process(source, catalog, deadline).await
    }

    /// Check the catalog, then load and validate the source image
    pub async fn load_source<P: AsRef<Path>>(
        &self,
        input_path: P,
        catalog: &DimensionCatalog,
    ) -> Result<Arc<SourceImage>> {
        ensure_not_empty(catalog)?;
        let source = self.loader.load(input_path).await?;
        Ok(Arc::new(source))
    }

    /// Generate every target, returning the first failure in catalog order
    pub async fn process(
        &self,
        source: Arc<SourceImage>,
        catalog: &DimensionCatalog,
        deadline: Instant,
    ) -> Result<()> {
        self.process_with_report(source, catalog, deadline)
            .await?
            .into_result()
    }

    /// Generate every target and report each outcome
    ///
    /// Errors here are run-level: an empty catalog, directory creation, the
    /// deadline passing before every target was launched, or a worker task
    /// panicking. Per-target failures are reported in the [`RunReport`].
    pub async fn process_with_report(
        &self,
        source: Arc<SourceImage>,
        catalog: &DimensionCatalog,
        deadline: Instant,
    ) -> Result<RunReport> {
        let start_time = Instant::now();
        ensure_not_empty(catalog)?;

        let total = catalog.len();
        let output_dir = self.config.output_dir.clone();

        tokio::fs::create_dir_all(&output_dir)
            .await
            .io_context("create output directory", &output_dir)?;

        let cache = Arc::new(self.cache_for(source.path()));
        cache.ensure_dir()?;

        let workers = total.min(self.config.concurrency).max(1);
        let semaphore = Arc::new(Semaphore::new(workers));

        info!(
            "Generating {} targets from {:?} with {} workers",
            total,
            source.path(),
            workers
        );
        self.progress_tracker.start(total);

        let mut tasks = Vec::with_capacity(total);
        let mut timed_out = false;

        for spec in catalog.iter() {
            if Instant::now() >= deadline {
                timed_out = true;
                break;
            }

            // Waiting for a free worker counts against the deadline too
            let permit = match tokio::time::timeout_at(
                tokio::time::Instant::from_std(deadline),
                Arc::clone(&semaphore).acquire_owned(),
            )
            .await
            {
                Ok(permit) => {
                    permit.map_err(|e| LogoError::parallel(format!("Worker pool closed: {}", e)))?
                }
                Err(_) => {
                    timed_out = true;
                    break;
                }
            };

            let engine = Arc::clone(&self.engine);
            let source = Arc::clone(&source);
            let cache = Arc::clone(&cache);
            let progress_tracker = Arc::clone(&self.progress_tracker);
            let output_dir = output_dir.clone();
            let spec = spec.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                produce_target(engine, source, cache, progress_tracker, spec, output_dir).await
            }));
        }

        let launched = tasks.len();
        if timed_out {
            warn!(
                "Deadline passed after launching {} of {} targets; waiting for running workers",
                launched, total
            );
        }

        // In-flight workers are never cancelled
        let results = futures::future::join_all(tasks).await;

        let mut outcomes = Vec::with_capacity(launched);
        for (spec, joined) in catalog.iter().zip(results) {
            let outcome =
                joined.map_err(|e| LogoError::parallel(format!("Task join error: {}", e)))?;
            outcomes.push((spec.name.clone(), outcome));
        }

        self.progress_tracker.finish();

        if timed_out {
            return Err(LogoError::Timeout { launched, total });
        }

        let report = RunReport {
            outcomes,
            elapsed: start_time.elapsed(),
        };

        info!(
            "Run completed in {:.2}s: {} produced, {} cached, {} failed",
            report.elapsed.as_secs_f64(),
            report.produced(),
            report.skipped(),
            report.failed()
        );

        Ok(report)
    }
}

fn ensure_not_empty(catalog: &DimensionCatalog) -> Result<()> {
    if catalog.is_empty() {
        return Err(LogoError::config("Dimension catalog is empty"));
    }
    Ok(())
}

async fn produce_target(
    engine: Arc<ProcessingEngine>,
    source: Arc<SourceImage>,
    cache: Arc<CompletionCache>,
    progress_tracker: Arc<ProgressTracker>,
    spec: DimensionSpec,
    output_dir: PathBuf,
) -> ProcessingOutcome {
    let name = spec.name.clone();
    progress_tracker.start_target(&name);

    // Cache lookup, render and marker write all touch the filesystem
    let tracker = Arc::clone(&progress_tracker);
    tokio::task::spawn_blocking(move || {
        produce_blocking(&engine, &source, &cache, &tracker, &spec, &output_dir)
    })
    .await
    .unwrap_or_else(|e| {
        let error = LogoError::target(&name, LogoError::parallel(format!("Task join error: {}", e)));
        progress_tracker.target_failed(&name, error.to_string());
        ProcessingOutcome::Failed(error)
    })
}

fn produce_blocking(
    engine: &ProcessingEngine,
    source: &SourceImage,
    cache: &CompletionCache,
    progress_tracker: &ProgressTracker,
    spec: &DimensionSpec,
    output_dir: &Path,
) -> ProcessingOutcome {
    let name = &spec.name;

    if cache.is_marked(name) {
        info!("Cached: {}", name);
        progress_tracker.target_skipped(name);
        return ProcessingOutcome::Skipped;
    }

    match engine.render_target(source, spec, output_dir) {
        Ok(rendered) => {
            if let Err(e) = cache.mark(name) {
                error!("Failed to record {} in cache: {}", name, e);
            }

            info!(
                "Produced {} ({}x{}) in {:.1}ms",
                name,
                rendered.width,
                rendered.height,
                rendered.processing_time.as_secs_f64() * 1000.0
            );
            progress_tracker.target_produced(name, rendered.processing_time);
            ProcessingOutcome::Produced(rendered)
        }
        Err(e) => {
            let error = LogoError::target(name.as_str(), e);
            debug!("Failed to produce {}: {}", name, error);
            progress_tracker.target_failed(name, error.to_string());
            ProcessingOutcome::Failed(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::derive_path;
    use image::{DynamicImage, ImageBuffer, Rgba};
    use tempfile::TempDir;

    fn source_in(dir: &Path) -> Arc<SourceImage> {
        let img = ImageBuffer::from_pixel(64, 64, Rgba([200u8, 20, 20, 255]));
        Arc::new(SourceImage::from_image(
            dir.join("logo.png"),
            DynamicImage::ImageRgba8(img),
            image::ImageFormat::Png,
        ))
    }

    fn pipeline_in(dir: &Path) -> LogoPipeline {
        LogoPipeline::new(
            PipelineConfig::default()
                .output_dir(dir.join("output"))
                .cache_root(dir.join("cache"))
                .concurrency(2),
        )
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn test_produces_every_target() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());
        let catalog = DimensionCatalog::new(vec![
            DimensionSpec::new(16, 16, "a.png"),
            DimensionSpec::new(8, 32, "b.png"),
            DimensionSpec::new(20, 10, "c.jpg"),
        ]);

        let report = pipeline
            .process_with_report(source_in(dir.path()), &catalog, far_deadline())
            .await
            .unwrap();

        assert_eq!(report.produced(), 3);
        let names: Vec<_> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["a.png", "b.png", "c.jpg"]);
        for name in names {
            assert!(dir.path().join("output").join(name).exists());
        }
    }

    #[tokio::test]
    async fn test_second_run_skips_everything() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());
        let source = source_in(dir.path());
        let catalog = DimensionCatalog::new(vec![
            DimensionSpec::new(16, 16, "a.png"),
            DimensionSpec::new(8, 32, "b.png"),
        ]);

        pipeline.process(Arc::clone(&source), &catalog, far_deadline()).await.unwrap();
        assert_eq!(pipeline.progress().produced(), 2);

        pipeline.process(source, &catalog, far_deadline()).await.unwrap();
        assert_eq!(pipeline.progress().produced(), 0);
        assert_eq!(pipeline.progress().skipped(), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_restore_deleted_output() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());
        let source = source_in(dir.path());
        let catalog = DimensionCatalog::new(vec![DimensionSpec::new(16, 16, "a.png")]);

        pipeline.process(Arc::clone(&source), &catalog, far_deadline()).await.unwrap();
        let output = dir.path().join("output").join("a.png");
        std::fs::remove_file(&output).unwrap();

        pipeline.process(source, &catalog, far_deadline()).await.unwrap();
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_empty_catalog_fails_fast() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());

        let result = pipeline
            .process(source_in(dir.path()), &DimensionCatalog::default(), far_deadline())
            .await;

        assert!(matches!(result, Err(LogoError::ConfigError { .. })));
        assert!(!dir.path().join("output").exists());
    }

    #[tokio::test]
    async fn test_first_failure_in_catalog_order() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());
        let catalog = DimensionCatalog::new(vec![
            DimensionSpec::new(16, 16, "ok.png"),
            DimensionSpec::new(16, 16, "first.bmp"),
            DimensionSpec::new(16, 16, "second.ico"),
        ]);

        let result = pipeline
            .process(source_in(dir.path()), &catalog, far_deadline())
            .await;

        match result {
            Err(LogoError::TargetFailed { ref name, ref source }) => {
                assert_eq!(name, "first.bmp");
                assert!(matches!(**source, LogoError::UnsupportedOutputFormat { .. }));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // Siblings still ran, and their successes stay on disk
        assert!(dir.path().join("output").join("ok.png").exists());
        assert_eq!(pipeline.progress().failed(), 2);
    }

    #[tokio::test]
    async fn test_failed_target_is_not_marked() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());
        let source = source_in(dir.path());
        let catalog = DimensionCatalog::new(vec![DimensionSpec::new(16, 16, "icon.bmp")]);

        assert!(pipeline.process(Arc::clone(&source), &catalog, far_deadline()).await.is_err());
        assert!(!pipeline.cache_for(source.path()).is_marked("icon.bmp"));
    }

    #[tokio::test]
    async fn test_elapsed_deadline_launches_nothing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());
        let catalog = DimensionCatalog::new(vec![
            DimensionSpec::new(16, 16, "a.png"),
            DimensionSpec::new(16, 16, "b.png"),
        ]);

        let result = pipeline
            .process(source_in(dir.path()), &catalog, Instant::now())
            .await;

        assert!(matches!(result, Err(LogoError::Timeout { launched: 0, total: 2 })));
        assert!(!dir.path().join("output").join("a.png").exists());
    }

    #[tokio::test]
    async fn test_single_worker_processes_all() {
        let dir = TempDir::new().unwrap();
        let pipeline = LogoPipeline::new(
            PipelineConfig::default()
                .output_dir(dir.path().join("output"))
                .cache_root(dir.path().join("cache"))
                .concurrency(1),
        );
        let catalog = DimensionCatalog::new(
            (1..=5).map(|i| DimensionSpec::new(i * 4, i * 4, format!("{}.png", i))).collect(),
        );

        let report = pipeline
            .process_with_report(source_in(dir.path()), &catalog, far_deadline())
            .await
            .unwrap();
        assert_eq!(report.produced(), 5);
        assert!(report.first_error().is_none());
    }

    #[tokio::test]
    async fn test_cache_mark_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());
        let source = source_in(dir.path());

        // A file where the marker's parent directory would go
        let cache_dir = derive_path(dir.path().join("cache"), source.path());
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::write(cache_dir.join("nested"), b"").unwrap();
        std::fs::create_dir_all(dir.path().join("output").join("nested")).unwrap();

        let catalog = DimensionCatalog::new(vec![DimensionSpec::new(16, 16, "nested/a.png")]);
        pipeline.process(Arc::clone(&source), &catalog, far_deadline()).await.unwrap();

        assert!(dir.path().join("output").join("nested").join("a.png").exists());
        assert!(!pipeline.cache_for(source.path()).is_marked("nested/a.png"));
    }

    #[tokio::test]
    async fn test_run_rejects_bad_source_before_creating_output() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_in(dir.path());
        let input = dir.path().join("small.png");
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(500, 500, Rgba([0u8, 0, 0, 255])))
            .save(&input)
            .unwrap();

        let catalog = DimensionCatalog::new(vec![DimensionSpec::new(16, 16, "a.png")]);
        let result = pipeline.run(&input, &catalog, far_deadline()).await;

        assert!(matches!(result, Err(LogoError::DimensionMismatch { width: 500, height: 500, .. })));
        assert!(!dir.path().join("output").exists());
    }
}
