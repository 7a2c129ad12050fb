//! Completion markers for already-produced outputs
//!
//! Each input path gets its own cache directory,
//! `<cache_root>/<md5 of the input path string>`, holding one empty
//! `<name>.cache` file per output that was written successfully.
//!
//! The key is the input *path*, not its contents. Renaming the input starts
//! from an empty cache even if the bytes are identical, and overwriting the
//! input in place keeps the old markers, so stale outputs are not
//! regenerated. Delete the cache directory (or run `clean-cache`) after
//! changing a source image in place.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, IoContext};

/// Suffix appended to an output name to form its marker file name
pub const MARKER_SUFFIX: &str = ".cache";

/// Marker store for one input path
#[derive(Debug, Clone)]
pub struct CompletionCache {
    dir: PathBuf,
}

impl CompletionCache {
    /// Cache for `input_path` under `cache_root`
    pub fn for_input<R: AsRef<Path>, I: AsRef<Path>>(cache_root: R, input_path: I) -> Self {
        Self {
            dir: derive_path(cache_root, input_path),
        }
    }

    /// Use an explicit directory
    pub fn at<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if missing
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).io_context("create cache directory", &self.dir)
    }

    /// Marker file path for an output name
    pub fn marker_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, MARKER_SUFFIX))
    }

    /// Whether `name` was already produced for this input
    pub fn is_marked(&self, name: &str) -> bool {
        self.marker_path(name).exists()
    }

    /// Record that `name` was produced; marking twice is harmless
    pub fn mark(&self, name: &str) -> Result<()> {
        let marker = self.marker_path(name);
        if let Some(parent) = marker.parent() {
            std::fs::create_dir_all(parent).io_context("create cache directory", parent)?;
        }
        std::fs::File::create(&marker).io_context("write cache marker", &marker)?;

        debug!("Marked {} as produced in {:?}", name, self.dir);
        Ok(())
    }

    /// Remove every marker for this input
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err::<(), _>(e).io_context("clear cache directory", &self.dir),
        }
    }
}

/// Cache directory for an input path: a pure function of the path string
pub fn derive_path<R: AsRef<Path>, I: AsRef<Path>>(cache_root: R, input_path: I) -> PathBuf {
    let key = input_path.as_ref().to_string_lossy();
    let digest = md5::compute(key.as_bytes());
    cache_root.as_ref().join(format!("{:x}", digest))
}
