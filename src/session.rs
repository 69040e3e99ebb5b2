//! The library-level entry point tying the engine, progress reporting and cancellation together.

use crate::{
    batch::{BatchCoordinator, BatchOptions, BatchProgress, ProgressSnapshot, StopFlag},
    engine::ContainerEngine,
    error::Result,
    extract::{ExtractOptions, ExtractionCoordinator, ExtractionReport},
    tree::{AnalysisNode, Visit},
};
use std::path::{Path, PathBuf};

/// Owns a [`ContainerEngine`] and runs analyses and extractions against it.
///
/// Progress can be polled and a stop requested from other threads while an operation runs.
#[derive(Debug)]
pub struct Session {
    engine: ContainerEngine,
    progress: BatchProgress,
    stop: StopFlag,
}

impl Session {
    /// Creates a session around a started engine.
    #[must_use]
    pub fn new(engine: ContainerEngine) -> Self {
        Self {
            engine,
            progress: BatchProgress::default(),
            stop: StopFlag::new(),
        }
    }

    /// Analyzes every file named by `paths`, expanding directories.
    ///
    /// # Errors
    /// Returns an error only if the worker pool cannot be created.
    pub fn analyze_batch(
        &self,
        paths: &[PathBuf],
        options: BatchOptions,
    ) -> Result<Vec<AnalysisNode>> {
        self.stop.reset();
        BatchCoordinator::new(&self.engine, &self.progress, self.stop.clone(), options).run(paths)
    }

    /// Extracts the sub-sounds in `selection` below `target`.
    ///
    /// # Errors
    /// Returns an error if `target` or the audit log cannot be created.
    pub fn extract<'v>(
        &self,
        selection: impl IntoIterator<Item = Visit<'v>>,
        target: &Path,
        options: ExtractOptions,
    ) -> Result<ExtractionReport> {
        self.stop.reset();
        ExtractionCoordinator::new(&self.engine, &self.progress, self.stop.clone())
            .extract(selection, target, options)
    }

    /// Copies the progress counters of the running (or last) operation.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Asks the running operation to stop at its next safe point.
    pub fn request_stop(&self) {
        self.stop.request();
    }

    /// Returns a flag that stops the running operation when set, usable from other threads.
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// The engine every operation goes through.
    #[must_use]
    pub fn engine(&self) -> &ContainerEngine {
        &self.engine
    }
}
