//! Parallel analysis of many input files.

use crate::{
    analyze::{BankAnalyzer, InputKind},
    engine::ContainerEngine,
    error::Result,
    tree::AnalysisNode,
};
use rayon::ThreadPoolBuilder;
use std::{
    cmp::Ordering as CmpOrdering,
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A cooperative cancellation signal shared by every clone.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every holder of the flag to stop at its next safe point.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once a stop was requested.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag for the next operation.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Counters updated by workers during a batch.
#[derive(Debug, Default)]
pub struct BatchProgress {
    total: AtomicUsize,
    completed: AtomicUsize,
    current: Mutex<String>,
}

/// A point-in-time copy of [`BatchProgress`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Number of items the operation expects to process.
    pub total: usize,
    /// Number of items processed so far, successful or not.
    pub completed: usize,
    /// Name of the item most recently started.
    pub current: String,
}

impl ProgressSnapshot {
    /// Returns `true` once every expected item was processed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}

impl BatchProgress {
    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            current: self.current_item().clone(),
        }
    }

    pub(crate) fn reset(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.current_item().clear();
    }

    pub(crate) fn begin(&self, item: &str) {
        item.clone_into(&mut self.current_item());
    }

    pub(crate) fn finish_one(&self) {
        let _ = self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn current_item(&self) -> MutexGuard<'_, String> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settings for [`BatchCoordinator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    /// Number of files analyzed concurrently.
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Input paths after directory expansion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpandedInputs {
    /// Strings banks, loaded before anything else is analyzed.
    pub strings_banks: Vec<PathBuf>,
    /// Files to analyze.
    pub files: Vec<PathBuf>,
}

impl ExpandedInputs {
    fn add(&mut self, path: PathBuf, seen: &mut HashSet<PathBuf>) {
        let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !seen.insert(key) {
            debug!(path = %path.display(), "skipping duplicate input");
            return;
        }

        match InputKind::of(&path) {
            Some(InputKind::StringsBank) => self.strings_banks.push(path),
            _ => self.files.push(path),
        }
    }
}

/// Expands directories into the `.bank` and `.fsb` files below them and removes duplicates.
///
/// Explicitly named files are kept even if they do not exist, so their failure is reported.
#[must_use]
pub fn expand_inputs(paths: &[PathBuf]) -> ExpandedInputs {
    let mut inputs = ExpandedInputs::default();
    let mut seen = HashSet::new();

    for path in paths {
        if !path.is_dir() {
            inputs.add(path.clone(), &mut seen);
            continue;
        }

        let entries = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| {
                entry
                    .map_err(|e| warn!(root = %path.display(), error = %e, "skipping entry"))
                    .ok()
            });

        for entry in entries {
            if entry.file_type().is_file() && InputKind::of(entry.path()).is_some() {
                inputs.add(entry.into_path(), &mut seen);
            }
        }
    }

    inputs
}

/// Runs [`BankAnalyzer`] over many files on a bounded worker pool.
#[derive(Debug)]
pub struct BatchCoordinator<'a> {
    engine: &'a ContainerEngine,
    progress: &'a BatchProgress,
    stop: StopFlag,
    options: BatchOptions,
}

impl<'a> BatchCoordinator<'a> {
    /// Creates a coordinator reporting into `progress` and honoring `stop`.
    #[must_use]
    pub fn new(
        engine: &'a ContainerEngine,
        progress: &'a BatchProgress,
        stop: StopFlag,
        options: BatchOptions,
    ) -> Self {
        Self {
            engine,
            progress,
            stop,
            options,
        }
    }

    /// Analyzes every file named by `paths` and returns one file node per file, sorted by name.
    ///
    /// A file that fails to analyze still gets a node, marked as failed. If a stop is requested,
    /// files not yet started are left out.
    ///
    /// # Errors
    /// Returns an error only if the worker pool cannot be created.
    pub fn run(&self, paths: &[PathBuf]) -> Result<Vec<AnalysisNode>> {
        let inputs = expand_inputs(paths);
        let files = &inputs.files;
        self.progress.reset(files.len());

        info!(
            files = files.len(),
            strings_banks = inputs.strings_banks.len(),
            workers = self.options.workers,
            "starting analysis"
        );

        let analyzer = BankAnalyzer::new(self.engine, self.stop.clone());
        for strings_bank in &inputs.strings_banks {
            if self.stop.is_set() {
                break;
            }
            analyzer.load_strings_bank(strings_bank);
        }

        let workers = self.options.workers.clamp(1, files.len().max(1));
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("fsbank-analyze-{index}"))
            .build()?;

        let next = AtomicUsize::new(0);
        let results = Mutex::new(Vec::with_capacity(files.len()));

        pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| loop {
                    if self.stop.is_set() {
                        break;
                    }

                    let Some(path) = files.get(next.fetch_add(1, Ordering::SeqCst)) else {
                        break;
                    };

                    self.progress.begin(&path.display().to_string());
                    let node = analyzer.analyze(path);
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(node);
                    self.progress.finish_one();
                });
            }
        });

        let mut roots = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        roots.sort_by(compare_roots);

        if self.stop.is_set() {
            info!(analyzed = roots.len(), "analysis stopped early");
        } else {
            info!(analyzed = roots.len(), "analysis finished");
        }

        Ok(roots)
    }
}

fn compare_roots(a: &AnalysisNode, b: &AnalysisNode) -> CmpOrdering {
    a.name()
        .cmp(b.name())
        .then_with(|| root_path(a).cmp(&root_path(b)))
}

fn root_path(node: &AnalysisNode) -> Option<&Path> {
    match node {
        AnalysisNode::FileRoot(root) => Some(&root.path),
        _ => None,
    }
}
