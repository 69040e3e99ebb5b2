//! Extraction of selected sub-sounds into a directory tree of WAVE files.

use crate::{
    audit::{AuditLog, AuditRecord, Level, AUDIT_LOG_NAME},
    batch::{BatchProgress, StopFlag},
    engine::ContainerEngine,
    error::{error_chain, Error, Result},
    naming::{sanitize_file_name, NameResolver},
    tree::{walk_matching, AnalysisNode, SubSoundLeaf, Visit},
    wav::WavExporter,
};
use std::{
    collections::{HashMap, HashSet},
    fs::{self, File},
    io::{BufWriter, Result as IoResult},
    path::{Path, PathBuf},
    ptr,
    slice,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

/// Settings for [`ExtractionCoordinator::extract`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Write an audit log into the target directory.
    pub log_enabled: bool,
}

/// Whether one item was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// The file was written.
    Success {
        /// Size of the written file, header included.
        bytes_written: u64,
    },
    /// The file could not be written.
    Failure {
        /// Why, including every underlying cause.
        reason: String,
    },
}

/// The result of extracting one sub-sound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionOutcome {
    /// Tree path of the sub-sound.
    pub name: String,
    /// Whether the file was written.
    pub status: ExtractionStatus,
    /// Where the file was (or would have been) written.
    pub output_path: PathBuf,
    /// Length of the sound in milliseconds.
    pub duration_ms: u32,
    /// Time spent on the item.
    pub elapsed: Duration,
}

impl ExtractionOutcome {
    /// Returns `true` if the file was written.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExtractionStatus::Success { .. })
    }
}

/// Totals for one extraction run.
///
/// `succeeded + failed == total` always holds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Items attempted.
    pub total: usize,
    /// Items written.
    pub succeeded: usize,
    /// Items that failed.
    pub failed: usize,
    /// Items never attempted because a stop was requested.
    pub skipped: usize,
    /// Bytes written across all successful items.
    pub total_bytes: u64,
    /// Wall time of the run.
    pub elapsed: Duration,
    /// Every attempted item, in order.
    pub outcomes: Vec<ExtractionOutcome>,
}

impl ExtractionReport {
    fn record(&mut self, outcome: ExtractionOutcome) {
        self.total += 1;
        match outcome.status {
            ExtractionStatus::Success { bytes_written } => {
                self.succeeded += 1;
                self.total_bytes += bytes_written;
            }
            ExtractionStatus::Failure { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Folds another run's totals into this one.
    pub fn absorb(&mut self, other: Self) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.total_bytes += other.total_bytes;
        self.elapsed += other.elapsed;
        self.outcomes.extend(other.outcomes);
    }

    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Writes selected sub-sounds as WAVE files, mirroring the analysis tree as directories.
#[derive(Debug)]
pub struct ExtractionCoordinator<'a> {
    engine: &'a ContainerEngine,
    progress: &'a BatchProgress,
    stop: StopFlag,
}

impl<'a> ExtractionCoordinator<'a> {
    /// Creates a coordinator reporting into `progress` and honoring `stop`.
    #[must_use]
    pub fn new(engine: &'a ContainerEngine, progress: &'a BatchProgress, stop: StopFlag) -> Self {
        Self {
            engine,
            progress,
            stop,
        }
    }

    /// Extracts every sub-sound in `selection` below `target`.
    ///
    /// A visited file or container node stands for all sub-sounds below it. Each sub-sound is
    /// written at most once, and no two items of one call share an output path. Failures of
    /// single items are recorded in the report.
    ///
    /// # Errors
    /// Returns an error if `target` cannot be created or the audit log cannot be opened.
    pub fn extract<'v>(
        &self,
        selection: impl IntoIterator<Item = Visit<'v>>,
        target: &Path,
        options: ExtractOptions,
    ) -> Result<ExtractionReport> {
        let started = Instant::now();
        let items = collect_leaves(selection);

        fs::create_dir_all(target).map_err(Error::io(target))?;
        let mut audit = if options.log_enabled {
            Some(AuditLog::open_in(target).map_err(Error::io(target.join(AUDIT_LOG_NAME)))?)
        } else {
            None
        };

        self.progress.reset(items.len());
        info!(items = items.len(), target = %target.display(), "starting extraction");
        note(&mut audit, |log| {
            log.session(
                Level::Info,
                &format!("extraction started: {} items -> {}", items.len(), target.display()),
            )
        });

        let mut layout = OutputLayout::new(target);
        let mut report = ExtractionReport::default();
        for (visit, leaf) in &items {
            if self.stop.is_set() {
                info!("extraction stopped early");
                note(&mut audit, |log| log.session(Level::Info, "extraction stopped by request"));
                break;
            }

            let (dir, output_path) = layout.place(visit, leaf);
            let outcome = self.extract_one(visit, leaf, &dir, output_path);
            let source_file = visit
                .source()
                .and_then(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            note(&mut audit, |log| {
                log.record(&AuditRecord {
                    source_file: &source_file,
                    event_name: &leaf.name,
                    format: &leaf.descriptor.format_summary(),
                    outcome: &outcome,
                })
            });

            report.record(outcome);
            self.progress.finish_one();
        }

        report.skipped = items.len() - report.total;
        report.elapsed = started.elapsed();

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            bytes = report.total_bytes,
            "extraction finished"
        );
        let level = if report.is_clean() { Level::Info } else { Level::Error };
        note(&mut audit, |log| {
            log.session(
                level,
                &format!(
                    "extraction finished: {} succeeded, {} failed, {} bytes, {} ms",
                    report.succeeded,
                    report.failed,
                    report.total_bytes,
                    report.elapsed.as_millis()
                ),
            )
        });
        if let Some(log) = audit {
            if let Err(e) = log.finish() {
                warn!(error = %e, "failed to flush audit log");
            }
        }

        Ok(report)
    }

    fn extract_one(
        &self,
        visit: &Visit<'_>,
        leaf: &SubSoundLeaf,
        dir: &Path,
        output_path: PathBuf,
    ) -> ExtractionOutcome {
        let started = Instant::now();
        let name = visit.display_path();
        self.progress.begin(&name);

        let result = fs::create_dir_all(dir)
            .map_err(Error::io(dir))
            .and_then(|()| {
                WavExporter::new(self.engine)
                    .export(&leaf.descriptor, &output_path)
                    .map_err(|source| Error::Wav {
                        output: output_path.clone(),
                        source,
                    })
            });

        let status = match result {
            Ok(bytes_written) => {
                debug!(%name, bytes_written, "extracted");
                ExtractionStatus::Success { bytes_written }
            }
            Err(e) => {
                let reason = error_chain(&e);
                warn!(%name, %reason, "extraction failed");
                ExtractionStatus::Failure { reason }
            }
        };

        ExtractionOutcome {
            name,
            status,
            output_path,
            duration_ms: leaf.descriptor.length_ms,
            elapsed: started.elapsed(),
        }
    }
}

fn note(
    audit: &mut Option<AuditLog<BufWriter<File>>>,
    write: impl FnOnce(&mut AuditLog<BufWriter<File>>) -> IoResult<()>,
) {
    if let Some(log) = audit {
        if let Err(e) = write(log) {
            warn!(error = %e, "failed to write audit log");
        }
    }
}

// Non-leaf visits expand to the leaves below them; a leaf reached twice is kept once.
fn collect_leaves<'v>(
    selection: impl IntoIterator<Item = Visit<'v>>,
) -> Vec<(Visit<'v>, &'v SubSoundLeaf)> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for visit in selection {
        let expanded = match visit.node.as_leaf() {
            Some(_) => vec![visit],
            None => walk_matching(slice::from_ref(visit.node), |node| node.as_leaf().is_some())
                .map(|inner| Visit {
                    node: inner.node,
                    ancestors: visit
                        .ancestors
                        .iter()
                        .copied()
                        .chain(inner.ancestors)
                        .collect(),
                })
                .collect(),
        };

        for visit in expanded {
            if let Some(leaf) = visit.node.as_leaf() {
                if seen.insert(ptr::from_ref(visit.node)) {
                    items.push((visit, leaf));
                }
            }
        }
    }

    items
}

/// Output paths for one extraction run.
///
/// Files and containers become directories named after them without their extension. Every
/// name is claimed in its parent directory, so `music.fsb` and `music.bank` land in `music`
/// and `music_1` instead of writing over each other.
#[derive(Debug)]
struct OutputLayout {
    target: PathBuf,
    dirs: HashMap<*const AnalysisNode, PathBuf>,
    names: HashMap<PathBuf, NameResolver>,
}

impl OutputLayout {
    fn new(target: &Path) -> Self {
        Self {
            target: target.to_path_buf(),
            dirs: HashMap::new(),
            names: HashMap::new(),
        }
    }

    // Returns the leaf's directory and file path.
    fn place(&mut self, visit: &Visit<'_>, leaf: &SubSoundLeaf) -> (PathBuf, PathBuf) {
        let mut dir = self.target.clone();

        for node in &visit.ancestors {
            if let AnalysisNode::FileRoot(_) | AnalysisNode::ContainerGroup(_) = node {
                let key = ptr::from_ref(*node);
                dir = match self.dirs.get(&key) {
                    Some(known) => known.clone(),
                    None => {
                        let stem = without_extension(node.name());
                        let child = dir.join(self.claim(&dir, &stem, ""));
                        self.dirs.entry(key).or_insert(child).clone()
                    }
                };
            }
        }

        let file = dir.join(self.claim(&dir, &leaf.name, ".wav"));
        (dir, file)
    }

    fn claim(&mut self, dir: &Path, stem: &str, extension: &str) -> String {
        self.names
            .entry(dir.to_path_buf())
            .or_default()
            .claim(&sanitize_file_name(stem), extension)
    }
}

fn without_extension(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map_or_else(|| name.to_owned(), |stem| stem.to_string_lossy().into_owned())
}

#[cfg(test)]
mod test {
    use super::{
        collect_leaves, ExtractionOutcome, ExtractionReport, ExtractionStatus, OutputLayout,
    };
    use crate::tree::{
        search,
        test::{container, leaf, root},
        walk, AnalysisNode,
    };
    use std::{
        path::{Path, PathBuf},
        time::Duration,
    };

    fn forest() -> Vec<AnalysisNode> {
        vec![root(
            "music.bank",
            vec![
                container("intro.fsb", vec![leaf("a", 0), leaf("b", 1)]),
                container("outro.fsb", vec![leaf("c", 0)]),
            ],
        )]
    }

    fn layout_paths(roots: &[AnalysisNode]) -> Vec<PathBuf> {
        let mut layout = OutputLayout::new(Path::new("out"));
        collect_leaves(walk(roots))
            .iter()
            .map(|(visit, leaf)| layout.place(visit, leaf).1)
            .collect()
    }

    #[test]
    fn mirror_ancestors_as_directories() {
        let roots = forest();
        let music = Path::new("out").join("music");

        assert_eq!(
            layout_paths(&roots),
            [
                music.join("intro").join("a.wav"),
                music.join("intro").join("b.wav"),
                music.join("outro").join("c.wav"),
            ]
        );
    }

    #[test]
    fn same_stem_roots_get_their_own_directories() {
        let roots = vec![
            root("music.fsb", vec![leaf("theme", 0), leaf("b", 1)]),
            root("music.bank", vec![leaf("theme", 0), leaf("c", 1)]),
            root("odd.fsb", vec![leaf("x?", 0), leaf("x*", 1)]),
        ];
        let out = Path::new("out");

        assert_eq!(
            layout_paths(&roots),
            [
                out.join("music").join("theme.wav"),
                out.join("music").join("b.wav"),
                out.join("music_1").join("theme.wav"),
                out.join("music_1").join("c.wav"),
                out.join("odd").join("x_.wav"),
                out.join("odd").join("x__1.wav"),
            ]
        );
    }

    #[test]
    fn expand_groups_without_duplicates() {
        let roots = forest();
        let selection = search(&roots, "intro").chain(walk(&roots).filter(|v| v.node.name() == "a"));

        let items = collect_leaves(selection);
        let names = items.iter().map(|(_, leaf)| leaf.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(items[1].0.display_path(), "music.bank/intro.fsb/b");
    }

    #[test]
    fn totals_add_up() {
        let outcome = |status| ExtractionOutcome {
            name: String::new(),
            status,
            output_path: "x.wav".into(),
            duration_ms: 0,
            elapsed: Duration::ZERO,
        };

        let mut report = ExtractionReport::default();
        report.record(outcome(ExtractionStatus::Success { bytes_written: 100 }));

        let mut other = ExtractionReport::default();
        other.record(outcome(ExtractionStatus::Failure {
            reason: "x".to_owned(),
        }));
        other.record(outcome(ExtractionStatus::Success { bytes_written: 20 }));

        report.absorb(other);
        assert_eq!((report.total, report.succeeded, report.failed), (3, 2, 1));
        assert_eq!(report.total_bytes, 120);
        assert_eq!(report.outcomes.len(), 3);
        assert!(!report.is_clean());
        assert!(report.outcomes[0].is_success());
    }
}
