//! `fsbank` command-line front end: analyze banks, extract their sounds, dump embedded containers.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fsbank::{
    batch::BatchOptions,
    engine::{dump_container, ContainerEngine},
    export::export_csv,
    extract::{ExtractOptions, ExtractionReport, ExtractionStatus},
    model::ContainerLocation,
    naming::{sanitize_file_name, NameResolver},
    scan::scan,
    tree::{search, selected_leaves, walk, AnalysisNode, NodeStatus, Visit},
    Session, FSB5_MAGIC,
};
use std::{
    collections::BTreeMap,
    env,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fsbank", version, about = "Analyze FMOD banks and extract their sounds as WAV files")]
struct Cli {
    /// Log debug messages and write an audit log next to extracted files
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sounds found in banks and sound containers
    Analyze {
        /// Files or directories to analyze
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Number of files analyzed concurrently
        #[arg(long, default_value_t = BatchOptions::default().workers)]
        workers: usize,

        /// Also write the analysis tree as comma-separated values
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },

    /// Extract sounds as WAV files
    Extract {
        /// Files or directories to extract from
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        location: OutputLocation,

        /// Number of files analyzed concurrently
        #[arg(long, default_value_t = BatchOptions::default().workers)]
        workers: usize,

        /// Only extract items whose name contains this text, ignoring case
        #[arg(long)]
        filter: Option<String>,
    },

    /// Copy every embedded sound container out of a bank as an .fsb file
    Dump {
        /// The bank to dump
        bank: PathBuf,

        /// Output directory (default: next to the bank)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
#[group(multiple = false)]
struct OutputLocation {
    /// Extract next to each source file (default)
    #[arg(long)]
    res: bool,

    /// Extract next to this executable
    #[arg(long)]
    exe: bool,

    /// Extract into this directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Commands::Analyze {
            paths,
            workers,
            csv,
        } => analyze(&paths, workers, csv.as_deref()),
        Commands::Extract {
            paths,
            location,
            workers,
            filter,
        } => extract(&paths, &location, workers, filter.as_deref(), cli.verbose),
        Commands::Dump { bank, output } => dump(&bank, output.as_deref()),
    }
}

fn start_session() -> Result<Session> {
    let engine = ContainerEngine::native().context("failed to start the sound engine")?;
    Ok(Session::new(engine))
}

fn analyze(paths: &[PathBuf], workers: usize, csv: Option<&Path>) -> Result<ExitCode> {
    let session = start_session()?;
    let roots = session
        .analyze_batch(paths, BatchOptions { workers })
        .context("analysis failed")?;

    print_tree(&roots);

    if let Some(csv) = csv {
        let _ = export_csv(&roots, csv)
            .with_context(|| format!("failed to write {}", csv.display()))?;
    }

    Ok(ExitCode::SUCCESS)
}

fn extract(
    paths: &[PathBuf],
    location: &OutputLocation,
    workers: usize,
    filter: Option<&str>,
    verbose: bool,
) -> Result<ExitCode> {
    let session = start_session()?;
    let roots = session
        .analyze_batch(paths, BatchOptions { workers })
        .context("analysis failed")?;

    for visit in walk(&roots) {
        if let Some(NodeStatus::Failed(reason)) = visit.node.status() {
            warn!(node = %visit.display_path(), %reason, "skipping unreadable item");
        }
    }

    let selection = match filter {
        Some(text) => search(&roots, text).collect::<Vec<_>>(),
        None => selected_leaves(&roots).collect(),
    };
    let options = ExtractOptions {
        log_enabled: verbose,
    };

    let report = if let Some(dir) = fixed_target(location)? {
        session
            .extract(selection, &dir, options)
            .with_context(|| format!("failed to extract into {}", dir.display()))?
    } else {
        let mut report = ExtractionReport::default();
        for (dir, visits) in beside_sources(selection) {
            let part = session
                .extract(visits, &dir, options)
                .with_context(|| format!("failed to extract into {}", dir.display()))?;
            report.absorb(part);
        }
        report
    };

    print_report(&report);

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(failed = report.failed, "some items could not be extracted");
        Ok(ExitCode::FAILURE)
    }
}

fn fixed_target(location: &OutputLocation) -> Result<Option<PathBuf>> {
    if let Some(dir) = &location.output {
        return Ok(Some(dir.clone()));
    }

    if location.exe {
        let exe = env::current_exe().context("failed to locate the executable")?;
        let dir = exe
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        return Ok(Some(dir));
    }

    Ok(None)
}

// groups the selection by the directory of the file each item came from
fn beside_sources(selection: Vec<Visit<'_>>) -> BTreeMap<PathBuf, Vec<Visit<'_>>> {
    let mut groups: BTreeMap<PathBuf, Vec<Visit<'_>>> = BTreeMap::new();

    for visit in selection {
        let dir = visit
            .source()
            .and_then(|path| path.parent())
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        groups.entry(dir).or_default().push(visit);
    }

    groups
}

fn print_tree(roots: &[AnalysisNode]) {
    for visit in walk(roots) {
        let indent = "  ".repeat(visit.ancestors.len());
        let node = visit.node;

        match (node.as_leaf(), node.status()) {
            (Some(leaf), _) => println!(
                "{indent}{} [{} ms] {}",
                leaf.name,
                leaf.descriptor.length_ms,
                leaf.descriptor.format_summary()
            ),
            (None, Some(NodeStatus::Failed(reason))) => {
                println!("{indent}{} ({}) FAILED: {reason}", node.name(), node.kind_label());
            }
            (None, Some(NodeStatus::Stopped)) => println!(
                "{indent}{} ({}, {} sounds) STOPPED",
                node.name(),
                node.kind_label(),
                node.leaf_count()
            ),
            (None, _) => println!(
                "{indent}{} ({}, {} sounds)",
                node.name(),
                node.kind_label(),
                node.leaf_count()
            ),
        }
    }
}

fn print_report(report: &ExtractionReport) {
    for outcome in &report.outcomes {
        if let ExtractionStatus::Failure { reason } = &outcome.status {
            println!("FAILED {}: {reason}", outcome.name);
        }
    }

    println!(
        "{} extracted, {} failed, {} skipped, {} bytes in {:.2?}",
        report.succeeded, report.failed, report.skipped, report.total_bytes, report.elapsed
    );
}

fn dump(bank: &Path, output: Option<&Path>) -> Result<ExitCode> {
    let offsets =
        scan(bank, FSB5_MAGIC).with_context(|| format!("failed to scan {}", bank.display()))?;
    let dir = output
        .map(Path::to_path_buf)
        .or_else(|| bank.parent().map(Path::to_path_buf))
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let stem = bank
        .file_stem()
        .map(|stem| sanitize_file_name(&stem.to_string_lossy()))
        .unwrap_or_default();
    let names = NameResolver::new().container_names(&stem, offsets.iter().map(|_| None));

    let mut failed = 0;
    for (offset, name) in offsets.into_iter().zip(names) {
        let location = ContainerLocation::new(bank, offset);
        let path = dir.join(&name);

        match dump_one(&location, &path) {
            Ok(size) => info!(%location, output = %path.display(), size, "dumped container"),
            Err(e) => {
                failed += 1;
                warn!(%location, "{e:#}");
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn dump_one(location: &ContainerLocation, path: &Path) -> Result<u64> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let size = dump_container(location, &mut out)
        .with_context(|| format!("failed to copy container to {}", path.display()))?;
    out.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(size)
}
