//! The tab-separated extraction audit log.

use crate::extract::{ExtractionOutcome, ExtractionStatus};
use chrono::Local;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Result as IoResult, Write},
    path::Path,
};

/// File name of the audit log inside the extraction directory.
pub const AUDIT_LOG_NAME: &str = "_extract.log";

const COLUMNS: [&str; 9] = [
    "Timestamp",
    "Level",
    "SourceFile",
    "EventName",
    "Result",
    "Format",
    "Duration(ms)",
    "OutputPath",
    "TimeTaken(ms)",
];

/// Severity of an audit line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// Normal progress.
    Info,
    /// A failure.
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

/// One extracted item as it appears in the audit log.
#[derive(Clone, Copy, Debug)]
pub struct AuditRecord<'a> {
    /// The bank or container file the item came from.
    pub source_file: &'a str,
    /// Display name of the item.
    pub event_name: &'a str,
    /// Format summary of the item.
    pub format: &'a str,
    /// What happened.
    pub outcome: &'a ExtractionOutcome,
}

/// Appends audit lines to a writer.
#[derive(Debug)]
pub struct AuditLog<W: Write> {
    out: W,
}

impl AuditLog<BufWriter<File>> {
    /// Opens (or creates) the audit log in `dir`.
    ///
    /// The column header is written only when the file is new.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or written.
    pub fn open_in(dir: &Path) -> IoResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(AUDIT_LOG_NAME))?;
        let is_new = file.metadata()?.len() == 0;

        let mut log = Self {
            out: BufWriter::new(file),
        };
        if is_new {
            log.write_columns()?;
        }

        Ok(log)
    }
}

impl<W: Write> AuditLog<W> {
    /// Starts a log on `out`, beginning with the column header.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn new(out: W) -> IoResult<Self> {
        let mut log = Self { out };
        log.write_columns()?;
        Ok(log)
    }

    fn write_columns(&mut self) -> IoResult<()> {
        writeln!(self.out, "{}", COLUMNS.join("\t"))
    }

    /// Writes a free-text session line such as `[INFO] extraction started`.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn session(&mut self, level: Level, message: &str) -> IoResult<()> {
        writeln!(
            self.out,
            "[{}] {} {}",
            level.as_str(),
            timestamp(),
            single_line(message)
        )?;
        self.out.flush()
    }

    /// Writes one tab-separated item line.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn record(&mut self, record: &AuditRecord<'_>) -> IoResult<()> {
        let outcome = record.outcome;
        let (level, result) = match &outcome.status {
            ExtractionStatus::Success { bytes_written } => {
                (Level::Info, format!("Success ({bytes_written} bytes)"))
            }
            ExtractionStatus::Failure { reason } => (Level::Error, format!("Failed: {reason}")),
        };

        let fields = [
            timestamp(),
            level.as_str().to_owned(),
            record.source_file.to_owned(),
            record.event_name.to_owned(),
            result,
            record.format.to_owned(),
            outcome.duration_ms.to_string(),
            outcome.output_path.display().to_string(),
            outcome.elapsed.as_millis().to_string(),
        ];

        let line = fields
            .iter()
            .map(|field| single_line(field))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(self.out, "{line}")
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> IoResult<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

// tabs and line breaks inside a field would shift the columns
fn single_line(text: &str) -> String {
    text.replace(['\t', '\r', '\n'], " ")
}
