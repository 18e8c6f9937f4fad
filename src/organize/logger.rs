use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::organize::config::OrganizeConfig;
use crate::organize::report::{FileOutcome, OutcomeStatus, RunReport};

/// Simple file logger for organizing runs with buffered writes
pub struct RunLogger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLogger {
    /// Create a new run logger, writing to ~/logs/viewsort/viewsort_<timestamp>.log
    ///
    /// # Errors
    /// Returns an error if the home directory is unknown or the log file cannot be created.
    pub fn new() -> Result<Self> {
        let log_dir = crate::config::LOG_DIR
            .as_deref()
            .context("Failed to get home directory")?;
        Self::in_directory(log_dir)
    }

    /// Create a new run logger with a timestamped log file in the given directory.
    ///
    /// # Errors
    /// Returns an error if the directory or the log file cannot be created.
    pub fn in_directory(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let log_path = log_dir.join(format!("viewsort_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        Ok(Self {
            path: log_path,
            writer: BufWriter::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log the run parameters
    pub fn log_init(&mut self, root: &Path, config: &OrganizeConfig, file_count: usize) {
        let _ = writeln!(self.writer, "[{}] INIT \"{}\"", Self::timestamp(), root.display());
        let _ = writeln!(self.writer, "  target: {}", config.target_root.display());
        let _ = writeln!(self.writer, "  side_keyword: {}", config.side_keyword);
        let _ = writeln!(self.writer, "  ventral_keyword: {}", config.ventral_keyword);
        let _ = writeln!(
            self.writer,
            "  delimiters: {:?} {:?}",
            config.delimiters.left, config.delimiters.right
        );
        let _ = writeln!(self.writer, "  context: {:?}", config.context);
        let _ = writeln!(self.writer, "  case_sensitive: {}", config.case_sensitive);
        let _ = writeln!(self.writer, "  regex: {}", config.regex_delimiters);
        let _ = writeln!(self.writer, "  mode: {:?}", config.mode);
        if !config.include.is_empty() {
            let _ = writeln!(self.writer, "  include: {:?}", config.include);
        }
        if !config.exclude.is_empty() {
            let _ = writeln!(self.writer, "  exclude: {:?}", config.exclude);
        }
        let _ = writeln!(self.writer, "  extensions: {:?}", config.extensions);
        let _ = writeln!(self.writer, "  dryrun: {}", config.dryrun);
        let _ = writeln!(self.writer, "  files: {file_count}");
        let _ = self.writer.flush();
    }

    /// Log the outcome of a single file
    pub fn log_outcome(&mut self, outcome: &FileOutcome) {
        let label = match outcome.status {
            OutcomeStatus::Transferred => "DONE",
            OutcomeStatus::Planned => "PLAN",
            OutcomeStatus::Skipped => "SKIP",
            OutcomeStatus::Failed => "FAIL",
        };
        let _ = write!(
            self.writer,
            "[{}] {label} \"{}\"",
            Self::timestamp(),
            outcome.source.display()
        );
        if let Some(destination) = &outcome.destination {
            let _ = write!(self.writer, " -> \"{}\"", destination.display());
        }
        if let Some(reason) = &outcome.reason {
            let _ = write!(self.writer, " ({reason})");
        }
        let _ = writeln!(self.writer);
        let _ = self.writer.flush();
    }

    /// Log the final counts
    pub fn log_summary(&mut self, report: &RunReport) {
        let _ = writeln!(
            self.writer,
            "[{}] SUMMARY succeeded: {}, skipped: {}, failed: {}{}",
            Self::timestamp(),
            report.succeeded,
            report.skipped,
            report.failed,
            if report.aborted { " (aborted)" } else { "" }
        );
        let _ = self.writer.flush();
    }
}
