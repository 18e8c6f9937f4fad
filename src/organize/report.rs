//! Per-file outcomes and the summary of a run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use crate::error::OrganizeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Copied or moved to the destination.
    Transferred,
    /// Would be transferred, dry run.
    Planned,
    /// Intentionally not transferred.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub status: OutcomeStatus,
    /// Error kind name for failures.
    pub error_kind: Option<&'static str>,
    /// Human readable reason for skips and failures.
    pub reason: Option<String>,
}

/// Aggregated result of one organizing run.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// True if the run was interrupted before all files were processed.
    pub aborted: bool,
    pub dryrun: bool,
    pub outcomes: Vec<FileOutcome>,
}

impl FileOutcome {
    #[must_use]
    pub const fn transferred(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination: Some(destination),
            status: OutcomeStatus::Transferred,
            error_kind: None,
            reason: None,
        }
    }

    #[must_use]
    pub const fn planned(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination: Some(destination),
            status: OutcomeStatus::Planned,
            error_kind: None,
            reason: None,
        }
    }

    #[must_use]
    pub fn skipped(source: PathBuf, destination: Option<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            source,
            destination,
            status: OutcomeStatus::Skipped,
            error_kind: None,
            reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn failed(source: PathBuf, destination: Option<PathBuf>, error: &OrganizeError) -> Self {
        Self {
            source,
            destination,
            status: OutcomeStatus::Failed,
            error_kind: Some(error.kind()),
            reason: Some(error.to_string()),
        }
    }
}

impl RunReport {
    #[must_use]
    pub fn new(dryrun: bool) -> Self {
        Self {
            dryrun,
            ..Self::default()
        }
    }

    /// Add an outcome and update the counts.
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome.status {
            OutcomeStatus::Transferred | OutcomeStatus::Planned => self.succeeded += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == OutcomeStatus::Failed)
    }

    pub fn skips(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == OutcomeStatus::Skipped)
    }

    /// Print the final counts and list every failure.
    pub fn print_summary(&self, root: &Path, verbose: bool) {
        if verbose {
            for outcome in self.skips() {
                println!(
                    "{} {}: {}",
                    "Skipped".yellow(),
                    crate::get_relative_path_or_filename(&outcome.source, root),
                    outcome.reason.as_deref().unwrap_or_default()
                );
            }
        }
        for outcome in self.failures() {
            crate::print_error!(
                "{}: {}",
                crate::get_relative_path_or_filename(&outcome.source, root),
                outcome.reason.as_deref().unwrap_or_default()
            );
        }

        let verb = if self.dryrun { "Would organize" } else { "Organized" };
        let summary = format!(
            "{verb} {} file{}, skipped {}, failed {}",
            self.succeeded,
            if self.succeeded == 1 { "" } else { "s" },
            self.skipped,
            self.failed
        );
        if self.has_failures() {
            println!("{}", summary.red().bold());
        } else {
            println!("{}", summary.green().bold());
        }
        if self.aborted {
            crate::print_warning!("Run was aborted, remaining files were not processed");
        }
    }

    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization or writing the file fails.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(path, json).with_context(|| format!("Failed to write run report: {}", path.display()))
    }
}
