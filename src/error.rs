//! Error kinds produced while classifying and placing files.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for organizer operations.
pub type Result<T> = std::result::Result<T, OrganizeError>;

/// Organizer errors.
///
/// `Configuration` is fatal for the whole run.
/// The other kinds only concern a single source file and the run continues past them.
#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unparseable file name '{name}': {reason}")]
    Parse { name: String, reason: String },

    #[error("Destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("I/O failure for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrganizeError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn parse(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that must stop the run before any file is touched.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Short machine-readable name of the error kind, used in reports and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Parse { .. } => "parse",
            Self::AlreadyExists(_) => "already_exists",
            Self::Io { .. } => "io",
        }
    }
}
