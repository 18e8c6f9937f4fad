//! Configuration for organizing runs.

use std::path::PathBuf;
use std::{fmt, fs};

use anyhow::Context;
use itertools::Itertools;
use serde::Deserialize;

use crate::organize::context::ContextMode;
use crate::organize::parser::DelimiterPair;

pub const DEFAULT_SIDE_KEYWORD: &str = "sideview";
pub const DEFAULT_VENTRAL_KEYWORD: &str = "ventralview";
pub const DEFAULT_GROUP_NAME: &str = "Batch";
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["csv", "mp4"];

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct ViewsortConfig {
    #[serde(default)]
    pub side_keyword: Option<String>,
    #[serde(default)]
    pub ventral_keyword: Option<String>,
    #[serde(default)]
    pub left_delimiter: Option<String>,
    #[serde(default)]
    pub right_delimiter: Option<String>,
    #[serde(default)]
    pub target: Option<PathBuf>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub timepoint: Option<String>,
    #[serde(default)]
    pub group_delimiters: Option<(String, String)>,
    #[serde(default)]
    pub timepoint_delimiters: Option<(String, String)>,
    #[serde(default)]
    pub default_group: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub log: bool,
    #[serde(default, rename = "move")]
    pub move_files: bool,
    #[serde(default)]
    pub recurse: bool,
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub require_ventral: bool,
    #[serde(default)]
    pub require_video: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    viewsort: ViewsortConfig,
}

/// How files get to their destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

/// Final config created from CLI arguments and user config file.
///
/// Holds the raw settings, validation happens when the organizer is created.
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    pub side_keyword: String,
    pub ventral_keyword: String,
    pub case_sensitive: bool,
    pub delimiters: DelimiterPair,
    pub regex_delimiters: bool,
    pub context: ContextMode,
    pub default_group: String,
    pub target_root: PathBuf,
    /// Lowercase file extensions without the leading dot.
    pub extensions: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub mode: TransferMode,
    pub require_ventral: bool,
    pub require_video: bool,
    pub recurse: bool,
    pub dryrun: bool,
    pub log: bool,
    pub report_path: Option<PathBuf>,
    pub debug: bool,
    pub verbose: bool,
}

impl ViewsortConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = crate::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.viewsort)
            .with_context(|| "Failed to parse config TOML")
    }
}

impl OrganizeConfig {
    /// Create a config with default settings for the given keywords, delimiters and target.
    #[must_use]
    pub fn new(
        side_keyword: impl Into<String>,
        ventral_keyword: impl Into<String>,
        delimiters: DelimiterPair,
        context: ContextMode,
        target_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            side_keyword: side_keyword.into(),
            ventral_keyword: ventral_keyword.into(),
            case_sensitive: true,
            delimiters,
            regex_delimiters: false,
            context,
            default_group: DEFAULT_GROUP_NAME.to_string(),
            target_root: target_root.into(),
            extensions: Self::normalize_extensions(Vec::new()),
            include: Vec::new(),
            exclude: Vec::new(),
            mode: TransferMode::Copy,
            require_ventral: false,
            require_video: false,
            recurse: true,
            dryrun: false,
            log: false,
            report_path: None,
            debug: false,
            verbose: false,
        }
    }

    /// Lowercase, strip leading dots and deduplicate extensions.
    /// Returns the default extensions if none remain.
    #[must_use]
    pub fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|extension| extension.trim().trim_start_matches('.').to_lowercase())
            .filter(|extension| !extension.is_empty())
            .unique()
            .collect();
        if extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect()
        } else {
            extensions
        }
    }
}

impl fmt::Display for OrganizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = match &self.context {
            ContextMode::Fixed { group, timepoint } => format!("fixed \"{group}\" / \"{timepoint}\""),
            ContextMode::Folders => "enclosing folders".to_string(),
            ContextMode::Delimiters { group, timepoint } => format!(
                "file name, group {}, timepoint \"{}\" .. \"{}\"",
                group
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |pair| format!("\"{}\" .. \"{}\"", pair.left, pair.right)),
                timepoint.left,
                timepoint.right
            ),
        };
        writeln!(f, "Config:")?;
        writeln!(f, "  side keyword:     \"{}\"", self.side_keyword)?;
        writeln!(f, "  ventral keyword:  \"{}\"", self.ventral_keyword)?;
        writeln!(
            f,
            "  delimiters:       \"{}\" .. \"{}\"",
            self.delimiters.left, self.delimiters.right
        )?;
        writeln!(f, "  context:          {context}")?;
        writeln!(f, "  default group:    \"{}\"", self.default_group)?;
        writeln!(f, "  target:           {}", self.target_root.display())?;
        writeln!(f, "  extensions:       {}", self.extensions.join(", "))?;
        writeln!(f, "  include:          [{}]", self.include.iter().join(", "))?;
        writeln!(f, "  exclude:          [{}]", self.exclude.iter().join(", "))?;
        writeln!(f, "  move:             {}", crate::colorize_bool(self.mode == TransferMode::Move))?;
        writeln!(f, "  case sensitive:   {}", crate::colorize_bool(self.case_sensitive))?;
        writeln!(f, "  regex:            {}", crate::colorize_bool(self.regex_delimiters))?;
        writeln!(f, "  require ventral:  {}", crate::colorize_bool(self.require_ventral))?;
        writeln!(f, "  require video:    {}", crate::colorize_bool(self.require_video))?;
        writeln!(f, "  recurse:          {}", crate::colorize_bool(self.recurse))?;
        writeln!(f, "  dryrun:           {}", crate::colorize_bool(self.dryrun))?;
        writeln!(f, "  log:              {}", crate::colorize_bool(self.log))?;
        writeln!(f, "  verbose:          {}", crate::colorize_bool(self.verbose))
    }
}
