//! Resolve the group and timepoint of a source file.

use std::path::{Component, Path};

use unicode_normalization::UnicodeNormalization;

use crate::error::{OrganizeError, Result};
use crate::organize::parser::{DelimiterPair, EntityExtractor, split_extension};
use crate::organize::types::{GroupContext, component_problem};

/// How the group and timepoint are chosen, as configured by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMode {
    /// Same group and timepoint for every file.
    Fixed { group: String, timepoint: String },
    /// Group and timepoint are the two folders enclosing the file.
    Folders,
    /// Group and timepoint are extracted from the file name.
    Delimiters {
        group: Option<DelimiterPair>,
        timepoint: DelimiterPair,
    },
}

/// Validated and compiled form of [`ContextMode`].
#[derive(Debug, Clone)]
pub enum ContextSource {
    Fixed(GroupContext),
    Folders {
        default_group: String,
    },
    Delimiters {
        group: Option<EntityExtractor>,
        timepoint: EntityExtractor,
        default_group: String,
    },
}

impl ContextSource {
    /// Validate the mode and compile delimiters.
    ///
    /// # Errors
    /// Returns a configuration error for invalid names or delimiters.
    pub fn new(mode: &ContextMode, default_group: &str, regex: bool) -> Result<Self> {
        let default_group = default_group.trim();
        if let Some(problem) = component_problem(default_group) {
            return Err(OrganizeError::config(format!(
                "invalid default group name '{default_group}': {problem}"
            )));
        }
        let default_group = default_group.to_string();
        match mode {
            ContextMode::Fixed { group, timepoint } => Ok(Self::Fixed(GroupContext::new(group, timepoint)?)),
            ContextMode::Folders => Ok(Self::Folders { default_group }),
            ContextMode::Delimiters { group, timepoint } => Ok(Self::Delimiters {
                group: group.as_ref().map(|pair| EntityExtractor::new(pair, regex)).transpose()?,
                timepoint: EntityExtractor::new(timepoint, regex)?,
                default_group,
            }),
        }
    }

    /// Resolve the context for a source file under `source_root`.
    ///
    /// # Errors
    /// Returns a parse error when the name or folders do not provide a valid context.
    pub fn resolve(&self, source_root: &Path, source: &Path) -> Result<GroupContext> {
        match self {
            Self::Fixed(context) => Ok(context.clone()),
            Self::Folders { default_group } => Self::from_folders(source_root, source, default_group),
            Self::Delimiters {
                group,
                timepoint,
                default_group,
            } => Self::from_name(source, group.as_ref(), timepoint, default_group),
        }
    }

    fn from_folders(source_root: &Path, source: &Path, default_group: &str) -> Result<GroupContext> {
        let relative = source.strip_prefix(source_root).unwrap_or(source);
        let folders: Vec<String> = relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .filter_map(|component| match component {
                        Component::Normal(name) => Some(crate::os_str_to_string(name).nfc().collect::<String>()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let file_name = crate::path_to_filename_string(source);
        let (group, timepoint) = match folders.as_slice() {
            [] => {
                return Err(OrganizeError::parse(
                    file_name,
                    "file is not inside a timepoint folder under the source directory",
                ));
            }
            [timepoint] => (default_group, timepoint.as_str()),
            [.., group, timepoint] => (group.as_str(), timepoint.as_str()),
        };
        Self::checked(&file_name, group, timepoint)
    }

    fn from_name(
        source: &Path,
        group: Option<&EntityExtractor>,
        timepoint: &EntityExtractor,
        default_group: &str,
    ) -> Result<GroupContext> {
        let file_name: String = crate::path_to_filename_string(source).nfc().collect();
        let (stem, _) = split_extension(&file_name);
        let timepoint = timepoint
            .extract(stem)
            .map_err(|reason| OrganizeError::parse(file_name.as_str(), format!("timepoint: {reason}")))?;
        let group = group
            .and_then(|extractor| extractor.extract(stem).ok())
            .unwrap_or(default_group);
        Self::checked(&file_name, group, timepoint)
    }

    fn checked(file_name: &str, group: &str, timepoint: &str) -> Result<GroupContext> {
        if let Some(problem) = component_problem(group) {
            return Err(OrganizeError::parse(file_name, format!("group '{group}': {problem}")));
        }
        if let Some(problem) = component_problem(timepoint) {
            return Err(OrganizeError::parse(
                file_name,
                format!("timepoint '{timepoint}': {problem}"),
            ));
        }
        Ok(GroupContext::new_unchecked(group, timepoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_GROUP: &str = "Batch";

    #[test]
    fn fixed_context_for_every_file() {
        let mode = ContextMode::Fixed {
            group: "G1".to_string(),
            timepoint: "T1".to_string(),
        };
        let source = ContextSource::new(&mode, DEFAULT_GROUP, false).expect("valid mode");
        let context = source
            .resolve(Path::new("/data"), Path::new("/data/a/b/M1_run1-SDE.csv"))
            .expect("should resolve");
        assert_eq!(context.group(), "G1");
        assert_eq!(context.timepoint(), "T1");
    }

    #[test]
    fn fixed_context_rejects_invalid_names() {
        let mode = ContextMode::Fixed {
            group: "../G1".to_string(),
            timepoint: "T1".to_string(),
        };
        let result = ContextSource::new(&mode, DEFAULT_GROUP, false);
        assert!(matches!(result, Err(OrganizeError::Configuration(_))));
    }

    #[test]
    fn invalid_default_group_rejected() {
        let result = ContextSource::new(&ContextMode::Folders, "", false);
        assert!(matches!(result, Err(OrganizeError::Configuration(_))));
    }

    #[test]
    fn folders_use_two_enclosing_directories() {
        let source = ContextSource::new(&ContextMode::Folders, DEFAULT_GROUP, false).expect("valid mode");
        let context = source
            .resolve(
                Path::new("/data"),
                Path::new("/data/Cohort A/Week 2/M1_run1-SDE.csv"),
            )
            .expect("should resolve");
        assert_eq!(context.group(), "Cohort A");
        assert_eq!(context.timepoint(), "Week 2");
    }

    #[test]
    fn folders_deeper_nesting_uses_nearest_two() {
        let source = ContextSource::new(&ContextMode::Folders, DEFAULT_GROUP, false).expect("valid mode");
        let context = source
            .resolve(Path::new("/data"), Path::new("/data/x/G2/T3/file.csv"))
            .expect("should resolve");
        assert_eq!(context.group(), "G2");
        assert_eq!(context.timepoint(), "T3");
    }

    #[test]
    fn folders_single_level_uses_default_group() {
        let source = ContextSource::new(&ContextMode::Folders, DEFAULT_GROUP, false).expect("valid mode");
        let context = source
            .resolve(Path::new("/data"), Path::new("/data/Pre/file.csv"))
            .expect("should resolve");
        assert_eq!(context.group(), DEFAULT_GROUP);
        assert_eq!(context.timepoint(), "Pre");
    }

    #[test]
    fn folders_file_in_root_is_parse_error() {
        let source = ContextSource::new(&ContextMode::Folders, DEFAULT_GROUP, false).expect("valid mode");
        let result = source.resolve(Path::new("/data"), Path::new("/data/file.csv"));
        assert!(matches!(result, Err(OrganizeError::Parse { .. })));
    }

    #[test]
    fn delimiters_extract_group_and_timepoint() {
        let mode = ContextMode::Delimiters {
            group: Some(DelimiterPair::new("Cohort", "_")),
            timepoint: DelimiterPair::new("Day", "_"),
        };
        let source = ContextSource::new(&mode, DEFAULT_GROUP, false).expect("valid mode");
        let context = source
            .resolve(Path::new("/data"), Path::new("/data/CohortB_Day7_M1_run1-SDE.csv"))
            .expect("should resolve");
        assert_eq!(context.group(), "B");
        assert_eq!(context.timepoint(), "7");
    }

    #[test]
    fn delimiters_missing_group_uses_default() {
        let mode = ContextMode::Delimiters {
            group: Some(DelimiterPair::new("Cohort", "_")),
            timepoint: DelimiterPair::new("Day", "_"),
        };
        let source = ContextSource::new(&mode, DEFAULT_GROUP, false).expect("valid mode");
        let context = source
            .resolve(Path::new("/data"), Path::new("/data/Day7_M1_run1-SDE.csv"))
            .expect("should resolve");
        assert_eq!(context.group(), DEFAULT_GROUP);
        assert_eq!(context.timepoint(), "7");
    }

    #[test]
    fn delimiters_missing_timepoint_is_parse_error() {
        let mode = ContextMode::Delimiters {
            group: None,
            timepoint: DelimiterPair::new("Day", "_"),
        };
        let source = ContextSource::new(&mode, DEFAULT_GROUP, false).expect("valid mode");
        let result = source.resolve(Path::new("/data"), Path::new("/data/M1_run1-SDE.csv"));
        assert!(matches!(result, Err(OrganizeError::Parse { .. })));
    }

    #[test]
    fn delimiters_with_regex() {
        let mode = ContextMode::Delimiters {
            group: None,
            timepoint: DelimiterPair::new(r"_(Pre|Post)", r"_"),
        };
        let source = ContextSource::new(&mode, DEFAULT_GROUP, true).expect("valid mode");
        let context = source
            .resolve(Path::new("/data"), Path::new("/data/M8_Post1_run6-SDE.csv"))
            .expect("should resolve");
        assert_eq!(context.timepoint(), "1");
    }
}
