use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::{OrganizeError, Result};

/// Camera perspective of a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewCategory {
    Side,
    Ventral,
    /// Residual category for names matching neither keyword.
    Video,
}

impl ViewCategory {
    pub const ALL: [Self; 3] = [Self::Side, Self::Ventral, Self::Video];

    /// Folder name used in the output tree.
    ///
    /// These exact names are read by the downstream feature extraction and must not change.
    #[must_use]
    pub const fn folder_name(self) -> &'static str {
        match self {
            Self::Side => "Side view",
            Self::Ventral => "Ventral view",
            Self::Video => "Video",
        }
    }
}

impl fmt::Display for ViewCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Side => "Side",
            Self::Ventral => "Ventral",
            Self::Video => "Video",
        };
        write!(f, "{name}")
    }
}

/// View category and entity name parsed from a single file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    entity_name: String,
    view_category: ViewCategory,
    /// Lowercase extension without the leading dot, empty if the name has none.
    extension: String,
}

impl Classification {
    pub(crate) fn new(entity_name: impl Into<String>, view_category: ViewCategory, extension: &str) -> Self {
        Self {
            entity_name: entity_name.into(),
            view_category,
            extension: extension.to_lowercase(),
        }
    }

    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    #[must_use]
    pub const fn view_category(&self) -> ViewCategory {
        self.view_category
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Destination file name: the entity name with the original extension.
    #[must_use]
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.entity_name.clone()
        } else {
            format!("{}.{}", self.entity_name, self.extension)
        }
    }
}

/// The two output levels above the view folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupContext {
    group: String,
    timepoint: String,
}

impl GroupContext {
    /// Create a context from user supplied names.
    ///
    /// # Errors
    /// Returns a configuration error if either name is not a single plain path component.
    pub fn new(group: &str, timepoint: &str) -> Result<Self> {
        let group = group.trim();
        let timepoint = timepoint.trim();
        if let Some(problem) = component_problem(group) {
            return Err(OrganizeError::config(format!("invalid group name '{group}': {problem}")));
        }
        if let Some(problem) = component_problem(timepoint) {
            return Err(OrganizeError::config(format!(
                "invalid timepoint name '{timepoint}': {problem}"
            )));
        }
        Ok(Self::new_unchecked(group, timepoint))
    }

    pub(crate) fn new_unchecked(group: impl Into<String>, timepoint: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            timepoint: timepoint.into(),
        }
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn timepoint(&self) -> &str {
        &self.timepoint
    }
}

impl fmt::Display for GroupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.timepoint)
    }
}

/// Everything needed to place one file in the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDescriptor {
    pub group: String,
    pub timepoint: String,
    pub view_category: ViewCategory,
    pub file_name: String,
}

impl DestinationDescriptor {
    #[must_use]
    pub fn new(classification: &Classification, context: &GroupContext) -> Self {
        Self {
            group: context.group.clone(),
            timepoint: context.timepoint.clone(),
            view_category: classification.view_category,
            file_name: classification.file_name(),
        }
    }

    /// Path relative to the target root: `<Group>/<Timepoint>/<View folder>/<file>`.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        [
            self.group.as_str(),
            self.timepoint.as_str(),
            self.view_category.folder_name(),
            self.file_name.as_str(),
        ]
        .iter()
        .collect()
    }

    #[must_use]
    pub fn path_under(&self, target_root: &Path) -> PathBuf {
        target_root.join(self.relative_path())
    }
}

/// Check that a name can be used as exactly one directory level.
/// Returns a description of the problem, or `None` if the name is fine.
pub(crate) fn component_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("name is empty");
    }
    if name.contains(['/', '\\']) {
        return Some("name contains a path separator");
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => None,
        _ => Some("name is not a plain directory name"),
    }
}
