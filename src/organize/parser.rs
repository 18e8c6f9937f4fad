//! File name classification: view category from keywords, entity name from delimiters.

use std::borrow::Cow;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::error::{OrganizeError, Result};
use crate::organize::types::{Classification, ViewCategory};

/// Keywords identifying side and ventral view files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    side: String,
    ventral: String,
    case_sensitive: bool,
}

/// Strings surrounding the entity name inside a file name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DelimiterPair {
    pub left: String,
    pub right: String,
}

/// Reason why an entity name could not be extracted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("left delimiter not found")]
    MissingLeft,
    #[error("right delimiter not found after the left delimiter")]
    MissingRight,
    #[error("nothing between the delimiters")]
    Empty,
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Pattern(Regex),
}

/// Compiled delimiter pair.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    left: Matcher,
    right: Matcher,
}

/// Classifies file names with a fixed keyword set and delimiter pair.
#[derive(Debug, Clone)]
pub struct NameParser {
    keywords: KeywordSet,
    extractor: EntityExtractor,
}

impl KeywordSet {
    /// Create a validated keyword set.
    ///
    /// # Errors
    /// Returns a configuration error if a keyword is empty,
    /// or if the keywords are equal or one contains the other,
    /// since every name matching the longer one would then match both.
    pub fn new(side: &str, ventral: &str, case_sensitive: bool) -> Result<Self> {
        if side.trim().is_empty() {
            return Err(OrganizeError::config("side keyword is empty"));
        }
        if ventral.trim().is_empty() {
            return Err(OrganizeError::config("ventral keyword is empty"));
        }
        let keywords = Self {
            side: side.to_string(),
            ventral: ventral.to_string(),
            case_sensitive,
        };
        let side_folded = keywords.fold(side);
        let ventral_folded = keywords.fold(ventral);
        if side_folded == ventral_folded {
            return Err(OrganizeError::config(format!(
                "side and ventral keywords are identical: '{side}'"
            )));
        }
        if side_folded.contains(ventral_folded.as_ref()) || ventral_folded.contains(side_folded.as_ref()) {
            return Err(OrganizeError::config(format!(
                "keywords '{side}' and '{ventral}' overlap: one contains the other"
            )));
        }
        Ok(keywords)
    }

    #[must_use]
    pub fn side(&self) -> &str {
        &self.side
    }

    #[must_use]
    pub fn ventral(&self) -> &str {
        &self.ventral
    }

    #[must_use]
    pub const fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Determine the view category from keyword substrings.
    ///
    /// # Errors
    /// Returns a configuration error if the name contains both keywords.
    pub fn classify(&self, file_name: &str) -> Result<ViewCategory> {
        let name = self.fold(file_name);
        let side = name.contains(self.fold(&self.side).as_ref());
        let ventral = name.contains(self.fold(&self.ventral).as_ref());
        match (side, ventral) {
            (true, true) => Err(OrganizeError::config(format!(
                "ambiguous keyword match: '{file_name}' contains both '{}' and '{}'",
                self.side, self.ventral
            ))),
            (true, false) => Ok(ViewCategory::Side),
            (false, true) => Ok(ViewCategory::Ventral),
            (false, false) => Ok(ViewCategory::Video),
        }
    }

    fn fold<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(text.to_lowercase())
        }
    }
}

impl DelimiterPair {
    #[must_use]
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl Matcher {
    /// Find the first match starting at byte offset `start`.
    /// Returns the byte range of the match.
    fn find_from(&self, haystack: &str, start: usize) -> Option<(usize, usize)> {
        match self {
            Self::Literal(needle) => haystack[start..]
                .find(needle.as_str())
                .map(|index| (start + index, start + index + needle.len())),
            Self::Pattern(regex) => regex.find_at(haystack, start).map(|m| (m.start(), m.end())),
        }
    }
}

impl EntityExtractor {
    /// Compile a delimiter pair.
    /// With `regex` the delimiters are regular expressions, otherwise literal strings.
    ///
    /// # Errors
    /// Returns a configuration error if a delimiter is empty or an invalid regex.
    pub fn new(pair: &DelimiterPair, regex: bool) -> Result<Self> {
        Ok(Self {
            left: Self::compile(&pair.left, "left", regex)?,
            right: Self::compile(&pair.right, "right", regex)?,
        })
    }

    fn compile(delimiter: &str, side: &str, regex: bool) -> Result<Matcher> {
        if delimiter.is_empty() {
            return Err(OrganizeError::config(format!("{side} delimiter is empty")));
        }
        if regex {
            Regex::new(delimiter)
                .map(Matcher::Pattern)
                .map_err(|e| OrganizeError::config(format!("invalid {side} delimiter regex '{delimiter}': {e}")))
        } else {
            Ok(Matcher::Literal(delimiter.to_string()))
        }
    }

    /// Extract the trimmed text between the first left delimiter
    /// and the first right delimiter after it.
    ///
    /// # Errors
    /// Returns the reason when a delimiter is missing or the result is empty.
    pub fn extract<'a>(&self, text: &'a str) -> std::result::Result<&'a str, ExtractError> {
        let (_, name_start) = self.left.find_from(text, 0).ok_or(ExtractError::MissingLeft)?;
        let (name_end, _) = self
            .right
            .find_from(text, name_start)
            .ok_or(ExtractError::MissingRight)?;
        let name = text[name_start..name_end].trim();
        if name.is_empty() {
            Err(ExtractError::Empty)
        } else {
            Ok(name)
        }
    }
}

impl NameParser {
    /// Create a parser, validating keywords and compiling delimiters.
    ///
    /// # Errors
    /// Returns a configuration error for invalid delimiters.
    pub fn new(keywords: KeywordSet, delimiters: &DelimiterPair, regex: bool) -> Result<Self> {
        let extractor = EntityExtractor::new(delimiters, regex)?;
        Ok(Self { keywords, extractor })
    }

    #[must_use]
    pub const fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Classify a single file name (not a full path).
    ///
    /// Keywords are matched against the whole name,
    /// the entity name is extracted from the name without its extension.
    ///
    /// # Errors
    /// Returns a configuration error if both keywords match,
    /// or a parse error if the entity name cannot be extracted.
    pub fn classify(&self, file_name: &str) -> Result<Classification> {
        let file_name: String = file_name.nfc().collect();
        let view_category = self.keywords.classify(&file_name)?;
        let (stem, extension) = split_extension(&file_name);
        let entity_name = self
            .extractor
            .extract(stem)
            .map_err(|reason| OrganizeError::parse(file_name.as_str(), reason))?;
        Ok(Classification::new(entity_name, view_category, extension))
    }

    /// Classify the file name component of a path.
    ///
    /// # Errors
    /// Same as [`NameParser::classify`].
    pub fn classify_path(&self, path: &Path) -> Result<Classification> {
        let file_name = crate::path_to_filename_string(path);
        self.classify(&file_name)
    }
}

/// Classify a file name with literal delimiters.
///
/// ```rust
/// use viewsort::organize::{DelimiterPair, KeywordSet, ViewCategory, classify};
///
/// let keywords = KeywordSet::new("SDE", "VNT", true).unwrap();
/// let delimiters = DelimiterPair::new("_", "-");
/// let result = classify("M1_run1-SDE.csv", &keywords, &delimiters).unwrap();
/// assert_eq!(result.entity_name(), "run1");
/// assert_eq!(result.view_category(), ViewCategory::Side);
/// ```
///
/// # Errors
/// Returns a configuration error for ambiguous keywords or empty delimiters,
/// and a parse error if the entity name cannot be extracted.
pub fn classify(file_name: &str, keywords: &KeywordSet, delimiters: &DelimiterPair) -> Result<Classification> {
    NameParser::new(keywords.clone(), delimiters, false)?.classify(file_name)
}

/// Split a file name into stem and extension.
/// A leading dot does not start an extension.
pub(crate) fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, extension),
        _ => (file_name, ""),
    }
}
