//! Integration tests for config loading from fixture files.
//!
//! These tests verify that the sample config file parses into the expected settings.

use std::fs;
use std::path::{Path, PathBuf};

use viewsort::organize::ViewsortConfig;

/// Read the sample config file content.
fn read_sample_config() -> String {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    fs::read_to_string(config_path).expect("Failed to read sample config file")
}

#[test]
fn sample_config_file_exists() {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    assert!(config_path.exists(), "Sample config file should exist");
}

#[test]
fn sample_config_is_valid_toml() {
    let config_content = read_sample_config();
    let result: Result<toml::Value, _> = toml::from_str(&config_content);
    assert!(result.is_ok(), "Sample config should be valid TOML: {:?}", result.err());
}

#[test]
fn sample_config_has_viewsort_section() {
    let config_content = read_sample_config();
    let value: toml::Value = toml::from_str(&config_content).expect("should parse");

    let table = value.as_table().expect("should be a table");
    assert!(table.contains_key("viewsort"), "Config should have [viewsort] section");
}

#[test]
fn viewsort_section_has_expected_structure() {
    let config_content = read_sample_config();
    let value: toml::Value = toml::from_str(&config_content).expect("should parse");

    let viewsort = value.get("viewsort").expect("should have viewsort section");

    for key in [
        "side_keyword",
        "ventral_keyword",
        "left_delimiter",
        "right_delimiter",
        "target",
        "default_group",
        "timepoint_delimiters",
        "group_delimiters",
        "extensions",
        "exclude",
        "move",
        "require_ventral",
        "require_video",
    ] {
        assert!(viewsort.get(key).is_some(), "viewsort section should have `{key}`");
    }
}

#[test]
fn config_values_have_correct_types() {
    let config_content = read_sample_config();
    let value: toml::Value = toml::from_str(&config_content).expect("should parse");

    let viewsort = value.get("viewsort").expect("should have viewsort section");

    // Check boolean types
    assert!(viewsort.get("ignore_case").unwrap().is_bool());
    assert!(viewsort.get("move").unwrap().is_bool());

    // Check string types
    assert!(viewsort.get("side_keyword").unwrap().is_str());
    assert!(viewsort.get("target").unwrap().is_str());

    // Check array types
    assert!(viewsort.get("extensions").unwrap().is_array());
    assert!(viewsort.get("timepoint_delimiters").unwrap().is_array());
}

#[test]
fn sample_config_parses_into_viewsort_config() {
    let config = ViewsortConfig::from_toml_str(&read_sample_config()).expect("should parse sample config");

    assert_eq!(config.side_keyword.as_deref(), Some("sideview"));
    assert_eq!(config.ventral_keyword.as_deref(), Some("ventralview"));
    assert_eq!(config.left_delimiter.as_deref(), Some("DLC_"));
    assert_eq!(config.right_delimiter.as_deref(), Some("_filtered"));
    assert_eq!(config.target, Some(PathBuf::from("/data/experiments/organized")));
    assert_eq!(config.default_group.as_deref(), Some("Batch"));
    assert_eq!(
        config.timepoint_delimiters,
        Some(("Week".to_string(), "_".to_string()))
    );
    assert_eq!(config.group_delimiters, Some(("Cohort".to_string(), "_".to_string())));
    assert_eq!(config.extensions, vec!["csv", "mp4"]);
    assert!(config.include.is_empty());
    assert_eq!(config.exclude, vec!["labeled"]);
    assert!(config.ignore_case);
    assert!(config.log);
    assert!(!config.move_files);
    assert!(config.recurse);
    assert!(config.require_ventral);
    assert!(!config.require_video);
}

#[test]
fn config_without_viewsort_section_uses_defaults() {
    let config = ViewsortConfig::from_toml_str("[other]\nverbose = true\n").expect("should parse");
    assert!(config.side_keyword.is_none());
    assert!(!config.verbose);
}
