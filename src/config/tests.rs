use super::*;
use crate::array::Casting;
use std::fs;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn test_parse_config() {
    let content = r#"---
project:
  name: test-project

features:
  config_path: defs
  config_name: basic_features

execution:
  parallel_execution: true
  max_workers: 4
---

# Config
"#;
    let config = Config::parse(content).unwrap();
    assert_eq!(config.project.name, "test-project");
    assert_eq!(config.features.config_path, "defs");
    assert_eq!(config.features.config_name, "basic_features");
    assert!(config.execution.parallel_execution);
    assert_eq!(config.execution.workers(), 4);
}

#[test]
fn test_parse_minimal_config() {
    let content = r#"---
project:
  name: minimal
---
"#;
    let config = Config::parse(content).unwrap();
    assert_eq!(config.project.name, "minimal");
    assert_eq!(config.features.config_path, "features");
    assert!(!config.execution.parallel_execution);
    assert_eq!(config.validation.casting, Casting::Unsafe);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_parse_without_frontmatter_fails() {
    assert!(Config::parse("just markdown").is_err());
}

#[test]
fn test_unknown_section_rejected() {
    let content = "---\nproviders:\n  x: 1\n---\n";
    assert!(Config::parse(content).is_err());
}

#[test]
fn test_invalid_log_level_rejected() {
    let content = "---\nlogging:\n  level: loud\n---\n";
    let err = Config::parse(content).unwrap_err();
    assert!(err.to_string().contains("Invalid logging.level 'loud'"));
}

#[test]
#[serial]
fn test_global_config_path() {
    std::env::set_var("HOME", "/home/testuser");
    let path = global_config_path().unwrap();
    let expected = std::path::PathBuf::from("/home/testuser")
        .join(".config")
        .join("fabrica")
        .join("config.md");
    assert_eq!(path, expected);
}

#[test]
fn test_load_merged_no_files() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load_merged_from(
        Some(&tmp.path().join("missing-global.md")),
        &tmp.path().join("missing-project.md"),
    )
    .unwrap();
    assert_eq!(config.features.config_name, "features");
    assert_eq!(config.execution, ExecutionConfig::sequential());
}

#[test]
fn test_load_merged_project_overrides_global() {
    let tmp = TempDir::new().unwrap();
    let global_path = tmp.path().join("global.md");
    let project_path = tmp.path().join("config.md");

    fs::write(
        &global_path,
        r#"---
features:
  config_path: ~/shared-features
  config_name: base
execution:
  parallel_execution: true
  max_workers: 8
validation:
  casting: safe
---
"#,
    )
    .unwrap();
    fs::write(
        &project_path,
        r#"---
project:
  name: my-project
features:
  config_name: local
execution:
  max_workers: 2
---
"#,
    )
    .unwrap();

    let config = Config::load_merged_from(Some(&global_path), &project_path).unwrap();
    assert_eq!(config.project.name, "my-project");
    // Field-level merge inside sections
    assert_eq!(config.features.config_path, "~/shared-features");
    assert_eq!(config.features.config_name, "local");
    assert!(config.execution.parallel_execution);
    assert_eq!(config.execution.max_workers, 2);
    assert_eq!(config.validation.casting, Casting::Safe);
}

#[test]
#[serial]
fn test_features_dir_expands_tilde() {
    std::env::set_var("HOME", "/home/testuser");
    let config = Config {
        features: FeaturesConfig {
            config_path: "~/defs".to_string(),
            config_name: "f".to_string(),
        },
        ..Default::default()
    };
    assert_eq!(config.features_dir(), std::path::PathBuf::from("/home/testuser/defs"));
}

#[test]
fn test_split_frontmatter() {
    let (frontmatter, body) = split_frontmatter("---\na: 1\n---\n# Body\n");
    assert_eq!(frontmatter.as_deref(), Some("a: 1"));
    assert_eq!(body, "# Body\n");

    let (frontmatter, body) = split_frontmatter("no frontmatter");
    assert!(frontmatter.is_none());
    assert_eq!(body, "no frontmatter");
}

#[test]
fn test_workers_zero_uses_machine() {
    assert!(ExecutionConfig::parallel(0).workers() >= 1);
}
