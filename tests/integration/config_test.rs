//! Project and global configuration as seen by the binary

use std::fs;

use crate::support::fixtures::{PRICES, PRICES_DATA};
use crate::support::harness::{stderr, stdout, TestHarness};

#[test]
fn test_definition_name_from_project_config() {
    let harness = TestHarness::with_config(
        "---\nfeatures:\n  config_path: features\n  config_name: prices\nexecution:\n  parallel_execution: true\n---\n",
    );
    harness.write_definitions("prices", PRICES);
    let data = harness.write_data("in.json", PRICES_DATA);

    let output = harness.run(&["compute", "--data", data.to_str().unwrap(), "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["gross"][0].as_f64(), Some(25.0));
}

#[test]
fn test_flags_override_config() {
    let harness = TestHarness::new();
    fs::create_dir_all(harness.path().join("elsewhere")).unwrap();
    fs::write(harness.path().join("elsewhere/other.yml"), PRICES).unwrap();

    let output = harness.run(&["list", "-p", "elsewhere", "-n", "other"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("gross"));
}

#[test]
fn test_global_config_is_merged_under_project() {
    let harness = TestHarness::with_config("---\nproject:\n  name: local\n---\n");
    let global_dir = harness.path().join("home/.config/fabrica");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.md"),
        "---\nfeatures:\n  config_name: prices\n---\n\n# Global\n",
    )
    .unwrap();
    harness.write_definitions("prices", PRICES);

    let output = harness.run(&["list"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("3 features"));
}

#[test]
fn test_invalid_config_reported() {
    let harness = TestHarness::with_config("---\nlogging:\n  level: loud\n---\n");
    let output = harness.run(&["list"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid logging.level 'loud'"));
}

#[test]
fn test_version_ignores_broken_config() {
    let harness = TestHarness::with_config("---\nunknown_section: 1\n---\n");
    let output = harness.run(&["version"]);
    assert!(output.status.success());
}
