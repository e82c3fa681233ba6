//! Dependency graph output

use fabrica::graph::GraphDetail;
use fabrica::manager::FeatureManager;

use crate::support::fixtures::PRICES;
use crate::support::harness::{stderr, stdout, TestHarness};

#[test]
fn test_dot_to_stdout() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);

    let output = harness.run(&["graph", "-n", "prices", "--format", "dot"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("// Feature Dependencies\ndigraph {"));
    assert!(text.contains("\t\"price\" -> \"gross\"\n"));
    assert!(text.contains("\t\"tax\" -> \"gross\"\n"));
}

#[test]
fn test_save_adds_dot_extension() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);

    let output = harness.run(&["graph", "-n", "prices", "--output", "deps"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let saved = harness.path().join("deps.dot");
    assert!(saved.exists());
    assert!(std::fs::read_to_string(saved).unwrap().contains("digraph"));
    assert!(stdout(&output).contains("deps.dot"));
}

#[test]
fn test_ascii_with_types() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);

    let output = harness.run(&["graph", "-n", "prices", "--detail", "types"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("price, tax ──▶ gross"));
    assert!(text.contains("[derived]"));
    assert!(text.contains("Roots:    price, tax"));
    assert!(text.contains("Leaves:   gross"));
}

#[test]
fn test_manager_ascii_matches_levels() {
    let manager = FeatureManager::builder().from_yaml_str(PRICES).unwrap();
    let drawing = manager.dependency_graph_ascii(GraphDetail::Minimal).unwrap();
    let first_boxes = drawing.lines().nth(1).unwrap();
    assert!(first_boxes.contains("price") && first_boxes.contains("tax"));
    assert!(!first_boxes.contains("gross"));
}
