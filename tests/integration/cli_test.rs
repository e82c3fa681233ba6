//! End-to-end runs of the fabrica binary

use crate::support::fixtures::{CYCLE, PRICES, PRICES_DATA};
use crate::support::harness::{stderr, stdout, TestHarness};

#[test]
fn test_version() {
    let harness = TestHarness::new();
    let output = harness.run(&["version", "--verbose"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with(&format!("fabrica {}", env!("CARGO_PKG_VERSION"))));
    assert!(text.contains("commit: "));
    assert!(text.contains("built: "));
}

#[test]
fn test_compute_json() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);
    let data = harness.write_data("in.json", PRICES_DATA);

    let output = harness.run(&["compute", "-n", "prices", "--data", data.to_str().unwrap(), "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let gross: Vec<f64> = json["gross"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(gross, vec![25.0, 50.0]);
    assert_eq!(json["tax"][1].as_f64(), Some(40.0));
}

#[test]
fn test_compute_selected_features_with_trace() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);
    let data = harness.write_data("in.json", PRICES_DATA);

    let output = harness.run(&[
        "compute",
        "-n",
        "prices",
        "--data",
        data.to_str().unwrap(),
        "--json",
        "--trace",
        "--feature",
        "tax",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(json["values"].get("gross").is_none());
    let trace = &json["traces"]["tax"];
    assert_eq!(trace["transformation_name"], "halve");
    assert_eq!(trace["transformation_type"], "ScaleFeature");
    assert_eq!(trace["output_hash"].as_str().unwrap().len(), 64);
    assert!(trace["next"].is_null());
}

#[test]
fn test_compute_table_output() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);
    let data = harness.write_data("in.json", PRICES_DATA);

    let output = harness.run(&["compute", "-n", "prices", "--data", data.to_str().unwrap(), "--parallel"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("gross"));
    assert!(text.contains("float64"));
    assert!(text.contains("Computed 3 features"));
}

#[test]
fn test_compute_table_trace_is_json() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);
    let data = harness.write_data("in.json", PRICES_DATA);

    let output = harness.run(&["compute", "-n", "prices", "--data", data.to_str().unwrap(), "--trace"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    let line = text
        .lines()
        .find(|l| l.contains("\"transformation_name\":\"halve\""))
        .expect("trace line for tax");
    let trace: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(trace["transformation_type"], "ScaleFeature");
    assert!(trace["next"].is_null());
}

#[test]
fn test_compute_missing_input_fails() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);
    let data = harness.write_data("in.json", r#"{"price": [1.0]}"#);

    let output = harness.run(&["compute", "-n", "prices", "--data", data.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Missing input data for independent feature 'tax'"));
}

#[test]
fn test_compute_cycle_fails() {
    let harness = TestHarness::new();
    harness.write_definitions("loop", CYCLE);

    let output = harness.run(&["compute", "-n", "loop"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Cyclic dependency detected"));
}

#[test]
fn test_quiet_suppresses_summary() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);
    let data = harness.write_data("in.json", PRICES_DATA);

    let output = harness.run(&["--quiet", "compute", "-n", "prices", "--data", data.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!stdout(&output).contains("Computed"));
}

#[test]
fn test_list_features_and_groups() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);

    let output = harness.run(&["list", "-n", "prices", "--group", "raw"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("price"));
    assert!(text.contains("tax"));
    assert!(!text.contains("gross"));
    assert!(text.contains("2 features"));
}

#[test]
fn test_list_files() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);
    harness.write_definitions("loop", CYCLE);

    let output = harness.run(&["list", "--files"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "loop\nprices\n");
}

#[test]
fn test_transforms_lists_catalogue() {
    let harness = TestHarness::new();
    let output = harness.run(&["transforms"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("scale"));
    assert!(text.contains("ScaleFeature"));
    assert!(text.contains("import"));
}

#[test]
fn test_completion_script() {
    let harness = TestHarness::new();
    let output = harness.run(&["completion", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("fabrica"));
}
