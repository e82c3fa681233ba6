//! `fabrica validate` and the validation report

use fabrica::array::Casting;
use fabrica::transform::TransformationRegistry;
use fabrica::validation::{validate_definitions, Severity, ValidationCategory};

use crate::support::builders::{definitions, FeatureBuilder};
use crate::support::fixtures::{CYCLE, PRICES};
use crate::support::harness::{stderr, stdout, TestHarness};

#[test]
fn test_valid_file_passes() {
    let harness = TestHarness::new();
    harness.write_definitions("prices", PRICES);

    let output = harness.run(&["validate", "-n", "prices"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("3 features"));
}

#[test]
fn test_errors_fail_with_every_issue_listed() {
    let harness = TestHarness::new();
    let yaml = definitions(&[
        FeatureBuilder::new("typo").step("t", "_target_: scael\nfactor: 2"),
        FeatureBuilder::new("orphan")
            .depends_on(&["ghost"])
            .step("t", "_target_: ghost * 2"),
        FeatureBuilder::new("odd").data_type("float128"),
    ]);
    harness.write_definitions("broken", &yaml);

    let output = harness.run(&["validate", "-n", "broken"]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Error locating target 'scael'"));
    assert!(text.contains("unknown feature 'ghost'"));
    assert!(text.contains("float128"));
    assert!(stderr(&output).contains("Validation of 'broken' failed"));
}

#[test]
fn test_strict_turns_warnings_into_failure() {
    let harness = TestHarness::new();
    let yaml = definitions(&[
        FeatureBuilder::new("raw"),
        FeatureBuilder::new("supplied").depends_on(&["raw"]),
    ]);
    harness.write_definitions("warn", &yaml);

    assert!(harness.run(&["validate", "-n", "warn"]).status.success());
    let strict = harness.run(&["validate", "-n", "warn", "--strict"]);
    assert!(!strict.status.success());
    assert!(stderr(&strict).contains("--strict"));
}

#[test]
fn test_cycle_in_report() {
    let harness = TestHarness::new();
    harness.write_definitions("loop", CYCLE);

    let report = validate_definitions(
        &harness.features_dir,
        "loop",
        &TransformationRegistry::with_builtins(),
        Casting::Unsafe,
    );
    let cycles: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.category == ValidationCategory::Dependency && i.message.starts_with("Cyclic"))
        .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].severity, Severity::Error);
    assert!(cycles[0].message.contains("a -> b"));
}

#[test]
fn test_demo_definitions_are_valid() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/features");
    let report = validate_definitions(
        &demos,
        "basic_features",
        &TransformationRegistry::with_builtins(),
        Casting::Unsafe,
    );
    assert!(report.is_valid(), "{:#?}", report.issues);
    assert_eq!(report.total, 9);
}
