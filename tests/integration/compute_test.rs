//! Computing definition files loaded from disk

use std::collections::HashMap;
use tempfile::TempDir;

use fabrica::array::{Array, Value};

use fabrica::config::ExecutionConfig;
use fabrica::errors::TransformationError;
use fabrica::manager::FeatureManager;

use crate::common::{float_inputs, floats, write_definitions};
use crate::support::builders::{definitions, FeatureBuilder};
use crate::support::fixtures::{PRICES, STAGES};

#[test]
fn test_compute_from_file() {
    let tmp = TempDir::new().unwrap();
    write_definitions(tmp.path(), "prices", PRICES).unwrap();

    let mut manager = FeatureManager::new(tmp.path(), "prices").unwrap();
    assert_eq!(manager.order(), ["price", "tax", "gross"]);

    let inputs = float_inputs(&[("price", &[10.0, 20.0]), ("tax", &[40.0, 80.0])]);
    let results = manager.compute_features(&inputs).unwrap();

    assert_eq!(floats(results.get("tax").unwrap()), vec![20.0, 40.0]);
    assert_eq!(floats(results.get("gross").unwrap()), vec![25.0, 50.0]);
    let names: Vec<&str> = results.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["price", "tax", "gross"]);

    let gross = manager.feature("gross").unwrap();
    assert!(!gross.transformation_chain().is_empty());
    assert_eq!(gross.feature_value().unwrap().data_type().to_string(), "float64");
}

#[test]
fn test_recompute_gives_same_result() {
    let tmp = TempDir::new().unwrap();
    write_definitions(tmp.path(), "stages", STAGES).unwrap();
    let mut manager = FeatureManager::new(tmp.path(), "stages").unwrap();

    let inputs = float_inputs(&[("reading", &[2.0, 8.0])]);
    let first = manager.compute_features(&inputs).unwrap();
    let second = manager.compute_features(&inputs).unwrap();
    assert_eq!(first, second);

    assert_eq!(floats(first.get("reading").unwrap()), vec![2.0, 4.0]);
    assert_eq!(floats(first.get("offset").unwrap()), vec![3.0, 15.0]);
}

#[test]
fn test_parallel_matches_sequential() {
    let yaml = definitions(&[
        FeatureBuilder::new("a"),
        FeatureBuilder::new("b"),
        FeatureBuilder::new("c"),
        FeatureBuilder::new("ab").depends_on(&["a", "b"]).step("sum", "_target_: a + b"),
        FeatureBuilder::new("bc").depends_on(&["b", "c"]).step("prod", "_target_: b * c"),
        FeatureBuilder::new("top")
            .depends_on(&["ab", "bc"])
            .step("diff", "_target_: ab - bc")
            .step("double", "_target_: scale\nfactor: 2"),
    ]);
    let inputs = float_inputs(&[("a", &[1.0, 2.0]), ("b", &[3.0, 4.0]), ("c", &[5.0, 6.0])]);

    let mut sequential = FeatureManager::builder().from_yaml_str(&yaml).unwrap();
    let mut parallel = FeatureManager::builder()
        .execution(ExecutionConfig::parallel(2))
        .from_yaml_str(&yaml)
        .unwrap();
    assert_eq!(parallel.levels().len(), 3);

    let expected = sequential.compute_features(&inputs).unwrap();
    let actual = parallel.compute_features(&inputs).unwrap();
    assert_eq!(expected, actual);
    // (1+3) - 3*5 = -11, (2+4) - 4*6 = -18
    assert_eq!(floats(actual.get("top").unwrap()), vec![-22.0, -36.0]);
}

#[test]
fn test_defaults_include() {
    let tmp = TempDir::new().unwrap();
    write_definitions(
        tmp.path(),
        "base",
        &definitions(&[FeatureBuilder::new("price").group("raw")]),
    )
    .unwrap();
    let main = format!(
        "defaults:\n  - base\n{}",
        definitions(&[FeatureBuilder::new("doubled")
            .depends_on(&["price"])
            .step("twice", "_target_: price * 2")])
    );
    write_definitions(tmp.path(), "main", &main).unwrap();

    let mut manager = FeatureManager::new(tmp.path(), "main").unwrap();
    assert_eq!(manager.features().len(), 2);
    assert_eq!(manager.feature("price").unwrap().group(), Some("raw"));

    let results = manager.compute_features(&float_inputs(&[("price", &[1.5])])).unwrap();
    assert_eq!(floats(results.get("doubled").unwrap()), vec![3.0]);
}

#[test]
fn test_failing_step_names_feature_and_step() {
    let yaml = definitions(&[FeatureBuilder::new("label")
        .data_type("str")
        .step("lower", "_target_: lower")
        .step("root", "_target_: sqrt")]);
    let mut manager = FeatureManager::builder().from_yaml_str(&yaml).unwrap();

    let inputs: HashMap<String, Value> = HashMap::from([("label".to_string(), Array::from_strs(&["ABC"]).into())]);
    let err = manager.compute_features(&inputs).unwrap_err();
    let failure = err.downcast_ref::<TransformationError>().unwrap();
    assert_eq!(failure.feature, "label");
    assert_eq!(failure.step, "root");
}
