//! Common test helpers for integration tests

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use fabrica::array::{Array, Value};

/// Write `<dir>/<name>.yaml`, creating `dir` if needed.
pub fn write_definitions(dir: &Path, name: &str, yaml: &str) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(format!("{}.yaml", name)), yaml)
}

/// Float inputs keyed by feature name.
pub fn float_inputs(entries: &[(&str, &[f64])]) -> HashMap<String, Value> {
    entries
        .iter()
        .map(|(name, values)| (name.to_string(), Array::from_f64(values.to_vec()).into()))
        .collect()
}

/// Flattened float contents of a computed value.
pub fn floats(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .and_then(|a| a.as_f64_vec())
        .expect("value should be a numeric array")
}
