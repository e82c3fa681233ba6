//! Pulling other features' values into a chain.

use anyhow::{bail, Result};

use super::{CompileContext, ExecContext, Operand, Transformation, TransformationRegistry};
use crate::array::Value;
use crate::instantiate::Param;

/// Import one feature's value, or stack several along a new leading axis.
///
/// Stacking follows [`Value::from_items`]: numeric values become `float64`
/// if any is a float and `int64` otherwise, strings stay strings, and
/// anything mixed or ragged is returned as a list.
#[derive(Debug)]
pub struct FeatureImporter {
    iterable: Vec<Operand>,
}

impl FeatureImporter {
    pub fn new(iterable: Vec<Operand>) -> Result<Self> {
        if iterable.is_empty() {
            bail!("features or feature should be set.");
        }
        Ok(Self { iterable })
    }

    /// Import references given as `name` or `name:step`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::new(names.iter().map(|n| Operand::reference(n.as_ref())).collect())
    }
}

impl Transformation for FeatureImporter {
    fn name(&self) -> &str {
        "FeatureImporter"
    }

    fn expects_data(&self) -> bool {
        false
    }

    fn compile(&mut self, ctx: &mut CompileContext<'_>) -> Result<()> {
        for operand in &mut self.iterable {
            operand.compile(ctx)?;
        }
        Ok(())
    }

    fn execute(&self, _data: Option<Value>, ctx: &ExecContext<'_>) -> Result<Value> {
        let mut values = self
            .iterable
            .iter()
            .map(|operand| operand.resolve(ctx))
            .collect::<Result<Vec<_>>>()?;
        if values.len() == 1 {
            return Ok(values.remove(0));
        }
        Ok(Value::from_items(values))
    }
}

/// Operands for import: strings are explicit references, `{name: step}` a
/// stage, anything else (nested chains, literals) as given.
fn import_operand(param: Param) -> Result<Operand> {
    match param {
        Param::Str(name) => Ok(Operand::reference(&name)),
        other => other.into_operand(),
    }
}

pub(crate) fn register_builtins(registry: &mut TransformationRegistry) {
    registry.add("import", "FeatureImporter", "Import and stack feature values", |args| {
        if let Some(feature) = args.take_string("feature")? {
            if args.take("iterable").is_some() {
                bail!("FeatureImporter takes either 'feature' or 'iterable', not both");
            }
            return Ok(Box::new(FeatureImporter::from_names(&[feature])?));
        }
        let iterable = match args.take("iterable") {
            None => Vec::new(),
            Some(Param::List(items)) => items
                .into_iter()
                .map(import_operand)
                .collect::<Result<Vec<_>>>()?,
            Some(single) => vec![import_operand(single)?],
        };
        Ok(Box::new(FeatureImporter::new(iterable)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Array, DType};
    use crate::promise::PromiseManager;
    use std::collections::HashMap;

    fn compiled(names: &[&str], deps: &[&str], pm: &mut PromiseManager) -> FeatureImporter {
        let deps: Vec<String> = deps.iter().map(|s| s.to_string()).collect();
        let mut importer = FeatureImporter::from_names(names).unwrap();
        importer
            .compile(&mut CompileContext::new("f", &deps, pm))
            .unwrap();
        importer
    }

    #[test]
    fn test_single_feature_passes_through() {
        let mut pm = PromiseManager::new();
        let importer = compiled(&["a"], &["a"], &mut pm);
        let mut values = HashMap::new();
        values.insert("a".to_string(), Value::from(Array::from_f32(vec![1.0])));
        let out = importer.execute(None, &ExecContext::new("f", &values, &pm)).unwrap();
        assert_eq!(out.as_array().unwrap().dtype(), DType::Float32);
    }

    #[test]
    fn test_stack_mixed_numeric_as_float() {
        let mut pm = PromiseManager::new();
        let importer = compiled(&["a", "b"], &["a", "b"], &mut pm);
        let mut values = HashMap::new();
        values.insert("a".to_string(), Value::from(Array::from_i32(vec![1, 2])));
        values.insert("b".to_string(), Value::from(Array::from_f32(vec![0.5, 1.5])));
        let out = importer.execute(None, &ExecContext::new("f", &values, &pm)).unwrap();
        let out = out.as_array().unwrap();
        assert_eq!(out.dtype(), DType::Float64);
        assert_eq!(out.shape(), &[2, 2]);
    }

    #[test]
    fn test_stack_mixed_kinds_is_list() {
        let mut pm = PromiseManager::new();
        let importer = compiled(&["a", "b"], &["a", "b"], &mut pm);
        let mut values = HashMap::new();
        values.insert("a".to_string(), Value::from(Array::from_i64(vec![1])));
        values.insert("b".to_string(), Value::from(Array::from_strs(&["x"])));
        let out = importer.execute(None, &ExecContext::new("f", &values, &pm)).unwrap();
        assert!(matches!(out, Value::List(_)));
    }

    #[test]
    fn test_stage_import() {
        let mut pm = PromiseManager::new();
        let importer = compiled(&["a:scale"], &["a"], &mut pm);
        assert!(pm.is_promised("a", Some("scale")));
        pm.pass_data("a", Some("scale"), Array::from_i64(vec![7]).into(), false)
            .unwrap();
        let values = HashMap::new();
        let out = importer.execute(None, &ExecContext::new("f", &values, &pm)).unwrap();
        assert_eq!(out, Value::from(Array::from_i64(vec![7])));
    }

    #[test]
    fn test_unknown_reference_rejected_at_compile() {
        let mut pm = PromiseManager::new();
        let deps: Vec<String> = Vec::new();
        let mut importer = FeatureImporter::from_names(&["missing"]).unwrap();
        assert!(importer
            .compile(&mut CompileContext::new("f", &deps, &mut pm))
            .is_err());
    }
}
