//! Type conversion and list building.

use anyhow::{bail, Result};

use super::{required_data, CompileContext, ExecContext, Operand, Transformation, TransformationRegistry};
use crate::array::{DType, Value};

/// Cast incoming data to a dtype.
#[derive(Debug)]
pub struct AsType {
    dtype: DType,
}

impl AsType {
    pub fn new(dtype: &str) -> Result<Self> {
        match DType::parse(dtype) {
            Ok(dtype) => Ok(Self { dtype }),
            Err(_) => bail!("dtype = {} is not valid numpy data type!", dtype),
        }
    }
}

fn cast_value(value: Value, dtype: &DType) -> Result<Value> {
    match value {
        Value::Array(array) => Ok(array.astype(dtype)?.into()),
        Value::List(items) => items
            .into_iter()
            .map(|item| cast_value(item, dtype))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
    }
}

impl Transformation for AsType {
    fn name(&self) -> &str {
        "AsType"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        cast_value(required_data(data, self.name())?, &self.dtype)
    }
}

/// Collect operands into a list value without stacking them.
#[derive(Debug)]
pub struct ListAggregation {
    iterable: Vec<Operand>,
}

impl ListAggregation {
    pub fn new(iterable: Vec<Operand>) -> Self {
        Self { iterable }
    }
}

impl Transformation for ListAggregation {
    fn name(&self) -> &str {
        "ListAggregation"
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
        let items = self
            .iterable
            .iter()
            .map(|operand| operand.resolve(ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::List(items))
    }
}

pub(crate) fn register_builtins(registry: &mut TransformationRegistry) {
    registry.add("astype", "AsType", "Cast to dtype", |args| {
        Ok(Box::new(AsType::new(&args.require_string("dtype")?)?))
    });
    registry.add("list", "ListAggregation", "Collect operands into a list", |args| {
        let iterable = args.take_operands("iterable")?.unwrap_or_default();
        if iterable.is_empty() {
            bail!("ListAggregation needs a non-empty 'iterable'");
        }
        Ok(Box::new(ListAggregation::new(iterable)))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::promise::PromiseManager;
    use std::collections::HashMap;

    #[test]
    fn test_astype_truncates() {
        let step = AsType::new("int32").unwrap();
        let out = step
            .execute(Some(Array::from_f64(vec![1.5, 2.6, 3.7]).into()), &ExecContext::detached())
            .unwrap();
        let out = out.as_array().unwrap();
        assert_eq!(out.dtype(), DType::Int32);
        assert_eq!(out.as_i64_vec().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_astype_invalid_dtype() {
        let err = AsType::new("invalid_dtype").unwrap_err();
        assert_eq!(err.to_string(), "dtype = invalid_dtype is not valid numpy data type!");
    }

    #[test]
    fn test_astype_datetime() {
        let step = AsType::new("datetime64[D]").unwrap();
        let out = step
            .execute(Some(Array::from_strs(&["2024-03-01"]).into()), &ExecContext::detached())
            .unwrap();
        assert_eq!(out.as_array().unwrap().format_element(0), "2024-03-01");
    }

    #[test]
    fn test_list_aggregation() {
        let mut pm = PromiseManager::new();
        let deps = vec!["a".to_string()];
        let mut step = ListAggregation::new(vec![
            Operand::Name("a".into()),
            Operand::literal(Array::from_strs(&["x", "y", "z"])),
        ]);
        step.compile(&mut CompileContext::new("f", &deps, &mut pm)).unwrap();

        let mut values = HashMap::new();
        values.insert("a".to_string(), Value::from(Array::from_i64(vec![1])));
        let out = step.execute(None, &ExecContext::new("f", &values, &pm)).unwrap();
        match out {
            Value::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1].shape(), vec![3]);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }
}
