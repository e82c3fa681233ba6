//! Feature values and promised values.

use anyhow::{bail, Context, Result};

use crate::array::{can_cast, Array, Casting, DType, Value};

/// A computed value checked against its feature's declared data type.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureValue {
    value: Value,
    data_type: DType,
}

impl FeatureValue {
    /// Validate `value` against `data_type`, casting when `casting` allows it.
    ///
    /// A list is accepted only when every element validates on its own.
    pub fn new(value: Value, data_type: DType, casting: Casting) -> Result<Self> {
        let value = validate_value(value, &data_type, casting)?;
        Ok(Self { value, data_type })
    }

    /// Parse the declared type name and validate.
    pub fn with_type_name(value: Value, data_type: &str, casting: Casting) -> Result<Self> {
        let dtype = DType::parse(data_type)?;
        Self::new(value, dtype, casting)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn data_type(&self) -> DType {
        self.data_type
    }

    pub fn as_array(&self) -> Result<&Array> {
        self.value.as_array()
    }
}

fn validate_value(value: Value, expected: &DType, casting: Casting) -> Result<Value> {
    match value {
        Value::Array(array) => validate_array(array, expected, casting).map(Value::Array),
        Value::List(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                validate_value(item, expected, casting)
                    .with_context(|| format!("list element {} does not validate", i))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
    }
}

fn validate_array(array: Array, expected: &DType, casting: Casting) -> Result<Array> {
    let actual = array.dtype();
    if expected.accepts(&actual) {
        return Ok(array);
    }
    if !can_cast(&actual, expected, casting) {
        bail!(
            "Array dtype '{}' does not match or is not compatible with expected type '{}'",
            actual,
            expected
        );
    }
    array.astype(expected)
}

/// A slot for a value another computation will produce later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromiseValue {
    value: Option<Value>,
    data_type: Option<DType>,
    casting: Casting,
}

impl PromiseValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A promise whose value is validated against `data_type` when fulfilled.
    pub fn typed(data_type: DType, casting: Casting) -> Self {
        Self {
            value: None,
            data_type: Some(data_type),
            casting,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn fulfil(&mut self, value: Value) -> Result<()> {
        let value = match &self.data_type {
            Some(dtype) => validate_value(value, dtype, self.casting)?,
            None => value,
        };
        self.value = Some(value);
        Ok(())
    }

    /// Forget the value, keeping the slot.
    pub fn reset(&mut self) {
        self.value = None;
    }
}
