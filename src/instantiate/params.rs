//! Keyword arguments handed to transformation factories.

use anyhow::{anyhow, bail, Result};

use crate::array::{Array, Value};
use crate::transform::{Chain, Operand};

/// One keyword argument value, after nested `_target_` nodes have been
/// instantiated.
#[derive(Debug)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Param>),
    Map(Vec<(String, Param)>),
    Chain(Chain),
}

impl Param {
    pub fn kind(&self) -> &'static str {
        match self {
            Param::Null => "null",
            Param::Bool(_) => "bool",
            Param::Int(_) => "int",
            Param::Float(_) => "float",
            Param::Str(_) => "string",
            Param::List(_) => "list",
            Param::Map(_) => "mapping",
            Param::Chain(_) => "transformation",
        }
    }

    /// A literal value: scalars become 0-d arrays, lists are stacked.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Param::Bool(b) => Ok(Array::scalar_bool(b).into()),
            Param::Int(i) => Ok(Array::scalar_i64(i).into()),
            Param::Float(f) => Ok(Array::scalar_f64(f).into()),
            Param::Str(s) => Ok(Array::scalar_str(&s).into()),
            Param::List(items) => {
                let values = items
                    .into_iter()
                    .map(Param::into_value)
                    .collect::<Result<Vec<_>>>()?;
                if values.is_empty() {
                    return Ok(Array::from_f64(Vec::new()).into());
                }
                Ok(Value::from_items(values))
            }
            other => bail!("a {} is not a literal value", other.kind()),
        }
    }

    /// An operand: strings are names bound at compile time, a single-entry
    /// mapping `{feature: step}` is a stage reference.
    pub fn into_operand(self) -> Result<Operand> {
        match self {
            Param::Null => bail!("null is not a valid operand"),
            Param::Str(name) => Ok(Operand::Name(name)),
            Param::Chain(chain) => Ok(Operand::Chain(chain)),
            Param::Map(mut entries) => {
                if entries.len() != 1 {
                    bail!("a stage reference must be a single 'feature: step' entry");
                }
                let (feature, step) = entries.remove(0);
                match step {
                    Param::Str(step) => Ok(Operand::Stage { feature, step }),
                    other => bail!("stage of '{}' must be a step name, got a {}", feature, other.kind()),
                }
            }
            literal => Ok(Operand::Literal(literal.into_value()?)),
        }
    }
}

/// Keyword arguments for one transformation, consumed by its factory.
#[derive(Debug)]
pub struct Args {
    type_name: String,
    entries: Vec<(String, Param)>,
}

impl Args {
    pub fn new(type_name: &str, entries: Vec<(String, Param)>) -> Self {
        Self {
            type_name: type_name.to_string(),
            entries,
        }
    }

    pub fn empty(type_name: &str) -> Self {
        Self::new(type_name, Vec::new())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Remove and return `key`. Null counts as absent.
    pub fn take(&mut self, key: &str) -> Option<Param> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        match self.entries.remove(index).1 {
            Param::Null => None,
            param => Some(param),
        }
    }

    fn missing(&self, key: &str) -> anyhow::Error {
        anyhow!("{} missing required argument '{}'", self.type_name, key)
    }

    fn wrong_type(&self, key: &str, expected: &str, got: &Param) -> anyhow::Error {
        anyhow!(
            "{} argument '{}' must be {}, got a {}",
            self.type_name,
            key,
            expected,
            got.kind()
        )
    }

    pub fn take_f64(&mut self, key: &str) -> Result<Option<f64>> {
        match self.take(key) {
            None => Ok(None),
            Some(Param::Int(i)) => Ok(Some(i as f64)),
            Some(Param::Float(f)) => Ok(Some(f)),
            Some(other) => Err(self.wrong_type(key, "a number", &other)),
        }
    }

    pub fn require_f64(&mut self, key: &str) -> Result<f64> {
        self.take_f64(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn take_i64(&mut self, key: &str) -> Result<Option<i64>> {
        match self.take(key) {
            None => Ok(None),
            Some(Param::Int(i)) => Ok(Some(i)),
            Some(Param::Float(f)) if f.fract() == 0.0 => Ok(Some(f as i64)),
            Some(other) => Err(self.wrong_type(key, "an integer", &other)),
        }
    }

    pub fn require_i64(&mut self, key: &str) -> Result<i64> {
        self.take_i64(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn take_bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.take(key) {
            None => Ok(None),
            Some(Param::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(self.wrong_type(key, "a bool", &other)),
        }
    }

    pub fn take_string(&mut self, key: &str) -> Result<Option<String>> {
        match self.take(key) {
            None => Ok(None),
            Some(Param::Str(s)) => Ok(Some(s)),
            Some(other) => Err(self.wrong_type(key, "a string", &other)),
        }
    }

    pub fn require_string(&mut self, key: &str) -> Result<String> {
        self.take_string(key)?.ok_or_else(|| self.missing(key))
    }

    /// A list of strings; numbers and bools are written as text.
    pub fn take_strings(&mut self, key: &str) -> Result<Option<Vec<String>>> {
        let items = match self.take(key) {
            None => return Ok(None),
            Some(Param::List(items)) => items,
            Some(other) => return Err(self.wrong_type(key, "a list", &other)),
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let text = match item {
                Param::Str(s) => s,
                Param::Int(i) => i.to_string(),
                Param::Float(f) => format!("{:?}", f),
                Param::Bool(true) => "True".to_string(),
                Param::Bool(false) => "False".to_string(),
                other => return Err(self.wrong_type(key, "a list of strings", &other)),
            };
            out.push(text);
        }
        Ok(Some(out))
    }

    pub fn take_operand(&mut self, key: &str) -> Result<Option<Operand>> {
        match self.take(key) {
            None => Ok(None),
            Some(param) => param
                .into_operand()
                .map(Some)
                .map_err(|e| anyhow!("{} argument '{}': {}", self.type_name, key, e)),
        }
    }

    /// A list whose items are each an operand.
    pub fn take_operands(&mut self, key: &str) -> Result<Option<Vec<Operand>>> {
        let items = match self.take(key) {
            None => return Ok(None),
            Some(Param::List(items)) => items,
            Some(other) => return Err(self.wrong_type(key, "a list", &other)),
        };
        let operands = items
            .into_iter()
            .map(Param::into_operand)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| anyhow!("{} argument '{}': {}", self.type_name, key, e))?;
        Ok(Some(operands))
    }

    /// Fail on any keyword the factory did not consume.
    pub fn finish(self) -> Result<()> {
        if let Some((key, _)) = self.entries.first() {
            bail!(
                "{} got an unexpected keyword argument '{}'",
                self.type_name,
                key
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DType;

    fn args(entries: Vec<(&str, Param)>) -> Args {
        Args::new(
            "ScaleFeature",
            entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        )
    }

    #[test]
    fn test_numbers() {
        let mut a = args(vec![("factor", Param::Int(2)), ("other", Param::Float(0.5))]);
        assert_eq!(a.require_f64("factor").unwrap(), 2.0);
        assert_eq!(a.take_f64("other").unwrap(), Some(0.5));
        a.finish().unwrap();
    }

    #[test]
    fn test_missing_and_unexpected() {
        let mut a = args(vec![("factr", Param::Int(2))]);
        let err = a.require_f64("factor").unwrap_err();
        assert_eq!(err.to_string(), "ScaleFeature missing required argument 'factor'");
        let err = a.finish().unwrap_err();
        assert!(err.to_string().contains("unexpected keyword argument 'factr'"));
    }

    #[test]
    fn test_wrong_type() {
        let mut a = args(vec![("factor", Param::Str("x".to_string()))]);
        assert!(a.require_f64("factor").is_err());
    }

    #[test]
    fn test_null_is_absent() {
        let mut a = args(vec![("chars", Param::Null)]);
        assert_eq!(a.take_string("chars").unwrap(), None);
        a.finish().unwrap();
    }

    #[test]
    fn test_operands() {
        let mut a = args(vec![(
            "iterable",
            Param::List(vec![
                Param::Str("feature_a".to_string()),
                Param::Int(2),
                Param::Map(vec![("feature_b".to_string(), Param::Str("scale".to_string()))]),
            ]),
        )]);
        let ops = a.take_operands("iterable").unwrap().unwrap();
        assert!(matches!(&ops[0], Operand::Name(n) if n == "feature_a"));
        assert!(matches!(&ops[1], Operand::Literal(_)));
        assert!(matches!(&ops[2], Operand::Stage { feature, step } if feature == "feature_b" && step == "scale"));
    }

    #[test]
    fn test_list_literal() {
        let value = Param::List(vec![Param::Int(1), Param::Float(2.5)]).into_value().unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.dtype(), DType::Float64);
        assert_eq!(array.shape(), &[2]);
    }

    #[test]
    fn test_strings_list() {
        let mut a = args(vec![(
            "categories",
            Param::List(vec![Param::Str("a".to_string()), Param::Int(3)]),
        )]);
        assert_eq!(a.take_strings("categories").unwrap().unwrap(), vec!["a", "3"]);
    }
}
