//! String cleaning, splitting and categorical encoding.

use anyhow::{anyhow, bail, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

use super::{required_array, CompileContext, ExecContext, Operand, Transformation, TransformationRegistry};
use crate::array::{Array, Buffer, DType, Value};

/// String elements of incoming data and the shape they came in.
fn strings(data: Option<Value>, step: &str) -> Result<(Vec<String>, Vec<usize>)> {
    let array = required_array(data, step)?;
    let values = array.as_str_vec()?.to_vec();
    Ok((values, array.shape().to_vec()))
}

/// Codes as an int32 array; 0-d input counts as one element.
fn int32_array(codes: Vec<i64>, mut shape: Vec<usize>, trailing: Option<usize>) -> Result<Array> {
    if shape.is_empty() {
        shape.push(1);
    }
    if let Some(width) = trailing {
        shape.push(width);
    }
    Array::new(DType::Int32, shape, Buffer::Int(codes))
}

fn sorted_unique(values: &[String]) -> Vec<String> {
    values
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn index_map(categories: &[String]) -> HashMap<&str, usize> {
    categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect()
}

macro_rules! string_map {
    ($type:ident, $doc:literal, $f:expr) => {
        #[doc = $doc]
        #[derive(Debug)]
        pub struct $type;

        impl Transformation for $type {
            fn name(&self) -> &str {
                stringify!($type)
            }

            fn expects_data(&self) -> bool {
                true
            }

            fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
                Ok(required_array(data, self.name())?.map_str($f)?.into())
            }
        }
    };
}

string_map!(ToLower, "Lowercase every element.", |s: &str| s.to_lowercase());
string_map!(ToUpper, "Uppercase every element.", |s: &str| s.to_uppercase());

/// Trim whitespace, or any of `chars`, from both ends.
#[derive(Debug)]
pub struct Strip {
    chars: Option<Vec<char>>,
}

impl Strip {
    pub fn new(chars: Option<&str>) -> Self {
        Self {
            chars: chars.map(|c| c.chars().collect()),
        }
    }
}

impl Transformation for Strip {
    fn name(&self) -> &str {
        "Strip"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let array = required_array(data, self.name())?;
        let stripped = match &self.chars {
            None => array.map_str(|s| s.trim().to_string())?,
            Some(chars) => array.map_str(|s| s.trim_matches(chars.as_slice()).to_string())?,
        };
        Ok(stripped.into())
    }
}

/// Split each element on a delimiter. The pieces of one element form an
/// array; several elements give a list of them.
#[derive(Debug)]
pub struct Split {
    delimiter: String,
}

impl Split {
    pub fn new(delimiter: &str) -> Result<Self> {
        if delimiter.is_empty() {
            bail!("Split delimiter must not be empty");
        }
        Ok(Self {
            delimiter: delimiter.to_string(),
        })
    }
}

impl Transformation for Split {
    fn name(&self) -> &str {
        "Split"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let array = required_array(data, self.name())?;
        let pieces = |s: &str| -> Value {
            let parts: Vec<&str> = s.split(self.delimiter.as_str()).collect();
            Array::from_strs(&parts).into()
        };
        let values = array.as_str_vec()?;
        if array.is_scalar() {
            return Ok(pieces(values[0].as_str()));
        }
        Ok(Value::List(values.iter().map(|s| pieces(s.as_str())).collect()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleUnknown {
    Error,
    Ignore,
}

/// One column per category, `1` where the element equals it.
#[derive(Debug)]
pub struct OneHotEncode {
    categories: Option<Vec<String>>,
    handle_unknown: HandleUnknown,
}

impl OneHotEncode {
    pub fn new(categories: Option<Vec<String>>, handle_unknown: HandleUnknown) -> Self {
        Self {
            categories,
            handle_unknown,
        }
    }
}

impl Transformation for OneHotEncode {
    fn name(&self) -> &str {
        "OneHotEncode"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let (values, shape) = strings(data, self.name())?;
        let categories = match &self.categories {
            Some(c) => c.clone(),
            None => sorted_unique(&values),
        };
        let lookup = index_map(&categories);
        let width = categories.len();
        let mut codes = vec![0i64; values.len() * width];
        for (row, value) in values.iter().enumerate() {
            match lookup.get(value.as_str()) {
                Some(&col) => codes[row * width + col] = 1,
                None if self.handle_unknown == HandleUnknown::Ignore => {}
                None => bail!("Found unknown category '{}' during one-hot encoding", value),
            }
        }
        Ok(int32_array(codes, shape, Some(width))?.into())
    }
}

/// Category index per element, `-1` when unknown.
#[derive(Debug)]
pub struct LabelEncode {
    categories: Option<Vec<String>>,
}

impl Transformation for LabelEncode {
    fn name(&self) -> &str {
        "LabelEncode"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let (values, shape) = strings(data, self.name())?;
        let categories = match &self.categories {
            Some(c) => c.clone(),
            None => sorted_unique(&values),
        };
        let lookup = index_map(&categories);
        let codes = values
            .iter()
            .map(|v| lookup.get(v.as_str()).map_or(-1, |&i| i as i64))
            .collect();
        Ok(int32_array(codes, shape, None)?.into())
    }
}

/// Category index per element in the given category order.
#[derive(Debug)]
pub struct OrdinalEncode {
    categories: Option<Vec<String>>,
    unknown_value: Option<i64>,
}

impl Transformation for OrdinalEncode {
    fn name(&self) -> &str {
        "OrdinalEncode"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let (values, shape) = strings(data, self.name())?;
        let categories = match &self.categories {
            Some(c) => c.clone(),
            None => sorted_unique(&values),
        };
        let lookup = index_map(&categories);
        let codes = values
            .iter()
            .map(|v| match lookup.get(v.as_str()) {
                Some(&i) => Ok(i as i64),
                None => self
                    .unknown_value
                    .ok_or_else(|| anyhow!("Found unknown category '{}' during ordinal encoding", v)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(int32_array(codes, shape, None)?.into())
    }
}

/// Index of each element among the sorted categories, written in binary
/// with the most significant bit first.
#[derive(Debug)]
pub struct BinaryEncode {
    categories: Option<Vec<String>>,
}

impl Transformation for BinaryEncode {
    fn name(&self) -> &str {
        "BinaryEncode"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let (values, shape) = strings(data, self.name())?;
        let categories = sorted_unique(self.categories.as_deref().unwrap_or(&values[..]));
        let lookup = index_map(&categories);
        let bits = bit_width(categories.len());

        let mut codes = Vec::with_capacity(values.len() * bits);
        for value in &values {
            let index = *lookup
                .get(value.as_str())
                .ok_or_else(|| anyhow!("Found unknown category '{}' during binary encoding", value))?;
            for bit in (0..bits).rev() {
                codes.push(((index >> bit) & 1) as i64);
            }
        }
        Ok(int32_array(codes, shape, Some(bits))?.into())
    }
}

/// `max(1, ceil(log2(n)))`
fn bit_width(n: usize) -> usize {
    let mut bits = 1;
    while (1usize << bits) < n {
        bits += 1;
    }
    bits
}

/// First match of a pattern in each element; empty when nothing matches.
#[derive(Debug)]
pub struct ExtractRegex {
    pattern: Regex,
    group: usize,
}

impl ExtractRegex {
    pub fn new(pattern: &str, group: usize) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| anyhow!("Invalid regex pattern '{}': {}", pattern, e))?;
        if group >= pattern.captures_len() {
            bail!(
                "Regex '{}' has no group {} ({} groups)",
                pattern.as_str(),
                group,
                pattern.captures_len() - 1
            );
        }
        Ok(Self { pattern, group })
    }
}

impl Transformation for ExtractRegex {
    fn name(&self) -> &str {
        "ExtractRegex"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let array = required_array(data, self.name())?;
        let extracted = array.map_str(|s| {
            self.pattern
                .captures(s)
                .and_then(|caps| caps.get(self.group))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })?;
        Ok(extracted.into())
    }
}

/// Element-wise concatenation of operands, or of incoming data along an axis.
#[derive(Debug)]
pub struct ConcatenateReduce {
    iterable: Vec<Operand>,
    expects_data: bool,
    axis: i64,
}

impl ConcatenateReduce {
    pub fn new(iterable: Vec<Operand>, expects_data: bool, axis: i64) -> Self {
        // with no operands the data is the only thing to concatenate
        let expects_data = expects_data || iterable.is_empty();
        Self {
            iterable,
            expects_data,
            axis,
        }
    }
}

impl Transformation for ConcatenateReduce {
    fn name(&self) -> &str {
        "ConcatenateReduce"
    }

    fn expects_data(&self) -> bool {
        self.expects_data
    }

    fn compile(&mut self, ctx: &mut CompileContext<'_>) -> Result<()> {
        for operand in &mut self.iterable {
            operand.compile(ctx)?;
        }
        Ok(())
    }

    fn execute(&self, data: Option<Value>, ctx: &ExecContext<'_>) -> Result<Value> {
        let mut parts = Vec::with_capacity(self.iterable.len() + 1);
        if self.expects_data {
            let data = required_array(data, self.name())?;
            if self.iterable.is_empty() {
                let axis = data.normalize_axis(self.axis)?;
                parts = data.split_axis(axis)?;
            } else {
                parts.push(data);
            }
        }
        for operand in &self.iterable {
            parts.push(operand.resolve_array(ctx)?);
        }
        let mut iter = parts.into_iter();
        let Some(first) = iter.next() else {
            bail!("nothing to concatenate");
        };
        let mut acc = first.astype(&DType::Str)?;
        for part in iter {
            acc = acc.concat_str(&part)?;
        }
        Ok(acc.into())
    }
}

pub(crate) fn register_builtins(registry: &mut TransformationRegistry) {
    registry.add("lower", "ToLower", "Lowercase strings", |_| Ok(Box::new(ToLower)));
    registry.add("upper", "ToUpper", "Uppercase strings", |_| Ok(Box::new(ToUpper)));
    registry.add("strip", "Strip", "Trim whitespace or the given chars", |args| {
        Ok(Box::new(Strip::new(args.take_string("chars")?.as_deref())))
    });
    registry.add("split", "Split", "Split strings on a delimiter", |args| {
        Ok(Box::new(Split::new(&args.require_string("delimiter")?)?))
    });
    registry.add("one_hot", "OneHotEncode", "One-hot encode categories", |args| {
        let categories = args.take_strings("categories")?;
        let handle_unknown = match args.take_string("handle_unknown")?.as_deref() {
            None | Some("error") => HandleUnknown::Error,
            Some("ignore") => HandleUnknown::Ignore,
            Some(other) => bail!("handle_unknown must be 'error' or 'ignore', got '{}'", other),
        };
        Ok(Box::new(OneHotEncode::new(categories, handle_unknown)))
    });
    registry.add("label_encode", "LabelEncode", "Category index, -1 when unknown", |args| {
        Ok(Box::new(LabelEncode {
            categories: args.take_strings("categories")?,
        }))
    });
    registry.add("ordinal_encode", "OrdinalEncode", "Category index in the given order", |args| {
        Ok(Box::new(OrdinalEncode {
            categories: args.take_strings("categories")?,
            unknown_value: args.take_i64("unknown_value")?,
        }))
    });
    registry.add("binary_encode", "BinaryEncode", "Binary digits of the sorted category index", |args| {
        Ok(Box::new(BinaryEncode {
            categories: args.take_strings("categories")?,
        }))
    });
    registry.add("extract", "ExtractRegex", "First regex match per element", |args| {
        let pattern = args.require_string("pattern")?;
        let group = args.take_i64("group")?.unwrap_or(0);
        if group < 0 {
            bail!("group must not be negative");
        }
        Ok(Box::new(ExtractRegex::new(&pattern, group as usize)?))
    });
    registry.add("concat", "ConcatenateReduce", "Element-wise string concatenation", |args| {
        let iterable = args.take_operands("iterable")?.unwrap_or_default();
        let expects_data = match args.take_bool("expects_data")? {
            Some(flag) => flag,
            None => args.take_bool("expect_data")?.unwrap_or(false),
        };
        let axis = args.take_i64("axis")?.unwrap_or(-1);
        Ok(Box::new(ConcatenateReduce::new(iterable, expects_data, axis)))
    });
}
