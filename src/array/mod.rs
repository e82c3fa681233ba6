//! Typed n-dimensional arrays.
//!
//! Features are computed over columnar data: every feature value is an
//! [`Array`] (a dtype, a shape and a row-major buffer) or, for ragged and
//! mixed results, a [`Value::List`] of values.

pub mod cast;
pub mod datetime;
pub mod dtype;
pub mod ops;

pub use cast::{can_cast, Casting};
pub use datetime::{DateComponent, TimeUnit};
pub use dtype::{is_valid_dtype, DType, DTypeKind};
pub use ops::BinaryOp;

use anyhow::{anyhow, bail, Context, Result};
use std::fmt;

/// Row-major element storage.
///
/// Integer dtypes of every width share `Int`; `uint64` keeps its bit pattern.
/// Datetimes are ticks since the epoch, timedeltas tick counts, both in the
/// unit of the owning array's dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
    DateTime(Vec<i64>),
    TimeDelta(Vec<i64>),
}

impl Buffer {
    pub fn len(&self) -> usize {
        match self {
            Buffer::Bool(v) => v.len(),
            Buffer::Int(v) | Buffer::DateTime(v) | Buffer::TimeDelta(v) => v.len(),
            Buffer::Float(v) => v.len(),
            Buffer::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(&self, dtype: &DType) -> bool {
        matches!(
            (self, dtype.kind()),
            (Buffer::Bool(_), DTypeKind::Bool)
                | (Buffer::Int(_), DTypeKind::Int | DTypeKind::UInt)
                | (Buffer::Float(_), DTypeKind::Float)
                | (Buffer::Str(_), DTypeKind::Str)
                | (Buffer::DateTime(_), DTypeKind::DateTime)
                | (Buffer::TimeDelta(_), DTypeKind::TimeDelta)
        )
    }

    fn gather(&self, indices: &[usize]) -> Buffer {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i].clone()).collect()
        }
        match self {
            Buffer::Bool(v) => Buffer::Bool(pick(v, indices)),
            Buffer::Int(v) => Buffer::Int(pick(v, indices)),
            Buffer::Float(v) => Buffer::Float(pick(v, indices)),
            Buffer::Str(v) => Buffer::Str(pick(v, indices)),
            Buffer::DateTime(v) => Buffer::DateTime(pick(v, indices)),
            Buffer::TimeDelta(v) => Buffer::TimeDelta(pick(v, indices)),
        }
    }

    fn extend(&mut self, other: Buffer) -> Result<()> {
        match (self, other) {
            (Buffer::Bool(a), Buffer::Bool(b)) => a.extend(b),
            (Buffer::Int(a), Buffer::Int(b)) => a.extend(b),
            (Buffer::Float(a), Buffer::Float(b)) => a.extend(b),
            (Buffer::Str(a), Buffer::Str(b)) => a.extend(b),
            (Buffer::DateTime(a), Buffer::DateTime(b)) => a.extend(b),
            (Buffer::TimeDelta(a), Buffer::TimeDelta(b)) => a.extend(b),
            _ => bail!("Cannot join buffers of different element types"),
        }
        Ok(())
    }
}

/// A single element read out of an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    DateTime(i64, TimeUnit),
    TimeDelta(i64, TimeUnit),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(true) => write!(f, "True"),
            Scalar::Bool(false) => write!(f, "False"),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::UInt(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{:?}", v),
            Scalar::Str(s) => write!(f, "{}", s),
            Scalar::DateTime(ticks, unit) => write!(f, "{}", datetime::format_datetime(*ticks, *unit)),
            Scalar::TimeDelta(ticks, unit) => write!(f, "{} {}", ticks, cast::unit_long_name(*unit, *ticks)),
        }
    }
}

/// Typed n-dimensional array. An empty shape is a 0-d scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    dtype: DType,
    shape: Vec<usize>,
    data: Buffer,
}

impl Array {
    /// Build an array, checking that the buffer fits the dtype and shape.
    pub fn new(dtype: DType, shape: Vec<usize>, data: Buffer) -> Result<Self> {
        if !data.matches(&dtype) {
            bail!("Buffer does not hold elements of dtype '{}'", dtype);
        }
        if dtype.time_unit() == Some(TimeUnit::Generic) {
            bail!("Array dtype '{}' needs a concrete time unit", dtype);
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            bail!(
                "Cannot fit {} elements into shape {:?}",
                data.len(),
                shape
            );
        }
        Ok(Self::from_parts(dtype, shape, data))
    }

    /// Build without checks, narrowing values to the dtype.
    pub(crate) fn from_parts(dtype: DType, shape: Vec<usize>, data: Buffer) -> Self {
        let data = match data {
            Buffer::Int(values) if !matches!(dtype, DType::Int64 | DType::UInt64) => {
                Buffer::Int(values.into_iter().map(|v| dtype.wrap_int(v)).collect())
            }
            Buffer::Float(values) if dtype == DType::Float32 => {
                Buffer::Float(values.into_iter().map(|v| dtype.round_float(v)).collect())
            }
            other => other,
        };
        Self { dtype, shape, data }
    }

    fn vector(dtype: DType, data: Buffer) -> Self {
        let len = data.len();
        Self::from_parts(dtype, vec![len], data)
    }

    pub fn from_f64(values: Vec<f64>) -> Self {
        Self::vector(DType::Float64, Buffer::Float(values))
    }

    pub fn from_f32(values: Vec<f32>) -> Self {
        Self::vector(
            DType::Float32,
            Buffer::Float(values.into_iter().map(f64::from).collect()),
        )
    }

    pub fn from_i64(values: Vec<i64>) -> Self {
        Self::vector(DType::Int64, Buffer::Int(values))
    }

    pub fn from_i32(values: Vec<i32>) -> Self {
        Self::vector(
            DType::Int32,
            Buffer::Int(values.into_iter().map(i64::from).collect()),
        )
    }

    pub fn from_bool(values: Vec<bool>) -> Self {
        Self::vector(DType::Bool, Buffer::Bool(values))
    }

    pub fn from_strs<S: AsRef<str>>(values: &[S]) -> Self {
        Self::vector(
            DType::Str,
            Buffer::Str(values.iter().map(|s| s.as_ref().to_string()).collect()),
        )
    }

    pub fn scalar_f64(value: f64) -> Self {
        Self::from_parts(DType::Float64, vec![], Buffer::Float(vec![value]))
    }

    pub fn scalar_i64(value: i64) -> Self {
        Self::from_parts(DType::Int64, vec![], Buffer::Int(vec![value]))
    }

    pub fn scalar_bool(value: bool) -> Self {
        Self::from_parts(DType::Bool, vec![], Buffer::Bool(vec![value]))
    }

    pub fn scalar_str(value: &str) -> Self {
        Self::from_parts(DType::Str, vec![], Buffer::Str(vec![value.to_string()]))
    }

    /// Parse ISO datetime strings. A generic unit picks the finest precision
    /// present in the inputs.
    pub fn datetime64<S: AsRef<str>>(values: &[S], unit: TimeUnit) -> Result<Self> {
        let parsed = values
            .iter()
            .map(|s| datetime::parse_datetime(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let unit = if unit == TimeUnit::Generic {
            parsed
                .iter()
                .map(|(_, u)| *u)
                .fold(TimeUnit::Generic, TimeUnit::finer)
        } else {
            unit
        };
        let unit = if unit == TimeUnit::Generic { TimeUnit::Day } else { unit };
        let ticks = parsed
            .into_iter()
            .map(|(dt, _)| datetime::to_ticks(dt, unit))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::vector(DType::DateTime(unit), Buffer::DateTime(ticks)))
    }

    /// A 0-d datetime parsed from one ISO string.
    pub fn datetime64_scalar(value: &str, unit: TimeUnit) -> Result<Self> {
        Self::datetime64(&[value], unit)?.with_shape(vec![])
    }

    pub fn timedelta64(ticks: Vec<i64>, unit: TimeUnit) -> Result<Self> {
        if unit == TimeUnit::Generic {
            bail!("timedelta64 values need a concrete time unit");
        }
        Ok(Self::vector(DType::TimeDelta(unit), Buffer::TimeDelta(ticks)))
    }

    /// Reshape to `shape`, which must hold the same number of elements.
    pub fn with_shape(mut self, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != self.len() {
            bail!(
                "cannot reshape array of size {} into shape {:?}",
                self.len(),
                shape
            );
        }
        self.shape = shape;
        Ok(self)
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn data(&self) -> &Buffer {
        &self.data
    }

    pub fn get(&self, index: usize) -> Option<Scalar> {
        if index >= self.len() {
            return None;
        }
        let scalar = match &self.data {
            Buffer::Bool(v) => Scalar::Bool(v[index]),
            Buffer::Int(v) if self.dtype == DType::UInt64 => Scalar::UInt(v[index] as u64),
            Buffer::Int(v) => Scalar::Int(v[index]),
            Buffer::Float(v) => Scalar::Float(v[index]),
            Buffer::Str(v) => Scalar::Str(v[index].clone()),
            Buffer::DateTime(v) => Scalar::DateTime(v[index], self.dtype.time_unit().unwrap_or(TimeUnit::Day)),
            Buffer::TimeDelta(v) => Scalar::TimeDelta(v[index], self.dtype.time_unit().unwrap_or(TimeUnit::Day)),
        };
        Some(scalar)
    }

    /// Numeric elements as `f64`.
    pub fn as_f64_vec(&self) -> Result<Vec<f64>> {
        match &self.data {
            Buffer::Bool(v) => Ok(v.iter().map(|b| *b as u8 as f64).collect()),
            Buffer::Int(v) if self.dtype == DType::UInt64 => Ok(v.iter().map(|x| *x as u64 as f64).collect()),
            Buffer::Int(v) => Ok(v.iter().map(|x| *x as f64).collect()),
            Buffer::Float(v) => Ok(v.clone()),
            _ => bail!("Expected a numeric array, got dtype '{}'", self.dtype),
        }
    }

    /// Integer, bool or tick elements as `i64`.
    pub fn as_i64_vec(&self) -> Result<Vec<i64>> {
        match &self.data {
            Buffer::Bool(v) => Ok(v.iter().map(|b| *b as i64).collect()),
            Buffer::Int(v) | Buffer::DateTime(v) | Buffer::TimeDelta(v) => Ok(v.clone()),
            _ => bail!("Expected an integer array, got dtype '{}'", self.dtype),
        }
    }

    pub fn as_str_vec(&self) -> Result<&[String]> {
        match &self.data {
            Buffer::Str(v) => Ok(v),
            _ => bail!("Expected a string array, got dtype '{}'", self.dtype),
        }
    }

    /// Text of element `index` as it appears when printed.
    pub fn format_element(&self, index: usize) -> String {
        match (&self.data, self.dtype) {
            (Buffer::Float(v), DType::Float32) => format!("{:?}", v[index] as f32),
            _ => self.get(index).map(|s| s.to_string()).unwrap_or_default(),
        }
    }

    /// Resolve a possibly negative axis against this array's rank.
    pub fn normalize_axis(&self, axis: i64) -> Result<usize> {
        let ndim = self.ndim() as i64;
        let resolved = if axis < 0 { axis + ndim } else { axis };
        if resolved < 0 || resolved >= ndim {
            bail!(
                "axis {} is out of bounds for array of dimension {}",
                axis,
                ndim
            );
        }
        Ok(resolved as usize)
    }

    /// The sub-array at position `index` along `axis`, with that axis removed.
    pub fn index_axis(&self, axis: usize, index: usize) -> Result<Array> {
        if axis >= self.ndim() {
            bail!("axis {} is out of bounds for array of dimension {}", axis, self.ndim());
        }
        let n = self.shape[axis];
        if index >= n {
            bail!("index {} is out of bounds for axis {} with size {}", index, axis, n);
        }
        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        let mut indices = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let base = o * n * inner + index * inner;
            indices.extend(base..base + inner);
        }
        let mut shape = self.shape.clone();
        shape.remove(axis);
        Ok(Self::from_parts(self.dtype, shape, self.data.gather(&indices)))
    }

    /// Elements at the given flat positions, as a 1-d array.
    pub fn take_flat(&self, indices: &[usize]) -> Result<Array> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            bail!("index {} is out of bounds for size {}", bad, self.len());
        }
        Ok(Self::from_parts(self.dtype, vec![indices.len()], self.data.gather(indices)))
    }

    /// Split along `axis` into its sub-arrays.
    pub fn split_axis(&self, axis: usize) -> Result<Vec<Array>> {
        let n = *self
            .shape
            .get(axis)
            .ok_or_else(|| anyhow!("axis {} is out of bounds for array of dimension {}", axis, self.ndim()))?;
        (0..n).map(|i| self.index_axis(axis, i)).collect()
    }

    /// Move axis `from` to position `to`, keeping the order of the others.
    pub fn move_axis(&self, from: usize, to: usize) -> Result<Array> {
        let ndim = self.ndim();
        if from >= ndim || to >= ndim {
            bail!("axis out of bounds for array of dimension {}", ndim);
        }
        if from == to {
            return Ok(self.clone());
        }
        let mut axes: Vec<usize> = (0..ndim).filter(|&a| a != from).collect();
        axes.insert(to, from);

        let shape: Vec<usize> = axes.iter().map(|&a| self.shape[a]).collect();
        let mut strides = vec![1usize; ndim];
        for d in (0..ndim.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * self.shape[d + 1];
        }
        let total = self.len();
        let indices: Vec<usize> = (0..total)
            .map(|flat| {
                let mut rem = flat;
                let mut index = 0;
                for d in (0..ndim).rev() {
                    let coord = rem % shape[d];
                    rem /= shape[d];
                    index += coord * strides[axes[d]];
                }
                index
            })
            .collect();
        Ok(Self::from_parts(self.dtype, shape, self.data.gather(&indices)))
    }

    /// Stack equally shaped arrays of one dtype along a new leading axis.
    pub fn stack(arrays: &[Array]) -> Result<Array> {
        let first = arrays
            .first()
            .ok_or_else(|| anyhow!("need at least one array to stack"))?;
        let mut data = first.data.clone();
        for array in &arrays[1..] {
            if array.shape != first.shape {
                bail!(
                    "all input arrays must have the same shape, got {:?} and {:?}",
                    first.shape,
                    array.shape
                );
            }
            if array.dtype != first.dtype {
                bail!(
                    "all input arrays must have the same dtype, got '{}' and '{}'",
                    first.dtype,
                    array.dtype
                );
            }
            data.extend(array.data.clone())?;
        }
        let mut shape = vec![arrays.len()];
        shape.extend_from_slice(&first.shape);
        Ok(Self::from_parts(first.dtype, shape, data))
    }

    /// Repeat elements to fill `shape` following broadcasting rules.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Array> {
        if self.shape == shape {
            return Ok(self.clone());
        }
        let target = broadcast_shapes(&[&self.shape, shape])?;
        if target != shape {
            bail!(
                "operands could not be broadcast together with shapes {:?} {:?}",
                self.shape,
                shape
            );
        }
        let indices = broadcast_index_map(&self.shape, shape);
        Ok(Self::from_parts(self.dtype, shape.to_vec(), self.data.gather(&indices)))
    }

    /// Little-endian bytes of every element at the dtype's native width;
    /// strings are UTF-8 with a trailing NUL.
    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.dtype.itemsize().max(1));
        match &self.data {
            Buffer::Bool(v) => out.extend(v.iter().map(|b| *b as u8)),
            Buffer::Int(v) => {
                for x in v {
                    match self.dtype {
                        DType::Int8 | DType::UInt8 => out.push(*x as u8),
                        DType::Int16 | DType::UInt16 => out.extend((*x as u16).to_le_bytes()),
                        DType::Int32 | DType::UInt32 => out.extend((*x as u32).to_le_bytes()),
                        _ => out.extend(x.to_le_bytes()),
                    }
                }
            }
            Buffer::Float(v) => {
                for x in v {
                    if self.dtype == DType::Float32 {
                        out.extend((*x as f32).to_le_bytes());
                    } else {
                        out.extend(x.to_le_bytes());
                    }
                }
            }
            Buffer::Str(v) => {
                for s in v {
                    out.extend(s.as_bytes());
                    out.push(0);
                }
            }
            Buffer::DateTime(v) | Buffer::TimeDelta(v) => {
                for x in v {
                    out.extend(x.to_le_bytes());
                }
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let items: Vec<serde_json::Value> = (0..self.len())
            .map(|i| match self.get(i) {
                Some(Scalar::Bool(b)) => serde_json::Value::from(b),
                Some(Scalar::Int(v)) => serde_json::Value::from(v),
                Some(Scalar::UInt(v)) => serde_json::Value::from(v),
                Some(Scalar::Float(v)) => serde_json::Value::from(v),
                Some(Scalar::Str(s)) => serde_json::Value::from(s),
                Some(Scalar::DateTime(t, u)) => serde_json::Value::from(datetime::format_datetime(t, u)),
                Some(Scalar::TimeDelta(t, _)) => serde_json::Value::from(t),
                None => serde_json::Value::Null,
            })
            .collect();
        nest_json(&self.shape, &items)
    }
}

fn nest_json(shape: &[usize], items: &[serde_json::Value]) -> serde_json::Value {
    match shape.split_first() {
        None => items.first().cloned().unwrap_or(serde_json::Value::Null),
        Some((&n, rest)) => {
            let inner: usize = rest.iter().product();
            serde_json::Value::Array(
                (0..n)
                    .map(|i| nest_json(rest, &items[i * inner..(i + 1) * inner]))
                    .collect(),
            )
        }
    }
}

fn fmt_nested(array: &Array, shape: &[usize], offset: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match shape.split_first() {
        None => {
            let text = array.format_element(offset);
            if array.dtype == DType::Str {
                write!(f, "'{}'", text)
            } else {
                write!(f, "{}", text)
            }
        }
        Some((&n, rest)) => {
            let inner: usize = rest.iter().product();
            write!(f, "[")?;
            for i in 0..n {
                if i > 0 {
                    write!(f, ", ")?;
                }
                fmt_nested(array, rest, offset + i * inner, f)?;
            }
            write!(f, "]")
        }
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_nested(self, &self.shape, 0, f)
    }
}

/// Broadcast shapes together: right-aligned, size-1 dimensions stretch.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    let ndim = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut result = vec![1usize; ndim];
    for shape in shapes {
        let offset = ndim - shape.len();
        for (i, &dim) in shape.iter().enumerate() {
            let current = result[offset + i];
            result[offset + i] = match (current, dim) {
                (a, b) if a == b => a,
                (1, b) => b,
                (a, 1) => a,
                _ => bail!(
                    "shape mismatch: objects cannot be broadcast to a single shape. Mismatch is between {:?} and {:?}",
                    shapes[0],
                    shape
                ),
            };
        }
    }
    Ok(result)
}

fn broadcast_index_map(src: &[usize], dst: &[usize]) -> Vec<usize> {
    let total: usize = dst.iter().product();
    let offset = dst.len() - src.len();
    let mut strides = vec![0usize; src.len()];
    let mut acc = 1usize;
    for i in (0..src.len()).rev() {
        strides[i] = if src[i] == 1 { 0 } else { acc };
        acc *= src[i];
    }
    (0..total)
        .map(|flat| {
            let mut rem = flat;
            let mut index = 0;
            for d in (0..dst.len()).rev() {
                let coord = rem % dst[d];
                rem /= dst[d];
                if d >= offset {
                    index += coord * strides[d - offset];
                }
            }
            index
        })
        .collect()
}

/// A computed value: an array, or a list of values for ragged and mixed results.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Array(Array),
    List(Vec<Value>),
}

impl Value {
    pub fn as_array(&self) -> Result<&Array> {
        match self {
            Value::Array(array) => Ok(array),
            Value::List(items) => bail!("Expected an array, got a list of {} values", items.len()),
        }
    }

    pub fn into_array(self) -> Result<Array> {
        match self {
            Value::Array(array) => Ok(array),
            Value::List(items) => bail!("Expected an array, got a list of {} values", items.len()),
        }
    }

    /// Array shape, or `[len]` for a list.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Value::Array(array) => array.shape().to_vec(),
            Value::List(items) => vec![items.len()],
        }
    }

    /// Dtype name, or `list` for a list.
    pub fn type_name(&self) -> String {
        match self {
            Value::Array(array) => array.dtype().to_string(),
            Value::List(_) => "list".to_string(),
        }
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        match self {
            Value::Array(array) => array.hash_bytes(),
            Value::List(items) => items.iter().flat_map(|v| v.hash_bytes()).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Array(array) => array.to_json(),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// Read JSON input: nested arrays of one element kind become an n-d
    /// array (integers as `int64`, any float as `float64`); ragged or mixed
    /// nesting becomes a list.
    pub fn from_json(json: &serde_json::Value) -> Result<Value> {
        match json {
            serde_json::Value::Bool(b) => Ok(Value::Array(Array::scalar_bool(*b))),
            serde_json::Value::Number(n) => {
                let array = if let Some(i) = n.as_i64() {
                    Array::scalar_i64(i)
                } else if let Some(u) = n.as_u64() {
                    Array::from_parts(DType::UInt64, vec![], Buffer::Int(vec![u as i64]))
                } else {
                    Array::scalar_f64(n.as_f64().unwrap_or(f64::NAN))
                };
                Ok(Value::Array(array))
            }
            serde_json::Value::String(s) => Ok(Value::Array(Array::scalar_str(s))),
            serde_json::Value::Array(items) => {
                if items.is_empty() {
                    return Ok(Value::Array(Array::from_f64(vec![])));
                }
                let values = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Value::from_json(item).with_context(|| format!("at index {}", i)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::from_items(values))
            }
            serde_json::Value::Null => bail!("null is not a valid array element"),
            serde_json::Value::Object(_) => bail!("objects are not valid array elements"),
        }
    }
}

impl Value {
    /// Stack values into one array when they agree in shape and element kind
    /// (all numeric, all strings or all bools); otherwise keep them as a list.
    pub fn from_items(values: Vec<Value>) -> Value {
        let arrays: Option<Vec<&Array>> = values
            .iter()
            .map(|v| match v {
                Value::Array(a) => Some(a),
                Value::List(_) => None,
            })
            .collect();
        let Some(arrays) = arrays else {
            return Value::List(values);
        };
        let same_shape = arrays.windows(2).all(|w| w[0].shape() == w[1].shape());
        if !same_shape {
            return Value::List(values);
        }
        let target = if arrays.iter().all(|a| a.dtype() == DType::Bool) {
            Some(DType::Bool)
        } else if arrays.iter().all(|a| a.dtype() == DType::Str) {
            Some(DType::Str)
        } else if arrays.iter().all(|a| a.dtype().is_numeric()) {
            if arrays.iter().any(|a| a.dtype().is_float()) {
                Some(DType::Float64)
            } else {
                Some(DType::Int64)
            }
        } else {
            None
        };
        let stacked = target.and_then(|dtype| {
            let cast = arrays
                .iter()
                .map(|a| a.astype(&dtype))
                .collect::<Result<Vec<_>>>()
                .ok()?;
            Array::stack(&cast).ok()
        });
        match stacked {
            Some(array) => Value::Array(array),
            None => Value::List(values),
        }
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Array(array) => write!(f, "{}", array),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_rejects_mismatched_buffer() {
        assert!(Array::new(DType::Int32, vec![2], Buffer::Float(vec![1.0, 2.0])).is_err());
        assert!(Array::new(DType::Float64, vec![3], Buffer::Float(vec![1.0, 2.0])).is_err());
        assert!(Array::new(DType::DateTime(TimeUnit::Generic), vec![1], Buffer::DateTime(vec![0])).is_err());
    }

    #[test]
    fn test_new_wraps_narrow_ints() {
        let array = Array::new(DType::Int8, vec![2], Buffer::Int(vec![127, 128])).unwrap();
        assert_eq!(array.as_i64_vec().unwrap(), vec![127, -128]);
    }

    #[test]
    fn test_float32_rounds() {
        let array = Array::from_f32(vec![0.1]);
        assert_eq!(array.as_f64_vec().unwrap()[0], 0.1f32 as f64);
        assert_eq!(array.format_element(0), "0.1");
    }

    #[test]
    fn test_reshape() {
        let array = Array::from_i64(vec![1, 2, 3, 4, 5, 6]).with_shape(vec![2, 3]).unwrap();
        assert_eq!(array.shape(), &[2, 3]);
        assert!(Array::from_i64(vec![1, 2, 3]).with_shape(vec![2, 2]).is_err());
    }

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(broadcast_shapes(&[&[3], &[1]]).unwrap(), vec![3]);
        assert_eq!(broadcast_shapes(&[&[2, 1], &[3]]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[&[], &[4]]).unwrap(), vec![4]);
        assert!(broadcast_shapes(&[&[2], &[3]]).is_err());
    }

    #[test]
    fn test_broadcast_to_repeats_rows() {
        let column = Array::from_i64(vec![1, 2]).with_shape(vec![2, 1]).unwrap();
        let wide = column.broadcast_to(&[2, 3]).unwrap();
        assert_eq!(wide.as_i64_vec().unwrap(), vec![1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_index_axis() {
        let array = Array::from_i64(vec![1, 2, 3, 4, 5, 6]).with_shape(vec![2, 3]).unwrap();
        let column = array.index_axis(1, 2).unwrap();
        assert_eq!(column.shape(), &[2]);
        assert_eq!(column.as_i64_vec().unwrap(), vec![3, 6]);
        let row = array.index_axis(0, 1).unwrap();
        assert_eq!(row.as_i64_vec().unwrap(), vec![4, 5, 6]);
    }

    #[test]
    fn test_move_axis() {
        let array = Array::from_i64(vec![1, 2, 3, 4, 5, 6]).with_shape(vec![2, 3]).unwrap();
        let moved = array.move_axis(1, 0).unwrap();
        assert_eq!(moved.shape(), &[3, 2]);
        assert_eq!(moved.as_i64_vec().unwrap(), vec![1, 4, 2, 5, 3, 6]);
        assert_eq!(moved.move_axis(0, 1).unwrap(), array);
    }

    #[test]
    fn test_stack() {
        let stacked = Array::stack(&[Array::from_i64(vec![1, 2]), Array::from_i64(vec![3, 4])]).unwrap();
        assert_eq!(stacked.shape(), &[2, 2]);
        assert!(Array::stack(&[Array::from_i64(vec![1]), Array::from_f64(vec![1.0])]).is_err());
    }

    #[test]
    fn test_hash_bytes_native_width() {
        assert_eq!(Array::from_i32(vec![1]).hash_bytes(), vec![1, 0, 0, 0]);
        assert_eq!(Array::from_strs(&["ab"]).hash_bytes(), vec![b'a', b'b', 0]);
        assert_eq!(Array::from_f64(vec![1.0]).hash_bytes(), 1.0f64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_to_json_nested() {
        let array = Array::from_i64(vec![1, 2, 3, 4]).with_shape(vec![2, 2]).unwrap();
        assert_eq!(array.to_json(), json!([[1, 2], [3, 4]]));
        assert_eq!(Array::scalar_f64(2.5).to_json(), json!(2.5));
    }

    #[test]
    fn test_from_json_infers_dtype() {
        let ints = Value::from_json(&json!([1, 2, 3])).unwrap();
        assert_eq!(ints.as_array().unwrap().dtype(), DType::Int64);

        let floats = Value::from_json(&json!([[1, 2.5], [3, 4]])).unwrap();
        let floats = floats.as_array().unwrap();
        assert_eq!(floats.dtype(), DType::Float64);
        assert_eq!(floats.shape(), &[2, 2]);

        let strings = Value::from_json(&json!(["a", "b"])).unwrap();
        assert_eq!(strings.as_array().unwrap().dtype(), DType::Str);
    }

    #[test]
    fn test_from_json_ragged_is_list() {
        let ragged = Value::from_json(&json!([[1, 2], [3]])).unwrap();
        assert!(matches!(ragged, Value::List(ref items) if items.len() == 2));
        assert!(Value::from_json(&json!([1, null])).is_err());
    }

    #[test]
    fn test_display() {
        let array = Array::from_f64(vec![1.0, 2.5]);
        assert_eq!(array.to_string(), "[1.0, 2.5]");
        assert_eq!(Array::from_strs(&["a"]).to_string(), "['a']");
    }

    #[test]
    fn test_datetime64_infers_unit() {
        let array = Array::datetime64(&["2023-01-05", "2023-01-10T12"], TimeUnit::Generic).unwrap();
        assert_eq!(array.dtype(), DType::DateTime(TimeUnit::Hour));
        assert_eq!(array.format_element(1), "2023-01-10T12");
    }
}
