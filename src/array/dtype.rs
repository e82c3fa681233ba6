//! Element data types.

use super::datetime::TimeUnit;
use anyhow::{anyhow, bail, Result};
use std::fmt;

/// Element type of an [`Array`](super::Array), spelled like numpy's dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Str,
    DateTime(TimeUnit),
    TimeDelta(TimeUnit),
}

/// Coarse classification used for promotion and casting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DTypeKind {
    Bool,
    UInt,
    Int,
    Float,
    Str,
    DateTime,
    TimeDelta,
}

impl DType {
    /// Parse a numpy dtype name such as `float32`, `str_` or `datetime64[D]`.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if let Some(unit) = bracketed_unit(name, "datetime64")? {
            return Ok(DType::DateTime(unit));
        }
        if let Some(unit) = bracketed_unit(name, "timedelta64")? {
            return Ok(DType::TimeDelta(unit));
        }
        let dtype = match name {
            "bool" | "bool_" => DType::Bool,
            "int8" | "byte" => DType::Int8,
            "int16" | "short" => DType::Int16,
            "int32" | "intc" => DType::Int32,
            "int64" | "int_" | "longlong" => DType::Int64,
            "uint8" | "ubyte" => DType::UInt8,
            "uint16" | "ushort" => DType::UInt16,
            "uint32" | "uintc" => DType::UInt32,
            "uint64" | "uint" | "ulonglong" => DType::UInt64,
            "float32" | "single" => DType::Float32,
            "float64" | "float_" | "double" => DType::Float64,
            "str" | "str_" | "unicode" | "unicode_" => DType::Str,
            "datetime64" => DType::DateTime(TimeUnit::Generic),
            "timedelta64" => DType::TimeDelta(TimeUnit::Generic),
            other => bail!("Invalid data_type specified: {}", other),
        };
        Ok(dtype)
    }

    pub fn kind(&self) -> DTypeKind {
        match self {
            DType::Bool => DTypeKind::Bool,
            DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64 => DTypeKind::Int,
            DType::UInt8 | DType::UInt16 | DType::UInt32 | DType::UInt64 => DTypeKind::UInt,
            DType::Float32 | DType::Float64 => DTypeKind::Float,
            DType::Str => DTypeKind::Str,
            DType::DateTime(_) => DTypeKind::DateTime,
            DType::TimeDelta(_) => DTypeKind::TimeDelta,
        }
    }

    /// Bool, integer or float.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.kind(),
            DTypeKind::Bool | DTypeKind::Int | DTypeKind::UInt | DTypeKind::Float
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind(), DTypeKind::Int | DTypeKind::UInt)
    }

    pub fn is_float(&self) -> bool {
        self.kind() == DTypeKind::Float
    }

    /// Width of one element in bytes; strings report 0.
    pub fn itemsize(&self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 => 8,
            DType::DateTime(_) | DType::TimeDelta(_) => 8,
            DType::Str => 0,
        }
    }

    /// Time unit of a datetime or timedelta dtype.
    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            DType::DateTime(unit) | DType::TimeDelta(unit) => Some(*unit),
            _ => None,
        }
    }

    /// Whether a concrete array dtype satisfies this (possibly generic) declared dtype.
    pub fn accepts(&self, actual: &DType) -> bool {
        match (self, actual) {
            (DType::DateTime(TimeUnit::Generic), DType::DateTime(_)) => true,
            (DType::TimeDelta(TimeUnit::Generic), DType::TimeDelta(_)) => true,
            (expected, actual) => expected == actual,
        }
    }

    /// Narrow an integer to this dtype's width, wrapping like a C cast.
    pub(crate) fn wrap_int(&self, value: i64) -> i64 {
        match self {
            DType::Int8 => value as i8 as i64,
            DType::Int16 => value as i16 as i64,
            DType::Int32 => value as i32 as i64,
            DType::UInt8 => value as u8 as i64,
            DType::UInt16 => value as u16 as i64,
            DType::UInt32 => value as u32 as i64,
            DType::Bool => (value != 0) as i64,
            _ => value,
        }
    }

    /// Round a float to this dtype's precision.
    pub(crate) fn round_float(&self, value: f64) -> f64 {
        match self {
            DType::Float32 => value as f32 as f64,
            _ => value,
        }
    }
}

fn bracketed_unit(name: &str, prefix: &str) -> Result<Option<TimeUnit>> {
    let Some(rest) = name.strip_prefix(prefix) else {
        return Ok(None);
    };
    if rest.is_empty() {
        return Ok(None);
    }
    let code = rest
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(|| anyhow!("Invalid data_type specified: {}", name))?;
    TimeUnit::parse(code)
        .map(Some)
        .map_err(|_| anyhow!("Invalid data_type specified: {}", name))
}

/// Whether `name` is a dtype [`DType::parse`] understands.
pub fn is_valid_dtype(name: &str) -> bool {
    DType::parse(name).is_ok()
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Bool => write!(f, "bool"),
            DType::Int8 => write!(f, "int8"),
            DType::Int16 => write!(f, "int16"),
            DType::Int32 => write!(f, "int32"),
            DType::Int64 => write!(f, "int64"),
            DType::UInt8 => write!(f, "uint8"),
            DType::UInt16 => write!(f, "uint16"),
            DType::UInt32 => write!(f, "uint32"),
            DType::UInt64 => write!(f, "uint64"),
            DType::Float32 => write!(f, "float32"),
            DType::Float64 => write!(f, "float64"),
            DType::Str => write!(f, "str"),
            DType::DateTime(TimeUnit::Generic) => write!(f, "datetime64"),
            DType::DateTime(unit) => write!(f, "datetime64[{}]", unit),
            DType::TimeDelta(TimeUnit::Generic) => write!(f, "timedelta64"),
            DType::TimeDelta(unit) => write!(f, "timedelta64[{}]", unit),
        }
    }
}
