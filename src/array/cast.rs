//! Dtype conversion and casting rules.

use super::datetime::{self, TimeUnit};
use super::dtype::{DType, DTypeKind};
use super::{Array, Buffer};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How strictly a value may be converted to a declared dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Casting {
    /// Only conversions that preserve every value.
    Safe,
    /// Any conversion [`Array::astype`] supports.
    #[default]
    Unsafe,
}

impl FromStr for Casting {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "safe" => Ok(Casting::Safe),
            "unsafe" => Ok(Casting::Unsafe),
            other => bail!("Invalid casting '{}'. Expected one of: safe, unsafe", other),
        }
    }
}

/// Whether values of `from` may be cast to `to` under `casting`.
pub fn can_cast(from: &DType, to: &DType, casting: Casting) -> bool {
    if to.accepts(from) {
        return true;
    }
    match casting {
        Casting::Unsafe => is_supported(from, to),
        Casting::Safe => is_safe(from, to),
    }
}

fn is_supported(from: &DType, to: &DType) -> bool {
    use DTypeKind::*;
    match (from.kind(), to.kind()) {
        (Bool | Int | UInt | Float, Bool | Int | UInt | Float) => true,
        (_, Str) => true,
        (Str, _) => true,
        (DateTime, DateTime) | (TimeDelta, TimeDelta) => true,
        (Int | UInt, DateTime | TimeDelta) => to.time_unit() != Some(TimeUnit::Generic),
        (Float, TimeDelta) => to.time_unit() != Some(TimeUnit::Generic),
        (DateTime | TimeDelta, Int | UInt | Float) => true,
        _ => false,
    }
}

fn is_safe(from: &DType, to: &DType) -> bool {
    use DType::*;
    match (from, to) {
        (Bool, _) if to.is_numeric() || *to == Str => true,
        (Int8 | Int16 | Int32 | Int64, Int8 | Int16 | Int32 | Int64) => to.itemsize() >= from.itemsize(),
        (UInt8 | UInt16 | UInt32 | UInt64, UInt8 | UInt16 | UInt32 | UInt64) => to.itemsize() >= from.itemsize(),
        (UInt8 | UInt16 | UInt32 | UInt64, Int8 | Int16 | Int32 | Int64) => to.itemsize() > from.itemsize(),
        (Int8 | Int16 | UInt8 | UInt16, Float32) => true,
        (_, Float64) if from.is_integer() || *from == Float32 => true,
        (_, Str) if from.is_numeric() => true,
        (DateTime(a), DateTime(b)) => b >= a,
        (TimeDelta(a), TimeDelta(b)) => b >= a && a.is_calendar() == b.is_calendar(),
        _ => false,
    }
}

/// Plural unit name used when printing timedeltas (`4 days`).
pub(crate) fn unit_long_name(unit: TimeUnit, ticks: i64) -> &'static str {
    let singular = ticks.abs() == 1;
    match (unit, singular) {
        (TimeUnit::Year, true) => "year",
        (TimeUnit::Year, false) => "years",
        (TimeUnit::Month, true) => "month",
        (TimeUnit::Month, false) => "months",
        (TimeUnit::Week, true) => "week",
        (TimeUnit::Week, false) => "weeks",
        (TimeUnit::Day, true) => "day",
        (TimeUnit::Day, false) => "days",
        (TimeUnit::Hour, true) => "hour",
        (TimeUnit::Hour, false) => "hours",
        (TimeUnit::Minute, true) => "minute",
        (TimeUnit::Minute, false) => "minutes",
        (TimeUnit::Second, true) => "second",
        (TimeUnit::Second, false) => "seconds",
        (TimeUnit::Milli, true) => "millisecond",
        (TimeUnit::Milli, false) => "milliseconds",
        (TimeUnit::Micro, true) => "microsecond",
        (TimeUnit::Micro, false) => "microseconds",
        (TimeUnit::Nano, true) => "nanosecond",
        (TimeUnit::Nano, false) => "nanoseconds",
        (TimeUnit::Generic, _) => "generic time units",
    }
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.trim() {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" | "" => Ok(false),
        other => bail!("invalid literal for bool: '{}'", other),
    }
}

impl Array {
    /// Convert to `dtype`, following numpy's `astype` semantics.
    pub fn astype(&self, dtype: &DType) -> Result<Array> {
        if dtype.accepts(&self.dtype) {
            return Ok(self.clone());
        }
        let shape = self.shape.clone();
        let unsupported = || anyhow!("Cannot cast array from dtype '{}' to '{}'", self.dtype, dtype);

        let data = match (dtype.kind(), &self.data) {
            (DTypeKind::Bool, Buffer::Str(values)) => Buffer::Bool(
                values.iter().map(|s| parse_bool(s)).collect::<Result<Vec<_>>>()?,
            ),
            (DTypeKind::Bool, _) if self.dtype.is_numeric() => {
                Buffer::Bool(self.as_f64_vec()?.into_iter().map(|v| v != 0.0).collect())
            }
            (DTypeKind::Int | DTypeKind::UInt, Buffer::Float(values)) => {
                Buffer::Int(values.iter().map(|v| float_to_int(*v, dtype)).collect())
            }
            (DTypeKind::Int | DTypeKind::UInt, Buffer::Str(values)) => Buffer::Int(
                values
                    .iter()
                    .map(|s| {
                        s.trim()
                            .parse::<i64>()
                            .map_err(|_| anyhow!("invalid literal for int() with base 10: '{}'", s))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            (DTypeKind::Int | DTypeKind::UInt, _) => Buffer::Int(self.as_i64_vec()?),
            (DTypeKind::Float, Buffer::Str(values)) => Buffer::Float(
                values
                    .iter()
                    .map(|s| {
                        s.trim()
                            .parse::<f64>()
                            .map_err(|_| anyhow!("could not convert string to float: '{}'", s))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            (DTypeKind::Float, Buffer::DateTime(values) | Buffer::TimeDelta(values)) => {
                Buffer::Float(values.iter().map(|v| *v as f64).collect())
            }
            (DTypeKind::Float, _) => Buffer::Float(self.as_f64_vec()?),
            (DTypeKind::Str, _) => Buffer::Str((0..self.len()).map(|i| self.format_element(i)).collect()),
            (DTypeKind::DateTime, Buffer::Str(values)) => {
                let unit = dtype.time_unit().unwrap_or(TimeUnit::Generic);
                return Array::datetime64(values, unit)
                    .with_context(|| format!("Cannot cast strings to '{}'", dtype))?
                    .with_shape(shape);
            }
            (DTypeKind::DateTime, Buffer::DateTime(values)) => {
                let from = self.dtype.time_unit().unwrap_or(TimeUnit::Day);
                let to = dtype.time_unit().ok_or_else(unsupported)?;
                Buffer::DateTime(
                    values
                        .iter()
                        .map(|v| datetime::convert_datetime(*v, from, to))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            (DTypeKind::TimeDelta, Buffer::TimeDelta(values)) => {
                let from = self.dtype.time_unit().unwrap_or(TimeUnit::Day);
                let to = dtype.time_unit().ok_or_else(unsupported)?;
                Buffer::TimeDelta(
                    values
                        .iter()
                        .map(|v| datetime::convert_timedelta(*v, from, to))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            (DTypeKind::TimeDelta, Buffer::Str(values)) if dtype.time_unit() != Some(TimeUnit::Generic) => {
                Buffer::TimeDelta(
                    values
                        .iter()
                        .map(|s| {
                            s.trim()
                                .parse::<i64>()
                                .map_err(|_| anyhow!("Could not convert '{}' to '{}'", s, dtype))
                        })
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            (DTypeKind::TimeDelta, Buffer::Float(values)) if dtype.time_unit() != Some(TimeUnit::Generic) => {
                Buffer::TimeDelta(values.iter().map(|v| v.trunc() as i64).collect())
            }
            (DTypeKind::DateTime, Buffer::Int(values)) if dtype.time_unit() != Some(TimeUnit::Generic) => {
                Buffer::DateTime(values.clone())
            }
            (DTypeKind::TimeDelta, Buffer::Int(values)) if dtype.time_unit() != Some(TimeUnit::Generic) => {
                Buffer::TimeDelta(values.clone())
            }
            _ => return Err(unsupported()),
        };

        let dtype = match dtype {
            DType::DateTime(TimeUnit::Generic) | DType::TimeDelta(TimeUnit::Generic) => self.dtype,
            other => *other,
        };
        Ok(Array::from_parts(dtype, shape, data))
    }
}

fn float_to_int(value: f64, dtype: &DType) -> i64 {
    let truncated = value.trunc();
    match dtype {
        DType::UInt64 => truncated as u64 as i64,
        _ => truncated as i64,
    }
}
