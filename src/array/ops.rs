//! Element-wise arithmetic, unary math and reductions.

use super::datetime::{self, TimeUnit};
use super::dtype::{DType, DTypeKind};
use super::{broadcast_shapes, Array, Buffer};
use anyhow::{anyhow, bail, Result};
use std::fmt;

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    fn apply_f64(&self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    fn apply_i64(&self, a: i64, b: i64) -> i64 {
        match self {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => 0,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "subtract",
            BinaryOp::Mul => "multiply",
            BinaryOp::Div => "divide",
        };
        write!(f, "{}", name)
    }
}

fn numeric_rank(dtype: &DType) -> u8 {
    match dtype.kind() {
        DTypeKind::Bool => 0,
        DTypeKind::Int | DTypeKind::UInt => 1,
        _ => 2,
    }
}

/// Result dtype of a numeric binary operation.
fn promote(a: &Array, b: &Array, op: BinaryOp) -> DType {
    let (da, db) = (a.dtype(), b.dtype());
    let base = if da == db {
        da
    } else if a.is_scalar() && !b.is_scalar() && numeric_rank(&da) <= numeric_rank(&db) {
        db
    } else if b.is_scalar() && !a.is_scalar() && numeric_rank(&db) <= numeric_rank(&da) {
        da
    } else if da.is_float() || db.is_float() {
        DType::Float64
    } else {
        DType::Int64
    };
    let base = if base == DType::Bool { DType::Int64 } else { base };
    if op == BinaryOp::Div && !base.is_float() {
        DType::Float64
    } else {
        base
    }
}

impl Array {
    pub fn add(&self, other: &Array) -> Result<Array> {
        self.binary(other, BinaryOp::Add)
    }

    pub fn sub(&self, other: &Array) -> Result<Array> {
        self.binary(other, BinaryOp::Sub)
    }

    pub fn mul(&self, other: &Array) -> Result<Array> {
        self.binary(other, BinaryOp::Mul)
    }

    pub fn div(&self, other: &Array) -> Result<Array> {
        self.binary(other, BinaryOp::Div)
    }

    /// Apply `op` element-wise with broadcasting.
    pub fn binary(&self, other: &Array, op: BinaryOp) -> Result<Array> {
        let shape = broadcast_shapes(&[self.shape(), other.shape()])?;
        if self.dtype().is_numeric() && other.dtype().is_numeric() {
            let dtype = promote(self, other, op);
            let lhs = self.broadcast_to(&shape)?;
            let rhs = other.broadcast_to(&shape)?;
            let data = if dtype.is_float() {
                let (a, b) = (lhs.as_f64_vec()?, rhs.as_f64_vec()?);
                Buffer::Float(a.iter().zip(&b).map(|(x, y)| op.apply_f64(*x, *y)).collect())
            } else {
                let (a, b) = (lhs.as_i64_vec()?, rhs.as_i64_vec()?);
                Buffer::Int(a.iter().zip(&b).map(|(x, y)| op.apply_i64(*x, *y)).collect())
            };
            return Ok(Array::from_parts(dtype, shape, data));
        }
        self.temporal_binary(other, op, shape)
    }

    fn temporal_binary(&self, other: &Array, op: BinaryOp, shape: Vec<usize>) -> Result<Array> {
        let unsupported = || {
            anyhow::anyhow!(
                "ufunc '{}' cannot use operands with types '{}' and '{}'",
                op,
                self.dtype(),
                other.dtype()
            )
        };
        match (self.dtype(), other.dtype(), op) {
            (DType::DateTime(a), DType::DateTime(b), BinaryOp::Sub) => {
                let unit = a.finer(b);
                let lhs = self.astype(&DType::DateTime(unit))?.broadcast_to(&shape)?;
                let rhs = other.astype(&DType::DateTime(unit))?.broadcast_to(&shape)?;
                let ticks = zip_ticks(&lhs, &rhs, |x, y| x.wrapping_sub(y))?;
                Array::new(DType::TimeDelta(unit), shape, Buffer::TimeDelta(ticks))
            }
            (DType::DateTime(_), DType::TimeDelta(_), BinaryOp::Add | BinaryOp::Sub) => {
                shift_datetime(self, other, op == BinaryOp::Sub, shape)
            }
            (DType::TimeDelta(_), DType::DateTime(_), BinaryOp::Add) => shift_datetime(other, self, false, shape),
            (DType::TimeDelta(a), DType::TimeDelta(b), BinaryOp::Add | BinaryOp::Sub) => {
                let unit = a.finer(b);
                let lhs = self.astype(&DType::TimeDelta(unit))?.broadcast_to(&shape)?;
                let rhs = other.astype(&DType::TimeDelta(unit))?.broadcast_to(&shape)?;
                let ticks = zip_ticks(&lhs, &rhs, |x, y| op.apply_i64(x, y))?;
                Array::new(DType::TimeDelta(unit), shape, Buffer::TimeDelta(ticks))
            }
            _ => Err(unsupported()),
        }
    }

    /// Apply `f` to every numeric element; the result is float, keeping `float32`.
    pub fn map_float<F: Fn(f64) -> f64>(&self, f: F) -> Result<Array> {
        if !self.dtype().is_numeric() {
            bail!("Expected a numeric array, got dtype '{}'", self.dtype());
        }
        let dtype = if self.dtype() == DType::Float32 {
            DType::Float32
        } else {
            DType::Float64
        };
        let values = self.as_f64_vec()?.into_iter().map(f).collect();
        Ok(Array::from_parts(dtype, self.shape().to_vec(), Buffer::Float(values)))
    }

    pub fn ln(&self) -> Result<Array> {
        self.map_float(f64::ln)
    }

    pub fn exp(&self) -> Result<Array> {
        self.map_float(f64::exp)
    }

    pub fn sqrt(&self) -> Result<Array> {
        self.map_float(f64::sqrt)
    }

    pub fn powf(&self, power: f64) -> Result<Array> {
        self.map_float(|v| v.powf(power))
    }

    /// Limit values to `[min, max]`. Integer arrays stay integer when both
    /// bounds are whole numbers.
    pub fn clip(&self, min: f64, max: f64) -> Result<Array> {
        let integral = min.fract() == 0.0 && max.fract() == 0.0;
        if integral && (self.dtype().is_integer() || self.dtype() == DType::Bool) {
            let dtype = if self.dtype() == DType::Bool { DType::Int64 } else { self.dtype() };
            let (lo, hi) = (min as i64, max as i64);
            let values = self
                .as_i64_vec()?
                .into_iter()
                .map(|v| v.max(lo).min(hi))
                .collect();
            return Ok(Array::from_parts(dtype, self.shape().to_vec(), Buffer::Int(values)));
        }
        self.map_float(|v| v.max(min).min(max))
    }

    /// Fold `op` over `axis`, removing it. Negative axes count from the end.
    pub fn reduce_axis(&self, op: BinaryOp, axis: i64) -> Result<Array> {
        if self.is_scalar() {
            bail!("cannot reduce over an axis of a 0-d array");
        }
        let axis = self.normalize_axis(axis)?;
        let slices = self.split_axis(axis)?;
        let mut iter = slices.into_iter();
        let Some(mut acc) = iter.next() else {
            bail!("zero-size array to reduction operation {} which has no identity", op);
        };
        if op == BinaryOp::Div && !acc.dtype().is_float() && acc.dtype().is_numeric() {
            acc = acc.astype(&DType::Float64)?;
        }
        for slice in iter {
            acc = acc.binary(&slice, op)?;
        }
        Ok(acc)
    }

    /// Element-wise string concatenation with broadcasting. Non-string
    /// elements are formatted first.
    pub fn concat_str(&self, other: &Array) -> Result<Array> {
        let shape = broadcast_shapes(&[self.shape(), other.shape()])?;
        let lhs = self.astype(&DType::Str)?.broadcast_to(&shape)?;
        let rhs = other.astype(&DType::Str)?.broadcast_to(&shape)?;
        let joined = lhs
            .as_str_vec()?
            .iter()
            .zip(rhs.as_str_vec()?)
            .map(|(a, b)| format!("{}{}", a, b))
            .collect();
        Array::new(DType::Str, shape, Buffer::Str(joined))
    }

    /// Apply `f` to every string element, keeping the shape.
    pub fn map_str<F: Fn(&str) -> String>(&self, f: F) -> Result<Array> {
        let values = self.as_str_vec()?.iter().map(|s| f(s)).collect();
        Ok(Array::from_parts(DType::Str, self.shape().to_vec(), Buffer::Str(values)))
    }
}

fn zip_ticks<F: Fn(i64, i64) -> i64>(lhs: &Array, rhs: &Array, f: F) -> Result<Vec<i64>> {
    let (a, b) = (lhs.as_i64_vec()?, rhs.as_i64_vec()?);
    Ok(a.iter().zip(&b).map(|(x, y)| f(*x, *y)).collect())
}

fn shift_datetime(datetimes: &Array, deltas: &Array, subtract: bool, shape: Vec<usize>) -> Result<Array> {
    let dt_unit = datetimes.dtype().time_unit().unwrap_or(TimeUnit::Day);
    let td_unit = deltas.dtype().time_unit().unwrap_or(TimeUnit::Day);
    let sign = if subtract { -1 } else { 1 };

    if td_unit.is_calendar() && !dt_unit.is_calendar() {
        let lhs = datetimes.broadcast_to(&shape)?.as_i64_vec()?;
        let rhs = deltas.broadcast_to(&shape)?.as_i64_vec()?;
        let per_tick = if td_unit == TimeUnit::Year { 12 } else { 1 };
        let ticks = lhs
            .iter()
            .zip(&rhs)
            .map(|(t, d)| {
                let months = d
                    .checked_mul(sign * per_tick)
                    .ok_or_else(|| anyhow!("Datetime overflow shifting by {} {}", d, td_unit))?;
                datetime::add_months(*t, dt_unit, months)
            })
            .collect::<Result<Vec<_>>>()?;
        return Array::new(DType::DateTime(dt_unit), shape, Buffer::DateTime(ticks));
    }

    let unit = dt_unit.finer(td_unit);
    let lhs = datetimes.astype(&DType::DateTime(unit))?.broadcast_to(&shape)?;
    let rhs = deltas.astype(&DType::TimeDelta(unit))?.broadcast_to(&shape)?;
    let ticks = zip_ticks(&lhs, &rhs, |t, d| t.wrapping_add(sign * d))?;
    Array::new(DType::DateTime(unit), shape, Buffer::DateTime(ticks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_dtype_is_kept() {
        let a = Array::from_f32(vec![2.0, 4.0]);
        let b = Array::from_f32(vec![1.0, 1.0]);
        assert_eq!(a.add(&b).unwrap().dtype(), DType::Float32);
    }

    #[test]
    fn test_scalar_adopts_array_dtype() {
        let a = Array::from_f32(vec![2.0, 4.0]);
        let result = a.mul(&Array::scalar_f64(2.0)).unwrap();
        assert_eq!(result.dtype(), DType::Float32);
        assert_eq!(result.as_f64_vec().unwrap(), vec![4.0, 8.0]);

        let ints = Array::from_i32(vec![1, 2]);
        assert_eq!(ints.add(&Array::scalar_i64(1)).unwrap().dtype(), DType::Int32);
        assert_eq!(ints.add(&Array::scalar_f64(1.0)).unwrap().dtype(), DType::Float64);
    }

    #[test]
    fn test_mixed_promotion() {
        let a = Array::from_i32(vec![1, 2]);
        let b = Array::from_f32(vec![0.5, 0.5]);
        assert_eq!(a.add(&b).unwrap().dtype(), DType::Float64);
        let c = Array::from_i64(vec![1, 2]);
        assert_eq!(a.add(&c).unwrap().dtype(), DType::Int64);
        let flags = Array::from_bool(vec![true, false]);
        assert_eq!(flags.add(&flags).unwrap().dtype(), DType::Int64);
    }

    #[test]
    fn test_int_division_is_float() {
        let a = Array::from_i64(vec![1, 3]);
        let b = Array::from_i64(vec![2, 2]);
        let result = a.div(&b).unwrap();
        assert_eq!(result.dtype(), DType::Float64);
        assert_eq!(result.as_f64_vec().unwrap(), vec![0.5, 1.5]);
    }

    #[test]
    fn test_broadcast_mismatch_errors() {
        let a = Array::from_i64(vec![1, 2]);
        let b = Array::from_i64(vec![1, 2, 3]);
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn test_integer_overflow_wraps() {
        let a = Array::new(DType::Int8, vec![1], Buffer::Int(vec![127])).unwrap();
        let result = a.add(&a).unwrap();
        assert_eq!(result.as_i64_vec().unwrap(), vec![-2]);
    }

    #[test]
    fn test_reduce_axis() {
        let matrix = Array::from_i64(vec![1, 2, 3, 4, 5, 6]).with_shape(vec![2, 3]).unwrap();
        let rows = matrix.reduce_axis(BinaryOp::Add, -1).unwrap();
        assert_eq!(rows.as_i64_vec().unwrap(), vec![6, 15]);
        let columns = matrix.reduce_axis(BinaryOp::Sub, 0).unwrap();
        assert_eq!(columns.as_i64_vec().unwrap(), vec![-3, -3, -3]);
        let product = Array::from_f32(vec![2.0, 4.0]).reduce_axis(BinaryOp::Mul, 0).unwrap();
        assert!(product.is_scalar());
        assert_eq!(product.as_f64_vec().unwrap(), vec![8.0]);
        assert!(matrix.reduce_axis(BinaryOp::Add, 2).is_err());
    }

    #[test]
    fn test_unary_math() {
        let a = Array::from_i64(vec![1, 4]);
        assert_eq!(a.sqrt().unwrap().as_f64_vec().unwrap(), vec![1.0, 2.0]);
        assert_eq!(a.sqrt().unwrap().dtype(), DType::Float64);
        assert_eq!(Array::from_f32(vec![1.0]).exp().unwrap().dtype(), DType::Float32);
        assert!(Array::from_strs(&["a"]).ln().is_err());
    }

    #[test]
    fn test_clip_keeps_ints() {
        let a = Array::from_i32(vec![-5, 3, 12]);
        let clipped = a.clip(0.0, 10.0).unwrap();
        assert_eq!(clipped.dtype(), DType::Int32);
        assert_eq!(clipped.as_i64_vec().unwrap(), vec![0, 3, 10]);
        assert_eq!(a.clip(0.5, 10.0).unwrap().dtype(), DType::Float64);
    }

    #[test]
    fn test_datetime_difference() {
        let dates = Array::datetime64(&["2023-01-05", "2023-01-10"], TimeUnit::Generic).unwrap();
        let start = Array::datetime64_scalar("2023-01-01", TimeUnit::Generic).unwrap();
        let diff = dates.sub(&start).unwrap();
        assert_eq!(diff.dtype(), DType::TimeDelta(TimeUnit::Day));
        assert_eq!(diff.as_i64_vec().unwrap(), vec![4, 9]);
    }

    #[test]
    fn test_datetime_plus_timedelta_uses_finer_unit() {
        let dates = Array::datetime64(&["2023-01-01"], TimeUnit::Day).unwrap();
        let hours = Array::timedelta64(vec![5], TimeUnit::Hour).unwrap();
        let shifted = dates.add(&hours).unwrap();
        assert_eq!(shifted.dtype(), DType::DateTime(TimeUnit::Hour));
        assert_eq!(shifted.format_element(0), "2023-01-01T05");
    }

    #[test]
    fn test_datetime_plus_months() {
        let dates = Array::datetime64(&["2024-01-31"], TimeUnit::Day).unwrap();
        let month = Array::timedelta64(vec![1], TimeUnit::Month).unwrap();
        let shifted = dates.add(&month).unwrap();
        assert_eq!(shifted.format_element(0), "2024-02-29");
        let back = shifted.sub(&month).unwrap();
        assert_eq!(back.format_element(0), "2024-01-29");
    }

    #[test]
    fn test_datetime_plus_huge_years_overflows() {
        let dates = Array::datetime64(&["2024-01-15"], TimeUnit::Day).unwrap();
        let years = Array::timedelta64(vec![i64::MAX / 2], TimeUnit::Year).unwrap();
        let err = dates.add(&years).unwrap_err();
        assert!(err.to_string().contains("Datetime overflow"));
    }

    #[test]
    fn test_string_arithmetic_is_rejected() {
        let a = Array::from_strs(&["a"]);
        let err = a.add(&a).unwrap_err();
        assert!(err.to_string().contains("cannot use operands"));
    }

    #[test]
    fn test_concat_str() {
        let a = Array::from_strs(&["hello", "good"]);
        let b = Array::from_strs(&[" there", "bye"]);
        let joined = a.concat_str(&b).unwrap();
        assert_eq!(joined.as_str_vec().unwrap(), &["hello there".to_string(), "goodbye".to_string()]);
        let numbered = a.concat_str(&Array::scalar_i64(1)).unwrap();
        assert_eq!(numbered.as_str_vec().unwrap()[0], "hello1");
    }
}
