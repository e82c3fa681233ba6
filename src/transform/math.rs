//! Arithmetic reductions and element-wise numeric transforms.

use anyhow::{bail, Result};

use super::{required_array, CompileContext, ExecContext, Operand, Transformation, TransformationRegistry};
use crate::array::{Array, BinaryOp, Value};

/// Fold a binary operator over operands, incoming data, or both.
#[derive(Debug)]
pub struct Reduce {
    op: BinaryOp,
    iterable: Vec<Operand>,
    expects_data: bool,
    axis: i64,
}

impl Reduce {
    pub fn new(op: BinaryOp, iterable: Vec<Operand>, expects_data: bool, axis: i64) -> Result<Self> {
        if iterable.is_empty() && !expects_data {
            bail!("Either expects_data or iterable should be set!");
        }
        Ok(Self {
            op,
            iterable,
            expects_data,
            axis,
        })
    }

    /// Fold over operands only.
    pub fn over(op: BinaryOp, iterable: Vec<Operand>) -> Result<Self> {
        Self::new(op, iterable, false, 0)
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }

    fn type_name(op: BinaryOp) -> &'static str {
        match op {
            BinaryOp::Add => "SumReduce",
            BinaryOp::Sub => "SubtractReduce",
            BinaryOp::Mul => "MultiplyReduce",
            BinaryOp::Div => "DivideReduce",
        }
    }

    fn fold(&self, mut operands: Vec<Array>) -> Result<Array> {
        if operands.is_empty() {
            bail!("nothing to reduce");
        }
        let mut acc = operands.remove(0);
        for operand in &operands {
            acc = acc.binary(operand, self.op)?;
        }
        if acc.is_scalar() {
            acc = acc.with_shape(vec![1])?;
        }
        Ok(acc)
    }
}

impl Transformation for Reduce {
    fn name(&self) -> &str {
        Self::type_name(self.op)
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
        let mut operands = Vec::with_capacity(self.iterable.len() + 1);
        if self.expects_data {
            let data = required_array(data, self.name())?;
            if self.iterable.is_empty() {
                return Ok(data.reduce_axis(self.op, self.axis)?.into());
            }
            operands.push(data);
        }
        for operand in &self.iterable {
            operands.push(operand.resolve_array(ctx)?);
        }
        Ok(self.fold(operands)?.into())
    }
}

/// `numerator / denominator`, with incoming data standing in for whichever
/// side is not given.
#[derive(Debug)]
pub struct DivideTransform {
    numerator: Option<Operand>,
    denominator: Option<Operand>,
}

impl DivideTransform {
    pub fn new(numerator: Option<Operand>, denominator: Option<Operand>) -> Result<Self> {
        if numerator.is_none() && denominator.is_none() {
            bail!("You have to pass either numerator or denominator for computation!");
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }
}

impl Transformation for DivideTransform {
    fn name(&self) -> &str {
        "DivideTransform"
    }

    fn expects_data(&self) -> bool {
        self.numerator.is_none() || self.denominator.is_none()
    }

    fn compile(&mut self, ctx: &mut CompileContext<'_>) -> Result<()> {
        for operand in [&mut self.numerator, &mut self.denominator].into_iter().flatten() {
            operand.compile(ctx)?;
        }
        Ok(())
    }

    fn execute(&self, data: Option<Value>, ctx: &ExecContext<'_>) -> Result<Value> {
        let result = match (&self.numerator, &self.denominator) {
            (Some(n), Some(d)) => n.resolve_array(ctx)?.div(&d.resolve_array(ctx)?)?,
            (Some(n), None) => n.resolve_array(ctx)?.div(&required_array(data, self.name())?)?,
            (None, Some(d)) => required_array(data, self.name())?.div(&d.resolve_array(ctx)?)?,
            (None, None) => bail!("DivideTransform has nothing to divide"),
        };
        Ok(result.into())
    }
}

/// Multiply by a constant factor.
#[derive(Debug)]
pub struct ScaleFeature {
    factor: f64,
}

impl ScaleFeature {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl Transformation for ScaleFeature {
    fn name(&self) -> &str {
        "ScaleFeature"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let data = required_array(data, self.name())?;
        Ok(data.mul(&Array::scalar_f64(self.factor))?.into())
    }
}

#[derive(Debug)]
pub struct LogTransform;

impl Transformation for LogTransform {
    fn name(&self) -> &str {
        "LogTransform"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        Ok(required_array(data, self.name())?.ln()?.into())
    }
}

#[derive(Debug)]
pub struct ExpTransform;

impl Transformation for ExpTransform {
    fn name(&self) -> &str {
        "ExpTransform"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        Ok(required_array(data, self.name())?.exp()?.into())
    }
}

#[derive(Debug)]
pub struct SqrtTransform;

impl Transformation for SqrtTransform {
    fn name(&self) -> &str {
        "SqrtTransform"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        Ok(required_array(data, self.name())?.sqrt()?.into())
    }
}

#[derive(Debug)]
pub struct PowerTransform {
    power: f64,
}

impl Transformation for PowerTransform {
    fn name(&self) -> &str {
        "PowerTransform"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        Ok(required_array(data, self.name())?.powf(self.power)?.into())
    }
}

/// `(x - mean) / std_dev`
#[derive(Debug)]
pub struct ZScoreTransform {
    mean: f64,
    std_dev: f64,
}

impl Transformation for ZScoreTransform {
    fn name(&self) -> &str {
        "ZScoreTransform"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let data = required_array(data, self.name())?;
        let centered = data.sub(&Array::scalar_f64(self.mean))?;
        Ok(centered.div(&Array::scalar_f64(self.std_dev))?.into())
    }
}

#[derive(Debug)]
pub struct ClipTransform {
    min: f64,
    max: f64,
}

impl Transformation for ClipTransform {
    fn name(&self) -> &str {
        "ClipTransform"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        Ok(required_array(data, self.name())?.clip(self.min, self.max)?.into())
    }
}

/// `(x - min) / (max - min)`
#[derive(Debug)]
pub struct MinMaxTransform {
    min: f64,
    max: f64,
}

impl Transformation for MinMaxTransform {
    fn name(&self) -> &str {
        "MinMaxTransform"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let data = required_array(data, self.name())?;
        let shifted = data.sub(&Array::scalar_f64(self.min))?;
        Ok(shifted.div(&Array::scalar_f64(self.max - self.min))?.into())
    }
}

fn reducer(op: BinaryOp, args: &mut crate::instantiate::Args) -> Result<Box<dyn Transformation>> {
    let iterable = args.take_operands("iterable")?.unwrap_or_default();
    let expects_data = match args.take_bool("expects_data")? {
        Some(flag) => flag,
        None => args.take_bool("expect_data")?.unwrap_or(false),
    };
    let axis = args.take_i64("axis")?.unwrap_or(0);
    Ok(Box::new(Reduce::new(op, iterable, expects_data, axis)?))
}

pub(crate) fn register_builtins(registry: &mut TransformationRegistry) {
    registry.add("sum", "SumReduce", "Element-wise sum of operands or sum along an axis", |args| {
        reducer(BinaryOp::Add, args)
    });
    registry.add("multiply", "MultiplyReduce", "Element-wise product of operands or along an axis", |args| {
        reducer(BinaryOp::Mul, args)
    });
    registry.add("subtract", "SubtractReduce", "Left fold of subtraction", |args| {
        reducer(BinaryOp::Sub, args)
    });
    registry.add("divide", "DivideReduce", "Left fold of division", |args| {
        reducer(BinaryOp::Div, args)
    });
    registry.add("div", "DivideTransform", "numerator / denominator, data filling the missing side", |args| {
        let numerator = args.take_operand("numerator")?;
        let denominator = args.take_operand("denominator")?;
        Ok(Box::new(DivideTransform::new(numerator, denominator)?))
    });
    registry.add("scale", "ScaleFeature", "Multiply by factor", |args| {
        Ok(Box::new(ScaleFeature::new(args.require_f64("factor")?)))
    });
    registry.add("log", "LogTransform", "Natural logarithm", |_| Ok(Box::new(LogTransform)));
    registry.add("exp", "ExpTransform", "Exponential", |_| Ok(Box::new(ExpTransform)));
    registry.add("sqrt", "SqrtTransform", "Square root", |_| Ok(Box::new(SqrtTransform)));
    registry.add("pow", "PowerTransform", "Raise to power", |args| {
        Ok(Box::new(PowerTransform {
            power: args.require_f64("power")?,
        }))
    });
    registry.add("zscore", "ZScoreTransform", "(x - mean) / std_dev", |args| {
        Ok(Box::new(ZScoreTransform {
            mean: args.require_f64("mean")?,
            std_dev: args.require_f64("std_dev")?,
        }))
    });
    registry.add("clip", "ClipTransform", "Limit values to [min, max]", |args| {
        Ok(Box::new(ClipTransform {
            min: args.require_f64("min")?,
            max: args.require_f64("max")?,
        }))
    });
    registry.add("minmax", "MinMaxTransform", "(x - min) / (max - min)", |args| {
        Ok(Box::new(MinMaxTransform {
            min: args.require_f64("min")?,
            max: args.require_f64("max")?,
        }))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DType;
    use crate::promise::PromiseManager;
    use std::collections::HashMap;

    fn run(step: &dyn Transformation, data: Array) -> Array {
        step.execute(Some(data.into()), &ExecContext::detached())
            .unwrap()
            .into_array()
            .unwrap()
    }

    fn values(entries: Vec<(&str, Array)>) -> HashMap<String, Value> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect()
    }

    #[test]
    fn test_reduce_needs_input() {
        let err = Reduce::new(BinaryOp::Add, Vec::new(), false, 0).unwrap_err();
        assert_eq!(err.to_string(), "Either expects_data or iterable should be set!");
    }

    #[test]
    fn test_sum_over_features() {
        let mut pm = PromiseManager::new();
        let deps = vec!["a".to_string(), "b".to_string()];
        let mut sum = Reduce::over(
            BinaryOp::Add,
            vec![Operand::Name("a".into()), Operand::Name("b".into()), Operand::literal(Array::scalar_i64(1))],
        )
        .unwrap();
        sum.compile(&mut CompileContext::new("c", &deps, &mut pm)).unwrap();

        let vals = values(vec![
            ("a", Array::from_f32(vec![1.0, 2.0])),
            ("b", Array::from_f32(vec![3.0, 4.0])),
        ]);
        let out = sum.execute(None, &ExecContext::new("c", &vals, &pm)).unwrap();
        let out = out.as_array().unwrap();
        assert_eq!(out.dtype(), DType::Float32);
        assert_eq!(out.as_f64_vec().unwrap(), vec![5.0, 7.0]);
    }

    #[test]
    fn test_scalar_only_fold_has_shape_one() {
        let sum = Reduce::over(
            BinaryOp::Mul,
            vec![Operand::literal(Array::scalar_f64(2.0)), Operand::literal(Array::scalar_f64(3.0))],
        )
        .unwrap();
        let out = sum.execute(None, &ExecContext::detached()).unwrap();
        assert_eq!(out.as_array().unwrap().shape(), &[1]);
        assert_eq!(out.as_array().unwrap().as_f64_vec().unwrap(), vec![6.0]);
    }

    #[test]
    fn test_reduce_data_along_axis() {
        let sum = Reduce::new(BinaryOp::Add, Vec::new(), true, 0).unwrap();
        let data = Array::from_i64(vec![1, 2, 3, 4]).with_shape(vec![2, 2]).unwrap();
        let out = run(&sum, data.clone());
        assert_eq!(out.as_i64_vec().unwrap(), vec![4, 6]);

        let rows = Reduce::new(BinaryOp::Add, Vec::new(), true, -1).unwrap();
        assert_eq!(run(&rows, data).as_i64_vec().unwrap(), vec![3, 7]);
    }

    #[test]
    fn test_subtract_data_and_iterable() {
        let sub = Reduce::new(BinaryOp::Sub, vec![Operand::literal(Array::scalar_f64(1.0))], true, 0).unwrap();
        let out = run(&sub, Array::from_f64(vec![5.0, 6.0]));
        assert_eq!(out.as_f64_vec().unwrap(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_divide_transform_modes() {
        let by_two = DivideTransform::new(None, Some(Operand::literal(Array::scalar_f64(2.0)))).unwrap();
        assert!(by_two.expects_data());
        assert_eq!(run(&by_two, Array::from_f64(vec![4.0])).as_f64_vec().unwrap(), vec![2.0]);

        let into_ten = DivideTransform::new(Some(Operand::literal(Array::scalar_f64(10.0))), None).unwrap();
        assert_eq!(run(&into_ten, Array::from_f64(vec![4.0])).as_f64_vec().unwrap(), vec![2.5]);

        assert!(DivideTransform::new(None, None).is_err());
    }

    #[test]
    fn test_divide_features() {
        let mut pm = PromiseManager::new();
        let deps = vec!["num".to_string(), "den".to_string()];
        let mut div = DivideTransform::new(Some(Operand::Name("num".into())), Some(Operand::Name("den".into()))).unwrap();
        div.compile(&mut CompileContext::new("ratio", &deps, &mut pm)).unwrap();
        assert!(!div.expects_data());
        let vals = values(vec![("num", Array::from_i64(vec![1, 3])), ("den", Array::from_i64(vec![2, 4]))]);
        let out = div.execute(None, &ExecContext::new("ratio", &vals, &pm)).unwrap();
        assert_eq!(out.as_array().unwrap().as_f64_vec().unwrap(), vec![0.5, 0.75]);
    }

    #[test]
    fn test_scale_keeps_float32() {
        let out = run(&ScaleFeature::new(0.5), Array::from_f32(vec![2.0, 4.0]));
        assert_eq!(out.dtype(), DType::Float32);
        assert_eq!(out.as_f64_vec().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_unary_math() {
        let out = run(&LogTransform, Array::from_f64(vec![1.0]));
        assert_eq!(out.as_f64_vec().unwrap(), vec![0.0]);
        let out = run(&SqrtTransform, Array::from_f64(vec![9.0]));
        assert_eq!(out.as_f64_vec().unwrap(), vec![3.0]);
        let out = run(&ExpTransform, Array::from_f64(vec![0.0]));
        assert_eq!(out.as_f64_vec().unwrap(), vec![1.0]);
        let out = run(&PowerTransform { power: 2.0 }, Array::from_f64(vec![3.0]));
        assert_eq!(out.as_f64_vec().unwrap(), vec![9.0]);
    }

    #[test]
    fn test_zscore_and_minmax() {
        let z = ZScoreTransform { mean: 2.0, std_dev: 2.0 };
        assert_eq!(run(&z, Array::from_f64(vec![4.0, 0.0])).as_f64_vec().unwrap(), vec![1.0, -1.0]);
        let mm = MinMaxTransform { min: 0.0, max: 10.0 };
        assert_eq!(run(&mm, Array::from_f64(vec![5.0])).as_f64_vec().unwrap(), vec![0.5]);
    }

    #[test]
    fn test_clip() {
        let clip = ClipTransform { min: 0.0, max: 10.0 };
        let out = run(&clip, Array::from_i64(vec![-5, 5, 15]));
        assert_eq!(out.dtype(), DType::Int64);
        assert_eq!(out.as_i64_vec().unwrap(), vec![0, 5, 10]);
    }

    #[test]
    fn test_log_rejects_strings() {
        let err = LogTransform
            .execute(Some(Array::from_strs(&["a"]).into()), &ExecContext::detached())
            .unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }
}
