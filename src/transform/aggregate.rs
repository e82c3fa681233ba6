//! Group-wise aggregation keyed by another feature.

use anyhow::{bail, Result};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use super::{required_array, Chain, CompileContext, ExecContext, Operand, Transformation, TransformationRegistry};
use crate::array::{Array, BinaryOp, DType, DTypeKind, Value};
use crate::instantiate::Param;

/// Built-in group reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sum,
    Multiply,
    Subtract,
    Concat,
    Mean,
    Median,
    Max,
    Min,
    Mode,
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let strategy = match s {
            "sum" => Strategy::Sum,
            "multiply" => Strategy::Multiply,
            "subtract" => Strategy::Subtract,
            "concat" => Strategy::Concat,
            "mean" => Strategy::Mean,
            "median" => Strategy::Median,
            "max" => Strategy::Max,
            "min" => Strategy::Min,
            "mode" => Strategy::Mode,
            other => bail!(
                "Unknown reduce strategy '{}'. Expected one of: sum, multiply, subtract, concat, mean, median, max, min, mode",
                other
            ),
        };
        Ok(strategy)
    }
}

#[derive(Debug)]
pub enum GroupReduce {
    Strategy(Strategy),
    /// Receives the stacked group, grouped axis first.
    Chain(Chain),
}

/// Replace every element with the aggregate of the elements sharing its key.
#[derive(Debug)]
pub struct GroupByReduce {
    key: Operand,
    reduce: GroupReduce,
    axis: i64,
}

impl GroupByReduce {
    pub fn new(key: Operand, reduce: GroupReduce, axis: i64) -> Self {
        Self { key, reduce, axis }
    }

    fn aggregate(&self, group: Array, ctx: &ExecContext<'_>) -> Result<Array> {
        match &self.reduce {
            GroupReduce::Strategy(strategy) => reduce_group(*strategy, &group),
            GroupReduce::Chain(chain) => match chain.run(Some(group.into()), ctx, &[])?.value {
                Some(value) => value.into_array(),
                None => bail!("Group reducer produced no value"),
            },
        }
    }
}

impl Transformation for GroupByReduce {
    fn name(&self) -> &str {
        "GroupByReduce"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn compile(&mut self, ctx: &mut CompileContext<'_>) -> Result<()> {
        self.key.compile(ctx)?;
        if let GroupReduce::Chain(chain) = &mut self.reduce {
            chain.compile(ctx)?;
        }
        Ok(())
    }

    fn execute(&self, data: Option<Value>, ctx: &ExecContext<'_>) -> Result<Value> {
        let data = required_array(data, self.name())?;
        if data.is_scalar() {
            bail!("GroupByReduce needs at least one dimension to group over");
        }
        let key = self.key.resolve_array(ctx)?;
        let axis = data.normalize_axis(self.axis)?;
        let moved = data.move_axis(axis, 0)?;
        let n = moved.shape()[0];
        if key.len() != n {
            bail!(
                "Key length {} does not match data length {} along axis {}",
                key.len(),
                n,
                self.axis
            );
        }

        // Groups are numbered in first-seen order.
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut group_of = Vec::with_capacity(n);
        for i in 0..n {
            let group = *index.entry(key.format_element(i)).or_insert_with(|| {
                members.push(Vec::new());
                members.len() - 1
            });
            members[group].push(i);
            group_of.push(group);
        }
        log::trace!("GroupByReduce found {} groups over {} rows", members.len(), n);

        let mut aggregates = Vec::with_capacity(members.len());
        for rows in &members {
            let slices = rows
                .iter()
                .map(|&i| moved.index_axis(0, i))
                .collect::<Result<Vec<_>>>()?;
            aggregates.push(self.aggregate(Array::stack(&slices)?, ctx)?);
        }

        let spread: Vec<Array> = group_of.iter().map(|&g| aggregates[g].clone()).collect();
        let result = Array::stack(&spread)?;
        let last = result.ndim() - 1;
        Ok(result.move_axis(0, axis.min(last))?.into())
    }
}

/// Reduce a stacked group (`[k, ...]`) along its first axis.
fn reduce_group(strategy: Strategy, group: &Array) -> Result<Array> {
    let k = group.shape()[0];
    match strategy {
        Strategy::Sum => group.reduce_axis(BinaryOp::Add, 0),
        Strategy::Multiply => group.reduce_axis(BinaryOp::Mul, 0),
        Strategy::Subtract => group.reduce_axis(BinaryOp::Sub, 0),
        Strategy::Concat => {
            let mut slices = group.split_axis(0)?.into_iter();
            let Some(first) = slices.next() else {
                bail!("empty group");
            };
            slices.try_fold(first.astype(&DType::Str)?, |acc, s| acc.concat_str(&s))
        }
        Strategy::Mean => group
            .astype(&DType::Float64)?
            .reduce_axis(BinaryOp::Add, 0)?
            .div(&Array::scalar_f64(k as f64)),
        Strategy::Median => {
            let rest = group.shape()[1..].to_vec();
            let m: usize = rest.iter().product();
            let values = group.as_f64_vec()?;
            let medians = (0..m)
                .map(|p| {
                    let mut column: Vec<f64> = (0..k).map(|j| values[j * m + p]).collect();
                    column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                    if k % 2 == 1 {
                        column[k / 2]
                    } else {
                        (column[k / 2 - 1] + column[k / 2]) / 2.0
                    }
                })
                .collect();
            Array::from_f64(medians).with_shape(rest)
        }
        Strategy::Max | Strategy::Min | Strategy::Mode => {
            let rest = group.shape()[1..].to_vec();
            let m: usize = rest.iter().product();
            let keys = SortKeys::of(group)?;
            let picks: Vec<usize> = (0..m)
                .map(|p| {
                    let candidates: Vec<usize> = (0..k).map(|j| j * m + p).collect();
                    pick(strategy, &keys, &candidates)
                })
                .collect();
            group.take_flat(&picks)?.with_shape(rest)
        }
    }
}

/// Comparable view of an array's elements.
enum SortKeys<'a> {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(&'a [String]),
}

impl<'a> SortKeys<'a> {
    fn of(array: &'a Array) -> Result<Self> {
        let keys = match array.dtype().kind() {
            DTypeKind::Float => SortKeys::Float(array.as_f64_vec()?),
            DTypeKind::Str => SortKeys::Str(array.as_str_vec()?),
            DTypeKind::UInt if array.dtype() == DType::UInt64 => SortKeys::Float(array.as_f64_vec()?),
            _ => SortKeys::Int(array.as_i64_vec()?),
        };
        Ok(keys)
    }

    fn cmp(&self, a: usize, b: usize) -> Ordering {
        match self {
            SortKeys::Int(v) => v[a].cmp(&v[b]),
            SortKeys::Float(v) => v[a].partial_cmp(&v[b]).unwrap_or(Ordering::Equal),
            SortKeys::Str(v) => v[a].cmp(&v[b]),
        }
    }
}

fn pick(strategy: Strategy, keys: &SortKeys<'_>, candidates: &[usize]) -> usize {
    let mut best = candidates[0];
    match strategy {
        Strategy::Max => {
            for &c in &candidates[1..] {
                if keys.cmp(c, best) == Ordering::Greater {
                    best = c;
                }
            }
        }
        Strategy::Min => {
            for &c in &candidates[1..] {
                if keys.cmp(c, best) == Ordering::Less {
                    best = c;
                }
            }
        }
        _ => {
            // most frequent, ties to the smallest value
            let count = |x: usize| candidates.iter().filter(|&&y| keys.cmp(x, y) == Ordering::Equal).count();
            let mut best_count = count(best);
            for &c in &candidates[1..] {
                let n = count(c);
                if n > best_count || (n == best_count && keys.cmp(c, best) == Ordering::Less) {
                    best = c;
                    best_count = n;
                }
            }
        }
    }
    best
}

fn key_operand(param: Param) -> Result<Operand> {
    match param {
        Param::Str(name) => Ok(Operand::reference(&name)),
        other => other.into_operand(),
    }
}

pub(crate) fn register_builtins(registry: &mut TransformationRegistry) {
    registry.add("group_by", "GroupByReduce", "Aggregate within groups of equal key", |args| {
        let Some(key) = args.take("key") else {
            bail!("GroupByReduce missing required argument 'key'");
        };
        let key = key_operand(key)?;
        let reduce = match args.take("reduce") {
            None => bail!("GroupByReduce missing required argument 'reduce'"),
            Some(Param::Str(name)) => GroupReduce::Strategy(name.parse()?),
            Some(Param::Chain(chain)) => GroupReduce::Chain(chain),
            Some(other) => bail!(
                "GroupByReduce argument 'reduce' must be a strategy name or a transformation, got a {}",
                other.kind()
            ),
        };
        let axis = args.take_i64("axis")?.unwrap_or(-1);
        Ok(Box::new(GroupByReduce::new(key, reduce, axis)))
    });
}
