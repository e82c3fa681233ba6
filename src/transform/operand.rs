//! Transformation arguments that are resolved at execution time.

use anyhow::{bail, Result};

use super::{Chain, CompileContext, ExecContext};
use crate::array::{Array, Value};

/// A value a step reads when it runs.
#[derive(Debug)]
pub enum Operand {
    /// A fixed value.
    Literal(Value),
    /// A string not yet bound. After compiling it is either a reference or
    /// stays a literal string.
    Name(String),
    /// The final value of a dependency.
    Feature(String),
    /// The output of a dependency's named step.
    Stage { feature: String, step: String },
    /// A nested chain run without incoming data.
    Chain(Chain),
}

impl Operand {
    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    /// An explicit reference: `name` or `name:step`.
    pub fn reference(name: &str) -> Self {
        match name.split_once(':') {
            Some((feature, step)) => Operand::Stage {
                feature: feature.to_string(),
                step: step.to_string(),
            },
            None => Operand::Feature(name.to_string()),
        }
    }

    /// Bind names against the owning feature's dependencies.
    ///
    /// A [`Operand::Name`] becomes a reference when it names a dependency or
    /// `dependency:step`; anything else stays a literal string.
    pub fn compile(&mut self, ctx: &mut CompileContext<'_>) -> Result<()> {
        match self {
            Operand::Literal(_) => Ok(()),
            Operand::Name(name) => {
                if ctx.is_dependency(name) {
                    *self = Operand::Feature(name.clone());
                    return Ok(());
                }
                if let Some((feature, step)) = name.split_once(':') {
                    if ctx.is_dependency(feature) {
                        ctx.register_stage(feature, step)?;
                        *self = Operand::Stage {
                            feature: feature.to_string(),
                            step: step.to_string(),
                        };
                    }
                }
                Ok(())
            }
            Operand::Feature(name) => ctx.require_dependency(name),
            Operand::Stage { feature, step } => ctx.register_stage(feature, step),
            Operand::Chain(chain) => chain.compile(ctx),
        }
    }

    pub fn resolve(&self, ctx: &ExecContext<'_>) -> Result<Value> {
        match self {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Name(name) => Ok(Array::scalar_str(name).into()),
            Operand::Feature(name) => ctx.feature_value(name).cloned(),
            Operand::Stage { feature, step } => ctx.stage_value(feature, step).cloned(),
            Operand::Chain(chain) => match chain.run(None, ctx, &[])?.value {
                Some(value) => Ok(value),
                None => bail!("Nested transformation chain produced no value"),
            },
        }
    }

    pub fn resolve_array(&self, ctx: &ExecContext<'_>) -> Result<Array> {
        self.resolve(ctx)?.into_array()
    }

    /// Whether this operand reads another feature.
    pub fn is_reference(&self) -> bool {
        matches!(self, Operand::Feature(_) | Operand::Stage { .. })
    }
}
