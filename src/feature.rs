//! A single feature: its definition, its transformation chain, and the
//! outcome of its last computation.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;

use crate::array::{Casting, DType, Value};
use crate::instantiate::instantiate_chain;
use crate::promise::PromiseManager;
use crate::spec::FeatureSpec;
use crate::trace::TransformationChain;
use crate::transform::{Chain, CompileContext, ExecContext, TransformationRegistry};
use crate::value::FeatureValue;

#[derive(Debug)]
pub struct Feature {
    name: String,
    spec: FeatureSpec,
    data_type: DType,
    casting: Casting,
    chain: Chain,
    feature_value: Option<FeatureValue>,
    transformation_chain: TransformationChain,
}

/// What one computation of a feature produced.
#[derive(Debug)]
pub struct FeatureOutcome {
    pub value: FeatureValue,
    pub trace: TransformationChain,
    /// Outputs of steps other features wait on.
    pub stages: Vec<(String, Value)>,
}

impl Feature {
    /// Validate `spec` and instantiate its transformation chain.
    ///
    /// # Arguments
    ///
    /// * `name` - Feature name, used in error messages and promise keys
    /// * `spec` - The feature's definition
    /// * `registry` - Where `_target_`s are looked up
    /// * `casting` - How the final value may be converted to `data_type`
    pub fn new(name: &str, spec: FeatureSpec, registry: &TransformationRegistry, casting: Casting) -> Result<Self> {
        spec.validate(name)?;
        let data_type = spec.dtype()?;
        let chain = match &spec.transformation {
            Some(config) => instantiate_chain(config, registry, &format!("{}.transformation", name))
                .with_context(|| format!("Failed to build transformations of feature '{}'", name))?,
            None => Chain::new(),
        };
        Ok(Self {
            name: name.to_string(),
            spec,
            data_type,
            casting,
            chain,
            feature_value: None,
            transformation_chain: TransformationChain::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    pub fn data_type(&self) -> DType {
        self.data_type
    }

    pub fn group(&self) -> Option<&str> {
        self.spec.group.as_deref()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.spec.dependencies
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn is_independent(&self) -> bool {
        self.spec.dependencies.is_empty()
    }

    /// Bind operands to dependencies and register stage promises.
    pub fn compile(&mut self, promises: &mut PromiseManager, steps: &HashMap<String, Vec<String>>) -> Result<()> {
        let mut ctx = CompileContext::new(&self.name, &self.spec.dependencies, promises).with_steps(steps);
        self.chain.compile(&mut ctx)
    }

    /// Run the chain on `data` and validate the result against the declared
    /// data type. Steps named in `capture` are returned for promise hand-off.
    pub fn compute(&self, data: Option<Value>, ctx: &ExecContext<'_>, capture: &[String]) -> Result<FeatureOutcome> {
        let run = self.chain.run(data, ctx, capture)?;
        let value = run
            .value
            .ok_or_else(|| anyhow!("Feature '{}' has no transformation and received no input data", self.name))?;
        let value = FeatureValue::new(value, self.data_type, self.casting)
            .with_context(|| format!("Feature '{}' failed data type validation", self.name))?;
        Ok(FeatureOutcome {
            value,
            trace: run.trace,
            stages: run.stages,
        })
    }

    pub(crate) fn store(&mut self, value: FeatureValue, trace: TransformationChain) {
        self.feature_value = Some(value);
        self.transformation_chain = trace;
    }

    /// The value from the last computation.
    pub fn feature_value(&self) -> Option<&FeatureValue> {
        self.feature_value.as_ref()
    }

    /// Trace of the last computation.
    pub fn transformation_chain(&self) -> &TransformationChain {
        &self.transformation_chain
    }
}
