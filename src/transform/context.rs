//! What a transformation sees while compiling and while executing.

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

use crate::array::Value;
use crate::promise::PromiseManager;

/// Compile-time view of the owning feature.
pub struct CompileContext<'a> {
    feature: &'a str,
    dependencies: &'a [String],
    promises: &'a mut PromiseManager,
    steps: Option<&'a HashMap<String, Vec<String>>>,
}

impl<'a> CompileContext<'a> {
    pub fn new(feature: &'a str, dependencies: &'a [String], promises: &'a mut PromiseManager) -> Self {
        Self {
            feature,
            dependencies,
            promises,
            steps: None,
        }
    }

    /// Known step names per feature, used to check stage references.
    pub fn with_steps(mut self, steps: &'a HashMap<String, Vec<String>>) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn feature(&self) -> &str {
        self.feature
    }

    pub fn is_dependency(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }

    /// Fail unless `name` is a declared dependency of the owning feature.
    pub fn require_dependency(&self, name: &str) -> Result<()> {
        if !self.is_dependency(name) {
            bail!(
                "Feature '{}' references '{}', which is not one of its dependencies",
                self.feature,
                name
            );
        }
        Ok(())
    }

    /// Register a promise for `feature:step`.
    pub fn register_stage(&mut self, feature: &str, step: &str) -> Result<()> {
        self.require_dependency(feature)?;
        if let Some(known) = self.steps.and_then(|steps| steps.get(feature)) {
            if !known.iter().any(|s| s == step) {
                bail!(
                    "Feature '{}' has no transformation step '{}' (referenced by '{}')",
                    feature,
                    step,
                    self.feature
                );
            }
        }
        self.promises.get_promise_value(feature, Some(step));
        Ok(())
    }
}

/// Run-time view: computed feature values and fulfilled promises.
#[derive(Clone, Copy)]
pub struct ExecContext<'a> {
    feature: &'a str,
    values: Option<&'a HashMap<String, Value>>,
    promises: Option<&'a PromiseManager>,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        feature: &'a str,
        values: &'a HashMap<String, Value>,
        promises: &'a PromiseManager,
    ) -> Self {
        Self {
            feature,
            values: Some(values),
            promises: Some(promises),
        }
    }

    /// A context with no features or promises, for running steps standalone.
    pub fn detached() -> ExecContext<'static> {
        ExecContext {
            feature: "",
            values: None,
            promises: None,
        }
    }

    pub fn feature(&self) -> &str {
        self.feature
    }

    pub fn feature_value(&self, name: &str) -> Result<&'a Value> {
        self.values
            .and_then(|values| values.get(name))
            .ok_or_else(|| anyhow!("Value of feature '{}' is not available", name))
    }

    pub fn stage_value(&self, feature: &str, step: &str) -> Result<&'a Value> {
        let promises = self
            .promises
            .ok_or_else(|| anyhow!("No promise registered for '{}:{}'", feature, step))?;
        promises.value(feature, Some(step))
    }
}
