//! Promised intermediate values shared between features.
//!
//! A stage reference `feature:step` in one feature's chain becomes a promise
//! here at compile time. The producing feature fills it once that step has run.

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

use crate::array::Value;
use crate::value::PromiseValue;

/// Join a feature name and optional step into a promise key.
pub fn promise_key(base: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(step) => format!("{}:{}", base, step),
        None => base.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromiseManager {
    memo: HashMap<String, PromiseValue>,
}

impl PromiseManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a promise, returning the existing slot if one is already there.
    pub fn get_promise_value(&mut self, base: &str, suffix: Option<&str>) -> &mut PromiseValue {
        let key = promise_key(base, suffix);
        log::trace!("Promise registered for '{}'", key);
        self.memo.entry(key).or_default()
    }

    pub fn is_promised(&self, base: &str, suffix: Option<&str>) -> bool {
        self.memo.contains_key(&promise_key(base, suffix))
    }

    /// Whether anything is promised for `base` itself or any of its steps.
    pub fn is_promised_any(&self, base: &str) -> bool {
        let prefix = format!("{}:", base);
        self.memo
            .keys()
            .any(|key| key == base || key.starts_with(&prefix))
    }

    /// Steps of `base` that other features wait on.
    pub fn promised_stages(&self, base: &str) -> Vec<String> {
        let prefix = format!("{}:", base);
        let mut stages: Vec<String> = self
            .memo
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect();
        stages.sort();
        stages
    }

    /// Fill a registered promise. Unregistered keys are an error.
    ///
    /// With `finally_delete` the slot is dropped once filled, for callers that
    /// only need the validation.
    pub fn pass_data(&mut self, base: &str, suffix: Option<&str>, value: Value, finally_delete: bool) -> Result<()> {
        let key = promise_key(base, suffix);
        let slot = self
            .memo
            .get_mut(&key)
            .ok_or_else(|| anyhow!("No promise registered for '{}'", key))?;
        slot.fulfil(value)?;
        log::trace!("Promise '{}' fulfilled", key);
        if finally_delete {
            self.memo.remove(&key);
        }
        Ok(())
    }

    /// Read a fulfilled promise.
    pub fn value(&self, base: &str, suffix: Option<&str>) -> Result<&Value> {
        let key = promise_key(base, suffix);
        let Some(slot) = self.memo.get(&key) else {
            bail!("No promise registered for '{}'", key);
        };
        slot.get()
            .ok_or_else(|| anyhow!("Promised value for '{}' is not ready yet", key))
    }

    /// Drop every promise made for `base` and its steps.
    pub fn delete_all_related_keys(&mut self, base: &str) {
        let prefix = format!("{}:", base);
        self.memo
            .retain(|key, _| key != base && !key.starts_with(&prefix));
    }

    /// Empty every slot while keeping the registrations.
    pub fn reset(&mut self) {
        for slot in self.memo.values_mut() {
            slot.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}
