//! Name → factory lookup for transformations.

use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::sync::Arc;

use super::Transformation;
use crate::instantiate::{Args, Param};

/// Builds a transformation from its keyword arguments.
pub type Factory = Arc<dyn Fn(&mut Args) -> Result<Box<dyn Transformation>> + Send + Sync>;

/// A registered transformation.
#[derive(Clone)]
pub struct Registration {
    /// Short name used in `_target_` and expressions, e.g. `scale`.
    pub name: String,
    /// Type name, e.g. `ScaleFeature`.
    pub type_name: String,
    pub summary: String,
    factory: Factory,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Available transformations, looked up by short name, type name, or a
/// dotted path ending in either.
#[derive(Debug, Clone)]
pub struct TransformationRegistry {
    entries: Vec<Registration>,
}

impl Default for TransformationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformationRegistry {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// A registry holding the built-in catalogue.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        super::math::register_builtins(&mut registry);
        super::generic::register_builtins(&mut registry);
        super::importer::register_builtins(&mut registry);
        super::string::register_builtins(&mut registry);
        super::datetime::register_builtins(&mut registry);
        super::aggregate::register_builtins(&mut registry);
        registry
    }

    /// Register a custom transformation.
    ///
    /// # Arguments
    ///
    /// * `name` - short name for `_target_` and expressions
    /// * `type_name` - name shown in traces and accepted as a target
    /// * `factory` - builds the step from its keyword arguments
    pub fn register<F>(&mut self, name: &str, type_name: &str, summary: &str, factory: F) -> Result<()>
    where
        F: Fn(&mut Args) -> Result<Box<dyn Transformation>> + Send + Sync + 'static,
    {
        for key in [name, type_name] {
            if self.lookup(key).is_some() {
                bail!("Transformation '{}' is already registered", key);
            }
        }
        self.add(name, type_name, summary, factory);
        Ok(())
    }

    pub(crate) fn add<F>(&mut self, name: &str, type_name: &str, summary: &str, factory: F)
    where
        F: Fn(&mut Args) -> Result<Box<dyn Transformation>> + Send + Sync + 'static,
    {
        self.entries.push(Registration {
            name: name.to_string(),
            type_name: type_name.to_string(),
            summary: summary.to_string(),
            factory: Arc::new(factory),
        });
    }

    pub fn lookup(&self, target: &str) -> Option<&Registration> {
        let direct = self
            .entries
            .iter()
            .find(|r| r.name == target || r.type_name == target);
        if direct.is_some() {
            return direct;
        }
        let (_, last) = target.rsplit_once('.')?;
        self.entries
            .iter()
            .find(|r| r.type_name == last || r.name == last)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.lookup(target).is_some()
    }

    /// Build `target` from keyword arguments; unused keywords are an error.
    pub fn create(&self, target: &str, kwargs: Vec<(String, Param)>) -> Result<Box<dyn Transformation>> {
        let registration = self
            .lookup(target)
            .ok_or_else(|| anyhow!("Unknown transformation '{}'", target))?;
        let mut args = Args::new(&registration.type_name, kwargs);
        let transformation = (registration.factory)(&mut args)?;
        args.finish()?;
        Ok(transformation)
    }

    pub fn entries(&self) -> &[Registration] {
        &self.entries
    }
}
