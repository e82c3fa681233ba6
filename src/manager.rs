//! Loading a feature set, ordering it, and computing it.

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::array::{Casting, Value};
use crate::config::ExecutionConfig;
use crate::domain::dependency::{check_dependencies_exist, level_groups, topological_sort};
use crate::feature::{Feature, FeatureOutcome};
use crate::graph::{self, GraphDetail};
use crate::promise::PromiseManager;
use crate::spec::{load_feature_file, parse_feature_specs, FeatureSpecs};
use crate::transform::{ExecContext, TransformationRegistry};

/// Computed values by feature name, iterated in computation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureResults {
    order: Vec<String>,
    values: HashMap<String, Value>,
}

impl FeatureResults {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), v)))
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.values
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Options for building a [`FeatureManager`].
#[derive(Debug, Default)]
pub struct FeatureManagerBuilder {
    registry: Option<TransformationRegistry>,
    execution: ExecutionConfig,
    casting: Casting,
}

impl FeatureManagerBuilder {
    /// Registry to resolve `_target_`s against; defaults to the built-ins.
    pub fn registry(mut self, registry: TransformationRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn casting(mut self, casting: Casting) -> Self {
        self.casting = casting;
        self
    }

    /// Load `<config_path>/<config_name>.yaml`.
    pub fn load(self, config_path: impl AsRef<Path>, config_name: &str) -> Result<FeatureManager> {
        let specs = load_feature_file(config_path.as_ref(), config_name)?;
        self.from_specs(specs)
    }

    /// Build from a definition document held in memory.
    pub fn from_yaml_str(self, content: &str) -> Result<FeatureManager> {
        self.from_specs(parse_feature_specs(content)?)
    }

    pub fn from_specs(self, specs: FeatureSpecs) -> Result<FeatureManager> {
        check_dependencies_exist(&specs)?;
        let order = topological_sort(&specs)?;
        let levels = level_groups(&specs)?;
        log::debug!("Feature computation order: {}", order.join(" -> "));

        let registry = self.registry.unwrap_or_default();
        let mut features = Vec::with_capacity(specs.len());
        for (name, spec) in specs {
            features.push(Feature::new(&name, spec, &registry, self.casting)?);
        }
        let index: HashMap<String, usize> = features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect();

        let steps: HashMap<String, Vec<String>> = features
            .iter()
            .map(|f| (f.name().to_string(), f.chain().step_names()))
            .collect();
        let mut promises = PromiseManager::new();
        for name in &order {
            let feature = &mut features[index[name]];
            feature.compile(&mut promises, &steps)?;
        }
        log::info!(
            "Built {} features ({} promised stages)",
            features.len(),
            promises.len()
        );

        Ok(FeatureManager {
            features,
            index,
            order,
            levels,
            promises,
            execution: self.execution,
        })
    }
}

/// Owns every feature of a definition file and computes them in dependency
/// order.
#[derive(Debug)]
pub struct FeatureManager {
    /// Declaration order.
    features: Vec<Feature>,
    index: HashMap<String, usize>,
    order: Vec<String>,
    levels: Vec<Vec<String>>,
    promises: PromiseManager,
    execution: ExecutionConfig,
}

impl FeatureManager {
    /// Load `<config_path>/<config_name>.yaml` with the built-in
    /// transformations and sequential execution.
    pub fn new(config_path: impl AsRef<Path>, config_name: &str) -> Result<Self> {
        Self::builder().load(config_path, config_name)
    }

    pub fn builder() -> FeatureManagerBuilder {
        FeatureManagerBuilder::default()
    }

    /// Features in declaration order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.index.get(name).map(|&i| &self.features[i])
    }

    /// Computation order; every feature follows its dependencies.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Groups of features that may run concurrently, in level order.
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    pub fn independent_features(&self) -> Vec<&Feature> {
        self.features.iter().filter(|f| f.is_independent()).collect()
    }

    pub fn dependent_features(&self) -> Vec<&Feature> {
        self.features.iter().filter(|f| !f.is_independent()).collect()
    }

    pub fn promises(&self) -> &PromiseManager {
        &self.promises
    }

    pub fn execution(&self) -> ExecutionConfig {
        self.execution
    }

    pub fn set_execution(&mut self, execution: ExecutionConfig) {
        self.execution = execution;
    }

    /// Compute every feature.
    ///
    /// Independent features read `inputs[name]`; dependent features read it
    /// when present and otherwise start their chain without data.
    ///
    /// # Errors
    ///
    /// Missing input for an independent feature, a failed step (as
    /// [`crate::errors::TransformationError`]), or a final value that does not
    /// match its declared data type.
    pub fn compute_features(&mut self, inputs: &HashMap<String, Value>) -> Result<FeatureResults> {
        self.promises.reset();
        let mut values: HashMap<String, Value> = HashMap::new();

        if self.execution.parallel_execution {
            let workers = self.execution.workers();
            log::debug!("Computing {} levels with up to {} workers", self.levels.len(), workers);
            let levels = self.levels.clone();
            for level in &levels {
                for batch in level.chunks(workers) {
                    let outcomes = self.compute_batch(batch, inputs, &values)?;
                    for (name, outcome) in batch.iter().zip(outcomes) {
                        self.record(name, outcome, &mut values)?;
                    }
                }
            }
        } else {
            let order = self.order.clone();
            for name in &order {
                let outcome = compute_one(self.feature_by_name(name)?, inputs, &values, &self.promises)?;
                self.record(name, outcome, &mut values)?;
            }
        }

        Ok(FeatureResults {
            order: self.order.clone(),
            values,
        })
    }

    fn compute_batch(
        &self,
        batch: &[String],
        inputs: &HashMap<String, Value>,
        values: &HashMap<String, Value>,
    ) -> Result<Vec<FeatureOutcome>> {
        let features = batch
            .iter()
            .map(|name| self.feature_by_name(name))
            .collect::<Result<Vec<_>>>()?;
        let promises = &self.promises;

        std::thread::scope(|scope| {
            let handles: Vec<_> = features
                .into_iter()
                .map(|feature| {
                    let handle = scope.spawn(move || compute_one(feature, inputs, values, promises));
                    (feature.name(), handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    handle
                        .join()
                        .map_err(|_| anyhow!("Worker computing feature '{}' panicked", name))?
                })
                .collect()
        })
    }

    fn record(&mut self, name: &str, outcome: FeatureOutcome, values: &mut HashMap<String, Value>) -> Result<()> {
        for (stage, value) in outcome.stages {
            self.promises.pass_data(name, Some(&stage), value, false)?;
        }
        if self.promises.is_promised(name, None) {
            self.promises
                .pass_data(name, None, outcome.value.value().clone(), false)?;
        }
        values.insert(name.to_string(), outcome.value.value().clone());
        let index = self.index[name];
        self.features[index].store(outcome.value, outcome.trace);
        Ok(())
    }

    fn feature_by_name(&self, name: &str) -> Result<&Feature> {
        self.feature(name)
            .ok_or_else(|| anyhow!("Unknown feature '{}'", name))
    }

    /// Graphviz DOT source of the dependency graph.
    pub fn dependency_graph_dot(&self) -> String {
        graph::to_dot(&self.specs())
    }

    /// Box drawing of the dependency graph.
    pub fn dependency_graph_ascii(&self, detail: GraphDetail) -> Result<String> {
        Ok(graph::to_ascii(&self.specs(), detail)?.0)
    }

    /// Write the DOT source to `path`. A missing extension becomes `.dot`.
    pub fn save_dependency_graph(&self, path: impl AsRef<Path>) -> Result<std::path::PathBuf> {
        let mut path = path.as_ref().to_path_buf();
        if path.extension().is_none() {
            path.set_extension("dot");
        }
        graph::write_atomically(&path, &self.dependency_graph_dot())?;
        log::info!("Dependency graph saved as {}", path.display());
        Ok(path)
    }

    fn specs(&self) -> FeatureSpecs {
        self.features
            .iter()
            .map(|f| (f.name().to_string(), f.spec().clone()))
            .collect()
    }
}

fn compute_one(
    feature: &Feature,
    inputs: &HashMap<String, Value>,
    values: &HashMap<String, Value>,
    promises: &PromiseManager,
) -> Result<FeatureOutcome> {
    let name = feature.name();
    let data = match inputs.get(name) {
        Some(value) => Some(value.clone()),
        None if feature.is_independent() => bail!("Missing input data for independent feature '{}'", name),
        None => None,
    };
    let capture = promises.promised_stages(name);
    let ctx = ExecContext::new(name, values, promises);
    log::debug!("Computing feature '{}'", name);
    feature.compute(data, &ctx, &capture)
}
