//! Building transformation chains from `_target_` configuration.
//!
//! A feature's `transformation:` entry is one of
//!
//! - a mapping of step name to node (the usual form),
//! - a single node, which becomes one step named after its target,
//! - a list of nodes, whose steps are named `"0"`, `"1"`, ...
//!
//! A node is a mapping with a `_target_` string plus keyword arguments. The
//! target names a registered transformation or is an infix expression (see
//! [`expression`]).

pub mod expression;
mod params;

pub use expression::{hydrate_expression, is_valid_expression};
pub use params::{Args, Param};

use anyhow::{anyhow, bail, Context, Result};
use serde_yaml::{Mapping, Value as Yaml};

use crate::transform::{Chain, TransformationRegistry};

pub const TARGET_KEY: &str = "_target_";

/// Instantiation flags that carry no meaning here and are skipped.
const IGNORED_KEYS: &[&str] = &["_recursive_", "_convert_", "_partial_"];

/// Build the chain described by `config`.
///
/// # Arguments
///
/// * `config` - The raw `transformation:` value
/// * `registry` - Where targets and expression functions are looked up
/// * `full_key` - Dotted path of `config`, used in error messages
pub fn instantiate_chain(config: &Yaml, registry: &TransformationRegistry, full_key: &str) -> Result<Chain> {
    let mut chain = Chain::new();
    match config {
        Yaml::Null => {}
        Yaml::Mapping(mapping) if mapping.is_empty() => {}
        Yaml::Mapping(mapping) if mapping.contains_key(TARGET_KEY) => {
            let target = target_of(mapping, full_key)?;
            let built = instantiate_node(mapping, registry, full_key)?;
            append_step(&mut chain, &target, built);
        }
        Yaml::Mapping(mapping) => {
            for (key, node) in mapping {
                let step = step_name(key)
                    .ok_or_else(|| anyhow!("Step names must be strings or integers, got {:?}\nfull_key: {}", key, full_key))?;
                let node_key = format!("{}.{}", full_key, step);
                let built = instantiate_step(node, registry, &node_key)?;
                append_step(&mut chain, &step, built);
            }
        }
        Yaml::Sequence(nodes) => {
            for (index, node) in nodes.iter().enumerate() {
                let step = index.to_string();
                let node_key = format!("{}.{}", full_key, step);
                let built = instantiate_step(node, registry, &node_key)?;
                append_step(&mut chain, &step, built);
            }
        }
        other => bail!(
            "Transformation config must be a mapping or a list, got {}\nfull_key: {}",
            yaml_kind(other),
            full_key
        ),
    }
    log::debug!("Instantiated {} with steps {:?}", full_key, chain.step_names());
    Ok(chain)
}

fn instantiate_step(node: &Yaml, registry: &TransformationRegistry, full_key: &str) -> Result<Chain> {
    match node {
        Yaml::Mapping(mapping) if mapping.contains_key(TARGET_KEY) => instantiate_node(mapping, registry, full_key),
        other => bail!(
            "Transformation step must be a mapping with a '{}' key, got {}\nfull_key: {}",
            TARGET_KEY,
            yaml_kind(other),
            full_key
        ),
    }
}

/// A one-step chain keeps the config's step name; longer chains expand into
/// `<step>_<sub-step>`.
fn append_step(chain: &mut Chain, step: &str, built: Chain) {
    if built.len() == 1 {
        for (_, transformation) in built.into_steps() {
            chain.push(step, transformation);
        }
    } else {
        chain.push_expanded(step, built);
    }
}

fn step_name(key: &Yaml) -> Option<String> {
    match key {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn target_of(mapping: &Mapping, full_key: &str) -> Result<String> {
    match mapping.get(TARGET_KEY) {
        Some(Yaml::String(target)) => Ok(target.trim().to_string()),
        _ => bail!("'{}' must be a string\nfull_key: {}", TARGET_KEY, full_key),
    }
}

/// Instantiate one `_target_` node into a chain of one or more steps.
fn instantiate_node(mapping: &Mapping, registry: &TransformationRegistry, full_key: &str) -> Result<Chain> {
    let target = target_of(mapping, full_key)?;

    let mut kwargs = Vec::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            bail!("Argument names must be strings, got {:?}\nfull_key: {}", key, full_key);
        };
        if key == TARGET_KEY || IGNORED_KEYS.contains(&key) {
            continue;
        }
        let param = to_param(value, registry, &format!("{}.{}", full_key, key))?;
        kwargs.push((key.to_string(), param));
    }

    let mut chain = Chain::new();
    if registry.contains(&target) {
        let transformation = registry
            .create(&target, kwargs)
            .with_context(|| format!("Error instantiating '{}'\nfull_key: {}", target, full_key))?;
        chain.push(target, transformation);
    } else if is_valid_expression(&target) {
        if let Some((key, _)) = kwargs.first() {
            bail!(
                "Expression target '{}' does not take keyword arguments (got '{}')\nfull_key: {}",
                target,
                key,
                full_key
            );
        }
        chain = hydrate_expression(&target, registry).with_context(|| format!("full_key: {}", full_key))?;
    } else {
        bail!("Error locating target '{}'\nfull_key: {}", target, full_key);
    }
    Ok(chain)
}

/// Convert a YAML argument. Mappings with a `_target_` become nested chains.
fn to_param(value: &Yaml, registry: &TransformationRegistry, full_key: &str) -> Result<Param> {
    Ok(match value {
        Yaml::Null => Param::Null,
        Yaml::Bool(b) => Param::Bool(*b),
        Yaml::Number(n) => match n.as_i64() {
            Some(i) => Param::Int(i),
            None => Param::Float(
                n.as_f64()
                    .ok_or_else(|| anyhow!("Unsupported number {}\nfull_key: {}", n, full_key))?,
            ),
        },
        Yaml::String(s) => Param::Str(s.clone()),
        Yaml::Sequence(items) => Param::List(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| to_param(item, registry, &format!("{}.{}", full_key, i)))
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) if mapping.contains_key(TARGET_KEY) => {
            Param::Chain(instantiate_node(mapping, registry, full_key)?)
        }
        Yaml::Mapping(mapping) => {
            let mut entries = Vec::with_capacity(mapping.len());
            for (key, item) in mapping {
                let key = step_name(key)
                    .ok_or_else(|| anyhow!("Mapping keys must be strings, got {:?}\nfull_key: {}", key, full_key))?;
                let param = to_param(item, registry, &format!("{}.{}", full_key, key))?;
                entries.push((key, param));
            }
            Param::Map(entries)
        }
        Yaml::Tagged(tagged) => bail!("Unsupported YAML tag {}\nfull_key: {}", tagged.tag, full_key),
    })
}

fn yaml_kind(value: &Yaml) -> &'static str {
    match value {
        Yaml::Null => "null",
        Yaml::Bool(_) => "a boolean",
        Yaml::Number(_) => "a number",
        Yaml::String(_) => "a string",
        Yaml::Sequence(_) => "a list",
        Yaml::Mapping(_) => "a mapping",
        Yaml::Tagged(_) => "a tagged value",
    }
}
