//! Reading feature definition files.
//!
//! A definition file maps feature names to specs. An optional top-level
//! `defaults:` list names sibling files (by stem) whose features are loaded
//! first; the including file's features override same-named ones.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{FeatureSpec, FeatureSpecs};

const DEFAULTS_KEY: &str = "defaults";
const SELF_ENTRY: &str = "_self_";

/// Resolve `<config_path>/<config_name>` trying `.yaml` then `.yml`.
pub fn feature_file_path(config_path: &Path, config_name: &str) -> Result<PathBuf> {
    let stem = config_name
        .strip_suffix(".yaml")
        .or_else(|| config_name.strip_suffix(".yml"))
        .unwrap_or(config_name);
    for extension in ["yaml", "yml"] {
        let candidate = config_path.join(format!("{}.{}", stem, extension));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    let available = definition_files(config_path).unwrap_or_default();
    if available.is_empty() {
        bail!(
            "Feature definition file '{}' not found in {} (tried .yaml and .yml)",
            stem,
            config_path.display()
        )
    }
    bail!(
        "Feature definition file '{}' not found in {} (available: {})",
        stem,
        config_path.display(),
        available.join(", ")
    )
}

/// Stems of the `.yaml`/`.yml` files in `config_path`, sorted.
pub fn definition_files(config_path: &Path) -> Result<Vec<String>> {
    let mut stems = Vec::new();
    for extension in ["yaml", "yml"] {
        let pattern = config_path.join(format!("*.{}", extension));
        let pattern = pattern
            .to_str()
            .ok_or_else(|| anyhow!("Non UTF-8 path: {}", config_path.display()))?;
        for entry in glob::glob(pattern).context("Invalid glob pattern")?.flatten() {
            if let Some(stem) = entry.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
    }
    stems.sort();
    stems.dedup();
    Ok(stems)
}

/// Load `<config_path>/<config_name>.yaml`, resolving `defaults:` includes.
pub fn load_feature_file(config_path: &Path, config_name: &str) -> Result<FeatureSpecs> {
    let mut chain = Vec::new();
    let specs = load_recursive(config_path, config_name, &mut chain)?;
    log::info!(
        "Loaded {} feature definitions from {}/{}",
        specs.len(),
        config_path.display(),
        config_name
    );
    Ok(specs)
}

fn load_recursive(config_path: &Path, config_name: &str, chain: &mut Vec<String>) -> Result<FeatureSpecs> {
    let path = feature_file_path(config_path, config_name)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(config_name)
        .to_string();
    if chain.contains(&stem) {
        chain.push(stem);
        bail!("Circular defaults include: {}", chain.join(" -> "));
    }
    chain.push(stem);

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read feature definitions from {}", path.display()))?;
    let (defaults, own) =
        parse_document(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut merged = FeatureSpecs::new();
    for include in &defaults {
        log::debug!("{} includes {}", path.display(), include);
        let included = load_recursive(config_path, include, chain)?;
        merge_into(&mut merged, included);
    }
    merge_into(&mut merged, own);

    chain.pop();
    Ok(merged)
}

fn merge_into(target: &mut FeatureSpecs, source: FeatureSpecs) {
    for (name, spec) in source {
        match target.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => target.push((name, spec)),
        }
    }
}

/// Parse a definition document held in memory. `defaults:` includes need a
/// directory to resolve against, so they are rejected here.
pub fn parse_feature_specs(content: &str) -> Result<FeatureSpecs> {
    let (defaults, specs) = parse_document(content)?;
    if !defaults.is_empty() {
        bail!("'defaults' includes can only be used when loading definitions from a file");
    }
    Ok(specs)
}

fn parse_document(content: &str) -> Result<(Vec<String>, FeatureSpecs)> {
    let document: serde_yaml::Value =
        serde_yaml::from_str(content).context("Invalid YAML in feature definitions")?;
    let mapping = match document {
        serde_yaml::Value::Null => return Ok((Vec::new(), Vec::new())),
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => bail!("Feature definitions must be a mapping of feature names to specs"),
    };

    let mut defaults = Vec::new();
    let mut specs = FeatureSpecs::new();
    for (key, value) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| anyhow!("Feature names must be strings, got {:?}", key))?
            .to_string();
        if name == DEFAULTS_KEY {
            defaults = parse_defaults(value)?;
            continue;
        }
        let spec: FeatureSpec = serde_yaml::from_value(value)
            .with_context(|| format!("Invalid definition for feature '{}'", name))?;
        specs.push((name, spec));
    }
    Ok((defaults, specs))
}

fn parse_defaults(value: serde_yaml::Value) -> Result<Vec<String>> {
    let entries = match value {
        serde_yaml::Value::Sequence(entries) => entries,
        serde_yaml::Value::Null => return Ok(Vec::new()),
        _ => bail!("'defaults' must be a list of definition file names"),
    };
    let mut names = Vec::new();
    for entry in entries {
        let name = entry
            .as_str()
            .ok_or_else(|| anyhow!("'defaults' entries must be file names, got {:?}", entry))?;
        if name != SELF_ENTRY {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
