//! `fabrica compute`: run every feature of a definition file.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fabrica::array::Value;
use fabrica::cli::DefinitionArgs;
use fabrica::config::{Config, ExecutionConfig};
use fabrica::manager::{FeatureManager, FeatureResults};
use fabrica::trace::now_seconds;
use fabrica::ui::{self, colors, format};

const VALUE_WIDTH: usize = 60;

pub struct ComputeOptions {
    pub definitions: DefinitionArgs,
    pub data: Option<PathBuf>,
    pub json: bool,
    pub parallel: bool,
    pub workers: Option<usize>,
    pub trace: bool,
    pub features: Vec<String>,
}

/// Read a JSON object of `feature name -> value`.
pub fn read_input_data(path: &Path) -> Result<HashMap<String, Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input data from {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let serde_json::Value::Object(entries) = json else {
        bail!("Input data in {} must be a JSON object of feature names to values", path.display());
    };

    let mut inputs = HashMap::with_capacity(entries.len());
    for (name, value) in entries {
        let value = Value::from_json(&value).with_context(|| format!("Invalid input for feature '{}'", name))?;
        inputs.insert(name, value);
    }
    Ok(inputs)
}

fn execution_for(config: &Config, options: &ComputeOptions) -> ExecutionConfig {
    let mut execution = config.execution;
    if options.parallel {
        execution.parallel_execution = true;
    }
    if let Some(workers) = options.workers {
        execution.max_workers = workers;
    }
    execution
}

pub fn cmd_compute(config: &Config, options: ComputeOptions) -> Result<()> {
    let mut manager = super::load_manager(config, &options.definitions, execution_for(config, &options))?;

    for name in &options.features {
        if manager.feature(name).is_none() {
            bail!("Unknown feature '{}'", name);
        }
    }

    let inputs = match &options.data {
        Some(path) => read_input_data(path)?,
        None => HashMap::new(),
    };
    for name in inputs.keys() {
        if manager.feature(name).is_none() {
            log::warn!("Input for '{}' does not match any feature and is ignored", name);
        }
    }

    let started = now_seconds();
    let results = manager.compute_features(&inputs)?;
    let elapsed = now_seconds() - started;

    let selected: Vec<&str> = if options.features.is_empty() {
        manager.order().iter().map(String::as_str).collect()
    } else {
        options.features.iter().map(String::as_str).collect()
    };

    if options.json {
        print_json(&manager, &results, &selected, options.trace)?;
    } else {
        print_table(&manager, &results, &selected, options.trace)?;
        if !ui::is_quiet() {
            println!(
                "\n{} Computed {} features in {}",
                "✓".green(),
                results.len(),
                format::duration(elapsed)
            );
        }
    }
    Ok(())
}

fn print_json(manager: &FeatureManager, results: &FeatureResults, selected: &[&str], trace: bool) -> Result<()> {
    let values: serde_json::Map<String, serde_json::Value> = selected
        .iter()
        .filter_map(|name| results.get(name).map(|v| (name.to_string(), v.to_json())))
        .collect();
    let output = if trace {
        let traces: serde_json::Map<String, serde_json::Value> = selected
            .iter()
            .filter_map(|name| {
                manager
                    .feature(name)
                    .map(|f| (name.to_string(), f.transformation_chain().to_json()))
            })
            .collect();
        serde_json::json!({ "values": values, "traces": traces })
    } else {
        serde_json::Value::Object(values)
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_table(manager: &FeatureManager, results: &FeatureResults, selected: &[&str], trace: bool) -> Result<()> {
    let name_width = selected.iter().map(|n| n.chars().count()).max().unwrap_or(0);
    let type_width = selected
        .iter()
        .filter_map(|name| manager.feature(name))
        .map(|f| f.data_type().to_string().len())
        .max()
        .unwrap_or(0);

    for name in selected {
        let (Some(feature), Some(value)) = (manager.feature(name), results.get(name)) else {
            continue;
        };
        let dtype = feature.data_type();
        let padding = " ".repeat(type_width.saturating_sub(dtype.to_string().len()));
        println!(
            "{} {}  {}{}  {}",
            ui::feature_icon(feature.is_independent()),
            colors::identifier(&format::pad(name, name_width)),
            ui::dtype_label(&dtype),
            padding,
            format::truncate(&value.to_string(), VALUE_WIDTH)
        );
        if trace && !feature.transformation_chain().is_empty() {
            let chain = serde_json::to_string(&feature.transformation_chain().to_json())?;
            println!("    {}", colors::secondary(&chain));
        }
    }
    Ok(())
}
