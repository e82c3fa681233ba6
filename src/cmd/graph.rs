//! `fabrica graph`: draw or save the dependency graph.

use anyhow::Result;
use colored::Colorize;
use std::collections::HashSet;
use std::path::PathBuf;

use fabrica::cli::{DefinitionArgs, GraphDetailArg, GraphFormat};
use fabrica::config::Config;
use fabrica::manager::FeatureManager;
use fabrica::ui::{self, colors};

pub fn cmd_graph(
    config: &Config,
    definitions: &DefinitionArgs,
    format: GraphFormat,
    detail: GraphDetailArg,
    output: Option<PathBuf>,
) -> Result<()> {
    let manager = super::load_manager(config, definitions, config.execution)?;

    if let Some(path) = output {
        let saved = manager.save_dependency_graph(path)?;
        if !ui::is_quiet() {
            println!("{} Dependency graph saved as {}", "✓".green(), saved.display());
        }
        return Ok(());
    }

    match format {
        GraphFormat::Dot => print!("{}", manager.dependency_graph_dot()),
        GraphFormat::Ascii => {
            println!("{}", manager.dependency_graph_ascii(detail.into())?);
            if !ui::is_quiet() && !manager.features().is_empty() {
                print_summary(&manager);
            }
        }
    }
    Ok(())
}

fn print_summary(manager: &FeatureManager) {
    let roots: Vec<&str> = manager
        .independent_features()
        .into_iter()
        .map(|f| f.name())
        .collect();
    let depended_on: HashSet<&str> = manager
        .features()
        .iter()
        .flat_map(|f| f.dependencies().iter().map(String::as_str))
        .collect();
    let leaves: Vec<&str> = manager
        .features()
        .iter()
        .map(|f| f.name())
        .filter(|name| !depended_on.contains(name))
        .collect();

    println!("{}", colors::heading("Summary"));
    println!("  Features: {}", manager.features().len());
    println!("  Levels:   {}", manager.levels().len());
    println!("  Roots:    {}", colors::identifier(&roots.join(", ")));
    println!("  Leaves:   {}", colors::identifier(&leaves.join(", ")));
}
