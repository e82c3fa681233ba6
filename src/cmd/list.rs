//! `fabrica list`: show the features of a definition file.

use anyhow::Result;

use fabrica::cli::DefinitionArgs;
use fabrica::config::Config;
use fabrica::spec::{definition_files, load_feature_file, FeatureSpec};
use fabrica::ui::{self, colors, format};

const DESCRIPTION_WIDTH: usize = 50;

pub fn cmd_list(config: &Config, definitions: &DefinitionArgs, group: Option<&str>, files: bool) -> Result<()> {
    let (config_path, config_name) = super::resolve_definitions(config, definitions);

    if files {
        let stems = definition_files(&config_path)?;
        if stems.is_empty() && !ui::is_quiet() {
            println!("No definition files in {}", config_path.display());
        }
        for stem in stems {
            println!("{}", stem);
        }
        return Ok(());
    }

    let specs = load_feature_file(&config_path, &config_name)?;
    let shown: Vec<&(String, FeatureSpec)> = specs
        .iter()
        .filter(|(_, spec)| group.map_or(true, |g| spec.group.as_deref() == Some(g)))
        .collect();

    if shown.is_empty() {
        if !ui::is_quiet() {
            match group {
                Some(g) => println!("No features in group '{}'", g),
                None => println!("No features defined"),
            }
        }
        return Ok(());
    }

    let name_width = shown.iter().map(|(n, _)| n.chars().count()).max().unwrap_or(0);
    let type_width = shown.iter().map(|(_, s)| s.data_type.len()).max().unwrap_or(0);
    for (name, spec) in &shown {
        let mut line = format!(
            "{} {}  {}  {}",
            ui::feature_icon(spec.dependencies.is_empty()),
            colors::identifier(&format::pad(name, name_width)),
            format::pad(&spec.data_type, type_width),
            format::truncate(&spec.description, DESCRIPTION_WIDTH)
        );
        if let Some(g) = &spec.group {
            line.push_str(&format!(" {}", colors::secondary(&format!("[{}]", g))));
        }
        if !spec.dependencies.is_empty() {
            line.push_str(&format!(" {}", colors::secondary(&format!("<- {}", spec.dependencies.join(", ")))));
        }
        println!("{}", line);
    }

    if !ui::is_quiet() {
        println!("\n{} features", shown.len());
    }
    Ok(())
}
