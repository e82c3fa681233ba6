//! Command handlers for the fabrica CLI

use anyhow::Result;
use std::path::PathBuf;

use fabrica::cli::DefinitionArgs;
use fabrica::config::{Config, ExecutionConfig};
use fabrica::manager::FeatureManager;

pub mod compute;
pub mod graph;
pub mod list;
pub mod transforms;
pub mod validate;

/// Definition directory and file name: flags first, then the config file.
pub fn resolve_definitions(config: &Config, args: &DefinitionArgs) -> (PathBuf, String) {
    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(|| config.features_dir());
    let config_name = args
        .config_name
        .clone()
        .unwrap_or_else(|| config.features.config_name.clone());
    (config_path, config_name)
}

/// Load and compile the selected definition file.
pub fn load_manager(config: &Config, args: &DefinitionArgs, execution: ExecutionConfig) -> Result<FeatureManager> {
    let (config_path, config_name) = resolve_definitions(config, args);
    FeatureManager::builder()
        .execution(execution)
        .casting(config.validation.casting)
        .load(&config_path, &config_name)
}
