//! Configuration management for fabrica projects.
//!
//! Configuration is YAML frontmatter at the top of a markdown file. A global
//! file is merged under the project file; project values win.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

pub use defaults::*;

pub const PROJECT_CONFIG_PATH: &str = ".fabrica/config.md";

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with full merge semantics.
    /// Merge order (later overrides earlier):
    /// 1. Global config (~/.config/fabrica/config.md)
    /// 2. Project config (.fabrica/config.md)
    ///
    /// Either file may be missing.
    pub fn load() -> Result<Self> {
        Self::load_merged_from(global_config_path().as_deref(), Path::new(PROJECT_CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config = PartialConfig::parse(content)?.merge_over(PartialConfig::default());
        config.validate()?;
        Ok(config)
    }

    /// Load merged configuration from the given global and project paths.
    pub fn load_merged_from(global_path: Option<&Path>, project_path: &Path) -> Result<Self> {
        let global_config = global_path
            .filter(|p| p.exists())
            .map(PartialConfig::load_from)
            .transpose()?
            .unwrap_or_default();

        let project_config = Some(project_path)
            .filter(|p| p.exists())
            .map(PartialConfig::load_from)
            .transpose()?
            .unwrap_or_default();

        let config = project_config.merge_over(global_config);
        config.validate()?;
        log::debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    /// Directory of feature definitions with `~` expanded.
    pub fn features_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.features.config_path).to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            bail!(
                "Invalid logging.level '{}'. Expected one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            );
        }
        if self.features.config_name.trim().is_empty() {
            bail!("features.config_name must not be empty");
        }
        Ok(())
    }
}

/// Returns the path to the global config file at ~/.config/fabrica/config.md
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/fabrica/config.md"))
}

/// Split `---`-delimited YAML frontmatter from the markdown body.
pub fn split_frontmatter(content: &str) -> (Option<String>, &str) {
    let content = content.trim_start();

    if !content.starts_with("---") {
        return (None, content);
    }

    let after_first = &content[3..];
    if let Some(end_pos) = after_first.find("\n---") {
        let frontmatter = after_first[..end_pos].trim();
        let body_start = 3 + end_pos + 4;
        let body = if body_start < content.len() {
            content[body_start..].trim_start_matches('\n')
        } else {
            ""
        };
        (Some(frontmatter.to_string()), body)
    } else {
        (None, content)
    }
}

/// Partial config for merging - all fields optional
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    pub project: Option<PartialProjectConfig>,
    pub features: Option<PartialFeaturesConfig>,
    pub execution: Option<PartialExecutionConfig>,
    pub validation: Option<ValidationConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct PartialProjectConfig {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PartialFeaturesConfig {
    pub config_path: Option<String>,
    pub config_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PartialExecutionConfig {
    pub parallel_execution: Option<bool>,
    pub max_workers: Option<usize>,
}

impl PartialConfig {
    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let (frontmatter, _body) = split_frontmatter(content);
        let frontmatter = frontmatter.context("Failed to extract frontmatter from config")?;
        if frontmatter.is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&frontmatter).context("Failed to parse config frontmatter")
    }

    /// Merge this config over `base`, returning the merged result.
    /// Values from `self` take precedence.
    fn merge_over(self, base: PartialConfig) -> Config {
        let project = self.project.unwrap_or_default();
        let base_project = base.project.unwrap_or_default();
        let features = self.features.unwrap_or_default();
        let base_features = base.features.unwrap_or_default();
        let execution = self.execution.unwrap_or_default();
        let base_execution = base.execution.unwrap_or_default();

        Config {
            project: ProjectConfig {
                name: project.name.or(base_project.name).unwrap_or_default(),
            },
            features: FeaturesConfig {
                config_path: features
                    .config_path
                    .or(base_features.config_path)
                    .unwrap_or_else(defaults::default_config_path),
                config_name: features
                    .config_name
                    .or(base_features.config_name)
                    .unwrap_or_else(defaults::default_config_name),
            },
            execution: ExecutionConfig {
                parallel_execution: execution
                    .parallel_execution
                    .or(base_execution.parallel_execution)
                    .unwrap_or_default(),
                max_workers: execution
                    .max_workers
                    .or(base_execution.max_workers)
                    .unwrap_or_default(),
            },
            validation: self.validation.or(base.validation).unwrap_or_default(),
            logging: self.logging.or(base.logging).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests;
