//! Default values and configuration structs with default implementations.

use serde::{Deserialize, Serialize};

use crate::array::Casting;

/// Macro to generate default functions for serde attributes
macro_rules! default_fn {
    ($name:ident, $type:ty, $value:expr) => {
        pub(crate) fn $name() -> $type {
            $value
        }
    };
}

default_fn!(default_config_path, String, "features".to_string());
default_fn!(default_config_name, String, "features".to_string());
default_fn!(default_log_level, String, "warn".to_string());

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,
}

/// Where feature definitions live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    /// Directory holding definition files (`~` is expanded)
    #[serde(default = "default_config_path")]
    pub config_path: String,
    /// File stem of the definition file to load
    #[serde(default = "default_config_name")]
    pub config_name: String,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            config_name: default_config_name(),
        }
    }
}

/// How features are scheduled when computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Run features of the same dependency level concurrently
    #[serde(default)]
    pub parallel_execution: bool,
    /// Upper bound on concurrent features; 0 uses the available parallelism
    #[serde(default)]
    pub max_workers: usize,
}

impl ExecutionConfig {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel(max_workers: usize) -> Self {
        Self {
            parallel_execution: true,
            max_workers,
        }
    }

    /// Worker count with 0 resolved against the machine.
    pub fn workers(&self) -> usize {
        if self.max_workers > 0 {
            return self.max_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// How computed values are checked against declared types.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub casting: Casting,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
