//! Feature definitions: the YAML schema and how definition files are loaded.

mod load;

pub use load::{definition_files, feature_file_path, load_feature_file, parse_feature_specs};

use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::array::{is_valid_dtype, DType};

/// Feature definitions in declaration order.
pub type FeatureSpecs = Vec<(String, FeatureSpec)>;

/// One feature as declared in a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSpec {
    pub description: String,
    pub data_type: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: Vec<String>,
    /// Raw `_target_` configuration, instantiated by [`crate::instantiate`].
    #[serde(default)]
    pub transformation: Option<serde_yaml::Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl FeatureSpec {
    /// Check the field constraints serde cannot express.
    pub fn validate(&self, name: &str) -> Result<()> {
        if !is_valid_feature_name(name) {
            bail!(
                "Invalid feature name '{}': names must start with a letter or underscore and contain only letters, digits and underscores",
                name
            );
        }
        if self.description.chars().count() < 5 {
            bail!(
                "Feature '{}': description must be at least 5 characters long",
                name
            );
        }
        if !is_valid_dtype(&self.data_type) {
            bail!(
                "Feature '{}': Invalid data_type specified: {}",
                name,
                self.data_type
            );
        }
        for dependency in &self.dependencies {
            if dependency == name {
                bail!("Feature '{}' cannot depend on itself", name);
            }
        }
        Ok(())
    }

    pub fn dtype(&self) -> Result<DType> {
        DType::parse(&self.data_type)
    }

    /// Whether a transformation chain is declared.
    pub fn has_transformation(&self) -> bool {
        match &self.transformation {
            None | Some(serde_yaml::Value::Null) => false,
            Some(serde_yaml::Value::Mapping(m)) => !m.is_empty(),
            Some(serde_yaml::Value::Sequence(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_feature_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
