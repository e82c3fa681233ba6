//! Checking feature definitions without computing anything.
//!
//! Collects every problem in a definition file instead of stopping at the
//! first one, so `fabrica validate` can report them together.

use std::collections::HashSet;
use std::path::Path;

use crate::array::Casting;
use crate::domain::dependency::detect_cycles;
use crate::feature::Feature;
use crate::manager::FeatureManager;
use crate::spec::{load_feature_file, FeatureSpecs};
use crate::transform::TransformationRegistry;

/// What part of a definition an issue concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCategory {
    /// File loading and per-feature fields
    Definition,
    /// References between features
    Dependency,
    /// Instantiating and compiling transformation chains
    Transformation,
}

impl std::fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definition => write!(f, "Definition"),
            Self::Dependency => write!(f, "Dependency"),
            Self::Transformation => write!(f, "Transformation"),
        }
    }
}

/// Severity level for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: ValidationCategory,
    /// Feature name, or the file name for file-level problems
    pub item_id: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        category: ValidationCategory,
        item_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            item_id: item_id.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Outcome of validating one definition file.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Features examined
    pub total: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Features with at least one error.
    pub fn failed(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.item_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

/// Load `<config_path>/<config_name>` and validate it.
///
/// A file that cannot be loaded yields a single error issue.
pub fn validate_definitions(
    config_path: &Path,
    config_name: &str,
    registry: &TransformationRegistry,
    casting: Casting,
) -> ValidationReport {
    match load_feature_file(config_path, config_name) {
        Ok(specs) => validate_specs(&specs, registry, casting),
        Err(e) => {
            let mut report = ValidationReport::default();
            report.add_issue(
                ValidationIssue::new(
                    Severity::Error,
                    ValidationCategory::Definition,
                    config_name,
                    format!("{:#}", e),
                )
                .with_suggestion("Check the features directory and the definition file name"),
            );
            report
        }
    }
}

/// Validate definitions already in memory.
///
/// # Arguments
///
/// * `specs` - Features in declaration order
/// * `registry` - Where `_target_`s are looked up
/// * `casting` - Casting rule features are built with
pub fn validate_specs(specs: &FeatureSpecs, registry: &TransformationRegistry, casting: Casting) -> ValidationReport {
    let mut report = ValidationReport {
        total: specs.len(),
        issues: Vec::new(),
    };
    let names: HashSet<&str> = specs.iter().map(|(name, _)| name.as_str()).collect();

    let mut well_formed = Vec::with_capacity(specs.len());
    for (name, spec) in specs {
        if let Err(e) = spec.validate(name) {
            report.add_issue(ValidationIssue::new(
                Severity::Error,
                ValidationCategory::Definition,
                name,
                e.to_string(),
            ));
            continue;
        }
        well_formed.push((name, spec));

        let mut seen = HashSet::new();
        for dependency in &spec.dependencies {
            if !names.contains(dependency.as_str()) {
                report.add_issue(
                    ValidationIssue::new(
                        Severity::Error,
                        ValidationCategory::Dependency,
                        name,
                        format!("Depends on unknown feature '{}'", dependency),
                    )
                    .with_suggestion(format!("Define '{}' or remove it from dependencies", dependency)),
                );
            }
            if !seen.insert(dependency.as_str()) {
                report.add_issue(ValidationIssue::new(
                    Severity::Warning,
                    ValidationCategory::Dependency,
                    name,
                    format!("Dependency '{}' is listed more than once", dependency),
                ));
            }
        }

        if !spec.dependencies.is_empty() && !spec.has_transformation() {
            report.add_issue(
                ValidationIssue::new(
                    Severity::Warning,
                    ValidationCategory::Transformation,
                    name,
                    "Has dependencies but no transformation",
                )
                .with_suggestion("Its value must then be supplied as input data"),
            );
        }
    }

    for cycle in detect_cycles(specs) {
        let first = cycle.first().cloned().unwrap_or_default();
        report.add_issue(
            ValidationIssue::new(
                Severity::Error,
                ValidationCategory::Dependency,
                first,
                format!("Cyclic dependency: {}", cycle.join(" -> ")),
            )
            .with_suggestion("Feature dependencies must be acyclic"),
        );
    }

    for (name, spec) in &well_formed {
        if let Err(e) = Feature::new(name, (*spec).clone(), registry, casting) {
            report.add_issue(ValidationIssue::new(
                Severity::Error,
                ValidationCategory::Transformation,
                *name,
                format!("{:#}", e),
            ));
        }
    }

    // Compiling binds operands and stage references across features, which
    // only makes sense once each feature stands on its own.
    if report.is_valid() {
        let built = FeatureManager::builder()
            .registry(registry.clone())
            .casting(casting)
            .from_specs(specs.clone());
        if let Err(e) = built {
            report.add_issue(ValidationIssue::new(
                Severity::Error,
                ValidationCategory::Transformation,
                "(compile)",
                format!("{:#}", e),
            ));
        }
    }

    report
}
