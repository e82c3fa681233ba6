//! Builders for feature definition documents.

/// Builds one feature entry of a definition file.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    name: String,
    description: String,
    data_type: String,
    group: Option<String>,
    dependencies: Vec<String>,
    steps: Vec<(String, String)>,
}

impl FeatureBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Feature {}", name),
            data_type: "float64".to_string(),
            group: None,
            dependencies: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn data_type(mut self, data_type: &str) -> Self {
        self.data_type = data_type.to_string();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn depends_on(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Add a step whose body is already-indented YAML, e.g.
    /// `"_target_: scale\nfactor: 2"`.
    pub fn step(mut self, name: &str, body: &str) -> Self {
        self.steps.push((name.to_string(), body.to_string()));
        self
    }

    pub fn build(&self) -> String {
        let mut out = format!(
            "{}:\n  description: {}\n  data_type: {}\n",
            self.name, self.description, self.data_type
        );
        if let Some(group) = &self.group {
            out.push_str(&format!("  group: {}\n", group));
        }
        if !self.dependencies.is_empty() {
            out.push_str(&format!("  dependencies: [{}]\n", self.dependencies.join(", ")));
        }
        if !self.steps.is_empty() {
            out.push_str("  transformation:\n");
            for (name, body) in &self.steps {
                out.push_str(&format!("    {}:\n", name));
                for line in body.lines() {
                    out.push_str(&format!("      {}\n", line));
                }
            }
        }
        out
    }
}

/// Concatenate feature entries into one document.
pub fn definitions(features: &[FeatureBuilder]) -> String {
    features.iter().map(FeatureBuilder::build).collect::<Vec<_>>().join("")
}
