//! Rendering the feature dependency graph as Graphviz DOT or as ASCII boxes.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::domain::dependency::dependency_levels;
use crate::spec::FeatureSpec;

/// How much to show inside each ASCII box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphDetail {
    /// Feature names only
    #[default]
    Minimal,
    /// Names plus data type and group
    Types,
}

fn quote(id: &str) -> String {
    format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Graphviz source: one node per feature, an edge from each dependency to
/// its dependent.
pub fn to_dot(features: &[(String, FeatureSpec)]) -> String {
    let mut out = String::from("// Feature Dependencies\ndigraph {\n");
    for (name, _) in features {
        out.push_str(&format!("\t{}\n", quote(name)));
    }
    for (name, spec) in features {
        for dep in &spec.dependencies {
            out.push_str(&format!("\t{} -> {}\n", quote(dep), quote(name)));
        }
    }
    out.push_str("}\n");
    out
}

/// Write `content` to `path` through a temp file in the same directory.
pub fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())
        .context("Failed to write dependency graph")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to save dependency graph to {}", path.display()))?;
    Ok(())
}

/// Box drawing of the graph, one row of boxes per dependency level.
///
/// Returns the drawing plus the roots (features without dependencies) and
/// leaves (features nothing depends on).
pub fn to_ascii(features: &[(String, FeatureSpec)], detail: GraphDetail) -> Result<(String, Vec<String>, Vec<String>)> {
    let roots: Vec<String> = features
        .iter()
        .filter(|(_, spec)| spec.dependencies.is_empty())
        .map(|(name, _)| name.clone())
        .collect();

    let mut has_dependents: HashMap<&str, bool> = HashMap::new();
    for (_, spec) in features {
        for dep in &spec.dependencies {
            has_dependents.insert(dep.as_str(), true);
        }
    }
    let leaves: Vec<String> = features
        .iter()
        .filter(|(name, _)| !has_dependents.contains_key(name.as_str()))
        .map(|(name, _)| name.clone())
        .collect();

    if features.is_empty() {
        return Ok(("(No features to display)".to_string(), roots, leaves));
    }

    let levels = dependency_levels(features)?;
    let max_level = levels.values().max().copied().unwrap_or(0);
    let mut rows: Vec<Vec<&(String, FeatureSpec)>> = vec![Vec::new(); max_level + 1];
    for feature in features {
        let level = levels.get(&feature.0).copied().unwrap_or(0);
        rows[level].push(feature);
    }

    let mut output = String::new();
    for (level, row) in rows.iter().enumerate() {
        output.push_str(&render_boxes(row, detail));
        if let Some(next) = rows.get(level + 1) {
            output.push_str(&render_connections(row, next));
        }
    }
    Ok((output, roots, leaves))
}

fn render_boxes(row: &[&(String, FeatureSpec)], detail: GraphDetail) -> String {
    let boxes: Vec<Vec<String>> = row.iter().map(|(name, spec)| render_box(name, spec, detail)).collect();
    let height = boxes.iter().map(Vec::len).max().unwrap_or(0);

    let mut result = String::new();
    for line in 0..height {
        for (i, lines) in boxes.iter().enumerate() {
            if i > 0 {
                result.push_str("     ");
            }
            let width = lines.first().map_or(0, |l| l.chars().count());
            match lines.get(line) {
                Some(text) => result.push_str(text),
                None => result.push_str(&" ".repeat(width)),
            }
        }
        result.push('\n');
    }
    result
}

fn render_box(name: &str, spec: &FeatureSpec, detail: GraphDetail) -> Vec<String> {
    let mut content = vec![name.to_string()];
    if detail == GraphDetail::Types {
        content.push(truncate(&spec.data_type, 18));
        if let Some(group) = &spec.group {
            content.push(truncate(&format!("[{}]", group), 18));
        }
    }
    let inner = content.iter().map(|c| c.chars().count()).max().unwrap_or(0).max(5);

    let mut lines = Vec::with_capacity(content.len() + 2);
    lines.push(format!("┌{}┐", "─".repeat(inner + 2)));
    for text in &content {
        lines.push(format!("│ {:^width$} │", text, width = inner));
    }
    lines.push(format!("└{}┘", "─".repeat(inner + 2)));
    lines
}

/// One arrow line per edge into the next level.
fn render_connections(from: &[&(String, FeatureSpec)], to: &[&(String, FeatureSpec)]) -> String {
    let mut out = String::new();
    for (name, spec) in to {
        let sources: Vec<&str> = spec
            .dependencies
            .iter()
            .filter(|dep| from.iter().any(|(n, _)| n == *dep))
            .map(String::as_str)
            .collect();
        if !sources.is_empty() {
            out.push_str(&format!("  {} ──▶ {}\n", sources.join(", "), name));
        }
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 1).collect();
        format!("{}…", truncated)
    }
}
