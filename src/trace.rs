//! Records of executed transformation steps.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::array::Value;

/// Longest value preview kept for error reports.
const PREVIEW_LIMIT: usize = 120;

/// One executed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceNode {
    /// Step name as written in the definition, e.g. `halve`.
    pub transformation_name: String,
    /// Type of the transformation, e.g. `ScaleFeature`.
    pub transformation_type: String,
    pub start_time: f64,
    pub end_time: f64,
    pub time_taken: f64,
    pub shape: Vec<usize>,
    pub output_hash: String,
    #[serde(skip)]
    pub preview: String,
}

impl TraceNode {
    /// Record step `name` (of type `type_name`) that produced `output`
    /// between `start_time` and `end_time`.
    pub fn record(name: &str, type_name: &str, output: &Value, start_time: f64, end_time: f64) -> Self {
        Self {
            transformation_name: name.to_string(),
            transformation_type: type_name.to_string(),
            start_time,
            end_time,
            time_taken: end_time - start_time,
            shape: output.shape(),
            output_hash: output_hash(output),
            preview: preview(output),
        }
    }
}

/// Lowercase hex SHA-256 of the value's byte image.
pub fn output_hash(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.hash_bytes());
    hex::encode(hasher.finalize())
}

fn preview(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= PREVIEW_LIMIT {
        return text;
    }
    let cut: String = text.chars().take(PREVIEW_LIMIT).collect();
    format!("{}...", cut)
}

/// Current time as Unix seconds.
pub fn now_seconds() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
}

/// The steps of one feature computation, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformationChain {
    nodes: Vec<TraceNode>,
}

impl TransformationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: TraceNode) {
        self.nodes.push(node);
    }

    /// Append the steps of a nested chain.
    pub fn extend(&mut self, other: TransformationChain) {
        self.nodes.extend(other.nodes);
    }

    pub fn nodes(&self) -> &[TraceNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn last(&self) -> Option<&TraceNode> {
        self.nodes.last()
    }

    /// Nodes nested head first, each holding the rest under `next`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut next = serde_json::Value::Null;
        for node in self.nodes.iter().rev() {
            let mut json = serde_json::to_value(node).unwrap_or_default();
            if let serde_json::Value::Object(map) = &mut json {
                map.insert("next".to_string(), next);
            }
            next = json;
        }
        next
    }

    /// One line per chain, e.g. `(Transformation: scale, Value: [2.0]) -> ...`.
    pub fn render(&self) -> String {
        self.nodes
            .iter()
            .map(|n| format!("(Transformation: {}, Value: {})", n.transformation_name, n.preview))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
