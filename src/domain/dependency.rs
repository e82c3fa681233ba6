//! Pure dependency graph functions for topological sorting and cycle detection.

use crate::errors::CyclicDependencyError;
use crate::spec::FeatureSpec;
use anyhow::{bail, Result};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Fails on the first dependency that names no declared feature.
pub fn check_dependencies_exist(features: &[(String, FeatureSpec)]) -> Result<()> {
    let names: HashSet<&str> = features.iter().map(|(name, _)| name.as_str()).collect();
    for (name, spec) in features {
        for dep in &spec.dependencies {
            if !names.contains(dep.as_str()) {
                bail!("Feature '{}' depends on unknown feature '{}'", name, dep);
            }
        }
    }
    Ok(())
}

/// Detects cycles in the dependency graph.
///
/// Returns a list of cycles, each a list of feature names in the order they
/// were reached. If no cycles exist, returns an empty vector.
///
/// # Arguments
///
/// * `features` - Feature definitions to analyze
pub fn detect_cycles(features: &[(String, FeatureSpec)]) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    let adj_map = build_adjacency_map(features);

    for (name, _) in features {
        if !visited.contains(name) {
            if let Some(cycle) = detect_cycle_dfs(name, &adj_map, &mut visited, &mut rec_stack, &mut path) {
                cycles.push(cycle);
                // The aborted search leaves entries behind.
                rec_stack.clear();
                path.clear();
            }
        }
    }

    cycles
}

fn detect_cycle_dfs(
    node: &str,
    adj_map: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(deps) = adj_map.get(node) {
        for dep in deps {
            if !visited.contains(dep) {
                if let Some(cycle) = detect_cycle_dfs(dep, adj_map, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(dep) {
                let cycle_start = path.iter().position(|name| name == dep).unwrap_or(0);
                return Some(path[cycle_start..].to_vec());
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

fn build_adjacency_map(features: &[(String, FeatureSpec)]) -> HashMap<String, Vec<String>> {
    features
        .iter()
        .map(|(name, spec)| (name.clone(), spec.dependencies.clone()))
        .collect()
}

/// Orders features so every feature comes after its dependencies.
///
/// Kahn's algorithm; among features that are ready at the same time the one
/// declared first goes first, so the order is stable across runs.
///
/// # Errors
///
/// [`CyclicDependencyError`] if the dependencies form a cycle.
pub fn topological_sort(features: &[(String, FeatureSpec)]) -> Result<Vec<String>> {
    let cycles = detect_cycles(features);
    if let Some(cycle) = cycles.into_iter().next() {
        return Err(CyclicDependencyError { loop_features: cycle }.into());
    }

    let index: HashMap<&str, usize> = features
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.as_str(), i))
        .collect();

    // If A depends on B, then B -> A.
    let mut dependents_of: Vec<Vec<usize>> = vec![Vec::new(); features.len()];
    let mut in_degree: Vec<usize> = vec![0; features.len()];
    for (i, (_, spec)) in features.iter().enumerate() {
        for dep in &spec.dependencies {
            if let Some(&d) = index.get(dep.as_str()) {
                dependents_of[d].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();
    let mut result = Vec::with_capacity(features.len());

    while let Some(Reverse(node)) = ready.pop() {
        result.push(features[node].0.clone());
        for &dependent in &dependents_of[node] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if result.len() != features.len() {
        let loop_features = features
            .iter()
            .filter(|(name, _)| !result.contains(name))
            .map(|(name, _)| name.clone())
            .collect();
        return Err(CyclicDependencyError { loop_features }.into());
    }
    Ok(result)
}

/// Depth of every feature: 0 without dependencies, else one more than its
/// deepest dependency. Features of equal depth never depend on each other.
pub fn dependency_levels(features: &[(String, FeatureSpec)]) -> Result<HashMap<String, usize>> {
    let order = topological_sort(features)?;
    let specs: HashMap<&str, &FeatureSpec> = features.iter().map(|(n, s)| (n.as_str(), s)).collect();
    let mut levels: HashMap<String, usize> = HashMap::new();
    for name in order {
        let level = specs
            .get(name.as_str())
            .map(|spec| {
                spec.dependencies
                    .iter()
                    .filter_map(|dep| levels.get(dep))
                    .map(|level| level + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        levels.insert(name, level);
    }
    Ok(levels)
}

/// Features grouped by level, each group in declaration order.
pub fn level_groups(features: &[(String, FeatureSpec)]) -> Result<Vec<Vec<String>>> {
    let levels = dependency_levels(features)?;
    let depth = levels.values().max().map_or(0, |max| max + 1);
    let mut groups = vec![Vec::new(); depth];
    for (name, _) in features {
        if let Some(&level) = levels.get(name) {
            groups[level].push(name.clone());
        }
    }
    Ok(groups)
}
