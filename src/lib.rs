//! # Fabrica - Declarative Feature Engineering
//!
//! Fabrica computes named features from input data. Each feature is declared
//! in a YAML definition file with a data type, the features it depends on,
//! and a chain of transformations.
//!
//! ## Overview
//!
//! A [`manager::FeatureManager`] loads a definition file, orders features so
//! every feature follows its dependencies, and computes them one level at a
//! time. Transformations are looked up by `_target_` name in a
//! [`transform::TransformationRegistry`], or written as arithmetic
//! expressions such as `0.5*(price + tax)`.
//!
//! ## Core Concepts
//!
//! - **Features**: A name, a declared data type and a transformation chain
//! - **Promises**: Intermediate step outputs other features reference as `feature:step`
//! - **Traces**: A record of every executed step with timing and an output hash
//!
//! ## Modules
//!
//! - [`array`] - N-dimensional typed arrays with numpy-style dtypes
//! - [`spec`] - Feature definition schema and file loading
//! - [`instantiate`] - Turning `_target_` configuration into transformation chains
//! - [`transform`] - The transformation trait and built-in catalogue
//! - [`manager`] - Dependency ordering and computation
//! - [`config`] - Configuration management for fabrica projects
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use fabrica::array::{Array, Value};
//! use fabrica::manager::FeatureManager;
//!
//! // Load features/prices.yaml
//! let mut manager = FeatureManager::new("features", "prices")
//!     .expect("Failed to load feature definitions");
//!
//! let mut inputs: HashMap<String, Value> = HashMap::new();
//! inputs.insert("price".to_string(), Array::from_f64(vec![9.5, 12.0]).into());
//!
//! let results = manager.compute_features(&inputs).expect("Computation failed");
//! for (name, value) in results.iter() {
//!     println!("{} = {}", name, value);
//! }
//! ```

pub mod array;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod feature;
pub mod graph;
pub mod instantiate;
pub mod logging;
pub mod manager;
pub mod promise;
pub mod spec;
pub mod trace;
pub mod transform;
pub mod ui;
pub mod validation;
pub mod value;
