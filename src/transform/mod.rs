//! Transformations: the steps a feature's value flows through.
//!
//! Every step implements [`Transformation`]. Steps are created from
//! `_target_` configuration through the [`TransformationRegistry`] and
//! strung together into a [`Chain`].

pub mod aggregate;
pub mod chain;
pub mod context;
pub mod datetime;
pub mod generic;
pub mod importer;
pub mod math;
pub mod operand;
pub mod registry;
pub mod string;

pub use chain::{Chain, ChainRun};
pub use context::{CompileContext, ExecContext};
pub use operand::Operand;
pub use registry::{Registration, TransformationRegistry};

use anyhow::{anyhow, Result};
use std::fmt;

use crate::array::{Array, Value};

/// One step of a feature's transformation chain.
///
/// Implementations are built once per feature, compiled against that feature's
/// dependencies and then executed any number of times.
pub trait Transformation: Send + Sync + fmt::Debug {
    /// Type name, e.g. `ScaleFeature`. Traces record it next to the step name.
    fn name(&self) -> &str;

    /// Whether `execute` receives the previous step's value.
    fn expects_data(&self) -> bool;

    /// Bind operands to the owning feature's dependencies.
    ///
    /// The default does nothing; steps holding [`Operand`]s compile them here.
    fn compile(&mut self, _ctx: &mut CompileContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Run the step. `data` is `Some` exactly when [`expects_data`] is true.
    ///
    /// [`expects_data`]: Transformation::expects_data
    fn execute(&self, data: Option<Value>, ctx: &ExecContext<'_>) -> Result<Value>;
}

/// Unwrap the incoming value of a step that expects data.
pub(crate) fn required_data(data: Option<Value>, step: &str) -> Result<Value> {
    data.ok_or_else(|| anyhow!("{} expects data but none was provided", step))
}

/// Unwrap the incoming value as an array.
pub(crate) fn required_array(data: Option<Value>, step: &str) -> Result<Array> {
    required_data(data, step)?.into_array()
}
