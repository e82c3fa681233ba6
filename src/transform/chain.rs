//! Ordered steps and how a value is threaded through them.

use anyhow::{Context, Result};

use super::{CompileContext, ExecContext, Transformation};
use crate::array::Value;
use crate::errors::TransformationError;
use crate::trace::{now_seconds, TraceNode, TransformationChain};

/// Named steps run in order.
#[derive(Debug, Default)]
pub struct Chain {
    steps: Vec<(String, Box<dyn Transformation>)>,
    /// Step name → name of the last sub-step it expanded into.
    aliases: Vec<(String, String)>,
}

/// The outcome of running a chain.
#[derive(Debug)]
pub struct ChainRun {
    /// `None` only for an empty chain run without data.
    pub value: Option<Value>,
    pub trace: TransformationChain,
    /// Outputs of the steps asked for, by step name.
    pub stages: Vec<(String, Value)>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, step: Box<dyn Transformation>) {
        self.steps.push((name.into(), step));
    }

    /// Append `other`'s steps as `<name>_<step>`, keeping `name` addressable
    /// as the last of them.
    pub fn push_expanded(&mut self, name: &str, other: Chain) {
        let mut last = None;
        for (step_name, step) in other.steps {
            let full = format!("{}_{}", name, step_name);
            last = Some(full.clone());
            self.steps.push((full, step));
        }
        if let Some(last) = last {
            self.aliases.push((name.to_string(), last));
        }
    }

    /// Take the steps out, dropping aliases.
    pub fn into_steps(self) -> Vec<(String, Box<dyn Transformation>)> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names including expanded aliases.
    pub fn step_names(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|(name, _)| name.clone())
            .chain(self.aliases.iter().map(|(alias, _)| alias.clone()))
            .collect()
    }

    pub fn steps(&self) -> impl Iterator<Item = (&str, &dyn Transformation)> {
        self.steps.iter().map(|(name, step)| (name.as_str(), step.as_ref()))
    }

    /// Whether the first step reads incoming data. An empty chain passes
    /// its input through.
    pub fn expects_data(&self) -> bool {
        self.steps.first().map_or(true, |(_, step)| step.expects_data())
    }

    pub fn compile(&mut self, ctx: &mut CompileContext<'_>) -> Result<()> {
        for (name, step) in &mut self.steps {
            step.compile(ctx)
                .with_context(|| format!("Failed to compile step '{}' of feature '{}'", name, ctx.feature()))?;
        }
        Ok(())
    }

    /// Thread `data` through every step.
    ///
    /// A step that does not expect data starts fresh and the previous value
    /// is dropped. Outputs of steps named in `capture` are kept in
    /// [`ChainRun::stages`].
    pub fn run(&self, data: Option<Value>, ctx: &ExecContext<'_>, capture: &[String]) -> Result<ChainRun> {
        let mut current = data;
        let mut trace = TransformationChain::new();
        let mut stages = Vec::new();

        for (name, step) in &self.steps {
            let input = if step.expects_data() {
                match current.take() {
                    Some(value) => Some(value),
                    None => {
                        return Err(self.fail(
                            ctx,
                            name,
                            &trace,
                            format!("{} expects data but none was provided", step.name()),
                        ))
                    }
                }
            } else {
                None
            };

            let start = now_seconds();
            let output = match step.execute(input, ctx) {
                Ok(output) => output,
                Err(err) => return Err(self.fail(ctx, name, &trace, format!("{:#}", err))),
            };
            let end = now_seconds();

            let node = TraceNode::record(name, step.name(), &output, start, end);
            log::debug!(
                "Feature '{}' step '{}' ({}) took {:.6}s, shape {:?}",
                ctx.feature(),
                name,
                step.name(),
                node.time_taken,
                node.shape
            );
            trace.push(node);

            if capture.iter().any(|c| c == name) {
                stages.push((name.clone(), output.clone()));
            }
            for (alias, target) in &self.aliases {
                if target == name && capture.iter().any(|c| c == alias) {
                    stages.push((alias.clone(), output.clone()));
                }
            }
            current = Some(output);
        }

        Ok(ChainRun {
            value: current,
            trace,
            stages,
        })
    }

    fn fail(&self, ctx: &ExecContext<'_>, step: &str, trace: &TransformationChain, message: String) -> anyhow::Error {
        log::error!(
            "Transformation chain of feature '{}' failed at step '{}'. Chain so far: {}",
            ctx.feature(),
            step,
            if trace.is_empty() { "<empty>".to_string() } else { trace.render() }
        );
        TransformationError {
            feature: ctx.feature().to_string(),
            step: step.to_string(),
            message,
        }
        .into()
    }
}
