//! Pipeline execution for orbsh.
//!
//! Runs a sequence of matched stages, threading each stage's value into the
//! next one's `ctx.input`. A single command is a pipeline of length one.

use std::sync::Arc;

use orbsh_types::{EvalFailure, EvalResult, Value};

use crate::commands::{ExecContext, PipelinePosition};
use crate::dispatch::{Binding, CommandDispatcher};

/// Runs pipelines stage by stage through a dispatcher.
pub struct PipelineRunner {
    dispatcher: Arc<dyn CommandDispatcher>,
}

impl PipelineRunner {
    pub fn new(dispatcher: Arc<dyn CommandDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Execute a pipeline of matched stages.
    ///
    /// Returns the last stage's value on success. The first failing stage
    /// ends the run; its failure text also goes to the error sink. The
    /// cancellation token is checked before every stage.
    #[tracing::instrument(level = "debug", skip_all, fields(stages = bindings.len()))]
    pub async fn run(&self, expr: &str, bindings: &[Binding], ctx: &mut ExecContext) -> EvalResult {
        let mut value: Option<Value> = None;

        for (i, binding) in bindings.iter().enumerate() {
            if ctx.is_cancelled() {
                ctx.input = None;
                return EvalResult::failed(expr, EvalFailure::Cancelled);
            }

            ctx.input = value.take();
            ctx.position = PipelinePosition::for_stage(i, bindings.len());

            match self.dispatcher.dispatch(binding, ctx).await {
                Ok(v) => value = Some(v),
                Err(failure) => {
                    tracing::debug!(stage = i, command = %binding.spec.name, %failure, "stage failed");
                    ctx.input = None;
                    ctx.err.writeln(&failure.to_string());
                    return EvalResult::failed(expr, failure);
                }
            }
        }

        ctx.input = None;
        EvalResult::success(expr, value)
    }
}
