//! Command dispatch: the single execution path for matched commands.
//!
//! The `CommandDispatcher` trait defines how one matched stage is executed.
//! `Dispatcher` assembles the handler's typed arguments from the matched
//! parameters and invokes the handler, turning handler errors and panics
//! into an [`EvalFailure`].
//!
//! ```text
//! Shell::eval ──▶ PipelineRunner::run(bindings, ctx)
//!                        │
//!                  for each stage:
//!                    dispatcher.dispatch(binding, ctx)
//!                        │
//!                  build_args ──▶ handler.invoke(ctx, args)
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use orbsh_types::{CommandArgs, EvalFailure, ReturnCode, Value};

use crate::commands::{CommandError, CommandSpec, ExecContext};
use crate::syntax::MatchingParameters;

/// A matched stage ready to run: the chosen spec and its bound parameters.
#[derive(Debug, Clone)]
pub struct Binding {
    pub spec: Arc<CommandSpec>,
    pub params: MatchingParameters,
    /// Byte offset of the stage in the line.
    pub position: usize,
}

/// Trait for executing a single matched stage.
///
/// The pipeline runner handles value threading between stages.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn dispatch(&self, binding: &Binding, ctx: &mut ExecContext) -> Result<Value, EvalFailure>;
}

/// Dispatcher that invokes the bound spec's handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dispatcher;

impl Dispatcher {
    pub fn new() -> Self {
        Self
    }
}

/// Build the handler's arguments by walking the spec's parameters in order.
///
/// A parameter unfilled by the user but marked `pipe_input` takes the
/// previous stage's value, coerced to its type.
pub fn build_args(
    spec: &CommandSpec,
    params: &MatchingParameters,
    input: Option<&Value>,
) -> Result<CommandArgs, EvalFailure> {
    let mut args = CommandArgs::new();
    for param in &spec.params {
        let Some(matched) = params.get(&param.name) else {
            tracing::error!(
                command = %spec.name,
                param = %param.name,
                "matched parameters disagree with the command specification"
            );
            return Err(EvalFailure::DispatchInconsistency {
                command: spec.name.clone(),
                param: param.name.clone(),
            });
        };
        match input {
            Some(piped) if param.pipe_input && !matched.provided => {
                let value = piped.clone().coerce_to(param.value_type).map_err(|e| EvalFailure::Handler {
                    code: ReturnCode::Error,
                    message: format!("{}: piped input for {}: {e}", spec.name, param.name),
                })?;
                args.push(&param.name, value, true);
            }
            _ => args.push(&param.name, matched.value.clone(), matched.provided),
        }
    }
    Ok(args)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl CommandDispatcher for Dispatcher {
    #[tracing::instrument(level = "debug", skip_all, fields(command = %binding.spec.name))]
    async fn dispatch(&self, binding: &Binding, ctx: &mut ExecContext) -> Result<Value, EvalFailure> {
        let spec = &binding.spec;
        let args = build_args(spec, &binding.params, ctx.input.as_ref())?;
        let handler = spec.handler().clone();

        match AssertUnwindSafe(handler.invoke(ctx, args)).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(CommandError::Cancelled)) => Err(EvalFailure::Cancelled),
            Ok(Err(CommandError::Failed { code, message })) => Err(EvalFailure::Handler {
                code: code.unwrap_or(ReturnCode::Error),
                message,
            }),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(command = %spec.name, %message, "command handler panicked");
                Err(EvalFailure::Panic {
                    command: spec.name.clone(),
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler_fn;
    use crate::registry::CommandRegistry;
    use crate::syntax::MatchedValue;
    use crate::vars::Variables;
    use orbsh_types::{ParamSpec, ValueType};

    fn ctx() -> ExecContext {
        ExecContext::new(Variables::new().shared(), CommandRegistry::new().shared())
    }

    fn binding(spec: CommandSpec, params: MatchingParameters) -> Binding {
        Binding {
            spec: Arc::new(spec),
            params,
            position: 0,
        }
    }

    #[test]
    fn build_args_follows_spec_order() {
        let spec = CommandSpec::new("cp", "", handler_fn(|_, _| Ok(Value::Null)))
            .param(ParamSpec::positional("src", 0, ValueType::String, ""))
            .param(ParamSpec::flag("force", "force", ""));
        let mut params = MatchingParameters::default();
        params.insert("force", MatchedValue::absent(Value::Bool(false)));
        params.insert("src", MatchedValue::provided(Value::String("a".into()), 3));

        let args = build_args(&spec, &params, None).unwrap();
        let names: Vec<&str> = args.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["src", "force"]);
        assert!(args.is_provided("src"));
        assert!(!args.is_provided("force"));
    }

    #[test]
    fn build_args_feeds_pipe_input() {
        let spec = CommandSpec::new("len", "", handler_fn(|_, _| Ok(Value::Null)))
            .param(ParamSpec::positional("text", 0, ValueType::String, "").optional().pipe_input());
        let mut params = MatchingParameters::default();
        params.insert("text", MatchedValue::absent(Value::Null));

        let args = build_args(&spec, &params, Some(&Value::Int(42))).unwrap();
        assert_eq!(args.get("text"), Some(&Value::String("42".into())));
    }

    #[test]
    fn build_args_missing_name_is_inconsistency() {
        let spec = CommandSpec::new("cp", "", handler_fn(|_, _| Ok(Value::Null)))
            .param(ParamSpec::positional("src", 0, ValueType::String, ""));
        let err = build_args(&spec, &MatchingParameters::default(), None).unwrap_err();
        assert_eq!(
            err,
            EvalFailure::DispatchInconsistency {
                command: "cp".into(),
                param: "src".into(),
            }
        );
    }

    #[tokio::test]
    async fn handler_error_keeps_code() {
        let spec = CommandSpec::new(
            "fail",
            "",
            handler_fn(|_, _| Err(CommandError::with_code(ReturnCode::NotIdentified, "nope"))),
        );
        let mut ctx = ctx();
        let err = Dispatcher
            .dispatch(&binding(spec, MatchingParameters::default()), &mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ReturnCode::NotIdentified);
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test]
    async fn handler_panic_is_captured() {
        let spec = CommandSpec::new("boom", "", handler_fn(|_, _| panic!("kaboom")));
        let mut ctx = ctx();
        let err = Dispatcher
            .dispatch(&binding(spec, MatchingParameters::default()), &mut ctx)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EvalFailure::Panic {
                command: "boom".into(),
                message: "kaboom".into(),
            }
        );
    }

    #[tokio::test]
    async fn cancelled_handler() {
        let spec = CommandSpec::new("stop", "", handler_fn(|_, _| Err(CommandError::Cancelled)));
        let mut ctx = ctx();
        let err = Dispatcher
            .dispatch(&binding(spec, MatchingParameters::default()), &mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ReturnCode::Cancelled);
    }
}
