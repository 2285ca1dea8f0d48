//! Startup arguments of the form `--env:NAME=VALUE`.
//!
//! Each one assigns an existing variable of the `env` namespace, coercing the
//! text to the variable's type. Anything else passes through untouched.

use thiserror::Error;

use crate::vars::{env_path, VarError, Variables};

pub const ENV_ARG_PREFIX: &str = "--env:";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvArgError {
    #[error("invalid env argument syntax: '{0}' (expected --env:NAME=VALUE)")]
    Syntax(String),
    #[error("env argument '{arg}': {source}")]
    Var {
        arg: String,
        #[source]
        source: VarError,
    },
}

/// Outcome of applying a batch of startup arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvArgsReport {
    /// `(path, value)` pairs assigned, in argument order.
    pub applied: Vec<(String, String)>,
    pub errors: Vec<EnvArgError>,
    /// Arguments without the `--env:` prefix.
    pub passthrough: Vec<String>,
}

impl EnvArgsReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Split `--env:NAME=VALUE` into name and value.
///
/// `None` when `arg` lacks the prefix.
pub fn parse_env_arg(arg: &str) -> Option<Result<(&str, &str), EnvArgError>> {
    let rest = arg.strip_prefix(ENV_ARG_PREFIX)?;
    let syntax = || EnvArgError::Syntax(arg.to_string());
    if rest.contains(':') {
        return Some(Err(syntax()));
    }
    let parts: Vec<&str> = rest.split('=').collect();
    Some(match parts.as_slice() {
        [name, value] if !name.trim().is_empty() => Ok((name.trim(), *value)),
        _ => Err(syntax()),
    })
}

/// Apply every `--env:` argument to `vars`.
pub fn apply_env_args<I, S>(vars: &mut Variables, args: I) -> EnvArgsReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = EnvArgsReport::default();
    for arg in args {
        let arg = arg.as_ref();
        let outcome = match parse_env_arg(arg) {
            None => {
                report.passthrough.push(arg.to_string());
                continue;
            }
            Some(Err(e)) => Err(e),
            Some(Ok((name, value))) => {
                let path = env_path(name);
                vars.assign_text(&path, value)
                    .map(|_| (path, value.to_string()))
                    .map_err(|source| EnvArgError::Var {
                        arg: arg.to_string(),
                        source,
                    })
            }
        };
        match outcome {
            Ok(applied) => report.applied.push(applied),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring env argument");
                report.errors.push(e);
            }
        }
    }
    report
}
