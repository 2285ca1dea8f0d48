//! Command specifications and the handler trait.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use orbsh_types::{CommandArgs, ParamSpec, ReturnCode, Value};

use super::context::ExecContext;
use crate::registry::RegistryError;

/// Failure reported by a command handler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("{message}")]
    Failed {
        code: Option<ReturnCode>,
        message: String,
    },
    #[error("cancelled")]
    Cancelled,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        CommandError::Failed {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: ReturnCode, message: impl Into<String>) -> Self {
        CommandError::Failed {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// The executable body of a command.
///
/// Arguments arrive already matched and coerced to the declared parameter
/// types. The returned value feeds the next pipeline stage.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError>;
}

/// Adapts a plain closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

/// Wrap a synchronous closure as a command handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut ExecContext, CommandArgs) -> Result<Value, CommandError> + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&mut ExecContext, CommandArgs) -> Result<Value, CommandError> + Send + Sync,
{
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        (self.0)(ctx, args)
    }
}

/// Identity of the code that declared a command: module and command set.
///
/// Overloads of one name are told apart by this identity; unregistration
/// works on the module part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DeclaringId {
    pub module: String,
    pub owner: String,
}

impl DeclaringId {
    pub fn new(module: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            owner: owner.into(),
        }
    }
}

impl fmt::Display for DeclaringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.owner)
    }
}

/// A command: its name, documentation, parameters, and handler.
#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub long_description: Option<String>,
    pub documentation: Option<String>,
    pub declaring: DeclaringId,
    pub params: Vec<ParamSpec>,
    handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            long_description: None,
            documentation: None,
            declaring: DeclaringId::default(),
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Add a parameter to the specification.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = Some(text.into());
        self
    }

    pub fn documentation(mut self, text: impl Into<String>) -> Self {
        self.documentation = Some(text.into());
        self
    }

    pub fn declared_by(mut self, module: impl Into<String>, owner: impl Into<String>) -> Self {
        self.declaring = DeclaringId::new(module, owner);
        self
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// Check the structural invariants a registry relies on.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidSpec {
            name: self.name.clone(),
            reason,
        };

        let valid_name = self
            .name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase())
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid_name {
            return Err(invalid("name must be a lowercase identifier".to_string()));
        }

        let mut names = HashSet::new();
        let mut indices = HashSet::new();
        let mut flags = HashSet::new();
        for param in &self.params {
            if !names.insert(param.name.as_str()) {
                return Err(invalid(format!("duplicate parameter name: {}", param.name)));
            }
            if let Some(index) = param.index() {
                if !indices.insert(index) {
                    return Err(invalid(format!("duplicate positional index: {index}")));
                }
            }
            if let Some(long) = param.long_name() {
                for flag in std::iter::once(long).chain(param.aliases.iter().map(String::as_str)) {
                    if !flags.insert(flag) {
                        return Err(invalid(format!("duplicate option name: {flag}")));
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("declaring", &self.declaring)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A group of commands declared together (one declaring type).
pub struct CommandSet {
    pub owner: String,
    pub commands: Vec<CommandSpec>,
}

impl CommandSet {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            commands: Vec::new(),
        }
    }

    pub fn command(mut self, spec: CommandSpec) -> Self {
        self.commands.push(spec);
        self
    }
}

/// Everything a module contributes to the registry.
pub struct ModuleDescriptor {
    pub name: String,
    pub description: String,
    pub sets: Vec<CommandSet>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sets: Vec::new(),
        }
    }

    pub fn set(mut self, set: CommandSet) -> Self {
        self.sets.push(set);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbsh_types::ValueType;

    fn noop() -> impl CommandHandler {
        handler_fn(|_, _| Ok(Value::Null))
    }

    #[test]
    fn validate_accepts_well_formed() {
        let spec = CommandSpec::new("copy", "copy things", noop())
            .param(ParamSpec::positional("src", 0, ValueType::String, ""))
            .param(ParamSpec::positional("dst", 1, ValueType::String, ""))
            .param(ParamSpec::flag("force", "force", "").with_aliases(["f"]));
        assert_eq!(spec.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_duplicate_index() {
        let spec = CommandSpec::new("copy", "", noop())
            .param(ParamSpec::positional("src", 0, ValueType::String, ""))
            .param(ParamSpec::positional("dst", 0, ValueType::String, ""));
        assert!(matches!(spec.validate(), Err(RegistryError::InvalidSpec { .. })));
    }

    #[test]
    fn validate_rejects_clashing_alias() {
        let spec = CommandSpec::new("copy", "", noop())
            .param(ParamSpec::flag("force", "force", "").with_aliases(["f"]))
            .param(ParamSpec::flag("fast", "f", ""));
        assert!(matches!(spec.validate(), Err(RegistryError::InvalidSpec { .. })));
    }

    #[test]
    fn validate_rejects_bad_name() {
        assert!(CommandSpec::new("Copy", "", noop()).validate().is_err());
        assert!(CommandSpec::new("", "", noop()).validate().is_err());
    }
}
