//! orbsh-kernel: the core of orbsh.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes command lines using logos and splits pipelines
//! - **Aliases**: Command-position replacement text, expanded before splitting
//! - **Registry**: Command specifications grouped into modules, with overloads
//! - **Syntax**: Matches a stage's tokens against every candidate syntax
//! - **Dispatch / Scheduler**: Runs matched stages, threading values through
//! - **Vars**: Namespaced variable tree (`env`, `global`, `local`) and `$?`
//! - **Shell**: The evaluation entry point tying it all together

pub mod aliases;
pub mod commands;
pub mod diagnostic;
pub mod dispatch;
pub mod env_args;
pub mod help;
pub mod lexer;
pub mod registry;
pub mod scheduler;
pub mod shell;
pub mod syntax;
pub mod vars;

pub use aliases::{AliasError, Aliases, SharedAliases};
pub use commands::{
    core_module, handler_fn, CommandError, CommandHandler, CommandSet, CommandSpec, DeclaringId,
    ExecContext, ModuleDescriptor, OutputSink, PipelinePosition, CORE_MODULE,
};
pub use diagnostic::Diagnostic;
pub use env_args::{EnvArgError, EnvArgsReport};
pub use registry::{CommandRegistry, ModuleInfo, ModuleStats, RegistryError};
pub use shell::{Shell, ShellConfig, ShellError};
pub use vars::{VarError, Variables};

// Data types shared with embedders
pub use orbsh_types::{
    CommandArgs, EvalFailure, EvalResult, ParamSpec, ParseResultType, ReturnCode, Value, ValueType,
};
