//! The Shell: one owned instance of registry, variables, and runner.
//!
//! `Shell::eval` is the single entry point for a command line:
//!
//! ```text
//! line ──▶ aliases ──▶ split_pipeline ──▶ analyse each stage ──▶ all Valid? ──▶ PipelineRunner
//!                                                 │                    │
//!                                                 └── rejected stages ─┴──▶ Diagnostics ──▶ err sink
//! ```
//!
//! Every stage is classified, and each rejected one gets its own diagnostic.
//! Every call ends by storing its [`EvalResult`] as the last result (`$?`),
//! taken from the first rejected stage when there is one.
//! Nothing escapes `eval`: lexer, matching, and handler failures all come
//! back as a result.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use orbsh_types::{EvalResult, ParseResultType, Value};

use crate::aliases::{Aliases, SharedAliases};
use crate::commands::{core_module, ExecContext, ModuleDescriptor, OutputSink};
use crate::diagnostic::{Diagnostic, DEFAULT_MARKER};
use crate::dispatch::{Binding, Dispatcher};
use crate::env_args::{self, EnvArgsReport};
use crate::lexer::{split_pipeline, Stage};
use crate::registry::{CommandRegistry, ModuleStats, RegistryError, SharedRegistry};
use crate::scheduler::PipelineRunner;
use crate::syntax::ParseResult;
use crate::vars::{SharedVars, Variables};

pub const PROMPT_VAR: &str = "env.settings.prompt";
pub const ERROR_MARKER_VAR: &str = "env.settings.error_marker";
pub const HISTORY_VAR: &str = "env.settings.history";
pub const BANNER_VAR: &str = "env.settings.banner";
pub const SHELL_NAME_VAR: &str = "env.shell.name";

/// Shell settings. Seeds the `env.settings.*` variables at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Name of this shell instance.
    pub name: String,
    pub prompt: String,
    /// Glyph placed under error positions in diagnostics.
    pub error_marker: char,
    pub history: bool,
    pub banner: bool,
    /// Aliases defined at startup, name to replacement text.
    pub aliases: BTreeMap<String, String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: "orbsh".to_string(),
            prompt: "> ".to_string(),
            error_marker: DEFAULT_MARKER,
            history: true,
            banner: true,
            aliases: BTreeMap::new(),
        }
    }
}

impl ShellConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_error_marker(mut self, marker: char) -> Self {
        self.error_marker = marker;
        self
    }

    pub fn with_history(mut self, history: bool) -> Self {
        self.history = history;
        self
    }

    pub fn with_banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }

    pub fn with_alias(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.aliases.insert(name.into(), text.into());
        self
    }

    fn seed(&self, vars: &mut Variables) -> Result<(), crate::vars::VarError> {
        vars.set(PROMPT_VAR, Value::String(self.prompt.clone()))?;
        vars.set(ERROR_MARKER_VAR, Value::String(self.error_marker.to_string()))?;
        vars.set(HISTORY_VAR, Value::Bool(self.history))?;
        vars.set(BANNER_VAR, Value::Bool(self.banner))?;
        vars.set(SHELL_NAME_VAR, Value::String(self.name.clone()))?;
        Ok(())
    }
}

/// Errors building a shell.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("failed to register the core module: {0}")]
    Core(#[from] RegistryError),
    #[error("failed to seed settings: {0}")]
    Settings(#[from] crate::vars::VarError),
}

/// A command shell instance.
pub struct Shell {
    config: ShellConfig,
    registry: SharedRegistry,
    vars: SharedVars,
    aliases: SharedAliases,
    runner: PipelineRunner,
    out: OutputSink,
    err: OutputSink,
}

impl Shell {
    /// Create a shell with the `core` module registered.
    pub fn new(config: ShellConfig) -> Result<Self, ShellError> {
        let mut registry = CommandRegistry::new();
        registry.register_module(core_module())?;
        Self::build(config, registry)
    }

    /// Create a shell with no commands at all.
    pub fn empty(config: ShellConfig) -> Result<Self, ShellError> {
        Self::build(config, CommandRegistry::new())
    }

    fn build(config: ShellConfig, registry: CommandRegistry) -> Result<Self, ShellError> {
        let mut vars = Variables::new();
        config.seed(&mut vars)?;
        let aliases: Aliases = config.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        tracing::debug!(name = %config.name, aliases = aliases.len(), "shell created");
        Ok(Self {
            registry: registry.shared(),
            vars: vars.shared(),
            aliases: aliases.shared(),
            config,
            runner: PipelineRunner::new(Arc::new(Dispatcher::new())),
            out: OutputSink::Stdout,
            err: OutputSink::Stderr,
        })
    }

    /// Replace the output and error sinks handed to commands and diagnostics.
    pub fn with_sinks(mut self, out: OutputSink, err: OutputSink) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn vars(&self) -> &SharedVars {
        &self.vars
    }

    pub fn aliases(&self) -> &SharedAliases {
        &self.aliases
    }

    pub fn out(&self) -> &OutputSink {
        &self.out
    }

    pub fn err(&self) -> &OutputSink {
        &self.err
    }

    pub async fn register_module(&self, module: ModuleDescriptor) -> Result<ModuleStats, RegistryError> {
        self.registry.write().await.register_module(module)
    }

    pub async fn unregister_module(&self, module: &str) -> Result<ModuleStats, RegistryError> {
        self.registry.write().await.unregister_module(module)
    }

    /// The current prompt, from `env.settings.prompt`.
    pub async fn prompt(&self) -> String {
        match self.vars.read().await.get_str(PROMPT_VAR) {
            Ok(prompt) => prompt.to_string(),
            Err(_) => self.config.prompt.clone(),
        }
    }

    /// Read a boolean setting, falling back to `default`.
    pub async fn setting_enabled(&self, path: &str, default: bool) -> bool {
        self.vars.read().await.get_bool(path).unwrap_or(default)
    }

    /// Whether `name` would resolve to a command or an alias.
    pub async fn knows_command(&self, name: &str) -> bool {
        self.aliases.read().await.contains(name) || self.registry.read().await.contains(name)
    }

    pub async fn last_result(&self) -> EvalResult {
        self.vars.read().await.last_result().clone()
    }

    /// Apply `--env:NAME=VALUE` startup arguments.
    pub async fn apply_env_args<I, S>(&self, args: I) -> EnvArgsReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        env_args::apply_env_args(&mut *self.vars.write().await, args)
    }

    /// Evaluate one line. Diagnostics are indented by the prompt width.
    pub async fn eval(&self, line: &str) -> EvalResult {
        let indent = self.prompt().await.chars().count();
        self.eval_with(line, indent, CancellationToken::new()).await
    }

    /// Evaluate one line with an explicit diagnostic indent and cancel token.
    #[tracing::instrument(level = "debug", skip(self, cancel))]
    pub async fn eval_with(&self, line: &str, indent: usize, cancel: CancellationToken) -> EvalResult {
        let expanded = self.aliases.read().await.expand(line);
        let source = expanded.as_deref().unwrap_or(line);

        let result = match split_pipeline(source) {
            Err(e) => {
                let parse = ParseResult::syntax_error(e.span.start, e.token.to_string());
                self.reject(line, source, &[parse], indent).await
            }
            Ok(stages) if stages.is_empty() => EvalResult::empty(line),
            Ok(stages) => match self.analyse(&stages).await {
                Err(rejected) => self.reject(line, source, &rejected, indent).await,
                Ok(bindings) => {
                    let mut ctx = ExecContext::new(self.vars.clone(), self.registry.clone())
                        .with_aliases(self.aliases.clone())
                        .with_sinks(self.out.clone(), self.err.clone())
                        .with_cancel(cancel);
                    self.runner.run(line, &bindings, &mut ctx).await
                }
            },
        };

        tracing::debug!(code = %result.code, parse = %result.parse_result, "line evaluated");
        self.vars.write().await.set_last_result(result.clone());
        result
    }

    /// Match every stage. Any stage that is not `Valid` rejects the line;
    /// all of them come back, in order. The guards are released before
    /// anything runs.
    async fn analyse(&self, stages: &[Stage]) -> Result<Vec<Binding>, Vec<ParseResult>> {
        let registry = self.registry.read().await;
        let vars = self.vars.read().await;

        let mut bindings = Vec::with_capacity(stages.len());
        let mut rejected = Vec::new();
        for stage in stages {
            let parse = registry.analyzer().analyse(stage, &vars);
            let binding = parse.binding().map(|(syntax, params)| Binding {
                spec: syntax.spec().clone(),
                params: params.clone(),
                position: stage.span.start,
            });
            match binding {
                Some(binding) => bindings.push(binding),
                None => rejected.push(parse),
            }
        }
        if rejected.is_empty() {
            Ok(bindings)
        } else {
            Err(rejected)
        }
    }

    /// Write one diagnostic per rejected stage. The result carries the first.
    ///
    /// Positions refer to `source`; when aliases changed the line, the
    /// expanded text is echoed first so markers sit under what they mark.
    async fn reject(&self, line: &str, source: &str, rejected: &[ParseResult], indent: usize) -> EvalResult {
        let marker = self.marker().await;
        if source != line {
            self.err.writeln(&format!("{}{source}", " ".repeat(indent)));
        }

        let mut first = None;
        for parse in rejected {
            let text = Diagnostic::for_parse(parse).render(source, indent, marker);
            self.err.writeln(&text);
            first.get_or_insert((parse.kind, text));
        }
        let (kind, text) = first.unwrap_or((ParseResultType::SyntaxError, String::new()));
        EvalResult::rejected(line, kind, text)
    }

    /// The diagnostic marker glyph, from `env.settings.error_marker`.
    pub async fn marker(&self) -> char {
        self.vars
            .read()
            .await
            .get_str(ERROR_MARKER_VAR)
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(DEFAULT_MARKER)
    }

    /// Evaluate a script line by line.
    ///
    /// Blank lines and lines starting with `#` are skipped. Every evaluated
    /// line's result is returned, in order.
    pub async fn run_batch(&self, source: &str) -> Vec<EvalResult> {
        let mut results = Vec::new();
        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            results.push(self.eval_with(trimmed, 0, CancellationToken::new()).await);
        }
        results
    }
}
