//! orbsh REPL — Interactive shell for orbsh.
//!
//! This REPL provides an interactive interface to an orbsh [`Shell`].
//! It handles:
//! - Meta-commands: `/help`, `/quit`, `/result`, `/parse`
//! - Command evaluation, with diagnostics aligned under the prompt
//! - Command history via rustyline
//! - The startup profile script

pub mod config;
pub mod format;
pub mod logfile;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use orbsh_kernel::shell::{BANNER_VAR, HISTORY_VAR};
use orbsh_kernel::{EnvArgsReport, OutputSink, Shell, ShellConfig};

pub use config::ReplConfig;
use format::{format_result, paint_error};

/// Returned by [`Repl::process_line`] when the user asks to leave.
#[derive(Debug, thiserror::Error)]
#[error("exit requested")]
pub struct ExitRequested;

/// Result from meta-command handling.
#[derive(Debug)]
enum MetaResult {
    /// Continue with optional output
    Continue(Option<String>),
    /// Exit the REPL (caller should save history and exit)
    Exit,
}

/// REPL configuration and state.
pub struct Repl {
    shell: Shell,
    runtime: Runtime,
    out: OutputSink,
    err: OutputSink,
    color: bool,
    show_parse: bool,
}

impl Repl {
    /// Create a new REPL with default shell settings.
    pub fn new() -> Result<Self> {
        Self::with_config(ShellConfig::default())
    }

    /// Create a new REPL with custom shell settings.
    pub fn with_config(config: ShellConfig) -> Result<Self> {
        let out = OutputSink::buffer();
        let err = OutputSink::buffer();
        let shell = Shell::new(config)
            .context("Failed to create shell")?
            .with_sinks(out.clone(), err.clone());

        // Create tokio runtime for async shell evaluation
        let runtime = Runtime::new().context("Failed to create tokio runtime")?;

        Ok(Self {
            shell,
            runtime,
            out,
            err,
            color: false,
            show_parse: false,
        })
    }

    /// Turn colored error output on or off.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn prompt(&self) -> String {
        self.runtime.block_on(self.shell.prompt())
    }

    pub fn setting_enabled(&self, path: &str, default: bool) -> bool {
        self.runtime.block_on(self.shell.setting_enabled(path, default))
    }

    /// Apply `--env:NAME=VALUE` arguments, returning what was not consumed.
    pub fn apply_env_args(&self, args: &[String]) -> EnvArgsReport {
        self.runtime.block_on(self.shell.apply_env_args(args))
    }

    /// Run a profile script, returning its collected output.
    pub fn run_profile(&mut self, path: &Path) -> Result<Option<String>> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;
        let results = self.runtime.block_on(self.shell.run_batch(&source));
        tracing::debug!(lines = results.len(), "profile loaded");
        Ok(self.collect_output(None))
    }

    /// Process a single line of input.
    ///
    /// Returns Ok(None) when there is nothing to show, Ok(Some(output)) for
    /// output to display, or Err([`ExitRequested`]) when the REPL should exit.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let trimmed = line.trim();

        if trimmed.starts_with('/') {
            return match self.handle_meta_command(trimmed) {
                MetaResult::Continue(output) => Ok(output),
                MetaResult::Exit => Err(ExitRequested.into()),
            };
        }

        // Shell-style exit without slash, unless a command or alias owns the name
        if matches!(trimmed, "quit" | "exit") && !self.runtime.block_on(self.shell.knows_command(trimmed)) {
            return Err(ExitRequested.into());
        }

        let indent = self.prompt().chars().count();
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            self.runtime.spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        // The raw line keeps its columns so diagnostics line up with the input.
        let result = self.runtime.block_on(self.shell.eval_with(line, indent, cancel));
        watcher.abort();

        let header = self
            .show_parse
            .then(|| format!("[{}] code={}", result.parse_result, result.code));
        Ok(self.collect_output(header))
    }

    /// Drain the shell's sinks into one display string.
    fn collect_output(&mut self, header: Option<String>) -> Option<String> {
        let out = self.out.take();
        let err = self.err.take();

        let mut parts = Vec::new();
        parts.extend(header);
        let out = out.trim_end_matches('\n');
        if !out.is_empty() {
            parts.push(out.to_string());
        }
        let err = err.trim_end_matches('\n');
        if !err.is_empty() {
            parts.push(paint_error(err, self.color));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    /// Handle a meta-command (starts with /).
    fn handle_meta_command(&mut self, cmd: &str) -> MetaResult {
        let parts: Vec<&str> = cmd.split_whitespace().collect();
        let command = parts.first().copied().unwrap_or("");

        match command {
            "/quit" | "/q" | "/exit" => MetaResult::Exit,
            "/help" | "/h" | "/?" => MetaResult::Continue(Some(HELP_TEXT.to_string())),
            "/result" | "/$?" => {
                let result = self.runtime.block_on(self.shell.last_result());
                MetaResult::Continue(Some(format_result(&result)))
            }
            "/parse" => {
                self.show_parse = !self.show_parse;
                MetaResult::Continue(Some(format!(
                    "Parse display: {}",
                    if self.show_parse { "ON" } else { "OFF" }
                )))
            }
            _ => MetaResult::Continue(Some(format!(
                "Unknown command: {}\nType /help for available commands.",
                command
            ))),
        }
    }
}

const HELP_TEXT: &str = r#"orbsh REPL

Meta Commands:
  /help, /?         Show this help
  /quit, /q, quit   Exit the REPL
  /result, /$?      Show the last result
  /parse            Toggle parse classification display

Shell Commands:
  help [command]    List commands, or show one command's syntaxes
  echo [text]       Print text
  get <path>        Print a variable
  set <path> <value> [--type <type>]
                    Assign a variable (unqualified names go to local.)
  vars [namespace]  List variables
  modules           List registered modules
  unregister <mod>  Remove a module's commands
  upper, len        Text helpers that accept piped input
  alias [name] [text]
                    List, show, or define a command alias
  unalias <name>    Remove an alias

Language:
  a | b | c         Pipeline (each value feeds the next stage)
  $name, ${a.b}     Variable reference (local, global, then env)
  $?, ${?.err}      Last result code and fields (ok, err, value, expr)
  "..." '...'       Quoting; backslash escapes in double quotes
  a"b"$x            Touching fragments form one argument
"#;

/// Save REPL history to disk.
fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Option<PathBuf>) {
    if let Some(path) = history_path {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create history directory: {}", e);
            }
        }
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("Failed to save history: {}", e);
        }
    }
}

/// Run the interactive REPL.
///
/// `args` are the command-line arguments; `--env:` ones are applied to the
/// shell before the profile runs.
pub fn run(config: ReplConfig, args: &[String]) -> Result<()> {
    let mut repl = Repl::with_config(config.shell.clone())?.with_color(format::detect_color());

    let report = repl.apply_env_args(args);
    for error in &report.errors {
        eprintln!("{}", paint_error(&error.to_string(), repl.color));
    }

    if let Some(profile) = config.profile_path().filter(|p| p.exists()) {
        match repl.run_profile(&profile) {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }

    if repl.setting_enabled(BANNER_VAR, true) {
        println!("orbsh v{}", env!("CARGO_PKG_VERSION"));
        println!("Type /help for commands, /quit to exit.");
        println!();
    }

    let mut rl: Editor<(), DefaultHistory> = Editor::new().context("Failed to create editor")?;

    let history_path = if repl.setting_enabled(HISTORY_VAR, true) {
        config.history_path()
    } else {
        None
    };
    if let Some(ref path) = history_path {
        if let Err(e) = rl.load_history(path) {
            // Only log if it's not a "file not found" error (expected on first run)
            let is_not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
            if !is_not_found {
                tracing::warn!("Failed to load history: {}", e);
            }
        }
    }

    loop {
        let prompt = repl.prompt();

        match rl.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = rl.add_history_entry(line.as_str()) {
                        tracing::warn!("Failed to add history entry: {}", e);
                    }
                }

                match repl.process_line(&line) {
                    Ok(Some(output)) => println!("{}", output),
                    Ok(None) => {}
                    Err(e) if e.is::<ExitRequested>() => break,
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    save_history(&mut rl, &history_path);

    Ok(())
}
