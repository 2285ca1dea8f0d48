//! orbsh CLI entry point.
//!
//! Usage:
//!   orbsh                          # Interactive REPL
//!   orbsh -c <command>             # Evaluate one line and exit
//!   orbsh script.orbsh             # Run a script
//!   orbsh --env:NAME=VALUE ...     # Override env.* variables (any mode)

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orbsh_kernel::{ReturnCode, Shell, ShellConfig};
use orbsh_repl::logfile::LogFile;
use orbsh_repl::ReplConfig;

fn main() -> ExitCode {
    let config = match ReplConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {e:#}; using default configuration");
            ReplConfig::default()
        }
    };

    init_tracing(&config);

    match run(config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing (respects RUST_LOG), with an optional log file layer.
fn init_tracing(config: &ReplConfig) {
    let file_layer = config.log_file.as_deref().and_then(|path| match LogFile::open(path) {
        Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(file)),
        Err(e) => {
            eprintln!("Warning: {e:#}");
            None
        }
    });

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

fn run(config: ReplConfig) -> Result<ExitCode> {
    let all: Vec<String> = env::args().skip(1).collect();
    let (env_args, args): (Vec<String>, Vec<String>) =
        all.into_iter().partition(|a| a.starts_with(orbsh_kernel::env_args::ENV_ARG_PREFIX));

    match args.first().map(|s| s.as_str()) {
        None => {
            orbsh_repl::run(config, &env_args)?;
            Ok(ExitCode::SUCCESS)
        }

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!(
                "orbsh {} ({} {})",
                env!("CARGO_PKG_VERSION"),
                env!("ORBSH_GIT_HASH"),
                env!("ORBSH_BUILD_DATE")
            );
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            let cmd = args.get(1).context("-c requires a command argument")?;
            run_command(config.shell, &env_args, cmd)
        }

        Some(path) if !path.starts_with('-') => run_script(config.shell, &env_args, path),

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'orbsh --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"orbsh v{}

Usage:
  orbsh                        Interactive REPL
  orbsh -c <command>           Evaluate a command line and exit
  orbsh <script.orbsh>         Run a script file

Options:
  -c <command>                 Evaluate a command line and exit
  --env:NAME=VALUE             Assign the existing variable env.NAME
  -h, --help                   Show this help
  -V, --version                Show version

Examples:
  orbsh -c 'echo hello | upper'
  orbsh --env:settings.prompt='$ '
  orbsh setup.orbsh
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Build a shell writing to the process's stdout and stderr.
fn batch_shell(config: ShellConfig, env_args: &[String], rt: &tokio::runtime::Runtime) -> Result<Shell> {
    let shell = Shell::new(config).context("Failed to create shell")?;
    let report = rt.block_on(shell.apply_env_args(env_args));
    for error in &report.errors {
        eprintln!("{error}");
    }
    Ok(shell)
}

fn exit_code(code: ReturnCode) -> ExitCode {
    ExitCode::from(code.exit_code() as u8)
}

/// Run a script file. The exit code is the last evaluated line's.
fn run_script(config: ShellConfig, env_args: &[String], path: &str) -> Result<ExitCode> {
    let source = std::fs::read_to_string(path).with_context(|| format!("Failed to read script: {path}"))?;

    // Skip shebang if present
    let source = if source.starts_with("#!") {
        source.lines().skip(1).collect::<Vec<_>>().join("\n")
    } else {
        source
    };

    let rt = tokio::runtime::Runtime::new()?;
    let shell = batch_shell(config, env_args, &rt)?;
    let results = rt.block_on(shell.run_batch(&source));

    Ok(results
        .last()
        .map(|r| exit_code(r.code))
        .unwrap_or(ExitCode::SUCCESS))
}

/// Evaluate a command line and exit.
fn run_command(config: ShellConfig, env_args: &[String], cmd: &str) -> Result<ExitCode> {
    let rt = tokio::runtime::Runtime::new()?;
    let shell = batch_shell(config, env_args, &rt)?;
    let result = rt.block_on(shell.eval_with(cmd, 0, CancellationToken::new()));
    Ok(exit_code(result.code))
}
