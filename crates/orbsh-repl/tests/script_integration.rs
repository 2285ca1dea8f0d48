//! Runs the built `orbsh` binary on scripts and single commands.

use std::path::PathBuf;
use std::process::{Command, Output};

fn orbsh(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_orbsh"))
        .args(args)
        // keep the user's own config out of the way
        .env("ORBSH_CONFIG", "/nonexistent/orbsh/config.toml")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run orbsh")
}

fn script(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("orbsh-{}-{name}.orbsh", std::process::id()));
    std::fs::write(&path, body).expect("write script");
    path
}

#[test]
fn runs_a_script() {
    let path = script(
        "ok",
        "#!/usr/bin/env orbsh\n# greet\nset name world\necho hello | upper\nget name\n",
    );
    let output = orbsh(&[path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "HELLO\nworld\n");
}

#[test]
fn script_exit_code_is_last_line() {
    let path = script("fail", "echo fine\nnope\n");
    let output = orbsh(&[path.to_str().unwrap()]);
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown command: nope"));
}

#[test]
fn command_flag_evaluates_one_line() {
    let output = orbsh(&["-c", "echo hi | len"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "2\n");
}

#[test]
fn env_args_apply_before_the_command() {
    let output = orbsh(&["--env:settings.prompt=>>", "-c", "get env.settings.prompt"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), ">>\n");
}

#[test]
fn bad_env_arg_is_reported_not_fatal() {
    let output = orbsh(&["--env:nothing=1", "-c", "echo ok"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "ok\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("variable not found: env.nothing"));
}

#[test]
fn handler_failure_exit_code() {
    let output = orbsh(&["-c", "get ghost"]);
    assert_eq!(output.status.code(), Some(1));
}
