//! Output formatting for the REPL.
//!
//! Values and results are rendered for a human at a terminal. Colors are
//! dropped when `NO_COLOR` is set or `TERM=dumb`.

use std::io::IsTerminal;

use owo_colors::OwoColorize;

use orbsh_kernel::{EvalResult, Value};

/// Whether stdout should get colors.
pub fn detect_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
        return false;
    }
    std::io::stdout().is_terminal()
}

/// Format a Value for display (with quotes on strings).
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("\"{}\"", s),
        Value::Json(json) => json.to_string(),
    }
}

/// Format an EvalResult as a status line, e.g. `✓ code=0 value="x"`.
pub fn format_result(result: &EvalResult) -> String {
    let status = if result.ok() { "✓" } else { "✗" };
    let mut output = format!("{} code={} parse={}", status, result.code, result.parse_result);

    if let Some(value) = &result.value {
        output.push_str(&format!(" value={}", format_value(value)));
    }
    if !result.expr.is_empty() {
        output.push_str(&format!(" expr=\"{}\"", result.expr));
    }
    if let Some(err) = &result.error_text {
        output.push_str(&format!("\n{}", err));
    }

    output
}

/// Paint error text red when colors are on.
pub fn paint_error(text: &str, color: bool) -> String {
    if color {
        text.red().to_string()
    } else {
        text.to_string()
    }
}
