//! EvalResult: the structured outcome of evaluating one expression line.
//!
//! After every line, the special variable `$?` holds an EvalResult.

use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Stable outcome codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Ok = 0,
    Error = 1,
    NotIdentified = 2,
    Cancelled = 130,
}

impl ReturnCode {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Process exit status for this code.
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// How the syntax matcher classified a line (or one stage of it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseResultType {
    /// Nothing but whitespace.
    Empty,
    /// Exactly one candidate syntax matched.
    Valid,
    /// Candidates exist but none matched.
    NotValid,
    /// More than one candidate matched.
    Ambiguous,
    /// No command by that name.
    NotIdentified,
    /// The line could not be tokenized or split.
    SyntaxError,
}

impl ParseResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseResultType::Empty => "empty",
            ParseResultType::Valid => "valid",
            ParseResultType::NotValid => "not valid",
            ParseResultType::Ambiguous => "ambiguous",
            ParseResultType::NotIdentified => "not identified",
            ParseResultType::SyntaxError => "syntax error",
        }
    }
}

impl fmt::Display for ParseResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a matched line failed while executing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalFailure {
    /// The matched parameters disagree with the command's specification.
    #[error("internal error: command '{command}' has no matched value for parameter '{param}'")]
    DispatchInconsistency { command: String, param: String },
    /// The handler reported an error.
    #[error("{message}")]
    Handler { code: ReturnCode, message: String },
    /// The handler panicked.
    #[error("command '{command}' panicked: {message}")]
    Panic { command: String, message: String },
    #[error("cancelled")]
    Cancelled,
}

impl EvalFailure {
    pub fn code(&self) -> ReturnCode {
        match self {
            EvalFailure::Handler { code, .. } => *code,
            EvalFailure::Cancelled => ReturnCode::Cancelled,
            EvalFailure::DispatchInconsistency { .. } | EvalFailure::Panic { .. } => ReturnCode::Error,
        }
    }
}

/// The result of evaluating one expression line.
///
/// Fields accessible via `${?.field}`:
/// - `code`: return code (0 = success)
/// - `ok`: true if code == 0
/// - `err`: diagnostic or failure text
/// - `value`: the last stage's value
/// - `expr`: the evaluated expression
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    pub expr: String,
    pub parse_result: ParseResultType,
    pub value: Option<Value>,
    pub code: ReturnCode,
    pub error_text: Option<String>,
    pub failure: Option<EvalFailure>,
}

impl EvalResult {
    /// A whitespace-only line.
    pub fn empty(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            parse_result: ParseResultType::Empty,
            value: None,
            code: ReturnCode::Ok,
            error_text: None,
            failure: None,
        }
    }

    /// A pipeline that ran to completion.
    pub fn success(expr: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            expr: expr.into(),
            parse_result: ParseResultType::Valid,
            value,
            code: ReturnCode::Ok,
            error_text: None,
            failure: None,
        }
    }

    /// A line rejected before dispatch, with its rendered diagnostic.
    pub fn rejected(expr: impl Into<String>, parse_result: ParseResultType, error_text: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            parse_result,
            value: None,
            code: ReturnCode::NotIdentified,
            error_text: Some(error_text.into()),
            failure: None,
        }
    }

    /// A matched line whose execution failed.
    pub fn failed(expr: impl Into<String>, failure: EvalFailure) -> Self {
        Self {
            expr: expr.into(),
            parse_result: ParseResultType::Valid,
            value: None,
            code: failure.code(),
            error_text: Some(failure.to_string()),
            failure: Some(failure),
        }
    }

    pub fn ok(&self) -> bool {
        self.code == ReturnCode::Ok
    }

    /// Get a field by name, for variable access like `${?.field}`.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "code" => Some(Value::Int(self.code.as_i64())),
            "ok" => Some(Value::Bool(self.ok())),
            "err" => Some(Value::String(self.error_text.clone().unwrap_or_default())),
            "value" => Some(self.value.clone().unwrap_or(Value::Null)),
            "expr" => Some(Value::String(self.expr.clone())),
            "parse" => Some(Value::String(self.parse_result.to_string())),
            _ => None,
        }
    }
}

impl Default for EvalResult {
    fn default() -> Self {
        Self::empty("")
    }
}
