//! Syntax matching: binding a stage's tokens to candidate command syntaxes.
//!
//! Every registered command has a [`CommandSyntax`]. Matching a stage tries
//! each syntax registered under the invoked name and classifies the outcome:
//!
//! - no syntax under that name: `NotIdentified`
//! - exactly one syntax matched: `Valid`
//! - none matched: `NotValid`, with every candidate's errors
//! - several matched: `Ambiguous`, with the matching candidates
//!
//! Positional tokens are the ones before the first flag. With `n` of them
//! and `m` mandatory positional slots, optional slots are filled left to
//! right only while `n - m` surplus tokens remain.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use orbsh_types::{ParamSpec, ParseResultType, Value};

use crate::commands::CommandSpec;
use crate::lexer::{Spanned, Stage, Token, WordPart};
use crate::vars::{VarError, Variables};

/// One problem found while matching, at a byte offset in the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub position: usize,
    pub description: String,
}

impl ParseError {
    pub fn new(position: usize, description: impl Into<String>) -> Self {
        Self {
            position,
            description: description.into(),
        }
    }
}

/// A value bound to a parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedValue {
    pub value: Value,
    /// False when the slot took its default.
    pub provided: bool,
    /// Position of the token that supplied it (the flag, for options).
    pub position: Option<usize>,
}

impl MatchedValue {
    pub fn provided(value: Value, position: usize) -> Self {
        Self {
            value,
            provided: true,
            position: Some(position),
        }
    }

    pub fn absent(value: Value) -> Self {
        Self {
            value,
            provided: false,
            position: None,
        }
    }
}

/// Parameter name to matched value, for one successful match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchingParameters {
    values: HashMap<String, MatchedValue>,
}

impl MatchingParameters {
    pub fn insert(&mut self, name: impl Into<String>, value: MatchedValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&MatchedValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_provided(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|v| v.provided)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop a binding. Only useful for exercising dispatch consistency checks.
    pub fn remove(&mut self, name: &str) -> Option<MatchedValue> {
        self.values.remove(name)
    }
}

/// Outcome of matching one candidate syntax.
#[derive(Debug, Clone)]
pub struct SyntaxParsingResult {
    /// None when no candidate could be attempted (unknown name, lexer error).
    pub syntax: Option<Arc<CommandSyntax>>,
    pub errors: Vec<ParseError>,
    pub params: MatchingParameters,
}

impl SyntaxParsingResult {
    pub fn is_match(&self) -> bool {
        self.syntax.is_some() && self.errors.is_empty()
    }

    fn unattempted(error: ParseError) -> Self {
        Self {
            syntax: None,
            errors: vec![error],
            params: MatchingParameters::default(),
        }
    }
}

/// Classification of one stage plus the per-candidate results behind it.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub kind: ParseResultType,
    pub results: Vec<SyntaxParsingResult>,
}

impl ParseResult {
    pub fn empty() -> Self {
        Self {
            kind: ParseResultType::Empty,
            results: Vec::new(),
        }
    }

    pub fn not_identified(position: usize, description: impl Into<String>) -> Self {
        Self {
            kind: ParseResultType::NotIdentified,
            results: vec![SyntaxParsingResult::unattempted(ParseError::new(position, description))],
        }
    }

    pub fn syntax_error(position: usize, description: impl Into<String>) -> Self {
        Self {
            kind: ParseResultType::SyntaxError,
            results: vec![SyntaxParsingResult::unattempted(ParseError::new(position, description))],
        }
    }

    /// The first error across all results, for single-marker diagnostics.
    pub fn first_error(&self) -> Option<&ParseError> {
        self.results.iter().flat_map(|r| r.errors.iter()).next()
    }

    /// The single bound syntax of a `Valid` result.
    pub fn binding(&self) -> Option<(&Arc<CommandSyntax>, &MatchingParameters)> {
        if self.kind != ParseResultType::Valid {
            return None;
        }
        let result = self.results.first()?;
        Some((result.syntax.as_ref()?, &result.params))
    }
}

/// The matchable shape of one command specification.
#[derive(Debug)]
pub struct CommandSyntax {
    spec: Arc<CommandSpec>,
    /// Indices into `spec.params`, positional slots sorted by index.
    positionals: Vec<usize>,
    /// Indices into `spec.params`, option slots in declaration order.
    options: Vec<usize>,
}

impl CommandSyntax {
    pub fn new(spec: Arc<CommandSpec>) -> Self {
        let mut positionals: Vec<usize> = (0..spec.params.len())
            .filter(|&i| spec.params[i].is_positional())
            .collect();
        positionals.sort_by_key(|&i| spec.params[i].index());
        let options = (0..spec.params.len())
            .filter(|&i| !spec.params[i].is_positional())
            .collect();
        Self {
            spec,
            positionals,
            options,
        }
    }

    pub fn spec(&self) -> &Arc<CommandSpec> {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The rendered signature, e.g. `set <path> <value> [--type <type>]`.
    pub fn signature(&self) -> String {
        self.to_string()
    }

    fn param(&self, i: usize) -> &ParamSpec {
        &self.spec.params[i]
    }

    /// Try to bind `args` (the stage's tokens after the name) to this syntax.
    ///
    /// `end` is the position reported for missing parameters. The match
    /// succeeded when no errors come back.
    pub fn bind(
        &self,
        args: &[Spanned<Token>],
        end: usize,
        vars: &Variables,
    ) -> (Vec<ParseError>, MatchingParameters) {
        let mut errors = Vec::new();
        let mut params = MatchingParameters::default();

        let split = args.iter().position(|a| a.token.is_flag()).unwrap_or(args.len());
        let (positional_args, option_args) = args.split_at(split);

        // Positionals: optional slots only take surplus tokens.
        let mandatory = self
            .positionals
            .iter()
            .filter(|&&i| !self.param(i).optional)
            .count();
        let mut surplus = positional_args.len().saturating_sub(mandatory);
        let mut tokens = positional_args.iter();
        for &i in &self.positionals {
            let param = self.param(i);
            if param.optional {
                if surplus == 0 {
                    continue;
                }
                surplus -= 1;
            }
            match tokens.next() {
                Some(arg) => match bind_value(param, arg, vars) {
                    Ok(value) => params.insert(&param.name, MatchedValue::provided(value, arg.span.start)),
                    Err(e) => errors.push(e),
                },
                None => errors.push(ParseError::new(end, format!("missing parameter: {}", param.name))),
            }
        }
        for leftover in tokens {
            errors.push(ParseError::new(
                leftover.span.start,
                format!("unexpected argument: {}", leftover.token),
            ));
        }

        // Options, in the order given.
        let mut rest = option_args.iter().peekable();
        while let Some(arg) = rest.next() {
            let Some(flag) = arg.token.flag_name() else {
                errors.push(ParseError::new(
                    arg.span.start,
                    format!("unexpected argument: {}", arg.token),
                ));
                continue;
            };
            let Some(param) = self
                .options
                .iter()
                .map(|&i| self.param(i))
                .find(|p| p.matches_flag(flag))
            else {
                errors.push(ParseError::new(arg.span.start, format!("unknown option: {}", arg.token)));
                continue;
            };
            if params.contains(&param.name) {
                errors.push(ParseError::new(arg.span.start, format!("duplicate option: {}", arg.token)));
                if param.takes_value() {
                    let _ = rest.next_if(|next| !next.token.is_flag());
                }
                continue;
            }
            if param.takes_value() {
                match rest.next_if(|next| !next.token.is_flag()) {
                    Some(value_arg) => match bind_value(param, value_arg, vars) {
                        Ok(value) => params.insert(&param.name, MatchedValue::provided(value, arg.span.start)),
                        Err(e) => errors.push(e),
                    },
                    None => errors.push(ParseError::new(
                        arg.span.start,
                        format!("missing value for option: {}", arg.token),
                    )),
                }
            } else {
                params.insert(&param.name, MatchedValue::provided(Value::Bool(true), arg.span.start));
            }
        }

        // Mandatory options and companions.
        for &i in &self.options {
            let param = self.param(i);
            let long = param.long_name().unwrap_or(&param.name);
            if !param.optional && !params.contains(&param.name) {
                errors.push(ParseError::new(end, format!("missing option: --{long}")));
            }
            if let (Some(companion), Some(bound)) = (&param.requires, params.get(&param.name)) {
                let satisfied = self
                    .spec
                    .params
                    .iter()
                    .find(|p| p.is_named(companion))
                    .is_some_and(|p| params.is_provided(&p.name));
                if !satisfied {
                    errors.push(ParseError::new(
                        bound.position.unwrap_or(end),
                        format!("option --{long} requires option --{companion}"),
                    ));
                }
            }
        }

        for param in &self.spec.params {
            if !params.contains(&param.name) {
                params.insert(&param.name, MatchedValue::absent(param.absent_value()));
            }
        }

        (errors, params)
    }
}

/// Coerce one token to a slot's type, resolving variable references.
fn bind_value(param: &ParamSpec, arg: &Spanned<Token>, vars: &Variables) -> Result<Value, ParseError> {
    let at = arg.span.start;
    match &arg.token {
        Token::Word(text) | Token::Quoted(text) => param
            .value_type
            .parse(text)
            .map_err(|e| ParseError::new(at, format!("invalid value for {}: {e}", param.name))),
        Token::VarRef(path) => {
            let value = vars.resolve(path).map_err(|e| ParseError::new(at, e.to_string()))?;
            value
                .coerce_to(param.value_type)
                .map_err(|e| ParseError::new(at, format!("invalid value for {}: {e}", param.name)))
        }
        Token::Compound(parts) => {
            let text = interpolate(parts, vars).map_err(|e| ParseError::new(at, e.to_string()))?;
            param
                .value_type
                .parse(&text)
                .map_err(|e| ParseError::new(at, format!("invalid value for {}: {e}", param.name)))
        }
        other => Err(ParseError::new(at, format!("unexpected argument: {other}"))),
    }
}

/// Render a compound argument, substituting each variable's text.
fn interpolate(parts: &[WordPart], vars: &Variables) -> Result<String, VarError> {
    let mut text = String::new();
    for part in parts {
        match part {
            WordPart::Text(literal) => text.push_str(literal),
            WordPart::Var(path) => text.push_str(&vars.resolve(path)?.to_string()),
        }
    }
    Ok(text)
}

impl fmt::Display for CommandSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec.name)?;
        for &i in &self.positionals {
            let param = self.param(i);
            if param.optional {
                write!(f, " [<{}>]", param.name)?;
            } else {
                write!(f, " <{}>", param.name)?;
            }
        }
        for &i in &self.options {
            let param = self.param(i);
            let long = param.long_name().unwrap_or(&param.name);
            let shape = if param.takes_value() {
                format!("--{long} <{}>", param.name)
            } else {
                format!("--{long}")
            };
            if param.optional {
                write!(f, " [{shape}]")?;
            } else {
                write!(f, " {shape}")?;
            }
        }
        Ok(())
    }
}

/// All syntaxes by command name. Owned by the registry.
#[derive(Debug, Default)]
pub struct SyntaxAnalyzer {
    syntaxes: HashMap<String, Vec<Arc<CommandSyntax>>>,
}

impl SyntaxAnalyzer {
    pub fn add(&mut self, spec: Arc<CommandSpec>) {
        self.syntaxes
            .entry(spec.name.clone())
            .or_default()
            .push(Arc::new(CommandSyntax::new(spec)));
    }

    pub fn remove(&mut self, spec: &Arc<CommandSpec>) {
        if let Some(list) = self.syntaxes.get_mut(&spec.name) {
            list.retain(|s| !Arc::ptr_eq(s.spec(), spec));
            if list.is_empty() {
                self.syntaxes.remove(&spec.name);
            }
        }
    }

    pub fn candidates(&self, name: &str) -> &[Arc<CommandSyntax>] {
        self.syntaxes.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Match one stage against every syntax registered under its name.
    pub fn analyse(&self, stage: &Stage, vars: &Variables) -> ParseResult {
        let Some(head) = stage.tokens.first() else {
            return ParseResult::empty();
        };
        let name = match &head.token {
            Token::Word(name) => name,
            other => {
                return ParseResult::syntax_error(
                    head.span.start,
                    format!("expected a command name, found {other}"),
                )
            }
        };

        let candidates = self.candidates(name);
        if candidates.is_empty() {
            return ParseResult::not_identified(head.span.start, format!("unknown command: {name}"));
        }

        let results: Vec<SyntaxParsingResult> = candidates
            .iter()
            .map(|syntax| {
                let (errors, params) = syntax.bind(stage.args(), stage.span.end, vars);
                SyntaxParsingResult {
                    syntax: Some(syntax.clone()),
                    errors,
                    params,
                }
            })
            .collect();

        let matches = results.iter().filter(|r| r.is_match()).count();
        let (kind, results) = match matches {
            0 => (ParseResultType::NotValid, results),
            1 => (
                ParseResultType::Valid,
                results.into_iter().filter(SyntaxParsingResult::is_match).collect(),
            ),
            _ => (
                ParseResultType::Ambiguous,
                results.into_iter().filter(SyntaxParsingResult::is_match).collect(),
            ),
        };
        tracing::debug!(command = %name, candidates = candidates.len(), %kind, "stage classified");
        ParseResult { kind, results }
    }
}
