//! Lexer for orbsh command lines.
//!
//! Converts a line into a stream of tokens using the logos lexer generator,
//! then splits the stream into pipeline stages on unescaped `|`.
//!
//! # Token Categories
//!
//! - **Words**: bare text, backslash escapes allowed (`a\|b` is one word)
//! - **Quoted strings**: `"..."` with escapes, `'...'` verbatim
//! - **Flags**: `--long-name`, `-x`
//! - **Variable references**: `$name`, `${a.b.c}`, `$?`, `${?.ok}`
//! - **Pipe**: `|`
//!
//! Fragments with no whitespace between them form one argument:
//! `a"b c"` is the word `ab c`, and `hello$x` is a [`Token::Compound`]
//! whose variable part is resolved at match time. A `$` that starts no
//! reference is literal text.

use logos::{Logos, Span};
use std::fmt;

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexerError {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
    UnterminatedVarRef,
    EmptyVarRef,
    InvalidEscape,
    /// A `|` with nothing on one side of it.
    EmptyStage,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexerError::UnterminatedString => write!(f, "unterminated string"),
            LexerError::UnterminatedVarRef => write!(f, "unterminated variable reference"),
            LexerError::EmptyVarRef => write!(f, "empty variable reference"),
            LexerError::InvalidEscape => write!(f, "invalid escape sequence"),
            LexerError::EmptyStage => write!(f, "empty pipeline stage"),
        }
    }
}

impl std::error::Error for LexerError {}

/// Tokens produced by the orbsh lexer.
///
/// Flags carry a higher priority than words so `-v` lexes as a flag while
/// `-5` and `-` stay words.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexerError)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token("|")]
    Pipe,

    /// Long flag: `--name` → `name`
    #[regex(r"--[a-zA-Z][a-zA-Z0-9_-]*", lex_long_flag, priority = 3)]
    LongFlag(String),

    /// Short flag: `-n` → `n`
    #[regex(r"-[a-zA-Z][a-zA-Z0-9]*", lex_short_flag, priority = 3)]
    ShortFlag(String),

    /// Double-quoted string with escapes processed, or single-quoted verbatim.
    #[regex(r#""([^"\\]|\\.)*""#, lex_string)]
    #[regex(r"'[^']*'", lex_single_string)]
    Quoted(String),

    /// Variable reference, holding the dotted path: `${a.b}` → `a.b`, `$?` → `?`
    #[regex(r"\$\{[^}]*\}", lex_braced_varref)]
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_.]*", lex_simple_varref)]
    #[token("$?", lex_last_result)]
    VarRef(String),

    /// Bare text. Backslash escapes any character, including `|` and quotes.
    #[regex(r#"([^\s|"'$\\]|\\.)+"#, lex_word)]
    #[token("$", lex_dollar)]
    Word(String),

    /// Adjacent fragments joined into one argument, with at least one
    /// variable reference among them. Synthesized after lexing.
    Compound(Vec<WordPart>),
}

/// One piece of a [`Token::Compound`].
#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    Text(String),
    /// Dotted variable path, resolved when the argument is bound.
    Var(String),
}

impl Token {
    /// Flag name without dashes, if this token is a flag.
    pub fn flag_name(&self) -> Option<&str> {
        match self {
            Token::LongFlag(name) | Token::ShortFlag(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_flag(&self) -> bool {
        self.flag_name().is_some()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Pipe => write!(f, "|"),
            Token::LongFlag(name) => write!(f, "--{name}"),
            Token::ShortFlag(name) => write!(f, "-{name}"),
            Token::Quoted(s) => write!(f, "\"{s}\""),
            Token::VarRef(path) => write!(f, "${{{path}}}"),
            Token::Word(s) => write!(f, "{s}"),
            Token::Compound(parts) => {
                for part in parts {
                    match part {
                        WordPart::Text(text) => write!(f, "{text}")?,
                        WordPart::Var(path) => write!(f, "${{{path}}}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

fn lex_long_flag(lex: &mut logos::Lexer<Token>) -> String {
    lex.slice()[2..].to_string()
}

fn lex_short_flag(lex: &mut logos::Lexer<Token>) -> String {
    lex.slice()[1..].to_string()
}

fn lex_string(lex: &mut logos::Lexer<Token>) -> Result<String, LexerError> {
    parse_string_literal(lex.slice())
}

/// Lex a single-quoted string literal (no escape processing).
fn lex_single_string(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    s[1..s.len() - 1].to_string()
}

fn lex_braced_varref(lex: &mut logos::Lexer<Token>) -> Result<String, LexerError> {
    let s = lex.slice();
    let inner = s[2..s.len() - 1].trim();
    if inner.is_empty() {
        return Err(LexerError::EmptyVarRef);
    }
    Ok(inner.to_string())
}

/// Lex a simple variable reference: `$NAME` → `NAME`
fn lex_simple_varref(lex: &mut logos::Lexer<Token>) -> String {
    lex.slice()[1..].to_string()
}

fn lex_last_result(_lex: &mut logos::Lexer<Token>) -> String {
    "?".to_string()
}

/// A `$` that starts no reference is literal, except before an unclosed `{`.
fn lex_dollar(lex: &mut logos::Lexer<Token>) -> Result<String, LexerError> {
    if lex.remainder().starts_with('{') {
        Err(LexerError::UnterminatedVarRef)
    } else {
        Ok("$".to_string())
    }
}

fn lex_word(lex: &mut logos::Lexer<Token>) -> String {
    let mut out = String::with_capacity(lex.slice().len());
    let mut chars = lex.slice().chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Extract the string content from a double-quoted token (removes quotes, processes escapes).
pub fn parse_string_literal(source: &str) -> Result<String, LexerError> {
    if source.len() < 2 || !source.starts_with('"') || !source.ends_with('"') {
        return Err(LexerError::UnterminatedString);
    }

    let inner = &source[1..source.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some(c @ ('\\' | '"' | '\'' | '$' | '|')) => result.push(c),
                _ => return Err(LexerError::InvalidEscape),
            }
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Refine logos' catch-all error using the text it failed on.
fn classify_error(err: LexerError, slice: &str) -> LexerError {
    if err != LexerError::UnexpectedCharacter {
        return err;
    }
    if slice.starts_with('"') || slice.starts_with('\'') {
        LexerError::UnterminatedString
    } else if slice.starts_with("${") {
        LexerError::UnterminatedVarRef
    } else if slice.starts_with('\\') {
        LexerError::InvalidEscape
    } else {
        err
    }
}

/// Tokenize a line.
///
/// Returns all errors rather than stopping at the first, so callers can
/// report every problem. Spans are byte offsets into `source`.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexerError>>> {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => {
                let slice = source.get(span.clone()).unwrap_or_default();
                errors.push(Spanned::new(classify_error(err, slice), span));
            }
        }
    }

    if errors.is_empty() {
        Ok(join_adjacent(tokens))
    } else {
        Err(errors)
    }
}

/// Join runs of touching fragments into single arguments.
///
/// Pipes always stand alone. A flag inside a run is kept as its literal
/// text, so `-a"b"` is the word `-ab` rather than the flag `-a` and a string.
fn join_adjacent(tokens: Vec<Spanned<Token>>) -> Vec<Spanned<Token>> {
    let mut joined = Vec::with_capacity(tokens.len());
    let mut run: Vec<Spanned<Token>> = Vec::new();

    for spanned in tokens {
        let touches = run.last().is_some_and(|prev| prev.span.end == spanned.span.start);
        if spanned.token == Token::Pipe || !touches {
            joined.extend(finish_run(std::mem::take(&mut run)));
        }
        if spanned.token == Token::Pipe {
            joined.push(spanned);
        } else {
            run.push(spanned);
        }
    }
    joined.extend(finish_run(run));
    joined
}

fn push_text(parts: &mut Vec<WordPart>, text: &str) {
    match parts.last_mut() {
        Some(WordPart::Text(last)) => last.push_str(text),
        _ => parts.push(WordPart::Text(text.to_string())),
    }
}

fn finish_run(mut run: Vec<Spanned<Token>>) -> Option<Spanned<Token>> {
    if run.len() < 2 {
        return run.pop();
    }
    let span = run[0].span.start..run[run.len() - 1].span.end;

    let mut parts = Vec::new();
    for spanned in run {
        match spanned.token {
            Token::Word(text) | Token::Quoted(text) => push_text(&mut parts, &text),
            Token::VarRef(path) => parts.push(WordPart::Var(path)),
            Token::Compound(inner) => {
                for part in inner {
                    match part {
                        WordPart::Text(text) => push_text(&mut parts, &text),
                        var => parts.push(var),
                    }
                }
            }
            flag @ (Token::LongFlag(_) | Token::ShortFlag(_)) => push_text(&mut parts, &flag.to_string()),
            Token::Pipe => {}
        }
    }

    let token = match <[WordPart; 1]>::try_from(parts) {
        Ok([WordPart::Text(text)]) => Token::Word(text),
        Ok(single) => Token::Compound(single.into()),
        Err(parts) => Token::Compound(parts),
    };
    Some(Spanned::new(token, span))
}

/// One command invocation within a pipe-delimited line.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Tokens of this stage; the first is the invoked name.
    pub tokens: Vec<Spanned<Token>>,
    /// Byte range from the first token's start to the last token's end.
    pub span: Span,
}

impl Stage {
    fn new(tokens: Vec<Spanned<Token>>) -> Option<Self> {
        let start = tokens.first()?.span.start;
        let end = tokens.last()?.span.end;
        Some(Self {
            tokens,
            span: start..end,
        })
    }

    /// The arguments after the invoked name.
    pub fn args(&self) -> &[Spanned<Token>] {
        self.tokens.get(1..).unwrap_or_default()
    }
}

/// Split a line into pipeline stages.
///
/// A whitespace-only line yields no stages. The first lexer error, or a `|`
/// with an empty stage on either side, is returned with its position.
pub fn split_pipeline(source: &str) -> Result<Vec<Stage>, Spanned<LexerError>> {
    let tokens = tokenize(source).map_err(|mut errors| errors.swap_remove(0))?;
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut stages = Vec::new();
    let mut current = Vec::new();
    let mut last_pipe: Option<Span> = None;

    for spanned in tokens {
        if spanned.token == Token::Pipe {
            match Stage::new(std::mem::take(&mut current)) {
                Some(stage) => stages.push(stage),
                None => return Err(Spanned::new(LexerError::EmptyStage, spanned.span)),
            }
            last_pipe = Some(spanned.span);
        } else {
            current.push(spanned);
        }
    }

    match Stage::new(current) {
        Some(stage) => stages.push(stage),
        None => {
            let span = last_pipe.unwrap_or(0..source.len());
            return Err(Spanned::new(LexerError::EmptyStage, span));
        }
    }

    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn words_and_flags() {
        assert_eq!(
            lex("echo hello --no-newline -n"),
            vec![
                Token::Word("echo".into()),
                Token::Word("hello".into()),
                Token::LongFlag("no-newline".into()),
                Token::ShortFlag("n".into()),
            ]
        );
    }

    #[test]
    fn negative_numbers_are_words() {
        assert_eq!(lex("add -5 -"), vec![
            Token::Word("add".into()),
            Token::Word("-5".into()),
            Token::Word("-".into()),
        ]);
    }

    #[test]
    fn quoted_strings() {
        assert_eq!(
            lex(r#""a b" 'c|d' "x\"y""#),
            vec![
                Token::Quoted("a b".into()),
                Token::Quoted("c|d".into()),
                Token::Quoted("x\"y".into()),
            ]
        );
    }

    #[test]
    fn var_refs() {
        assert_eq!(
            lex("$name ${env.settings.prompt} $? ${?.ok}"),
            vec![
                Token::VarRef("name".into()),
                Token::VarRef("env.settings.prompt".into()),
                Token::VarRef("?".into()),
                Token::VarRef("?.ok".into()),
            ]
        );
    }

    #[test]
    fn escaped_pipe_stays_in_word() {
        assert_eq!(lex(r"a\|b"), vec![Token::Word("a|b".into())]);
    }

    #[test]
    fn touching_fragments_form_one_word() {
        assert_eq!(lex(r#"echo a"b c"'d'"#), vec![
            Token::Word("echo".into()),
            Token::Word("ab cd".into()),
        ]);
        assert_eq!(lex(r#"cost$5 $ -a"b""#), vec![
            Token::Word("cost$5".into()),
            Token::Word("$".into()),
            Token::Word("-ab".into()),
        ]);
    }

    #[test]
    fn touching_var_refs_form_a_compound() {
        let tokens = tokenize("echo hello$x!${y.z}").unwrap();
        assert_eq!(tokens[1].span, 5..19);
        assert_eq!(
            tokens[1].token,
            Token::Compound(vec![
                WordPart::Text("hello".into()),
                WordPart::Var("x".into()),
                WordPart::Text("!".into()),
                WordPart::Var("y.z".into()),
            ])
        );
        assert_eq!(tokens[1].token.to_string(), "hello${x}!${y.z}");
    }

    #[test]
    fn lone_var_ref_stays_a_var_ref() {
        assert_eq!(lex("$x | $y"), vec![
            Token::VarRef("x".into()),
            Token::Pipe,
            Token::VarRef("y".into()),
        ]);
    }

    #[test]
    fn unclosed_brace_after_dollar_is_an_error() {
        let errors = tokenize("echo ${abc").unwrap_err();
        assert_eq!(errors[0].token, LexerError::UnterminatedVarRef);
        assert_eq!(errors[0].span.start, 5);
    }

    #[test]
    fn spans_are_byte_offsets() {
        let tokens = tokenize("ls  -l").unwrap();
        assert_eq!(tokens[0].span, 0..2);
        assert_eq!(tokens[1].span, 4..6);
    }

    #[test]
    fn empty_braces_rejected() {
        let errors = tokenize("echo ${}").unwrap_err();
        assert_eq!(errors[0].token, LexerError::EmptyVarRef);
    }

    #[test]
    fn split_single_stage() {
        let stages = split_pipeline("echo hi").unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].span, 0..7);
        assert_eq!(stages[0].args().len(), 1);
    }

    #[test]
    fn split_blank_line() {
        assert!(split_pipeline("   \t ").unwrap().is_empty());
    }

    #[test]
    fn split_reports_empty_stage_at_pipe() {
        let err = split_pipeline("a | | b").unwrap_err();
        assert_eq!(err.token, LexerError::EmptyStage);
        assert_eq!(err.span, 4..5);

        let err = split_pipeline("a |").unwrap_err();
        assert_eq!(err.span, 2..3);
    }
}
