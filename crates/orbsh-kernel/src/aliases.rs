//! Command aliases.
//!
//! An alias maps a command name to replacement text. Expansion happens on
//! the raw line before it is split into stages: every word in command
//! position (the first word of each stage) that names an alias is replaced
//! by the alias text. The replacement is not expanded again, so an alias
//! may refer to a command of the same name.
//!
//! ```text
//! alias ll "vars local"    ll x | len   ──▶   vars local x | len
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::lexer::{tokenize, Token};

/// Alias table shared between the shell and command handlers.
pub type SharedAliases = Arc<RwLock<Aliases>>;

/// Errors defining an alias.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AliasError {
    #[error("invalid alias name: {0}")]
    InvalidName(String),
    #[error("empty alias: {0}")]
    Empty(String),
    #[error("{0}: not found")]
    NotFound(String),
}

/// Alias name to replacement text, kept sorted for listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aliases {
    table: BTreeMap<String, String>,
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedAliases {
        Arc::new(RwLock::new(self))
    }

    /// Define or replace an alias, returning the previous text.
    pub fn define(&mut self, name: &str, text: &str) -> Result<Option<String>, AliasError> {
        if !valid_name(name) {
            return Err(AliasError::InvalidName(name.to_string()));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(AliasError::Empty(name.to_string()));
        }
        Ok(self.table.insert(name.to_string(), text.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<String, AliasError> {
        self.table
            .remove(name)
            .ok_or_else(|| AliasError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.table.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.table.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Expand aliases in command position.
    ///
    /// Returns `None` when nothing was replaced, including when the line does
    /// not lex (the caller reports that error against the line as typed).
    pub fn expand(&self, line: &str) -> Option<String> {
        if self.table.is_empty() {
            return None;
        }
        let tokens = tokenize(line).ok()?;

        let mut replacements = Vec::new();
        let mut at_head = true;
        for spanned in &tokens {
            match &spanned.token {
                Token::Pipe => {
                    at_head = true;
                    continue;
                }
                Token::Word(name) if at_head => {
                    if let Some(text) = self.get(name) {
                        replacements.push((spanned.span.clone(), text));
                    }
                }
                _ => {}
            }
            at_head = false;
        }
        if replacements.is_empty() {
            return None;
        }

        let mut expanded = String::with_capacity(line.len());
        let mut copied = 0;
        for (span, text) in replacements {
            expanded.push_str(&line[copied..span.start]);
            expanded.push_str(text);
            copied = span.end;
        }
        expanded.push_str(&line[copied..]);
        tracing::debug!(%line, %expanded, "aliases expanded");
        Some(expanded)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Aliases {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut aliases = Aliases::new();
        for (name, text) in iter {
            if let Err(e) = aliases.define(name, text) {
                tracing::warn!(error = %e, "skipping alias");
            }
        }
        aliases
    }
}
