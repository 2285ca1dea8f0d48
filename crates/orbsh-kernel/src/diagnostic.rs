//! Diagnostics for rejected lines.
//!
//! A diagnostic is an optional marker row (the marker glyph under every error
//! position) followed by one message per line:
//!
//! ```text
//! > echo a b
//!          ^
//! unexpected argument: b
//! for syntax: echo [<text>] [--no-newline]
//! ```

use orbsh_types::ParseResultType;

use crate::syntax::ParseResult;

pub const DEFAULT_MARKER: char = '^';

/// Rendered form of a rejected parse.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnostic {
    /// Byte offsets to mark, sorted and deduplicated.
    pub positions: Vec<usize>,
    pub messages: Vec<String>,
}

impl Diagnostic {
    /// Build the diagnostic for a non-valid parse result.
    pub fn for_parse(parse: &ParseResult) -> Self {
        match parse.kind {
            ParseResultType::Empty | ParseResultType::Valid => Self::default(),
            ParseResultType::NotValid => {
                let mut positions: Vec<usize> = parse
                    .results
                    .iter()
                    .flat_map(|r| r.errors.iter().map(|e| e.position))
                    .collect();
                positions.sort_unstable();
                positions.dedup();

                let mut messages: Vec<String> = Vec::new();
                for error in parse.results.iter().flat_map(|r| r.errors.iter()) {
                    if !messages.contains(&error.description) {
                        messages.push(error.description.clone());
                    }
                }
                for result in &parse.results {
                    if let Some(syntax) = &result.syntax {
                        messages.push(format!("for syntax: {syntax}"));
                    }
                }
                Self { positions, messages }
            }
            ParseResultType::Ambiguous => {
                let mut messages = vec!["ambiguous syntaxes:".to_string()];
                messages.extend(
                    parse
                        .results
                        .iter()
                        .filter_map(|r| r.syntax.as_ref())
                        .map(|s| s.signature()),
                );
                Self {
                    positions: Vec::new(),
                    messages,
                }
            }
            ParseResultType::NotIdentified | ParseResultType::SyntaxError => match parse.first_error() {
                Some(error) => Self {
                    positions: vec![error.position],
                    messages: vec![error.description.clone()],
                },
                None => Self::default(),
            },
        }
    }

    /// Render against the expression, indenting the marker row by `indent` columns.
    pub fn render(&self, expr: &str, indent: usize, marker: char) -> String {
        let mut lines = Vec::with_capacity(self.messages.len() + 1);
        if !self.positions.is_empty() {
            let row = marker_row(expr, &self.positions, marker);
            lines.push(format!("{}{}", " ".repeat(indent), row));
        }
        lines.extend(self.messages.iter().cloned());
        lines.join("\n")
    }
}

/// A row of `N + 2` cells (`N` the character length of `expr`) with `marker`
/// under each byte position. Positions at or past the end mark the cell
/// right after the expression.
pub fn marker_row(expr: &str, positions: &[usize], marker: char) -> String {
    let width = expr.chars().count() + 2;
    let mut cells = vec![' '; width];
    for &pos in positions {
        let column = expr.char_indices().take_while(|(i, _)| *i < pos).count();
        cells[column.min(width - 1)] = marker;
    }
    cells.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_row_width_and_position() {
        let row = marker_row("echo a b", &[7], '^');
        assert_eq!(row.chars().count(), 10);
        assert_eq!(row, "       ^  ");
    }

    #[test]
    fn marker_row_multiple_positions() {
        assert_eq!(marker_row("ab cd", &[0, 3], '*'), "*  *   ");
    }

    #[test]
    fn marker_row_counts_chars_not_bytes() {
        // 'é' is two bytes; the second word starts at byte 3, char 2.
        assert_eq!(marker_row("é x", &[3], '^'), "  ^  ");
    }

    #[test]
    fn marker_row_past_end_marks_after_expr() {
        assert_eq!(marker_row("ab", &[99], '^'), "  ^ ");
    }

    #[test]
    fn not_identified_renders_single_marker() {
        let parse = ParseResult::not_identified(0, "unknown command: foo");
        let text = Diagnostic::for_parse(&parse).render("foo", 2, '^');
        assert_eq!(text, "  ^    \nunknown command: foo");
    }

    #[test]
    fn syntax_error_renders_description() {
        let parse = ParseResult::syntax_error(4, "unterminated string");
        let diag = Diagnostic::for_parse(&parse);
        assert_eq!(diag.positions, vec![4]);
        assert_eq!(diag.messages, vec!["unterminated string".to_string()]);
    }

    #[test]
    fn valid_has_nothing_to_say() {
        let parse = ParseResult {
            kind: ParseResultType::Valid,
            results: Vec::new(),
        };
        assert_eq!(Diagnostic::for_parse(&parse), Diagnostic::default());
    }
}
