//! Help text for registered commands.
//!
//! Two views: the command list (one line per name) and the detailed help of
//! one command, covering every overload registered under it.

use std::fmt::Write as _;
use std::sync::Arc;

use orbsh_types::ParamKind;

use crate::commands::CommandSpec;
use crate::syntax::CommandSyntax;

/// Format the list of commands, one name per line with its description.
///
/// Overloads share a line; the first registered description is shown.
pub fn format_command_list(specs: &[Arc<CommandSpec>]) -> String {
    let mut rows: Vec<(&str, &str)> = Vec::new();
    for spec in specs {
        if !rows.iter().any(|(name, _)| *name == spec.name) {
            rows.push((&spec.name, &spec.description));
        }
    }

    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut output = String::from("Commands:\n\n");
    for (name, description) in &rows {
        let _ = writeln!(output, "  {name:<width$}  {description}");
    }
    output.push_str("\nUse 'help <command>' for details on a command.");
    output
}

/// Format detailed help for `name`. `None` when no syntax is registered.
pub fn format_command_help(name: &str, syntaxes: &[Arc<CommandSyntax>]) -> Option<String> {
    if syntaxes.is_empty() {
        return None;
    }

    let mut output = String::new();
    for (i, syntax) in syntaxes.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        let spec = syntax.spec();
        let _ = writeln!(output, "{name}: {}", spec.description);
        let _ = writeln!(output, "  usage: {}", syntax.signature());
        let _ = writeln!(output, "  declared by: {}", spec.declaring);

        if !spec.params.is_empty() {
            output.push_str("\n  Parameters:\n");
            for param in &spec.params {
                let shape = match &param.kind {
                    ParamKind::Positional { index } => format!("#{index}"),
                    ParamKind::Option { long_name, .. } => format!("--{long_name}"),
                };
                let optional = if param.optional { ", optional" } else { "" };
                let _ = writeln!(
                    output,
                    "    {} ({shape}) : {}{optional}",
                    param.name, param.value_type
                );
                if !param.description.is_empty() {
                    let _ = writeln!(output, "      {}", param.description);
                }
            }
        }

        if let Some(long) = &spec.long_description {
            let _ = writeln!(output, "\n  {long}");
        }
        if let Some(doc) = &spec.documentation {
            let _ = writeln!(output, "\n  {doc}");
        }
    }
    Some(output.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler_fn;
    use orbsh_types::{ParamSpec, Value, ValueType};

    fn spec(name: &str, description: &str) -> Arc<CommandSpec> {
        Arc::new(
            CommandSpec::new(name, description, handler_fn(|_, _| Ok(Value::Null)))
                .param(ParamSpec::positional("path", 0, ValueType::String, "Where to look"))
                .param(ParamSpec::flag("all", "all", "")),
        )
    }

    #[test]
    fn list_aligns_and_dedups() {
        let list = format_command_list(&[spec("ls", "List"), spec("ls", "Other"), spec("mkdir", "Make")]);
        assert!(list.contains("  ls     List\n"));
        assert!(list.contains("  mkdir  Make\n"));
        assert!(!list.contains("Other"));
    }

    #[test]
    fn command_help_shows_usage_and_params() {
        let syntax = Arc::new(CommandSyntax::new(spec("ls", "List entries")));
        let help = format_command_help("ls", &[syntax]).unwrap();
        assert!(help.starts_with("ls: List entries\n"));
        assert!(help.contains("usage: ls <path> [--all]"));
        assert!(help.contains("path (#0) : string"));
        assert!(help.contains("all (--all) : bool, optional"));
        assert!(help.contains("Where to look"));
    }

    #[test]
    fn unknown_command_has_no_help() {
        assert_eq!(format_command_help("nope", &[]), None);
    }
}
