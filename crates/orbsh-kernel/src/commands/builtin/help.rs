//! help — Show the command list or one command's help.

use async_trait::async_trait;

use orbsh_types::{CommandArgs, ParamSpec, Value, ValueType};

use crate::commands::{CommandError, CommandHandler, CommandSpec, ExecContext};
use crate::help::{format_command_help, format_command_list};

/// Help tool: lists commands, or details one.
pub struct Help;

impl Help {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("help", "Show available commands or help for one command", Help)
            .param(
                ParamSpec::positional("command", 0, ValueType::String, "Command to describe")
                    .optional(),
            )
            .long_description("Without an argument, lists every registered command.")
    }
}

#[async_trait]
impl CommandHandler for Help {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let registry = ctx.registry.read().await;
        let text = match args.get_string("command") {
            None => format_command_list(&registry.all_commands()),
            Some(name) => format_command_help(&name, registry.syntaxes(&name))
                .ok_or_else(|| CommandError::new(format!("help: unknown command: {name}")))?,
        };
        drop(registry);

        let value = Value::String(text);
        ctx.emit(&value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::builtin::test_support::ctx;

    fn command(name: Option<&str>) -> CommandArgs {
        let mut args = CommandArgs::new();
        let value = name.map(|n| Value::String(n.into())).unwrap_or(Value::Null);
        args.push("command", value, name.is_some());
        args
    }

    #[tokio::test]
    async fn lists_core_commands() {
        let (mut ctx, out) = ctx();
        Help.invoke(&mut ctx, command(None)).await.unwrap();
        let text = out.contents();
        for name in [
            "alias", "echo", "get", "help", "len", "modules", "set", "unalias", "unregister", "upper", "vars",
        ] {
            assert!(text.contains(name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn describes_one_command() {
        let (mut ctx, _) = ctx();
        let value = Help.invoke(&mut ctx, command(Some("echo"))).await.unwrap();
        let text = value.to_string();
        assert!(text.contains("usage: echo [<text>] [--no-newline]"));
        assert!(text.contains("declared by: core::core.text"));
    }

    #[tokio::test]
    async fn unknown_command() {
        let (mut ctx, _) = ctx();
        let err = Help.invoke(&mut ctx, command(Some("nope"))).await.unwrap_err();
        assert_eq!(err.to_string(), "help: unknown command: nope");
    }
}
