//! echo — Print text to stdout.

use async_trait::async_trait;

use orbsh_types::{CommandArgs, ParamSpec, Value, ValueType};

use crate::commands::{CommandError, CommandHandler, CommandSpec, ExecContext};

/// Echo: prints its text (or the piped value) and passes it on.
pub struct Echo;

impl Echo {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("echo", "Print text to standard output", Echo)
            .param(
                ParamSpec::positional("text", 0, ValueType::Any, "Text to print")
                    .optional()
                    .pipe_input(),
            )
            .param(
                ParamSpec::flag("no_newline", "no-newline", "Do not output the trailing newline")
                    .with_aliases(["n"]),
            )
    }
}

#[async_trait]
impl CommandHandler for Echo {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let text = args.get("text").map(Value::to_string).unwrap_or_default();

        if ctx.position.is_terminal() {
            if args.get_bool("no_newline") {
                ctx.out.write(&text);
            } else {
                ctx.out.writeln(&text);
            }
        }

        Ok(Value::String(text))
    }
}
