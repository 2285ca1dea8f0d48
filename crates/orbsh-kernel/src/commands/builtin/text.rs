//! upper, len — Small text commands that accept piped input.

use async_trait::async_trait;

use orbsh_types::{CommandArgs, ParamSpec, Value, ValueType};

use crate::commands::{CommandError, CommandHandler, CommandSpec, ExecContext};

fn input_text(command: &str, args: &CommandArgs) -> Result<String, CommandError> {
    args.get_string("text")
        .ok_or_else(|| CommandError::new(format!("{command}: no input")))
}

/// Upper: uppercase its text.
pub struct Upper;

impl Upper {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("upper", "Convert text to upper case", Upper).param(
            ParamSpec::positional("text", 0, ValueType::String, "Text to convert")
                .optional()
                .pipe_input(),
        )
    }
}

#[async_trait]
impl CommandHandler for Upper {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let value = Value::String(input_text("upper", &args)?.to_uppercase());
        ctx.emit(&value);
        Ok(value)
    }
}

/// Len: count the characters of its text.
pub struct Len;

impl Len {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("len", "Count the characters of a text", Len).param(
            ParamSpec::positional("text", 0, ValueType::String, "Text to measure")
                .optional()
                .pipe_input(),
        )
    }
}

#[async_trait]
impl CommandHandler for Len {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let count = input_text("len", &args)?.chars().count();
        let value = Value::Int(count as i64);
        ctx.emit(&value);
        Ok(value)
    }
}
