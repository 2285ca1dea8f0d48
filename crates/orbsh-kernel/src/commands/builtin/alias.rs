//! alias / unalias — Manage command aliases.

use async_trait::async_trait;
use serde_json::json;

use orbsh_types::{CommandArgs, ParamSpec, Value, ValueType};

use crate::aliases::AliasError;
use crate::commands::{CommandError, CommandHandler, CommandSpec, ExecContext};

/// Alias: define, list, or show command aliases.
///
/// - `alias` lists all aliases
/// - `alias name "text"` or `alias name=text` defines one
/// - `alias name` shows one
pub struct Alias;

impl Alias {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("alias", "Define or display command aliases", Alias)
            .param(ParamSpec::positional("name", 0, ValueType::String, "Alias name").optional())
            .param(ParamSpec::positional("text", 1, ValueType::String, "Replacement text").optional())
            .long_description(
                "An alias replaces a command name, at the start of any pipeline \
                 stage, by its text. The text may itself be a pipeline.",
            )
    }
}

fn render(name: &str, text: &str) -> String {
    format!("alias {name}='{text}'")
}

#[async_trait]
impl CommandHandler for Alias {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let fail = |e: AliasError| CommandError::new(format!("alias: {e}"));

        let Some(name) = args.get_string("name") else {
            let aliases = ctx.aliases.read().await;
            let mut listing = serde_json::Map::new();
            for (name, text) in aliases.iter() {
                if ctx.position.is_terminal() {
                    ctx.out.writeln(&render(name, text));
                }
                listing.insert(name.to_string(), json!(text));
            }
            return Ok(Value::Json(serde_json::Value::Object(listing)));
        };

        let definition = match args.get_string("text") {
            Some(text) => Some((name.clone(), text)),
            None => name
                .split_once('=')
                .map(|(name, text)| (name.to_string(), text.to_string())),
        };

        match definition {
            Some((name, text)) => {
                ctx.aliases.write().await.define(&name, &text).map_err(fail)?;
                Ok(Value::Null)
            }
            None => {
                let aliases = ctx.aliases.read().await;
                let text = aliases
                    .get(&name)
                    .ok_or_else(|| fail(AliasError::NotFound(name.clone())))?;
                let value = Value::String(text.to_string());
                if ctx.position.is_terminal() {
                    ctx.out.writeln(&render(&name, text));
                }
                Ok(value)
            }
        }
    }
}

/// Unalias: remove a command alias.
pub struct Unalias;

impl Unalias {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("unalias", "Remove a command alias", Unalias)
            .param(ParamSpec::positional("name", 0, ValueType::String, "Alias name"))
    }
}

#[async_trait]
impl CommandHandler for Unalias {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let name = args.get_string("name").unwrap_or_default();
        let text = ctx
            .aliases
            .write()
            .await
            .remove(&name)
            .map_err(|e| CommandError::new(format!("unalias: {e}")))?;
        Ok(Value::String(text))
    }
}
