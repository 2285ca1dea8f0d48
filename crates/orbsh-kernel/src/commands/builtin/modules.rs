//! modules, unregister — Inspect and remove command modules.

use async_trait::async_trait;
use serde_json::json;

use orbsh_types::{CommandArgs, ParamSpec, Value, ValueType};

use crate::commands::{CommandError, CommandHandler, CommandSpec, ExecContext};

/// Modules: list registered modules.
pub struct Modules;

impl Modules {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("modules", "List registered modules", Modules)
    }
}

#[async_trait]
impl CommandHandler for Modules {
    async fn invoke(&self, ctx: &mut ExecContext, _args: CommandArgs) -> Result<Value, CommandError> {
        let registry = ctx.registry.read().await;
        let mut listing = Vec::new();
        for info in registry.modules() {
            if ctx.position.is_terminal() {
                ctx.out.writeln(&format!(
                    "{}  {} (types: {}, commands: {})",
                    info.name, info.description, info.types, info.commands
                ));
            }
            listing.push(json!({
                "name": info.name,
                "description": info.description,
                "types": info.types,
                "commands": info.commands,
            }));
        }
        Ok(Value::Json(serde_json::Value::Array(listing)))
    }
}

/// Unregister: remove every command a module declared.
pub struct Unregister;

impl Unregister {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("unregister", "Remove a module and its commands", Unregister)
            .param(ParamSpec::positional("module", 0, ValueType::String, "Module name"))
    }
}

#[async_trait]
impl CommandHandler for Unregister {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let module = args.get_string("module").unwrap_or_default();
        let stats = ctx
            .registry
            .write()
            .await
            .unregister_module(&module)
            .map_err(|e| CommandError::new(format!("unregister: {e}")))?;

        if ctx.position.is_terminal() {
            ctx.out.writeln(&format!(
                "unregistered {module} (types: {}, commands: {})",
                stats.types, stats.commands
            ));
        }
        Ok(Value::Int(stats.commands as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::builtin::test_support::ctx;
    use crate::commands::{handler_fn, CommandSet, ModuleDescriptor};

    fn module_args(name: &str) -> CommandArgs {
        let mut args = CommandArgs::new();
        args.push("module", Value::String(name.into()), true);
        args
    }

    #[tokio::test]
    async fn lists_core() {
        let (mut ctx, out) = ctx();
        let value = Modules.invoke(&mut ctx, CommandArgs::new()).await.unwrap();
        assert_eq!(out.contents(), "core  Built-in shell commands (types: 2, commands: 11)\n");
        let Value::Json(serde_json::Value::Array(items)) = value else {
            panic!("expected a json array");
        };
        assert_eq!(items[0]["name"], "core");
    }

    #[tokio::test]
    async fn unregister_removes_commands() {
        let (mut ctx, out) = ctx();
        let extra = ModuleDescriptor::new("extra", "").set(
            CommandSet::new("extra.a")
                .command(CommandSpec::new("ping", "", handler_fn(|_, _| Ok(Value::Null)))),
        );
        ctx.registry.write().await.register_module(extra).unwrap();

        let value = Unregister.invoke(&mut ctx, module_args("extra")).await.unwrap();
        assert_eq!(value, Value::Int(1));
        assert_eq!(out.contents(), "unregistered extra (types: 1, commands: 1)\n");
        assert!(!ctx.registry.read().await.contains("ping"));
    }

    #[tokio::test]
    async fn unregister_unknown_module() {
        let (mut ctx, _) = ctx();
        let err = Unregister.invoke(&mut ctx, module_args("ghost")).await.unwrap_err();
        assert_eq!(err.to_string(), "unregister: module not registered: ghost");
    }
}
