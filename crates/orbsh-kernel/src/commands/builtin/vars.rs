//! get, set, vars — Read and write shell variables.

use async_trait::async_trait;

use orbsh_types::{value_to_json, CommandArgs, ParamSpec, Value, ValueType};

use crate::commands::{CommandError, CommandHandler, CommandSpec, ExecContext};
use crate::vars::{LOCAL_NAMESPACE, PATH_DELIMITER};

/// Get: print a variable's value.
pub struct Get;

impl Get {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("get", "Print the value of a variable", Get)
            .param(ParamSpec::positional("path", 0, ValueType::String, "Variable path"))
            .documentation("Unqualified names are looked up in local, global, then env.")
    }
}

#[async_trait]
impl CommandHandler for Get {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let path = args.get_string("path").unwrap_or_default();
        let value = ctx
            .vars
            .read()
            .await
            .resolve(&path)
            .map_err(|e| CommandError::new(format!("get: {e}")))?;
        ctx.emit(&value);
        Ok(value)
    }
}

/// Set: assign a variable.
pub struct Set;

impl Set {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("set", "Assign a value to a variable", Set)
            .param(ParamSpec::positional("path", 0, ValueType::String, "Variable path"))
            .param(
                ParamSpec::positional("value", 1, ValueType::Any, "Value to assign")
                    .optional()
                    .pipe_input(),
            )
            .param(ParamSpec::option("type", "type", ValueType::String, "Store the value as this type"))
            .long_description(
                "A name without a namespace is stored under local. An existing \
                 variable keeps its type unless --type is given.",
            )
    }
}

/// Qualify a bare name into the local namespace.
fn qualify(path: &str) -> String {
    if path.contains(PATH_DELIMITER) {
        path.to_string()
    } else {
        format!("{LOCAL_NAMESPACE}{PATH_DELIMITER}{path}")
    }
}

fn fail(e: impl std::fmt::Display) -> CommandError {
    CommandError::new(format!("set: {e}"))
}

#[async_trait]
impl CommandHandler for Set {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let path = qualify(&args.get_string("path").unwrap_or_default());
        let value = match args.get("value") {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Err(fail("no value")),
        };

        let mut vars = ctx.vars.write().await;

        let value = match args.get_string("type") {
            Some(kind) => {
                let target: ValueType = kind.parse().map_err(fail)?;
                value.coerce_to(target).map_err(fail)?
            }
            None => match vars.get(&path) {
                Ok(existing) => {
                    let target = existing.value_type();
                    value.coerce_to(target).map_err(fail)?
                }
                Err(_) => value,
            },
        };

        vars.set(&path, value.clone()).map_err(fail)?;
        tracing::debug!(%path, "variable set");
        Ok(value)
    }
}

/// Vars: list variables.
pub struct Vars;

impl Vars {
    pub fn spec() -> CommandSpec {
        CommandSpec::new("vars", "List variables", Vars).param(
            ParamSpec::positional("namespace", 0, ValueType::String, "Only list under this path")
                .optional(),
        )
    }
}

#[async_trait]
impl CommandHandler for Vars {
    async fn invoke(&self, ctx: &mut ExecContext, args: CommandArgs) -> Result<Value, CommandError> {
        let prefix = args.get_string("namespace");
        let entries = ctx
            .vars
            .read()
            .await
            .list(prefix.as_deref())
            .map_err(|e| CommandError::new(format!("vars: {e}")))?;

        if ctx.position.is_terminal() {
            for (path, value) in &entries {
                ctx.out.writeln(&format!("{path} = {value} ({})", value.value_type()));
            }
        }

        let map: serde_json::Map<String, serde_json::Value> = entries
            .into_iter()
            .map(|(path, value)| (path, value_to_json(&value)))
            .collect();
        Ok(Value::Json(serde_json::Value::Object(map)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::builtin::test_support::ctx;

    fn set_args(path: &str, value: Value, kind: Option<&str>) -> CommandArgs {
        let mut args = CommandArgs::new();
        args.push("path", Value::String(path.into()), true);
        args.push("value", value, true);
        args.push(
            "type",
            kind.map(|k| Value::String(k.into())).unwrap_or(Value::Null),
            kind.is_some(),
        );
        args
    }

    fn path_args(name: &str, path: &str) -> CommandArgs {
        let mut args = CommandArgs::new();
        args.push(name, Value::String(path.into()), true);
        args
    }

    #[tokio::test]
    async fn set_unqualified_goes_local() {
        let (mut ctx, out) = ctx();
        Set.invoke(&mut ctx, set_args("x", Value::String("1".into()), None))
            .await
            .unwrap();
        assert_eq!(
            ctx.vars.read().await.get("local.x").unwrap(),
            &Value::String("1".into())
        );
        assert_eq!(out.contents(), "");
    }

    #[tokio::test]
    async fn set_with_type() {
        let (mut ctx, _) = ctx();
        Set.invoke(&mut ctx, set_args("global.n", Value::String("42".into()), Some("int")))
            .await
            .unwrap();
        assert_eq!(ctx.vars.read().await.get("global.n").unwrap(), &Value::Int(42));
    }

    #[tokio::test]
    async fn set_keeps_existing_type() {
        let (mut ctx, _) = ctx();
        ctx.vars.write().await.set("env.flag", Value::Bool(false)).unwrap();
        Set.invoke(&mut ctx, set_args("env.flag", Value::String("yes".into()), None))
            .await
            .unwrap();
        assert_eq!(ctx.vars.read().await.get("env.flag").unwrap(), &Value::Bool(true));

        let err = Set
            .invoke(&mut ctx, set_args("env.flag", Value::String("maybe".into()), None))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("set: "));
        assert_eq!(ctx.vars.read().await.get("env.flag").unwrap(), &Value::Bool(true));
    }

    #[tokio::test]
    async fn set_without_value_fails() {
        let (mut ctx, _) = ctx();
        let err = Set.invoke(&mut ctx, set_args("x", Value::Null, None)).await.unwrap_err();
        assert_eq!(err.to_string(), "set: no value");
        assert!(!ctx.vars.read().await.contains("local.x"));
    }

    #[tokio::test]
    async fn get_resolves_and_prints() {
        let (mut ctx, out) = ctx();
        ctx.vars.write().await.set("global.name", Value::from("orb")).unwrap();
        let value = Get.invoke(&mut ctx, path_args("path", "name")).await.unwrap();
        assert_eq!(value, Value::from("orb"));
        assert_eq!(out.contents(), "orb\n");
    }

    #[tokio::test]
    async fn get_missing_fails() {
        let (mut ctx, _) = ctx();
        let err = Get.invoke(&mut ctx, path_args("path", "ghost")).await.unwrap_err();
        assert_eq!(err.to_string(), "get: variable not found: ghost");
    }

    #[tokio::test]
    async fn vars_lists_namespace() {
        let (mut ctx, out) = ctx();
        ctx.vars.write().await.set("local.a", Value::Int(1)).unwrap();
        ctx.vars.write().await.set("local.b", Value::from("x")).unwrap();
        let value = Vars.invoke(&mut ctx, path_args("namespace", "local")).await.unwrap();
        assert_eq!(out.contents(), "local.a = 1 (int)\nlocal.b = x (string)\n");
        assert_eq!(value, Value::Json(serde_json::json!({"local.a": 1, "local.b": "x"})));
    }
}
