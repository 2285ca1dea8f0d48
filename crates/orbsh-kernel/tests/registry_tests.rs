//! Registry behaviour through the shell: uniqueness, overloads, modules.

use orbsh_kernel::{
    core_module, handler_fn, CommandRegistry, CommandSet, CommandSpec, ModuleDescriptor, OutputSink,
    ParamSpec, ParseResultType, RegistryError, Shell, ShellConfig, Value, ValueType, CORE_MODULE,
};

fn shell() -> (Shell, OutputSink) {
    let out = OutputSink::buffer();
    let shell = Shell::new(ShellConfig::default())
        .expect("shell builds")
        .with_sinks(out.clone(), OutputSink::Null);
    (shell, out)
}

fn greeter(reply: &'static str) -> CommandSpec {
    CommandSpec::new("greet", "Say hello", handler_fn(move |_, _| Ok(Value::from(reply))))
        .param(ParamSpec::positional("who", 0, ValueType::String, "").optional())
}

fn greet_module() -> ModuleDescriptor {
    ModuleDescriptor::new("greetings", "Friendly commands")
        .set(CommandSet::new("greetings.en").command(greeter("hello")))
        .set(
            CommandSet::new("greetings.fr").command(
                CommandSpec::new("greet", "Dire bonjour", handler_fn(|_, _| Ok(Value::from("bonjour"))))
                    .param(ParamSpec::flag("formal", "formal", "")),
            ),
        )
}

#[test]
fn same_identity_twice_is_rejected() {
    let mut registry = CommandRegistry::new();
    registry.register(greeter("a").declared_by("m", "s")).unwrap();
    let err = registry.register(greeter("b").declared_by("m", "s")).unwrap_err();
    assert!(matches!(err, RegistryError::Duplicate { ref name, .. } if name == "greet"));
    assert_eq!(registry.candidates("greet").len(), 1);
}

#[test]
fn duplicate_inside_module_is_skipped_not_fatal() {
    let mut registry = CommandRegistry::new();
    let module = ModuleDescriptor::new("m", "")
        .set(CommandSet::new("s").command(greeter("a")).command(greeter("b")));
    let stats = registry.register_module(module).unwrap();
    assert_eq!(stats.commands, 1);
    assert_eq!(stats.conflicts.len(), 1);
}

#[test]
fn core_module_cannot_register_twice() {
    let mut registry = CommandRegistry::new();
    registry.register_module(core_module()).unwrap();
    assert_eq!(
        registry.register_module(core_module()),
        Err(RegistryError::ModuleAlreadyRegistered(CORE_MODULE.into()))
    );
}

#[tokio::test]
async fn overloads_coexist_and_dispatch_by_shape() {
    let (shell, _) = shell();
    let stats = shell.register_module(greet_module()).await.unwrap();
    assert_eq!(stats.types, 2);
    assert_eq!(stats.commands, 2);

    assert_eq!(shell.registry().read().await.candidates("greet").len(), 2);

    let en = shell.eval("greet world").await;
    assert_eq!(en.value, Some(Value::from("hello")));
    let fr = shell.eval("greet --formal").await;
    assert_eq!(fr.value, Some(Value::from("bonjour")));
    let both = shell.eval("greet").await;
    assert_eq!(both.parse_result, ParseResultType::Ambiguous);
}

#[tokio::test]
async fn unregister_round_trip() {
    let (shell, _) = shell();
    let before: Vec<String> = shell
        .registry()
        .read()
        .await
        .all_commands()
        .iter()
        .map(|s| s.name.clone())
        .collect();

    shell.register_module(greet_module()).await.unwrap();
    let stats = shell.unregister_module("greetings").await.unwrap();
    assert_eq!(stats.types, 2);
    assert_eq!(stats.commands, 2);

    {
        let registry = shell.registry().read().await;
        let after: Vec<String> = registry.all_commands().iter().map(|s| s.name.clone()).collect();
        assert_eq!(after, before);
        assert!(registry.syntaxes("greet").is_empty());
        assert!(registry.module("greetings").is_none());
    }

    let result = shell.eval("greet").await;
    assert_eq!(result.parse_result, ParseResultType::NotIdentified);

    // registering again works once the old one is gone
    shell.register_module(greet_module()).await.unwrap();
    assert_eq!(shell.eval("greet you").await.value, Some(Value::from("hello")));
}

#[tokio::test]
async fn unregister_unknown_module_fails() {
    let (shell, _) = shell();
    assert_eq!(
        shell.unregister_module("ghost").await,
        Err(RegistryError::ModuleNotRegistered("ghost".into()))
    );
}

#[tokio::test]
async fn unregister_command_from_the_shell() {
    let (shell, out) = shell();
    shell.register_module(greet_module()).await.unwrap();

    let result = shell.eval("unregister greetings").await;
    assert_eq!(result.value, Some(Value::Int(2)));
    assert_eq!(out.take(), "unregistered greetings (types: 2, commands: 2)\n");
    assert!(!shell.registry().read().await.contains("greet"));
}

#[tokio::test]
async fn modules_command_lists_in_name_order() {
    let (shell, out) = shell();
    shell.register_module(greet_module()).await.unwrap();
    shell.eval("modules").await;
    assert_eq!(
        out.contents(),
        "core  Built-in shell commands (types: 2, commands: 11)\n\
         greetings  Friendly commands (types: 2, commands: 2)\n"
    );
}

#[tokio::test]
async fn help_shows_every_overload() {
    let (shell, _) = shell();
    shell.register_module(greet_module()).await.unwrap();
    let result = shell.eval("help greet").await;
    let text = result.value.unwrap().to_string();
    assert!(text.contains("usage: greet [<who>]"));
    assert!(text.contains("usage: greet [--formal]"));
    assert!(text.contains("declared by: greetings::greetings.en"));
    assert!(text.contains("declared by: greetings::greetings.fr"));
}

#[test]
fn empty_module_is_rejected() {
    let mut registry = CommandRegistry::new();
    let module = ModuleDescriptor::new("hollow", "Nothing inside").set(CommandSet::new("hollow.a"));
    assert_eq!(
        registry.register_module(module),
        Err(RegistryError::NoCommandsFound("hollow".into()))
    );
    assert!(registry.module("hollow").is_none());
}
