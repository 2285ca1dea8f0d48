//! Built-in commands for orbsh.
//!
//! These make up the `core` module, registered by every shell.

mod alias;
mod echo;
mod help;
mod modules;
mod text;
mod vars;

use super::{CommandSet, ModuleDescriptor};

pub const CORE_MODULE: &str = "core";

/// The built-in module: shell introspection and text commands.
pub fn core_module() -> ModuleDescriptor {
    ModuleDescriptor::new(CORE_MODULE, "Built-in shell commands")
        .set(
            CommandSet::new("core.shell")
                .command(help::Help::spec())
                .command(vars::Get::spec())
                .command(vars::Set::spec())
                .command(vars::Vars::spec())
                .command(modules::Modules::spec())
                .command(modules::Unregister::spec())
                .command(alias::Alias::spec())
                .command(alias::Unalias::spec()),
        )
        .set(
            CommandSet::new("core.text")
                .command(echo::Echo::spec())
                .command(text::Upper::spec())
                .command(text::Len::spec()),
        )
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::commands::{ExecContext, OutputSink};
    use crate::registry::CommandRegistry;
    use crate::vars::Variables;

    /// A context with a buffered stdout and a registry holding the core module.
    pub fn ctx() -> (ExecContext, OutputSink) {
        let mut registry = CommandRegistry::new();
        registry
            .register_module(super::core_module())
            .expect("core module registers");
        let out = OutputSink::buffer();
        let ctx = ExecContext::new(Variables::new().shared(), registry.shared())
            .with_sinks(out.clone(), OutputSink::Null);
        (ctx, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;

    #[test]
    fn core_module_registers_cleanly() {
        let mut registry = CommandRegistry::new();
        let stats = registry.register_module(core_module()).unwrap();
        assert_eq!(stats.types, 2);
        assert_eq!(stats.commands, 11);
        assert!(stats.conflicts.is_empty());
    }
}
