//! Command registry: specifications indexed by name, plus module bookkeeping.
//!
//! A name may carry several specifications (overloads) as long as each comes
//! from a different declaring identity. Every registered spec also gets a
//! [`CommandSyntax`] in the analyzer, built here and dropped on removal.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::commands::{CommandSpec, DeclaringId, ModuleDescriptor};
use crate::syntax::{CommandSyntax, SyntaxAnalyzer};

/// Shared handle used by the shell and command handlers.
pub type SharedRegistry = Arc<RwLock<CommandRegistry>>;

/// Registration and unregistration failures. Prior state is left intact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("command already registered: '{name}' from {declaring}")]
    Duplicate { name: String, declaring: DeclaringId },
    #[error("invalid command specification '{name}': {reason}")]
    InvalidSpec { name: String, reason: String },
    #[error("module already registered: {0}")]
    ModuleAlreadyRegistered(String),
    #[error("module not registered: {0}")]
    ModuleNotRegistered(String),
    #[error("no commands found in module: {0}")]
    NoCommandsFound(String),
}

/// Counts reported by module registration and unregistration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleStats {
    /// Command sets that contributed at least one command.
    pub types: usize,
    pub commands: usize,
    /// Per-command failures skipped during registration.
    pub conflicts: Vec<RegistryError>,
}

/// A registered module, for introspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
    pub types: usize,
    pub commands: usize,
}

/// Registry of commands and the modules that declared them.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Vec<Arc<CommandSpec>>>,
    modules: BTreeMap<String, ModuleInfo>,
    analyzer: SyntaxAnalyzer,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register one command.
    ///
    /// Rejects a second spec with the same name and declaring identity;
    /// a different identity adds an overload.
    pub fn register(&mut self, spec: CommandSpec) -> Result<(), RegistryError> {
        spec.validate()?;
        let overloads = self.commands.entry(spec.name.clone()).or_default();
        if overloads.iter().any(|s| s.declaring == spec.declaring) {
            return Err(RegistryError::Duplicate {
                name: spec.name,
                declaring: spec.declaring,
            });
        }
        let spec = Arc::new(spec);
        tracing::debug!(command = %spec.name, declaring = %spec.declaring, "registered command");
        overloads.push(spec.clone());
        self.analyzer.add(spec);
        Ok(())
    }

    /// Register every command of every set in a module.
    ///
    /// Individual conflicts are logged and skipped; a module contributing no
    /// command at all is rejected and not recorded.
    #[tracing::instrument(level = "debug", skip(self, module), fields(module = %module.name))]
    pub fn register_module(&mut self, module: ModuleDescriptor) -> Result<ModuleStats, RegistryError> {
        if self.modules.contains_key(&module.name) {
            return Err(RegistryError::ModuleAlreadyRegistered(module.name));
        }

        let mut stats = ModuleStats::default();
        for set in module.sets {
            let mut registered = 0;
            for spec in set.commands {
                let spec = spec.declared_by(module.name.clone(), set.owner.clone());
                match self.register(spec) {
                    Ok(()) => registered += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping command");
                        stats.conflicts.push(e);
                    }
                }
            }
            if registered > 0 {
                stats.types += 1;
                stats.commands += registered;
            }
        }

        if stats.commands == 0 {
            return Err(RegistryError::NoCommandsFound(module.name));
        }

        self.modules.insert(
            module.name.clone(),
            ModuleInfo {
                name: module.name,
                description: module.description,
                types: stats.types,
                commands: stats.commands,
            },
        );
        Ok(stats)
    }

    /// Remove every command declared by `module`, with its syntaxes.
    pub fn unregister_module(&mut self, module: &str) -> Result<ModuleStats, RegistryError> {
        let recorded = self.modules.remove(module);
        let removed = self.remove_where(|declaring| declaring.module == module);
        if recorded.is_none() && removed.is_empty() {
            return Err(RegistryError::ModuleNotRegistered(module.to_string()));
        }

        let mut owners: Vec<&str> = removed.iter().map(|s| s.declaring.owner.as_str()).collect();
        owners.sort_unstable();
        owners.dedup();
        let stats = ModuleStats {
            types: owners.len(),
            commands: removed.len(),
            conflicts: Vec::new(),
        };
        tracing::debug!(module, commands = stats.commands, "unregistered module");
        Ok(stats)
    }

    fn remove_where(&mut self, pred: impl Fn(&DeclaringId) -> bool) -> Vec<Arc<CommandSpec>> {
        let mut removed = Vec::new();
        self.commands.retain(|_, overloads| {
            overloads.retain(|spec| {
                if pred(&spec.declaring) {
                    removed.push(spec.clone());
                    false
                } else {
                    true
                }
            });
            !overloads.is_empty()
        });
        for spec in &removed {
            self.analyzer.remove(spec);
        }
        removed
    }

    /// All specs registered under `name`, in registration order.
    pub fn candidates(&self, name: &str) -> &[Arc<CommandSpec>] {
        self.commands.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Every registered spec, sorted by name (overloads keep registration order).
    pub fn all_commands(&self) -> Vec<Arc<CommandSpec>> {
        let mut names: Vec<&String> = self.commands.keys().collect();
        names.sort();
        names
            .into_iter()
            .flat_map(|name| self.commands[name].iter().cloned())
            .collect()
    }

    /// Registered modules, sorted by name.
    pub fn modules(&self) -> Vec<&ModuleInfo> {
        self.modules.values().collect()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules.get(name)
    }

    pub fn analyzer(&self) -> &SyntaxAnalyzer {
        &self.analyzer
    }

    /// Syntaxes for `name`, in registration order.
    pub fn syntaxes(&self, name: &str) -> &[Arc<CommandSyntax>] {
        self.analyzer.candidates(name)
    }
}
