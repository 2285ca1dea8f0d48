//! Parameter specifications and matched argument sets.

use std::collections::HashSet;

use crate::value::{Value, ValueType};

/// How a parameter is supplied on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Bound by position among the tokens before the first flag.
    Positional { index: usize },
    /// Bound by `--long_name` (or an alias). Value-less options are flags.
    Option { long_name: String, takes_value: bool },
}

/// One formal parameter of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Parameter name, unique within its command.
    pub name: String,
    pub kind: ParamKind,
    /// Alternative flag spellings (e.g. `n` for `-n`). Options only.
    pub aliases: Vec<String>,
    pub optional: bool,
    pub default: Option<Value>,
    /// Type the matched token text is coerced to.
    pub value_type: ValueType,
    /// Companion option that must be present whenever this one is.
    pub requires: Option<String>,
    /// Receives the previous pipeline stage's value when left unfilled.
    pub pipe_input: bool,
    /// Description for help text.
    pub description: String,
}

impl ParamSpec {
    fn base(name: impl Into<String>, kind: ParamKind, value_type: ValueType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            aliases: Vec::new(),
            optional: false,
            default: None,
            value_type,
            requires: None,
            pipe_input: false,
            description: description.into(),
        }
    }

    /// A mandatory positional parameter.
    pub fn positional(
        name: impl Into<String>,
        index: usize,
        value_type: ValueType,
        description: impl Into<String>,
    ) -> Self {
        Self::base(name, ParamKind::Positional { index }, value_type, description)
    }

    /// A value-less option (`--name`), optional, `false` when absent.
    pub fn flag(name: impl Into<String>, long_name: impl Into<String>, description: impl Into<String>) -> Self {
        let mut spec = Self::base(
            name,
            ParamKind::Option {
                long_name: long_name.into(),
                takes_value: false,
            },
            ValueType::Bool,
            description,
        );
        spec.optional = true;
        spec
    }

    /// A value-taking option (`--name <value>`), optional unless `required()`.
    pub fn option(
        name: impl Into<String>,
        long_name: impl Into<String>,
        value_type: ValueType,
        description: impl Into<String>,
    ) -> Self {
        let mut spec = Self::base(
            name,
            ParamKind::Option {
                long_name: long_name.into(),
                takes_value: true,
            },
            value_type,
            description,
        );
        spec.optional = true;
        spec
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    /// Optional with a default value used when the slot is left unfilled.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.optional = true;
        self.default = Some(default.into());
        self
    }

    /// Add alternative flag names for this option (e.g. `n` matches `-n`).
    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Require a companion option, named by parameter name or long name.
    pub fn requires(mut self, companion: impl Into<String>) -> Self {
        self.requires = Some(companion.into());
        self
    }

    pub fn pipe_input(mut self) -> Self {
        self.pipe_input = true;
        self
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.kind, ParamKind::Positional { .. })
    }

    pub fn index(&self) -> Option<usize> {
        match self.kind {
            ParamKind::Positional { index } => Some(index),
            ParamKind::Option { .. } => None,
        }
    }

    pub fn long_name(&self) -> Option<&str> {
        match &self.kind {
            ParamKind::Option { long_name, .. } => Some(long_name),
            ParamKind::Positional { .. } => None,
        }
    }

    pub fn takes_value(&self) -> bool {
        matches!(self.kind, ParamKind::Option { takes_value: true, .. })
    }

    /// Check if a flag name (without dashes) names this option or an alias.
    pub fn matches_flag(&self, flag: &str) -> bool {
        match &self.kind {
            ParamKind::Option { long_name, .. } => {
                long_name == flag || self.aliases.iter().any(|a| a == flag)
            }
            ParamKind::Positional { .. } => false,
        }
    }

    /// Check if `name` refers to this parameter by name or long name.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.long_name() == Some(name)
    }

    /// Value an unfilled slot takes: the default, `false` for flags, else null.
    pub fn absent_value(&self) -> Value {
        match (&self.default, &self.kind) {
            (Some(default), _) => default.clone(),
            (None, ParamKind::Option { takes_value: false, .. }) => Value::Bool(false),
            (None, _) => Value::Null,
        }
    }
}

/// Typed arguments handed to a command handler, in specification order.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    values: Vec<(String, Value)>,
    provided: HashSet<String>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument. `provided` is false for defaults and absent slots.
    pub fn push(&mut self, name: impl Into<String>, value: Value, provided: bool) {
        let name = name.into();
        if provided {
            self.provided.insert(name.clone());
        }
        self.values.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a non-null argument rendered as a string.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    /// True only for a `Bool(true)` argument.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether the user supplied this argument (or it came through a pipe).
    pub fn is_provided(&self, name: &str) -> bool {
        self.provided.contains(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}
