//! Typed variable store for orbsh.
//!
//! Variables live in a namespace tree addressed by `.` delimited paths
//! (`env.settings.prompt`). Leaves hold a typed [`Value`]; assigning text to
//! an existing leaf coerces it to the leaf's current type.
//!
//! Three namespaces exist from the start: `env` (shell settings, startup
//! `--env:` arguments), `global`, and `local` (where unqualified `set`
//! writes). An unqualified reference like `$name` is tried as written, then
//! under `local`, `global`, and `env`.
//!
//! The special `$?` root resolves against the last line's [`EvalResult`].

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use orbsh_types::{json_to_value, CoercionError, EvalResult, Value, ValueType};

pub const PATH_DELIMITER: char = '.';
pub const ENV_NAMESPACE: &str = "env";
pub const GLOBAL_NAMESPACE: &str = "global";
pub const LOCAL_NAMESPACE: &str = "local";
pub const LAST_RESULT: &str = "?";

const LOOKUP_ORDER: [&str; 3] = [LOCAL_NAMESPACE, GLOBAL_NAMESPACE, ENV_NAMESPACE];

/// Shared handle used by the shell and command handlers.
pub type SharedVars = Arc<RwLock<Variables>>;

/// Errors from variable lookup and assignment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VarError {
    #[error("variable not found: {0}")]
    NotFound(String),
    #[error("not a value: '{0}' is a namespace")]
    NotAValue(String),
    #[error("invalid variable path: '{0}'")]
    InvalidPath(String),
    #[error("type mismatch for {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: ValueType,
        found: ValueType,
    },
    #[error("cannot assign to {path}: {source}")]
    Coercion {
        path: String,
        #[source]
        source: CoercionError,
    },
}

#[derive(Debug, Clone)]
enum Node {
    Value(Value),
    Namespace(BTreeMap<String, Node>),
}

/// The namespace tree plus the last evaluation result.
#[derive(Debug, Clone)]
pub struct Variables {
    root: BTreeMap<String, Node>,
    last_result: EvalResult,
}

fn split_path(path: &str) -> Result<Vec<&str>, VarError> {
    let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(VarError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

impl Variables {
    /// Create a store with empty `env`, `global`, and `local` namespaces.
    pub fn new() -> Self {
        let mut root = BTreeMap::new();
        for ns in [ENV_NAMESPACE, GLOBAL_NAMESPACE, LOCAL_NAMESPACE] {
            root.insert(ns.to_string(), Node::Namespace(BTreeMap::new()));
        }
        Self {
            root,
            last_result: EvalResult::default(),
        }
    }

    pub fn shared(self) -> SharedVars {
        Arc::new(RwLock::new(self))
    }

    fn node(&self, path: &str) -> Result<&Node, VarError> {
        let not_found = || VarError::NotFound(path.to_string());
        let segments = split_path(path)?;
        let (first, rest) = segments
            .split_first()
            .ok_or_else(|| VarError::InvalidPath(path.to_string()))?;
        let mut node = self.root.get(*first).ok_or_else(not_found)?;
        for segment in rest {
            node = match node {
                Node::Namespace(children) => children.get(*segment).ok_or_else(not_found)?,
                Node::Value(_) => return Err(not_found()),
            };
        }
        Ok(node)
    }

    fn value_mut(&mut self, path: &str) -> Result<&mut Value, VarError> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| VarError::InvalidPath(path.to_string()))?;
        let mut map = &mut self.root;
        for segment in parents {
            map = match map.get_mut(*segment) {
                Some(Node::Namespace(children)) => children,
                _ => return Err(VarError::NotFound(path.to_string())),
            };
        }
        match map.get_mut(*last) {
            Some(Node::Value(value)) => Ok(value),
            Some(Node::Namespace(_)) => Err(VarError::NotAValue(path.to_string())),
            None => Err(VarError::NotFound(path.to_string())),
        }
    }

    /// Get the value at `path`.
    pub fn get(&self, path: &str) -> Result<&Value, VarError> {
        match self.node(path)? {
            Node::Value(value) => Ok(value),
            Node::Namespace(_) => Err(VarError::NotAValue(path.to_string())),
        }
    }

    pub fn get_str(&self, path: &str) -> Result<&str, VarError> {
        match self.get(path)? {
            Value::String(s) => Ok(s),
            other => Err(mismatch(path, ValueType::String, other)),
        }
    }

    pub fn get_bool(&self, path: &str) -> Result<bool, VarError> {
        match self.get(path)? {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch(path, ValueType::Bool, other)),
        }
    }

    /// True if `path` names a value or a namespace.
    pub fn contains(&self, path: &str) -> bool {
        self.node(path).is_ok()
    }

    pub fn is_namespace(&self, path: &str) -> bool {
        matches!(self.node(path), Ok(Node::Namespace(_)))
    }

    /// Set the value at `path`, creating intermediate namespaces.
    ///
    /// Returns the previous value. Fails if the path runs through a value or
    /// names an existing namespace.
    pub fn set(&mut self, path: &str, value: Value) -> Result<Option<Value>, VarError> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| VarError::InvalidPath(path.to_string()))?;
        let mut map = &mut self.root;
        for segment in parents {
            let entry = map
                .entry(segment.to_string())
                .or_insert_with(|| Node::Namespace(BTreeMap::new()));
            map = match entry {
                Node::Namespace(children) => children,
                Node::Value(_) => return Err(VarError::InvalidPath(path.to_string())),
            };
        }
        if matches!(map.get(*last), Some(Node::Namespace(_))) {
            return Err(VarError::NotAValue(path.to_string()));
        }
        Ok(match map.insert(last.to_string(), Node::Value(value)) {
            Some(Node::Value(previous)) => Some(previous),
            _ => None,
        })
    }

    /// Assign text to an existing leaf, coercing it to the leaf's type.
    pub fn assign_text(&mut self, path: &str, text: &str) -> Result<&Value, VarError> {
        let slot = self.value_mut(path)?;
        let target = slot.value_type();
        let coerced = target.parse(text).map_err(|source| VarError::Coercion {
            path: path.to_string(),
            source,
        })?;
        *slot = coerced;
        Ok(&*slot)
    }

    /// Remove a value or a whole namespace subtree.
    pub fn remove(&mut self, path: &str) -> Result<(), VarError> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| VarError::InvalidPath(path.to_string()))?;
        let mut map = &mut self.root;
        for segment in parents {
            map = match map.get_mut(*segment) {
                Some(Node::Namespace(children)) => children,
                _ => return Err(VarError::NotFound(path.to_string())),
            };
        }
        map.remove(*last)
            .map(|_| ())
            .ok_or_else(|| VarError::NotFound(path.to_string()))
    }

    /// Resolve a reference from a command line (`$name`, `${a.b}`, `${?.ok}`).
    ///
    /// The path is tried as written, then under each lookup namespace. A path
    /// reaching into a JSON value continues into its fields.
    pub fn resolve(&self, reference: &str) -> Result<Value, VarError> {
        let segments = split_path(reference)?;
        if segments[0] == LAST_RESULT {
            return self.resolve_last_result(reference, &segments[1..]);
        }

        if let Some(value) = self.resolve_segments(&segments) {
            return Ok(value);
        }
        for ns in LOOKUP_ORDER {
            let mut qualified = Vec::with_capacity(segments.len() + 1);
            qualified.push(ns);
            qualified.extend_from_slice(&segments);
            if let Some(value) = self.resolve_segments(&qualified) {
                return Ok(value);
            }
        }
        if self.is_namespace(reference) {
            return Err(VarError::NotAValue(reference.to_string()));
        }
        Err(VarError::NotFound(reference.to_string()))
    }

    fn resolve_segments(&self, segments: &[&str]) -> Option<Value> {
        let mut map = &self.root;
        for (i, segment) in segments.iter().enumerate() {
            match map.get(*segment)? {
                Node::Namespace(children) => map = children,
                Node::Value(Value::Json(json)) => {
                    return json_path(json, &segments[i + 1..]).map(json_to_value);
                }
                Node::Value(value) if i + 1 == segments.len() => return Some(value.clone()),
                Node::Value(_) => return None,
            }
        }
        None
    }

    /// `$?` alone is the return code; `${?.field}` reads one result field.
    fn resolve_last_result(&self, reference: &str, fields: &[&str]) -> Result<Value, VarError> {
        match fields {
            [] => Ok(Value::Int(self.last_result.code.as_i64())),
            [field] => self
                .last_result
                .get_field(field)
                .ok_or_else(|| VarError::NotFound(reference.to_string())),
            _ => Err(VarError::NotFound(reference.to_string())),
        }
    }

    pub fn set_last_result(&mut self, result: EvalResult) {
        self.last_result = result;
    }

    pub fn last_result(&self) -> &EvalResult {
        &self.last_result
    }

    /// All leaves under `prefix` (or everywhere), as full paths, sorted.
    pub fn list(&self, prefix: Option<&str>) -> Result<Vec<(String, Value)>, VarError> {
        let mut out = Vec::new();
        match prefix {
            None => collect_leaves(&self.root, "", &mut out),
            Some(prefix) => match self.node(prefix)? {
                Node::Namespace(children) => collect_leaves(children, prefix, &mut out),
                Node::Value(value) => out.push((prefix.to_string(), value.clone())),
            },
        }
        Ok(out)
    }
}

impl Default for Variables {
    fn default() -> Self {
        Self::new()
    }
}

fn mismatch(path: &str, expected: ValueType, found: &Value) -> VarError {
    VarError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: found.value_type(),
    }
}

fn collect_leaves(map: &BTreeMap<String, Node>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (name, node) in map {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}{PATH_DELIMITER}{name}")
        };
        match node {
            Node::Value(value) => out.push((path, value.clone())),
            Node::Namespace(children) => collect_leaves(children, &path, out),
        }
    }
}

fn json_path(json: &serde_json::Value, fields: &[&str]) -> Option<serde_json::Value> {
    let mut current = json;
    for field in fields {
        current = match current {
            serde_json::Value::Object(map) => map.get(*field)?,
            serde_json::Value::Array(items) => items.get(field.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Path of a variable inside the `env` namespace.
pub fn env_path(name: &str) -> String {
    format!("{ENV_NAMESPACE}{PATH_DELIMITER}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbsh_types::{ParseResultType, ReturnCode};

    #[test]
    fn new_store_has_namespaces() {
        let vars = Variables::new();
        assert!(vars.is_namespace("env"));
        assert!(vars.is_namespace("local"));
        assert!(vars.is_namespace("global"));
        assert_eq!(vars.get("env"), Err(VarError::NotAValue("env".into())));
    }

    #[test]
    fn set_creates_intermediate_namespaces() {
        let mut vars = Variables::new();
        vars.set("env.settings.prompt", Value::String("> ".into())).unwrap();
        assert!(vars.is_namespace("env.settings"));
        assert_eq!(vars.get_str("env.settings.prompt"), Ok("> "));
    }

    #[test]
    fn set_returns_previous() {
        let mut vars = Variables::new();
        assert_eq!(vars.set("local.x", Value::Int(1)), Ok(None));
        assert_eq!(vars.set("local.x", Value::Int(2)), Ok(Some(Value::Int(1))));
    }

    #[test]
    fn set_cannot_replace_namespace() {
        let mut vars = Variables::new();
        assert!(matches!(
            vars.set("env", Value::Int(1)),
            Err(VarError::NotAValue(_))
        ));
    }

    #[test]
    fn set_through_value_is_invalid() {
        let mut vars = Variables::new();
        vars.set("local.x", Value::Int(1)).unwrap();
        assert!(matches!(
            vars.set("local.x.y", Value::Int(2)),
            Err(VarError::InvalidPath(_))
        ));
    }

    #[test]
    fn empty_segments_are_invalid() {
        let vars = Variables::new();
        assert!(matches!(vars.get("env..x"), Err(VarError::InvalidPath(_))));
        assert!(matches!(vars.get(""), Err(VarError::InvalidPath(_))));
    }

    #[test]
    fn assign_text_coerces_to_leaf_type() {
        let mut vars = Variables::new();
        vars.set("env.depth", Value::Int(3)).unwrap();
        assert_eq!(vars.assign_text("env.depth", "12"), Ok(&Value::Int(12)));

        let err = vars.assign_text("env.depth", "deep").unwrap_err();
        assert!(matches!(err, VarError::Coercion { .. }));
        assert_eq!(vars.get("env.depth"), Ok(&Value::Int(12)));
    }

    #[test]
    fn assign_text_requires_existing_value() {
        let mut vars = Variables::new();
        assert_eq!(
            vars.assign_text("env.nope", "1"),
            Err(VarError::NotFound("env.nope".into()))
        );
        assert_eq!(
            vars.assign_text("env", "1"),
            Err(VarError::NotAValue("env".into()))
        );
    }

    #[test]
    fn typed_getters_report_mismatch() {
        let mut vars = Variables::new();
        vars.set("env.flag", Value::Bool(true)).unwrap();
        assert_eq!(vars.get_bool("env.flag"), Ok(true));
        assert_eq!(
            vars.get_str("env.flag"),
            Err(VarError::TypeMismatch {
                path: "env.flag".into(),
                expected: ValueType::String,
                found: ValueType::Bool,
            })
        );
    }

    #[test]
    fn resolve_falls_back_through_namespaces() {
        let mut vars = Variables::new();
        vars.set("env.name", Value::String("env".into())).unwrap();
        assert_eq!(vars.resolve("name"), Ok(Value::String("env".into())));

        vars.set("local.name", Value::String("local".into())).unwrap();
        assert_eq!(vars.resolve("name"), Ok(Value::String("local".into())));
        assert_eq!(vars.resolve("env.name"), Ok(Value::String("env".into())));
    }

    #[test]
    fn resolve_missing() {
        let vars = Variables::new();
        assert_eq!(vars.resolve("ghost"), Err(VarError::NotFound("ghost".into())));
        assert_eq!(vars.resolve("env"), Err(VarError::NotAValue("env".into())));
    }

    #[test]
    fn resolve_into_json() {
        let mut vars = Variables::new();
        vars.set("local.cfg", Value::Json(serde_json::json!({"a": {"b": [10, 20]}})))
            .unwrap();
        assert_eq!(vars.resolve("cfg.a.b.1"), Ok(Value::Int(20)));
        assert!(vars.resolve("cfg.a.missing").is_err());
    }

    #[test]
    fn resolve_last_result() {
        let mut vars = Variables::new();
        vars.set_last_result(EvalResult::rejected(
            "foo",
            ParseResultType::NotIdentified,
            "unknown command: foo",
        ));
        assert_eq!(
            vars.resolve("?"),
            Ok(Value::Int(ReturnCode::NotIdentified.as_i64()))
        );
        assert_eq!(vars.resolve("?.ok"), Ok(Value::Bool(false)));
        assert_eq!(vars.resolve("?.expr"), Ok(Value::String("foo".into())));
        assert!(vars.resolve("?.bogus").is_err());
    }

    #[test]
    fn list_is_sorted_with_full_paths() {
        let mut vars = Variables::new();
        vars.set("env.b", Value::Int(2)).unwrap();
        vars.set("env.a", Value::Int(1)).unwrap();
        vars.set("local.z", Value::Int(3)).unwrap();

        let all: Vec<String> = vars.list(None).unwrap().into_iter().map(|(p, _)| p).collect();
        assert_eq!(all, vec!["env.a", "env.b", "local.z"]);

        let env = vars.list(Some("env")).unwrap();
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn remove_subtree() {
        let mut vars = Variables::new();
        vars.set("local.a.b", Value::Int(1)).unwrap();
        vars.remove("local.a").unwrap();
        assert!(!vars.contains("local.a.b"));
        assert!(vars.remove("local.a").is_err());
    }
}
