//! Validation helpers shared across the composition core
//!
//! Argument kind checks over [`serde_json::Value`], the namespace-name
//! grammar, shallow object merge, and registration-name resolution.

use crate::error::CompositionError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

#[allow(clippy::expect_used)]
static NAMESPACE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+(\.\w+)*$").expect("namespace grammar is a valid regex")
});

/// Runtime kind of a [`Value`], used for argument validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Classify a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Check that `value`'s runtime kind is among `kinds`.
///
/// The error names the caller, the argument, and the allowed kind(s).
pub fn validate_arg(
    caller: &str,
    arg: &str,
    value: &Value,
    kinds: &[ValueKind],
) -> Result<(), CompositionError> {
    if kinds.contains(&ValueKind::of(value)) {
        return Ok(());
    }
    let expected = kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/");
    Err(CompositionError::invalid_arguments(caller, arg, expected))
}

/// Check a dotted path against the `identifier(.identifier)*` grammar.
pub fn validate_namespace_name(path: &str) -> Result<(), CompositionError> {
    if NAMESPACE_NAME.is_match(path) {
        return Ok(());
    }
    Err(CompositionError::InvalidNamespaceName {
        path: path.to_string(),
    })
}

/// Shallowly merge `overlay` into `base`, overwriting colliding keys.
pub fn merge(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}

/// Resolve the effective name for a named registration: an explicit name
/// wins, otherwise the name carried by the registered item itself.
pub fn member_name(
    caller: &str,
    explicit: Option<&str>,
    carried: Option<&str>,
) -> Result<String, CompositionError> {
    match (explicit, carried) {
        (Some(name), _) if !name.is_empty() => Ok(name.to_string()),
        (_, Some(name)) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(CompositionError::invalid_arguments(caller, "name", "string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn validate_arg_accepts_listed_kinds() {
        assert!(validate_arg("f", "x", &json!("s"), &[ValueKind::String]).is_ok());
        assert!(validate_arg("f", "x", &json!(1), &[ValueKind::String, ValueKind::Number]).is_ok());
    }

    #[test]
    fn validate_arg_names_caller_and_kinds() {
        let err = validate_arg("define", "path", &json!(1), &[ValueKind::String])
            .expect_err("number is not a string");
        assert_eq!(
            err.to_string(),
            "define() called with invalid arguments: path should be a string"
        );
        let err = validate_arg("f", "x", &json!(null), &[ValueKind::String, ValueKind::Object])
            .expect_err("null is neither");
        assert_matches!(
            err,
            CompositionError::InvalidArguments { expected, .. } if expected == "string/object"
        );
    }

    #[test]
    fn namespace_grammar() {
        for good in ["a", "a.b", "a.b.c", "snake_case.v2", "_x.y_"] {
            assert!(validate_namespace_name(good).is_ok(), "{good}");
        }
        for bad in ["", ".", "a.", ".a", "a..b", "a b", "a.-b", "a.b!"] {
            assert_matches!(
                validate_namespace_name(bad),
                Err(CompositionError::InvalidNamespaceName { .. }),
                "{bad}"
            );
        }
    }

    #[test]
    fn merge_is_shallow_and_overwrites() {
        let mut base = json!({"a": 1, "nested": {"x": 1}})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let overlay = json!({"b": 2, "nested": {"y": 2}})
            .as_object()
            .cloned()
            .unwrap_or_default();
        merge(&mut base, &overlay);
        assert_eq!(base.get("a"), Some(&json!(1)));
        assert_eq!(base.get("b"), Some(&json!(2)));
        // shallow: the whole nested object is replaced, not merged
        assert_eq!(base.get("nested"), Some(&json!({"y": 2})));
    }

    #[test]
    fn member_name_prefers_explicit() {
        assert_eq!(member_name("f", Some("a"), Some("b")).ok(), Some("a".into()));
        assert_eq!(member_name("f", None, Some("b")).ok(), Some("b".into()));
        assert_eq!(member_name("f", Some(""), Some("b")).ok(), Some("b".into()));
        assert_matches!(
            member_name("f", None, None),
            Err(CompositionError::InvalidArguments { .. })
        );
    }
}
