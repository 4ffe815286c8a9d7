//! Normalization of the permissive shapes compose files allow
//!
//! Every helper takes a raw tree node and returns one canonical Rust shape, so
//! decode logic never has to care whether a field was written as a list or a
//! mapping, a string or a number.

use crate::commons::{Delay, KeyValue};
use serde_yaml::Value;

/// Field of a mapping node, treating explicit nulls as absent
pub(crate) fn field<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    match node.get(key) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

/// Scalar rendered as text
pub(crate) fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar(&tagged.value),
        _ => None,
    }
}

/// Scalar field rendered as text
pub(crate) fn string(node: &Value, key: &str) -> Option<String> {
    field(node, key).and_then(scalar)
}

/// Boolean field, accepting `true`/`false` strings
pub(crate) fn boolean(node: &Value, key: &str) -> Option<bool> {
    match field(node, key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Unsigned integer field, accepting numeric strings
pub(crate) fn unsigned(node: &Value, key: &str) -> Option<u64> {
    match field(node, key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Unsigned 32-bit field
pub(crate) fn unsigned32(node: &Value, key: &str) -> Option<u32> {
    unsigned(node, key).and_then(|n| u32::try_from(n).ok())
}

/// Floating point field
pub(crate) fn float(node: &Value, key: &str) -> Option<f64> {
    match field(node, key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// External flag: a boolean, or the legacy `{name: ...}` mapping
pub(crate) fn external(node: &Value) -> Option<bool> {
    match field(node, "external")? {
        Value::Bool(b) => Some(*b),
        Value::Mapping(_) => Some(true),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Duration field; malformed values are logged and dropped
pub(crate) fn delay(node: &Value, key: &str) -> Option<Delay> {
    let raw = string(node, key)?;
    match raw.parse() {
        Ok(delay) => Some(delay),
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", key, e);
            None
        }
    }
}

/// Keyword field parsed with `parse`; unknown keywords are logged and dropped
pub(crate) fn keyword<T>(node: &Value, key: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let raw = string(node, key)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        tracing::warn!("Ignoring unknown {} '{}'", key, raw);
    }
    parsed
}

/// Entries of a mapping node, in document order
pub(crate) fn entries(node: Option<&Value>) -> Vec<(String, &Value)> {
    match node {
        Some(Value::Mapping(map)) => map
            .iter()
            .filter_map(|(key, value)| scalar(key).map(|key| (key, value)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Name list written either as a sequence or as a mapping whose keys are the
/// names. Mapping values are ignored.
pub(crate) fn names(node: Option<&Value>) -> Vec<String> {
    match node {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar).collect(),
        Some(Value::Mapping(map)) => map.keys().filter_map(scalar).collect(),
        _ => Vec::new(),
    }
}

/// Reference list in short (`- name`) or long (`- source: name`) syntax
pub(crate) fn references(node: Option<&Value>) -> Vec<String> {
    match node {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Mapping(_) => string(item, "source"),
                other => scalar(other),
            })
            .collect(),
        other => names(other),
    }
}

/// `KEY=VALUE` pairs written either as a sequence of strings or as a mapping.
///
/// Sequence entries split on the first `=`; a bare key has no value. Mapping
/// entries with a null value have no value.
pub(crate) fn pairs(node: Option<&Value>) -> Vec<(String, Option<String>)> {
    match node {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(scalar)
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), Some(value.to_string())),
                None => (entry, None),
            })
            .collect(),
        Some(Value::Mapping(map)) => map
            .iter()
            .filter_map(|(key, value)| scalar(key).map(|key| (key, scalar(value))))
            .collect(),
        _ => Vec::new(),
    }
}

/// Attribute-value pairs in either shape
pub(crate) fn key_values(node: Option<&Value>) -> Vec<KeyValue> {
    pairs(node)
        .into_iter()
        .map(|(key, value)| KeyValue::new(&key, value.as_deref()))
        .collect()
}

/// String list; a single scalar counts as a one-item list
pub(crate) fn strings(node: Option<&Value>) -> Vec<String> {
    match node {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar).collect(),
        Some(other) => scalar(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Command-like field: a literal token list, or a string split on whitespace.
///
/// Shell quoting is not interpreted, so `sh -c "a b"` becomes four tokens.
pub(crate) fn tokens(node: Option<&Value>) -> Option<Vec<String>> {
    match node? {
        Value::Sequence(items) => Some(items.iter().filter_map(scalar).collect()),
        other => scalar(other).map(|s| s.split_whitespace().map(str::to_string).collect()),
    }
}
