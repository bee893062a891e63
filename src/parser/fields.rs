// ABOUTME: Typed accessors over raw YAML documents that track field paths
// ABOUTME: Shared by the normalizer and every engine-specific step reader

use serde_yaml::{Mapping, Value};

use super::error::{Result, SpecError};

pub(crate) fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

pub(crate) fn index(path: &str, idx: usize) -> String {
    format!("{}[{}]", path, idx)
}

pub(crate) fn mapping<'a>(value: &'a Value, path: &str) -> Result<&'a Mapping> {
    value.as_mapping().ok_or_else(|| SpecError::InvalidType {
        path: path.to_string(),
        expected: "a mapping",
    })
}

pub(crate) fn sequence<'a>(value: &'a Value, path: &str) -> Result<&'a [Value]> {
    value
        .as_sequence()
        .map(|items| items.as_slice())
        .ok_or_else(|| SpecError::InvalidType {
            path: path.to_string(),
            expected: "a sequence",
        })
}

pub(crate) fn required<'a>(value: &'a Value, key: &str, path: &str) -> Result<&'a Value> {
    match value.get(key) {
        Some(found) if !found.is_null() => Ok(found),
        _ => Err(SpecError::MissingField {
            path: child(path, key),
        }),
    }
}

/// Render a scalar as text; numbers and booleans keep their YAML spelling
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

pub(crate) fn optional_string(value: &Value, key: &str, path: &str) -> Result<Option<String>> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(found) => scalar_string(found)
            .map(Some)
            .ok_or_else(|| SpecError::InvalidType {
                path: child(path, key),
                expected: "a scalar",
            }),
    }
}

pub(crate) fn required_string(value: &Value, key: &str, path: &str) -> Result<String> {
    optional_string(value, key, path)?.ok_or_else(|| SpecError::MissingField {
        path: child(path, key),
    })
}

/// Accept a single scalar or a sequence of scalars; absent means empty
pub(crate) fn string_list(value: Option<&Value>, path: &str) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                scalar_string(item).ok_or_else(|| SpecError::InvalidType {
                    path: index(path, idx),
                    expected: "a scalar",
                })
            })
            .collect(),
        Some(other) => scalar_string(other)
            .map(|single| vec![single])
            .ok_or_else(|| SpecError::InvalidType {
                path: path.to_string(),
                expected: "a scalar or a sequence of scalars",
            }),
    }
}
