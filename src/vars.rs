//! Variable Table
//!
//! Builds the `key=value` mapping a template renders against.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use thiserror::Error;

use crate::template::Value;

/// An entry that is not a usable `key=value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed variable {entry:?}: {reason}")]
pub struct MalformedVariableError {
    pub entry: String,
    pub reason: String,
}

impl MalformedVariableError {
    fn new(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

/// String variables in first-insertion order. Later writes win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    vars: IndexMap<String, String>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `key=value` entries.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, MalformedVariableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for entry in entries {
            table.insert_entry(entry.as_ref())?;
        }
        Ok(table)
    }

    /// Split on the first `=`; `a=b=c` sets `a` to `b=c`.
    pub fn insert_entry(&mut self, entry: &str) -> Result<(), MalformedVariableError> {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| MalformedVariableError::new(entry, "expected key=value"))?;
        if key.is_empty() {
            return Err(MalformedVariableError::new(entry, "empty key"));
        }
        self.insert(key, value);
        Ok(())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Merge a YAML mapping of scalars. Strings, numbers and booleans are
    /// stored as text.
    pub fn merge_yaml(&mut self, source: &str) -> Result<(), MalformedVariableError> {
        let doc: serde_yaml::Value = serde_yaml::from_str(source)
            .map_err(|e| MalformedVariableError::new("<secrets>", e.to_string()))?;
        let mapping = match doc {
            serde_yaml::Value::Mapping(mapping) => mapping,
            // an empty document
            serde_yaml::Value::Null => return Ok(()),
            _ => {
                return Err(MalformedVariableError::new(
                    "<secrets>",
                    "expected a mapping of variables",
                ))
            }
        };
        for (key, value) in mapping {
            let key = scalar_text(&key).ok_or_else(|| {
                MalformedVariableError::new(format!("{:?}", key), "key must be a scalar")
            })?;
            if key.is_empty() {
                return Err(MalformedVariableError::new(key, "empty key"));
            }
            let value = scalar_text(&value).ok_or_else(|| {
                MalformedVariableError::new(key.clone(), "value must be a string, number or boolean")
            })?;
            self.insert(key, value);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The table as template data: a map of strings.
    pub fn to_value(&self) -> Value {
        let map: BTreeMap<String, Value> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
            .collect();
        Value::Map(map)
    }
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
