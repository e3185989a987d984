//! Typed parameter map handed to resources.

use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::envelope::Fault;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Plain JSON value (strings from forms and query strings land here too).
    Value(Value),
    /// Server-local file, e.g. a rehydrated upload.
    File(PathBuf),
    /// In-memory named byte source, e.g. a multipart file part.
    Part {
        /// Original file name supplied by the client.
        file_name: String,
        /// Raw bytes.
        data: Bytes,
    },
}

impl Param {
    /// Text view of the parameter, if it is a JSON string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for file and part values.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Param::File(_) | Param::Part { .. })
    }

    fn to_json(&self) -> Value {
        match self {
            Param::Value(v) => v.clone(),
            Param::File(path) => Value::from(path.to_string_lossy().into_owned()),
            Param::Part { file_name, .. } => Value::from(file_name.clone()),
        }
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param::Value(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Value(Value::from(value))
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Value(Value::from(value))
    }
}

impl From<PathBuf> for Param {
    fn from(path: PathBuf) -> Self {
        Param::File(path)
    }
}

/// Named parameters of a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Param>);

impl Params {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Param>) {
        self.0.insert(name.into(), value.into());
    }

    /// Looks up a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.get(name)
    }

    /// Looks up a string parameter.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Param::as_str)
    }

    /// Looks up a string parameter, failing with an invalid-parameter fault.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidParameter`] when the parameter is absent or not a string.
    pub fn require_str(&self, name: &str) -> Result<&str, Fault> {
        self.get_str(name)
            .ok_or_else(|| Fault::invalid_parameter(name, format!("parameter '{name}' is required")))
    }

    /// Looks up a file parameter.
    #[must_use]
    pub fn get_file(&self, name: &str) -> Option<&Path> {
        match self.get(name) {
            Some(Param::File(path)) => Some(path),
            _ => None,
        }
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` when any parameter is a file or a byte part.
    #[must_use]
    pub fn has_binary(&self) -> bool {
        self.0.values().any(Param::is_binary)
    }

    /// Iterates parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Param)> {
        self.0.iter()
    }

    /// Builds parameters from a JSON object; `null` yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidParameter`] when `value` is neither an object nor `null`.
    pub fn from_json(value: Value) -> Result<Self, Fault> {
        match value {
            Value::Object(map) => Ok(Self(
                map.into_iter().map(|(k, v)| (k, Param::Value(v))).collect(),
            )),
            Value::Null => Ok(Self::new()),
            other => Err(Fault::invalid_parameter(
                "params",
                format!("expected a JSON object, got {other}"),
            )),
        }
    }

    /// JSON object view; files become paths and parts their file names.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect::<Map<_, _>>(),
        )
    }
}

impl IntoIterator for Params {
    type Item = (String, Param);
    type IntoIter = std::collections::btree_map::IntoIter<String, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, Param)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, Param)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_rejects_non_objects() {
        let err = Params::from_json(json!([1, 2])).unwrap_err();
        assert_eq!(err.parameter(), Some("params"));
        assert!(Params::from_json(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn require_str_names_the_missing_parameter() {
        let params = Params::new().with("count", json!(3));
        let err = params.require_str("count").unwrap_err();
        assert_eq!(err.parameter(), Some("count"));
    }

    #[test]
    fn to_json_flattens_binary_values() {
        let params = Params::new()
            .with("msg", "hi")
            .with("doc", PathBuf::from("/tmp/a.txt"))
            .with(
                "part",
                Param::Part {
                    file_name: "b.bin".into(),
                    data: Bytes::from_static(b"xy"),
                },
            );
        assert!(params.has_binary());
        assert_eq!(
            params.to_json(),
            json!({"msg": "hi", "doc": "/tmp/a.txt", "part": "b.bin"})
        );
    }
}
