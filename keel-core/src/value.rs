//! Value - Typed attribute values and dotted-path field access
//!
//! Declared configuration, wire parameters and vendor responses all share this
//! representation. Maps are ordered so that anything built from them
//! (parameters, serialized state) is deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered attribute map
pub type ValueMap = BTreeMap<String, Value>;

/// Attribute value of a resource, a wire parameter or a response node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(ValueMap),
}

/// Error returned by path access
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessError {
    #[error("path '{path}' not found")]
    PathNotFound { path: String },

    #[error("type mismatch at '{path}': cannot descend into {found}")]
    TypeMismatch { path: String, found: &'static str },
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for null and for the zero value of each type
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Render a scalar the way it is sent in a form-encoded parameter
    pub fn to_param_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Look up a dot-separated path such as `Result.LoadBalancerId`.
    ///
    /// Segments address map keys; on a list a segment must be a zero-based
    /// index. A null intermediate node counts as absent. A null leaf is
    /// returned as `Value::Null`.
    pub fn get_path(&self, path: &str) -> Result<&Value, AccessError> {
        if path.is_empty() {
            return Ok(self);
        }

        let mut current = self;
        let mut walked = String::new();
        for segment in path.split('.') {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);

            current = match current {
                Value::Map(map) => map.get(segment).ok_or_else(|| AccessError::PathNotFound {
                    path: walked.clone(),
                })?,
                Value::List(items) => {
                    let index: usize =
                        segment
                            .parse()
                            .map_err(|_| AccessError::TypeMismatch {
                                path: walked.clone(),
                                found: "List",
                            })?;
                    items.get(index).ok_or_else(|| AccessError::PathNotFound {
                        path: walked.clone(),
                    })?
                }
                Value::Null => return Err(AccessError::PathNotFound { path: walked }),
                other => {
                    return Err(AccessError::TypeMismatch {
                        path: walked,
                        found: other.type_name(),
                    });
                }
            };
        }
        Ok(current)
    }

    /// Look up a path that must hold a string
    pub fn get_str_path(&self, path: &str) -> Result<&str, AccessError> {
        let value = self.get_path(path)?;
        match value {
            Value::String(s) => Ok(s),
            Value::Null => Err(AccessError::PathNotFound {
                path: path.to_string(),
            }),
            other => Err(AccessError::TypeMismatch {
                path: path.to_string(),
                found: other.type_name(),
            }),
        }
    }

    /// Set the value at a dot-separated path, creating intermediate maps
    /// for missing or null nodes
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), AccessError> {
        let segments: Vec<&str> = path.split('.').collect();
        let mut current = self;
        let mut walked = String::new();

        for (i, segment) in segments.iter().enumerate() {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);
            let last = i + 1 == segments.len();

            if current.is_null() {
                *current = Value::Map(ValueMap::new());
            }

            current = match current {
                Value::Map(map) => {
                    if last {
                        map.insert(segment.to_string(), value);
                        return Ok(());
                    }
                    map.entry(segment.to_string()).or_insert(Value::Null)
                }
                Value::List(items) => {
                    let index: usize =
                        segment
                            .parse()
                            .map_err(|_| AccessError::TypeMismatch {
                                path: walked.clone(),
                                found: "List",
                            })?;
                    let slot = items
                        .get_mut(index)
                        .ok_or_else(|| AccessError::PathNotFound {
                            path: walked.clone(),
                        })?;
                    if last {
                        *slot = value;
                        return Ok(());
                    }
                    slot
                }
                other => {
                    return Err(AccessError::TypeMismatch {
                        path: walked,
                        found: other.type_name(),
                    });
                }
            };
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::List(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}
