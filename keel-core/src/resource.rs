//! Resource - Declared configuration and last-known remote state

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueMap};

/// Last-known remote representation of one resource instance, flattened to
/// schema attribute names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "clb_listener")
    pub resource_type: String,
    /// Vendor identifier (e.g., "lsn-xxx")
    pub id: String,
    pub attributes: ValueMap,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes: ValueMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Desired state for one resource instance, together with its identity and
/// the state read back on the previous pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: Option<String>,
    attributes: ValueMap,
    state: Option<ResourceState>,
}

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared configuration with no prior state (first create)
    pub fn from_attributes(attributes: ValueMap) -> Self {
        Self {
            id: None,
            attributes,
            state: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach prior state; the id follows the state
    pub fn with_state(mut self, state: ResourceState) -> Self {
        self.id = Some(state.id.clone());
        self.state = Some(state);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Record the vendor identifier; an empty id marks the resource as gone
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if id.is_empty() {
            self.clear();
        } else {
            self.id = Some(id);
        }
    }

    /// Forget identity and state (resource no longer exists)
    pub fn clear(&mut self) {
        self.id = None;
        self.state = None;
    }

    pub fn attributes(&self) -> &ValueMap {
        &self.attributes
    }

    pub fn state(&self) -> Option<&ResourceState> {
        self.state.as_ref()
    }

    pub(crate) fn set_state(&mut self, state: ResourceState) {
        self.id = Some(state.id.clone());
        self.state = Some(state);
    }

    /// Declared value, falling back to the last-read state
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes
            .get(key)
            .or_else(|| self.state.as_ref().and_then(|s| s.get(key)))
    }

    /// Declared value only if it is set to something other than its zero value
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_zero())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Whether the declared value differs from the last-read state. An
    /// attribute absent from the declaration is not a change.
    pub fn has_change(&self, key: &str) -> bool {
        match self.attributes.get(key) {
            None => false,
            Some(new) => {
                let old = self.state.as_ref().and_then(|s| s.get(key));
                match old {
                    Some(old) => old != new,
                    None => !new.is_null(),
                }
            }
        }
    }

    pub fn has_changes(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.has_change(k))
    }

    /// (old, new) pair for an attribute
    pub fn get_change(&self, key: &str) -> (Option<&Value>, Option<&Value>) {
        (
            self.state.as_ref().and_then(|s| s.get(key)),
            self.attributes.get(key),
        )
    }
}
