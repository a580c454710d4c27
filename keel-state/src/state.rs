//! State file: the last-read state of every managed resource

use keel_core::resource::{ResourceData, ResourceState};
use serde::{Deserialize, Serialize};

/// Persisted document holding every managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Incremented on every write
    pub serial: u64,
    /// Identity of this state history; a write never crosses lineages
    pub lineage: String,
    /// Version of keel that last wrote this state
    pub keel_version: String,
    pub resources: Vec<StoredResource>,
}

/// One managed resource, addressed by the name the user gave it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    pub name: String,
    pub state: ResourceState,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            keel_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Prepare for a write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.keel_version = env!("CARGO_PKG_VERSION").to_string();
    }

    fn position(&self, resource_type: &str, name: &str) -> Option<usize> {
        self.resources
            .iter()
            .position(|r| r.state.resource_type == resource_type && r.name == name)
    }

    pub fn find(&self, resource_type: &str, name: &str) -> Option<&ResourceState> {
        self.position(resource_type, name).map(|i| &self.resources[i].state)
    }

    pub fn upsert(&mut self, name: impl Into<String>, state: ResourceState) {
        let name = name.into();
        match self.position(&state.resource_type, &name) {
            Some(i) => self.resources[i].state = state,
            None => self.resources.push(StoredResource { name, state }),
        }
    }

    pub fn remove(&mut self, resource_type: &str, name: &str) -> Option<ResourceState> {
        self.position(resource_type, name)
            .map(|i| self.resources.remove(i).state)
    }

    /// Store what a dispatcher operation left in `data`: its state when the
    /// resource exists, nothing when it is gone
    pub fn record(&mut self, resource_type: &str, name: &str, data: &ResourceData) {
        match data.state() {
            Some(state) => self.upsert(name, state.clone()),
            None => {
                self.remove(resource_type, name);
            }
        }
    }

    /// Declared attributes paired with the stored state, ready for the next
    /// dispatcher operation
    pub fn restore(&self, resource_type: &str, name: &str, data: ResourceData) -> ResourceData {
        match self.find(resource_type, name) {
            Some(state) => data.with_state(state.clone()),
            None => data,
        }
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}
