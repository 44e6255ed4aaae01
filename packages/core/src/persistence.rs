//! Saved session state.
//!
//! Only essential cells that were written are stored, keyed by component
//! name and essential key. A component created later (for example by a
//! code editor's results) picks its values up when it is built.

use crate::error::{CoreError, CoreResult};
use crate::value::StateValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PERSISTED_VERSION: u32 = 1;

fn current_version() -> u32 {
    PERSISTED_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedVariant {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default = "current_version")]
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<SavedVariant>,

    #[serde(default)]
    pub cells: BTreeMap<String, BTreeMap<String, StateValue>>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: PERSISTED_VERSION,
            variant: None,
            cells: BTreeMap::new(),
        }
    }
}

impl PersistedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        let state: Self =
            serde_json::from_str(json).map_err(|e| CoreError::Persistence(e.to_string()))?;
        if state.version > PERSISTED_VERSION {
            return Err(CoreError::Persistence(format!(
                "unsupported version {} (expected at most {})",
                state.version, PERSISTED_VERSION
            )));
        }
        Ok(state)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Persistence(e.to_string()))
    }

    pub fn value(&self, component: &str, key: &str) -> Option<&StateValue> {
        self.cells.get(component).and_then(|cells| cells.get(key))
    }

    pub fn set(&mut self, component: &str, key: &str, value: StateValue) {
        self.cells
            .entry(component.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn remove_component(&mut self, component: &str) {
        self.cells.remove(component);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
