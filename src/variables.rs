//! Variable Registry: the `{{key}}` placeholders of a collection.

use crate::collection::Variable;
use std::collections::HashMap;

/// Deduplicated, insertion-ordered set of collection variables.
///
/// The first writer of a key wins: later registrations of the same key are ignored, whatever
/// value they carry. Registered placeholders take their value from the presets (the external
/// defaults source) or stay empty.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
    presets: HashMap<String, String>,
}

impl VariableRegistry {
    /// An empty registry with default values for placeholders.
    pub fn new(presets: HashMap<String, String>) -> Self {
        Self {
            variables: Vec::new(),
            presets,
        }
    }

    /// Add a variable with a fixed value, unless the key is already known.
    ///
    /// Returns whether the variable was added.
    pub fn seed(&mut self, key: &str, value: impl Into<String>) -> bool {
        if self.contains(key) {
            return false;
        }
        self.variables.push(Variable {
            id: uuid::Uuid::new_v4().to_string(),
            key: key.to_string(),
            value: value.into(),
            kind: "string".to_string(),
        });
        true
    }

    /// Register a discovered placeholder; its value is the preset for `key` or empty.
    pub fn register(&mut self, key: &str) -> bool {
        let value = self.presets.get(key).cloned().unwrap_or_default();
        self.seed(key, value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variables.iter().any(|v| v.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.key == key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn into_vec(self) -> Vec<Variable> {
        self.variables
    }
}
