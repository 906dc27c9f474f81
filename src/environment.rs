//! Environment export: a Postman environment holding every collection variable.

use crate::collection::Variable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A Postman environment document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(rename = "_postman_variable_scope")]
    pub scope: String,
    pub values: Vec<EnvironmentValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentValue {
    pub key: String,
    pub value: String,
    pub enabled: bool,
    pub description: ValueDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDescription {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Environment {
    /// Environment named `[<ENVIRONMENT>] <title>` with one enabled value per variable.
    ///
    /// A variable without a value takes its preset, if any.
    pub fn from_variables(
        title: &str,
        environment: &str,
        variables: &[Variable],
        presets: &HashMap<String, String>,
    ) -> Self {
        let title = if title.is_empty() { "api" } else { title };
        let values = variables
            .iter()
            .map(|variable| EnvironmentValue {
                key: variable.key.clone(),
                value: if variable.value.is_empty() {
                    presets.get(&variable.key).cloned().unwrap_or_default()
                } else {
                    variable.value.clone()
                },
                enabled: true,
                description: ValueDescription {
                    content: String::new(),
                    kind: "text/plain".to_string(),
                },
            })
            .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: format!("[{}] {}", environment.to_uppercase(), title),
            scope: "environment".to_string(),
            values,
        }
    }
}
