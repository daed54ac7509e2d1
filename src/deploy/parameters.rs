// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Mapping local values onto a template's declared parameters

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::{DefflowError, DefflowResult};

/// Values passed to one deployment, `{ name: { "value": v } }`
///
/// Only names the template declares are included. A declared parameter
/// without a value and without a `defaultValue` is an error.
pub fn parameter_set(
    template_name: &str,
    template: &Value,
    values: &Map<String, Value>,
) -> DefflowResult<Map<String, Value>> {
    let Some(declared) = template.get("parameters").and_then(Value::as_object) else {
        return Ok(Map::new());
    };

    let mut set = Map::new();
    let mut missing = Vec::new();

    for (name, declaration) in declared {
        match values.get(name) {
            Some(value) => {
                set.insert(name.clone(), json!({ "value": value }));
            }
            None if declaration.get("defaultValue").is_some() => {}
            None => missing.push(name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(DefflowError::MissingTemplateParameters {
            template: template_name.to_string(),
            parameters: missing,
        });
    }

    Ok(set)
}

/// Parameters of a site network service that are not flat configuration
/// values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraParameters {
    /// Linked site records
    #[serde(default)]
    pub sites: Vec<Value>,
    /// Config group values, one per resource element
    #[serde(default)]
    pub config_group_values: Vec<Value>,
}

impl ExtraParameters {
    /// Parse the content of a linked-resources file
    pub fn from_slice(content: &[u8]) -> DefflowResult<Self> {
        Ok(serde_json::from_slice(content)?)
    }

    /// Add the extra values to a value map, replacing same-named values
    pub fn apply(&self, values: &mut Map<String, Value>) {
        values.insert("sites".into(), Value::Array(self.sites.clone()));
        values.insert(
            "configGroupValues".into(),
            Value::Array(self.config_group_values.clone()),
        );
    }
}
