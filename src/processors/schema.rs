// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Config-group schema and value mapping generation
//!
//! A processor describes its input as a JSON schema plus a set of default
//! values. From those two it derives which parameters the operator must
//! supply at deploy time (the schema) and how each template parameter is
//! filled in (the mappings): either a hard-coded value or a reference to a
//! config-group value.

use serde_json::{json, Map, Value};

use crate::constants::CGS_NAME;

/// ARM expression the control plane refuses as a config-group default
const RESOURCE_GROUP_LOCATION: &str = "[resourceGroup().location]";

/// Root object of referenced definitions, not part of parameter names
const ROOT_OBJECT: &str = "configObject";

/// How a processor decides which parameters to expose
#[derive(Debug, Clone, Copy)]
pub enum Exposure<'a> {
    /// Required parameters always, everything else when `expose_all` is set
    Template { expose_all: bool },
    /// Required parameters only; `hardcoded` names are never exposed
    Reference { hardcoded: &'a [&'a str] },
}

/// Schema and mapping generator for one processor
#[derive(Debug, Clone, Copy)]
pub struct SchemaGenerator<'a> {
    /// Processor name, the top-level key of everything generated
    pub name: &'a str,
    pub exposure: Exposure<'a>,
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(name: &'a str, exposure: Exposure<'a>) -> Self {
        Self { name, exposure }
    }

    /// `{ name: { type, properties, required } }`, or empty when nothing is exposed
    pub fn schema(&self, source: &Value, defaults: &Map<String, Value>) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        match self.exposure {
            Exposure::Template { expose_all } => {
                template_schema(source, defaults, None, expose_all, &mut properties, &mut required)
            }
            Exposure::Reference { hardcoded } => {
                reference_schema(source, defaults, None, hardcoded, &mut properties, &mut required)
            }
        }

        let mut schema = Map::new();
        if !properties.is_empty() {
            schema.insert(
                self.name.to_string(),
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }),
            );
        }
        schema
    }

    /// Value for every template parameter: a hard-coded default or a config-group reference
    pub fn mappings(&self, source: &Value, defaults: &Map<String, Value>) -> Map<String, Value> {
        match self.exposure {
            Exposure::Template { expose_all } => self.template_mappings(source, defaults, None, expose_all),
            Exposure::Reference { hardcoded } => {
                self.reference_mappings(source, defaults.clone(), None, hardcoded)
            }
        }
    }

    fn template_mappings(
        &self,
        schema: &Value,
        defaults: &Map<String, Value>,
        prefix: Option<&str>,
        expose_all: bool,
    ) -> Map<String, Value> {
        let mut mappings = Map::new();
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return mappings;
        };

        for (prop, details) in properties {
            let param_name = prefixed(prefix, prop);

            if details.get("properties").is_some() {
                let child_defaults = object_or_empty(defaults.get(prop));
                mappings.insert(
                    prop.clone(),
                    Value::Object(self.template_mappings(
                        details,
                        &child_defaults,
                        Some(&param_name),
                        expose_all,
                    )),
                );
            } else if lacks_default(defaults, prop) && is_required(schema, prop) {
                mappings.insert(prop.clone(), self.reference(&param_name));
            } else if expose_all {
                mappings.insert(prop.clone(), self.reference(&param_name));
            } else if let Some(value) = defaults.get(prop) {
                mappings.insert(prop.clone(), value.clone());
            }
        }

        mappings
    }

    fn reference_mappings(
        &self,
        schema: &Value,
        mut mapping: Map<String, Value>,
        prefix: Option<&str>,
        hardcoded: &[&str],
    ) -> Map<String, Value> {
        let prefix = prefix.filter(|p| *p != ROOT_OBJECT);
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return mapping;
        };

        for (prop, details) in properties {
            let param_name = prefixed(prefix, prop);

            if hardcoded.contains(&prop.as_str()) {
                continue;
            }

            if is_required(schema, prop) && !mapping.contains_key(prop) {
                let value = if details.get("properties").is_some() {
                    Value::Object(self.reference_mappings(details, Map::new(), Some(&param_name), hardcoded))
                } else {
                    self.reference(&param_name)
                };
                mapping.insert(prop.clone(), value);
            } else if details.get("properties").is_some() {
                if let Some(existing) = mapping.get(prop) {
                    let child = object_or_empty(Some(existing));
                    let value = self.reference_mappings(details, child, Some(&param_name), hardcoded);
                    mapping.insert(prop.clone(), Value::Object(value));
                }
            }
        }

        mapping
    }

    fn reference(&self, param_name: &str) -> Value {
        Value::String(format!(
            "{{configurationparameters('{}').{}.{}}}",
            CGS_NAME, self.name, param_name
        ))
    }
}

fn template_schema(
    source: &Value,
    defaults: &Map<String, Value>,
    prefix: Option<&str>,
    expose_all: bool,
    properties: &mut Map<String, Value>,
    required: &mut Vec<String>,
) {
    let Some(source_properties) = source.get("properties").and_then(Value::as_object) else {
        return;
    };

    for (prop, details) in source_properties {
        let param_name = prefixed(prefix, prop);

        if lacks_default(defaults, prop) && is_required(source, prop) {
            required.push(param_name.clone());
            properties.insert(param_name, details.clone());
        } else if details.get("properties").is_some() {
            let child_defaults = object_or_empty(defaults.get(prop));
            template_schema(
                details,
                &child_defaults,
                Some(&param_name),
                expose_all,
                properties,
                required,
            );
        } else if expose_all {
            let mut details = details.clone();
            if let Some(default) = defaults.get(prop) {
                // the control plane wants null spelled as a string
                let default = if default.is_null() {
                    Value::String("null".into())
                } else {
                    default.clone()
                };
                details["default"] = default;
            }
            if details.get("default").and_then(Value::as_str) == Some(RESOURCE_GROUP_LOCATION) {
                if let Some(map) = details.as_object_mut() {
                    map.remove("default");
                }
                required.push(param_name.clone());
            }
            properties.insert(param_name, details);
        }
    }
}

fn reference_schema(
    source: &Value,
    defaults: &Map<String, Value>,
    prefix: Option<&str>,
    hardcoded: &[&str],
    properties: &mut Map<String, Value>,
    required: &mut Vec<String>,
) {
    let prefix = prefix.filter(|p| *p != ROOT_OBJECT);
    let Some(source_properties) = source.get("properties").and_then(Value::as_object) else {
        return;
    };

    for (prop, details) in source_properties {
        let param_name = prefixed(prefix, prop);

        if hardcoded.contains(&prop.as_str()) {
            continue;
        }

        if is_required(source, prop) && !defaults.contains_key(prop) {
            if details.get("properties").is_some() {
                reference_schema(details, &Map::new(), Some(&param_name), hardcoded, properties, required);
            } else {
                required.push(param_name.clone());
                properties.insert(param_name, details.clone());
            }
        } else if details.get("properties").is_some() {
            if let Some(child) = defaults.get(prop) {
                let child_defaults = object_or_empty(Some(child));
                reference_schema(
                    details,
                    &child_defaults,
                    Some(&param_name),
                    hardcoded,
                    properties,
                    required,
                );
            }
        }
    }
}

fn prefixed(prefix: Option<&str>, prop: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}_{}", prefix, prop),
        None => prop.to_string(),
    }
}

fn is_required(schema: &Value, prop: &str) -> bool {
    schema
        .get("required")
        .and_then(Value::as_array)
        .is_some_and(|names| names.iter().any(|n| n.as_str() == Some(prop)))
}

fn lacks_default(defaults: &Map<String, Value>, prop: &str) -> bool {
    defaults.get(prop).map_or(true, Value::is_null)
}

fn object_or_empty(value: Option<&Value>) -> Map<String, Value> {
    value
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Wrap schema properties in a draft-07 document
pub fn schema_document(title: &str, properties: Map<String, Value>, required: Vec<String>) -> Value {
    let mut document = json!({
        "$schema": crate::constants::SCHEMA_DRAFT,
        "title": title,
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        document["required"] = json!(required);
    }
    document
}
