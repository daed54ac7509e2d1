// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! ARM template resource elements

use serde_json::{json, Map, Value};
use std::path::Path;

use super::schema::{Exposure, SchemaGenerator};
use super::{mappings_file_name, Processor, ResourceElementTemplate, RetType};
use crate::config::ArmTemplateProperties;
use crate::definition::{ArtifactDetail, ArtifactType, ManifestArtifact, SupportingFile};
use crate::errors::{DefflowError, DefflowResult};

/// Publishes an ARM template as an artifact and exposes its parameters
#[derive(Debug, Clone)]
pub struct ArmTemplateProcessor {
    properties: ArmTemplateProperties,
    /// Template file content, uploaded unchanged
    content: Vec<u8>,
    /// The template's `parameters` block
    parameters: Map<String, Value>,
    expose_all: bool,
}

impl ArmTemplateProcessor {
    /// Read the template named by `properties` from `path`
    pub fn from_file(properties: ArmTemplateProperties, path: &Path) -> DefflowResult<Self> {
        let content = std::fs::read(path).map_err(|e| DefflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_bytes(properties, content, path)
    }

    pub fn from_bytes(
        properties: ArmTemplateProperties,
        content: Vec<u8>,
        path: &Path,
    ) -> DefflowResult<Self> {
        let template: Value =
            serde_json::from_slice(&content).map_err(|e| DefflowError::InvalidArmTemplate {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let parameters = match template.get("parameters") {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(DefflowError::InvalidArmTemplate {
                    path: path.to_path_buf(),
                    reason: "'parameters' is not an object".into(),
                })
            }
        };

        Ok(Self {
            expose_all: properties.expose_all_parameters,
            properties,
            content,
            parameters,
        })
    }

    fn artifact_file(&self) -> String {
        format!("{}.json", self.properties.artifact_name)
    }

    fn generator(&self) -> SchemaGenerator<'_> {
        SchemaGenerator::new(
            &self.properties.artifact_name,
            Exposure::Template {
                expose_all: self.expose_all,
            },
        )
    }

    /// The template parameters as a JSON schema
    fn source_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, parameter) in &self.parameters {
            let arm_type = parameter.get("type").and_then(Value::as_str).unwrap_or("string");
            properties.insert(name.clone(), json!({ "type": schema_type(arm_type) }));
            if parameter.get("defaultValue").is_none() {
                required.push(name.clone());
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    fn defaults(&self) -> Map<String, Value> {
        self.parameters
            .iter()
            .filter_map(|(name, parameter)| {
                parameter
                    .get("defaultValue")
                    .map(|default| (name.clone(), default.clone()))
            })
            .collect()
    }
}

impl Processor for ArmTemplateProcessor {
    fn name(&self) -> &str {
        &self.properties.artifact_name
    }

    fn artifact_manifest_list(&self) -> Vec<ManifestArtifact> {
        vec![ManifestArtifact {
            artifact_name: self.properties.artifact_name.clone(),
            artifact_type: ArtifactType::ArmTemplate,
            artifact_version: self.properties.version.clone(),
        }]
    }

    fn artifact_details(&self) -> DefflowResult<(Vec<ArtifactDetail>, Vec<SupportingFile>)> {
        let file = self.artifact_file();
        let detail = ArtifactDetail {
            artifact_name: self.properties.artifact_name.clone(),
            artifact_type: ArtifactType::ArmTemplate,
            artifact_version: self.properties.version.clone(),
            file: file.clone(),
        };
        Ok((vec![detail], vec![SupportingFile::new(file, self.content.clone())]))
    }

    fn resource_element_template(&self) -> DefflowResult<ResourceElementTemplate> {
        Ok(ResourceElementTemplate {
            name: self.properties.artifact_name.clone(),
            template_type: RetType::ArmResourceDefinition,
            artifact_name: self.properties.artifact_name.clone(),
            artifact_version: self.properties.version.clone(),
            mappings_file: mappings_file_name(self.name()),
        })
    }

    fn generate_schema(&self) -> DefflowResult<Map<String, Value>> {
        tracing::debug!(
            "Generating schema for '{}' (expose all: {})",
            self.name(),
            self.expose_all
        );
        Ok(self.generator().schema(&self.source_schema(), &self.defaults()))
    }

    fn generate_values_mappings(&self) -> DefflowResult<Map<String, Value>> {
        Ok(self.generator().mappings(&self.source_schema(), &self.defaults()))
    }
}

/// JSON schema type of an ARM parameter type
fn schema_type(arm_type: &str) -> &'static str {
    match arm_type.to_ascii_lowercase().as_str() {
        "int" => "integer",
        "bool" => "boolean",
        "object" | "secureobject" => "object",
        "array" => "array",
        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> ArmTemplateProperties {
        ArmTemplateProperties {
            artifact_name: "svc1".into(),
            version: "1.0.0".into(),
            file_path: "svc1.json".into(),
            ..Default::default()
        }
    }

    fn template() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "$schema": "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#",
            "parameters": {
                "vmName": {"type": "string"},
                "adminPassword": {"type": "securestring"},
                "count": {"type": "int", "defaultValue": 1},
                "location": {"type": "string", "defaultValue": "[resourceGroup().location]"}
            },
            "resources": []
        }))
        .unwrap()
    }

    fn processor() -> ArmTemplateProcessor {
        ArmTemplateProcessor::from_bytes(properties(), template(), Path::new("svc1.json")).unwrap()
    }

    fn exposing_processor() -> ArmTemplateProcessor {
        let properties = ArmTemplateProperties {
            expose_all_parameters: true,
            ..properties()
        };
        ArmTemplateProcessor::from_bytes(properties, template(), Path::new("svc1.json")).unwrap()
    }

    #[test]
    fn test_artifacts() {
        let processor = processor();
        let manifest = processor.artifact_manifest_list();
        let (details, files) = processor.artifact_details().unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].artifact_type, ArtifactType::ArmTemplate);
        assert_eq!(details[0].file, "svc1.json");
        assert_eq!(files[0].name, "svc1.json");
        assert_eq!(files[0].contents, template());
    }

    #[test]
    fn test_defaulted_parameters_are_fixed_by_default() {
        let schema = processor().generate_schema().unwrap();
        let svc = &schema["svc1"];

        assert_eq!(svc["properties"]["adminPassword"]["type"], "string");
        assert!(svc["properties"].get("count").is_none());
        assert!(svc["properties"].get("location").is_none());
        assert_eq!(svc["required"], json!(["vmName", "adminPassword"]));

        let mappings = processor().generate_values_mappings().unwrap();
        assert_eq!(mappings["count"], 1);
        assert_eq!(mappings["location"], "[resourceGroup().location]");
    }

    #[test]
    fn test_expose_all_parameters() {
        let schema = exposing_processor().generate_schema().unwrap();
        let svc = &schema["svc1"];

        assert_eq!(svc["properties"]["count"]["type"], "integer");
        assert_eq!(svc["properties"]["count"]["default"], 1);
        assert_eq!(
            svc["required"],
            json!(["vmName", "adminPassword", "location"])
        );

        let mappings = exposing_processor().generate_values_mappings().unwrap();
        assert_eq!(
            mappings["count"],
            "{configurationparameters('ConfigGroupSchema').svc1.count}"
        );
    }

    #[test]
    fn test_ret() {
        let ret = processor().resource_element_template().unwrap();

        assert_eq!(ret.template_type, RetType::ArmResourceDefinition);
        assert_eq!(ret.mappings_file, "svc1-mappings.json");
    }

    #[test]
    fn test_invalid_template() {
        let result = ArmTemplateProcessor::from_bytes(properties(), b"{".to_vec(), Path::new("x.json"));
        assert!(matches!(result, Err(DefflowError::InvalidArmTemplate { .. })));
    }
}
