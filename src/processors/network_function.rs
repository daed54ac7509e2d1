// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Network function resource elements
//!
//! References a network function definition version that is already
//! published. Its deploy parameters become the element's config-group
//! schema; the element's artifact is a small bicep template deploying the
//! network function, rendered here.

use serde_json::{json, Map, Value};
use tera::Context;

use super::schema::{Exposure, SchemaGenerator};
use super::{mappings_file_name, NfviType, Processor, ResourceElementTemplate, RetType};
use crate::config::{DesignConfig, NetworkFunctionProperties};
use crate::control_plane::{ControlPlane, DefinitionKind, PublisherScope, ResourceId};
use crate::definition::templates::NSD_NF_TEMPLATE;
use crate::definition::{ArtifactDetail, ArtifactType, ManifestArtifact, SupportingFile, TemplateRenderer};
use crate::errors::{DefflowError, DefflowResult};

/// Values always supplied by the design, never by the operator
const HARDCODED: &[&str] = &["location", "publisherName", "nfdgName", "publisherResourceGroup"];

const CONTAINERIZED: &str = "ContainerizedNetworkFunction";
const VIRTUAL: &str = "VirtualNetworkFunction";

/// Deploys a published network function definition version
#[derive(Debug, Clone)]
pub struct NetworkFunctionProcessor {
    properties: NetworkFunctionProperties,
    /// Version of the artifact, the design version it ships in
    artifact_version: String,
    /// Schema of one entry of the definition's deploy parameters
    deploy_parameters: Value,
    nfvi_type: NfviType,
    is_cnf: bool,
    application_names: Vec<String>,
}

impl NetworkFunctionProcessor {
    /// Read the referenced definition version from the control plane
    pub async fn fetch(
        properties: NetworkFunctionProperties,
        config: &DesignConfig,
        client: &dyn ControlPlane,
    ) -> DefflowResult<Self> {
        let id = ResourceId::DefinitionVersion {
            scope: PublisherScope {
                resource_group: properties.publisher_resource_group.clone(),
                publisher: properties.publisher.clone(),
            },
            kind: DefinitionKind::NetworkFunction,
            group: properties.name.clone(),
            version: properties.version.clone(),
        };

        tracing::info!("Reading {}", id);
        let definition = client.get(&id).await?.ok_or_else(|| DefflowError::InvalidDefinitionVersion {
            name: format!("{}/{}", properties.name, properties.version),
            reason: "it does not exist".into(),
            help: Some(format!(
                "Publish the network function definition to publisher '{}' before building the design",
                properties.publisher
            )),
        })?;

        Self::from_definition(properties, &definition, &config.nsd_version)
    }

    /// Build from a definition version resource as the control plane returns it
    pub fn from_definition(
        properties: NetworkFunctionProperties,
        definition: &Value,
        artifact_version: &str,
    ) -> DefflowResult<Self> {
        let invalid = |reason: &str| DefflowError::InvalidDefinitionVersion {
            name: format!("{}/{}", properties.name, properties.version),
            reason: format!("it {}", reason),
            help: None,
        };

        let props = definition
            .get("properties")
            .ok_or_else(|| invalid("has no properties"))?;

        let mut deploy_parameters = match props.get("deployParameters") {
            Some(Value::String(text)) => serde_json::from_str::<Value>(text)
                .map_err(|e| invalid(&format!("has unreadable deployParameters: {}", e)))?,
            Some(value @ Value::Object(_)) => value.clone(),
            _ => return Err(invalid("has no deployParameters")),
        };
        if let Some(map) = deploy_parameters.as_object_mut() {
            map.remove("$schema");
            map.remove("title");
        }

        let nf_template = props
            .get("networkFunctionTemplate")
            .ok_or_else(|| invalid("has no nfvi type"))?;
        let nfvi_type: NfviType = nf_template
            .get("nfviType")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| invalid("has no valid nfvi type"))?;

        let is_cnf = match props.get("networkFunctionType").and_then(Value::as_str) {
            Some(CONTAINERIZED) => true,
            Some(VIRTUAL) => false,
            other => {
                return Err(invalid(&format!(
                    "has invalid network function type {:?}",
                    other.unwrap_or("")
                )))
            }
        };

        let application_names = if is_cnf {
            nf_template
                .get("networkFunctionApplications")
                .and_then(Value::as_array)
                .map(|apps| {
                    apps.iter()
                        .filter_map(|app| app.get("name").and_then(Value::as_str))
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(Self {
            properties,
            artifact_version: artifact_version.to_string(),
            deploy_parameters,
            nfvi_type,
            is_cnf,
            application_names,
        })
    }

    fn artifact_file(&self) -> String {
        format!("{}.bicep", self.properties.name)
    }

    fn generator(&self) -> SchemaGenerator<'_> {
        SchemaGenerator::new(&self.properties.name, Exposure::Reference { hardcoded: HARDCODED })
    }

    /// Schema of the `configObject` parameter of the rendered template
    fn source_schema(&self) -> Value {
        let mut properties = json!({
            "location": {"type": "string"},
            "publisherName": {"type": "string"},
            "publisherResourceGroup": {"type": "string"},
            "nfdgName": {"type": "string"},
            "nfdv": {
                "type": "string",
                "description": format!(
                    "The version of the {} NFD to use. This version must be compatible with (have the same parameters exposed as) {}.",
                    self.properties.name, self.properties.version
                ),
            },
            "deployParameters": {
                "type": "array",
                "items": self.deploy_parameters,
            },
        });
        let mut required = vec![
            "location",
            "publisherName",
            "publisherResourceGroup",
            "nfdgName",
            "nfdv",
            "deployParameters",
        ];
        if self.nfvi_type != NfviType::AzureCore {
            properties["customLocationId"] = json!({
                "type": "string",
                "description": "The custom location ID of the Arc-enabled cluster the network function is deployed to.",
            });
            required.push("customLocationId");
        }

        json!({
            "type": "object",
            "properties": {
                "configObject": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            },
            "required": ["configObject"],
        })
    }

    fn defaults(&self) -> Map<String, Value> {
        let mut defaults = Map::new();
        defaults.insert(
            "configObject".into(),
            json!({
                "location": self.properties.publisher_offering_location,
                "publisherName": self.properties.publisher,
                "publisherResourceGroup": self.properties.publisher_resource_group,
                "nfdgName": self.properties.name,
            }),
        );
        defaults
    }

    fn render_template(&self) -> DefflowResult<String> {
        let mut context = Context::new();
        context.insert("nfdg_name", &self.properties.name);
        context.insert("offering_location", &self.properties.publisher_offering_location);
        context.insert("nfvi_type", &self.nfvi_type.to_string());
        context.insert("is_cnf", &self.is_cnf);
        context.insert("nf_application_names", &self.application_names);

        TemplateRenderer::new()?.render(NSD_NF_TEMPLATE, &context)
    }
}

impl Processor for NetworkFunctionProcessor {
    fn name(&self) -> &str {
        &self.properties.name
    }

    fn artifact_manifest_list(&self) -> Vec<ManifestArtifact> {
        vec![ManifestArtifact {
            artifact_name: self.properties.name.clone(),
            artifact_type: ArtifactType::ArmTemplate,
            artifact_version: self.artifact_version.clone(),
        }]
    }

    fn artifact_details(&self) -> DefflowResult<(Vec<ArtifactDetail>, Vec<SupportingFile>)> {
        let file = self.artifact_file();
        let detail = ArtifactDetail {
            artifact_name: self.properties.name.clone(),
            artifact_type: ArtifactType::ArmTemplate,
            artifact_version: self.artifact_version.clone(),
            file: file.clone(),
        };
        Ok((vec![detail], vec![SupportingFile::new(file, self.render_template()?)]))
    }

    fn resource_element_template(&self) -> DefflowResult<ResourceElementTemplate> {
        Ok(ResourceElementTemplate {
            name: self.properties.name.clone(),
            template_type: RetType::NetworkFunctionDefinition,
            artifact_name: self.properties.name.clone(),
            artifact_version: self.artifact_version.clone(),
            mappings_file: mappings_file_name(self.name()),
        })
    }

    fn generate_schema(&self) -> DefflowResult<Map<String, Value>> {
        Ok(self.generator().schema(&self.source_schema(), &self.defaults()))
    }

    fn generate_values_mappings(&self) -> DefflowResult<Map<String, Value>> {
        Ok(self.generator().mappings(&self.source_schema(), &self.defaults()))
    }

    fn nfvi_type(&self) -> Option<NfviType> {
        Some(self.nfvi_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> NetworkFunctionProperties {
        NetworkFunctionProperties {
            name: "ubuntu-nfdg".into(),
            version: "1.0.0".into(),
            publisher: "nf-publisher".into(),
            publisher_resource_group: "nf-rg".into(),
            publisher_offering_location: "uksouth".into(),
            ..Default::default()
        }
    }

    fn definition(nf_type: &str, nfvi_type: &str) -> Value {
        json!({
            "name": "1.0.0",
            "properties": {
                "networkFunctionType": nf_type,
                "deployParameters": "{\"$schema\":\"https://json-schema.org/draft-07/schema#\",\"title\":\"DeployParametersSchema\",\"type\":\"object\",\"properties\":{\"vmName\":{\"type\":\"string\"}},\"required\":[\"vmName\"]}",
                "networkFunctionTemplate": {
                    "nfviType": nfvi_type,
                    "networkFunctionApplications": [{"name": "app1"}, {"name": "app2"}]
                }
            }
        })
    }

    fn processor() -> NetworkFunctionProcessor {
        NetworkFunctionProcessor::from_definition(
            properties(),
            &definition(VIRTUAL, "AzureCore"),
            "2.0.0",
        )
        .unwrap()
    }

    #[test]
    fn test_schema_excludes_hardcoded_values() {
        let schema = processor().generate_schema().unwrap();
        let nf = &schema["ubuntu-nfdg"];

        assert_eq!(nf["required"], json!(["nfdv", "deployParameters"]));
        assert!(nf["properties"].get("location").is_none());
        let items = &nf["properties"]["deployParameters"]["items"];
        assert!(items.get("$schema").is_none());
        assert_eq!(items["properties"]["vmName"]["type"], "string");
    }

    #[test]
    fn test_arc_nfs_need_a_custom_location() {
        let processor = NetworkFunctionProcessor::from_definition(
            properties(),
            &definition(CONTAINERIZED, "AzureArcKubernetes"),
            "2.0.0",
        )
        .unwrap();

        let schema = processor.generate_schema().unwrap();
        assert!(schema["ubuntu-nfdg"]["properties"]
            .get("customLocationId")
            .is_some());
        assert_eq!(processor.nfvi_type(), Some(NfviType::AzureArcKubernetes));
    }

    #[test]
    fn test_mappings_keep_hardcoded_values() {
        let mappings = processor().generate_values_mappings().unwrap();
        let config = &mappings["configObject"];

        assert_eq!(config["location"], "uksouth");
        assert_eq!(config["nfdgName"], "ubuntu-nfdg");
        assert_eq!(
            config["nfdv"],
            "{configurationparameters('ConfigGroupSchema').ubuntu-nfdg.nfdv}"
        );
    }

    #[test]
    fn test_rendered_artifact() {
        let processor = NetworkFunctionProcessor::from_definition(
            properties(),
            &definition(CONTAINERIZED, "AzureCore"),
            "2.0.0",
        )
        .unwrap();
        let (details, files) = processor.artifact_details().unwrap();

        assert_eq!(details[0].file, "ubuntu-nfdg.bicep");
        assert_eq!(details[0].artifact_version, "2.0.0");
        let text = String::from_utf8(files[0].contents.clone()).unwrap();
        assert!(text.contains("param configObject object"));
        assert!(text.contains("nfviType: 'AzureCore'"));
        assert!(text.contains(r#"'{"name": "app2"}'"#));
    }

    #[test]
    fn test_unknown_function_type() {
        let result =
            NetworkFunctionProcessor::from_definition(properties(), &definition("Other", "AzureCore"), "1.0.0");
        assert!(matches!(
            result,
            Err(DefflowError::InvalidDefinitionVersion { name, .. }) if name == "ubuntu-nfdg/1.0.0"
        ));
    }
}
