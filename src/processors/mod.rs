// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Resource element processors
//!
//! One processor per resource element of a design. Each turns its typed
//! input into the artifacts to publish, the resource element template for
//! the design version, and the config-group schema fragment operators fill
//! in at deploy time.

mod arm_template;
mod network_function;
pub mod schema;

pub use arm_template::ArmTemplateProcessor;
pub use network_function::NetworkFunctionProcessor;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::config::{DesignConfig, ResourceElement};
use crate::control_plane::ControlPlane;
use crate::definition::{ArtifactDetail, ManifestArtifact, SupportingFile};
use crate::errors::{DefflowError, DefflowResult};

/// Platform a network function is deployed onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NfviType {
    AzureCore,
    AzureArcKubernetes,
    AzureOperatorNexus,
}

impl fmt::Display for NfviType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AzureCore => "AzureCore",
            Self::AzureArcKubernetes => "AzureArcKubernetes",
            Self::AzureOperatorNexus => "AzureOperatorNexus",
        };
        write!(f, "{}", name)
    }
}

/// Resource element template type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetType {
    ArmResourceDefinition,
    NetworkFunctionDefinition,
}

/// A processor's contribution to the design version's resource elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceElementTemplate {
    pub name: String,
    pub template_type: RetType,
    pub artifact_name: String,
    pub artifact_version: String,
    /// Supporting file holding the parameter value mappings
    pub mappings_file: String,
}

/// Operations every resource element processor provides
pub trait Processor {
    /// Name of the resource element, used to scope its parameters
    fn name(&self) -> &str;

    /// Artifacts the publish manifest must list
    fn artifact_manifest_list(&self) -> Vec<ManifestArtifact>;

    /// Artifacts to upload plus the local files holding them
    fn artifact_details(&self) -> DefflowResult<(Vec<ArtifactDetail>, Vec<SupportingFile>)>;

    /// Fragment contributed to the design version
    fn resource_element_template(&self) -> DefflowResult<ResourceElementTemplate>;

    /// Config-group schema properties, keyed by processor name
    fn generate_schema(&self) -> DefflowResult<Map<String, Value>>;

    /// Template parameter values: hard-coded or config-group references
    fn generate_values_mappings(&self) -> DefflowResult<Map<String, Value>>;

    /// Platform the element deploys onto, for elements that have one
    fn nfvi_type(&self) -> Option<NfviType> {
        None
    }
}

/// Processor for one resource element kind
#[derive(Debug, Clone)]
pub enum ResourceProcessor {
    ArmTemplate(ArmTemplateProcessor),
    NetworkFunction(NetworkFunctionProcessor),
}

impl ResourceProcessor {
    fn inner(&self) -> &dyn Processor {
        match self {
            Self::ArmTemplate(p) => p,
            Self::NetworkFunction(p) => p,
        }
    }
}

impl Processor for ResourceProcessor {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn artifact_manifest_list(&self) -> Vec<ManifestArtifact> {
        self.inner().artifact_manifest_list()
    }

    fn artifact_details(&self) -> DefflowResult<(Vec<ArtifactDetail>, Vec<SupportingFile>)> {
        self.inner().artifact_details()
    }

    fn resource_element_template(&self) -> DefflowResult<ResourceElementTemplate> {
        self.inner().resource_element_template()
    }

    fn generate_schema(&self) -> DefflowResult<Map<String, Value>> {
        self.inner().generate_schema()
    }

    fn generate_values_mappings(&self) -> DefflowResult<Map<String, Value>> {
        self.inner().generate_values_mappings()
    }

    fn nfvi_type(&self) -> Option<NfviType> {
        self.inner().nfvi_type()
    }
}

/// Build one processor per resource element, in input order
///
/// Network function elements read their published definition through
/// `client`; a design with such elements and no client is rejected. Any
/// failure aborts the whole list.
pub async fn build_processors(
    config: &DesignConfig,
    client: Option<&dyn ControlPlane>,
) -> DefflowResult<Vec<ResourceProcessor>> {
    let mut processors = Vec::new();

    for element in config.resource_elements()? {
        let processor = match element {
            ResourceElement::ArmTemplate(properties) => {
                let path = config.resolve_path(&properties.file_path);
                ResourceProcessor::ArmTemplate(ArmTemplateProcessor::from_file(properties, &path)?)
            }
            ResourceElement::NetworkFunction(properties) => {
                let client = client.ok_or_else(|| {
                    DefflowError::invalid_config(vec![format!(
                        "network function '{}' needs access to the control plane",
                        properties.name
                    )])
                })?;
                ResourceProcessor::NetworkFunction(
                    NetworkFunctionProcessor::fetch(properties, config, client).await?,
                )
            }
        };
        tracing::debug!("Created processor for '{}'", processor.name());
        processors.push(processor);
    }

    Ok(processors)
}

/// File name of a processor's mappings supporting file
pub fn mappings_file_name(processor: &str) -> String {
    format!("{}{}", processor, crate::constants::MAPPINGS_SUFFIX)
}
