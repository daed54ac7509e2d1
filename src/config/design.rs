// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Design input configuration
//!
//! The file a user fills in to describe a network service design: who
//! publishes it, where, and which resource elements it is made of.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::jsonc;
use super::validation::ConfigValidator;
use crate::errors::{DefflowError, DefflowResult};
use crate::utils::Confirm;

/// Discriminant of an ARM template resource element
pub const ARM_TEMPLATE_TYPE: &str = "ArmTemplate";

/// Discriminant of a network function resource element
pub const NETWORK_FUNCTION_TYPE: &str = "NF";

/// A network service design to build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    /// Azure location of the publisher and every resource below it
    pub location: String,

    /// Publisher the design is published under
    pub publisher_name: String,

    /// Resource group holding the publisher
    pub publisher_resource_group_name: String,

    /// Container registry artifact store for template artifacts
    pub acr_artifact_store_name: String,

    /// Network service design group name
    pub nsd_name: String,

    /// Version of the design, `A.B.C`
    pub nsd_version: String,

    /// Free text stored on the design version
    pub nsdv_description: String,

    /// Resource elements making up the design, in deployment order
    pub resource_element_templates: Vec<ResourceElementConfig>,

    /// Directory relative file paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// One resource element as written in the input file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceElementConfig {
    /// `ArmTemplate` or `NF`
    #[serde(default)]
    pub resource_element_type: String,

    /// Payload whose shape depends on `resource_element_type`
    #[serde(default)]
    pub properties: Value,
}

/// A resource element after its discriminant has been checked
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceElement {
    ArmTemplate(ArmTemplateProperties),
    NetworkFunction(NetworkFunctionProperties),
}

/// Properties of an ARM template resource element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmTemplateProperties {
    pub artifact_name: String,
    pub version: String,
    pub file_path: String,
    /// Expose parameters that have a default as well as required ones
    pub expose_all_parameters: bool,
}

/// Properties of a reference to a published network function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkFunctionProperties {
    /// Network function definition group to deploy
    pub name: String,
    pub version: String,
    pub publisher: String,
    pub publisher_resource_group: String,
    pub publisher_offering_location: String,
    pub publisher_scope: String,
}

impl Default for NetworkFunctionProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: String::new(),
            publisher: String::new(),
            publisher_resource_group: String::new(),
            publisher_offering_location: String::new(),
            publisher_scope: "private".to_string(),
        }
    }
}

impl ResourceElementConfig {
    /// Resolve the discriminant into a typed element
    pub fn resolve(&self) -> DefflowResult<ResourceElement> {
        // an omitted payload reads as an empty object so field checks report it
        let properties = match &self.properties {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };

        let invalid = |e: serde_json::Error| {
            DefflowError::invalid_config(vec![format!(
                "{} properties are invalid: {}",
                self.resource_element_type, e
            )])
        };

        match self.resource_element_type.as_str() {
            ARM_TEMPLATE_TYPE => serde_json::from_value(properties)
                .map(ResourceElement::ArmTemplate)
                .map_err(invalid),
            NETWORK_FUNCTION_TYPE => serde_json::from_value(properties)
                .map(ResourceElement::NetworkFunction)
                .map_err(invalid),
            other => Err(DefflowError::UnknownResourceElementType {
                element_type: other.to_string(),
            }),
        }
    }
}

impl From<ResourceElement> for ResourceElementConfig {
    fn from(element: ResourceElement) -> Self {
        let (resource_element_type, properties) = match element {
            ResourceElement::ArmTemplate(p) => (ARM_TEMPLATE_TYPE, serde_json::to_value(p)),
            ResourceElement::NetworkFunction(p) => {
                (NETWORK_FUNCTION_TYPE, serde_json::to_value(p))
            }
        };
        Self {
            resource_element_type: resource_element_type.to_string(),
            properties: properties.unwrap_or(Value::Null),
        }
    }
}

impl DesignConfig {
    /// An empty configuration with one example of each resource element
    pub fn template() -> Self {
        Self {
            resource_element_templates: vec![
                ResourceElement::ArmTemplate(ArmTemplateProperties::default()).into(),
                ResourceElement::NetworkFunction(NetworkFunctionProperties::default()).into(),
            ],
            ..Default::default()
        }
    }

    /// Load from a JSONC file
    pub fn from_file(path: &Path) -> DefflowResult<Self> {
        if !path.exists() {
            return Err(DefflowError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DefflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut config = Self::from_jsonc(&content).map_err(|e| DefflowError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(config)
    }

    /// Parse from JSONC text
    pub fn from_jsonc(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&jsonc::strip_comments(content))
    }

    /// Canonical JSON without comments
    pub fn to_json(&self) -> DefflowResult<String> {
        Ok(jsonc::to_pretty_string(self)?)
    }

    /// JSONC with a description comment above every known field
    pub fn to_jsonc(&self) -> DefflowResult<String> {
        let json = self.to_json()?;
        let mut element_type = String::new();

        Ok(jsonc::annotate(&json, |key, line| {
            if key == "resource_element_type" {
                element_type = line
                    .split(':')
                    .nth(1)
                    .unwrap_or_default()
                    .trim()
                    .trim_end_matches(',')
                    .trim_matches('"')
                    .to_string();
            }
            describe(key, &element_type)
        }))
    }

    /// Write as JSONC, asking before replacing an existing file
    pub fn write_to(&self, path: &Path, confirm: &dyn Confirm) -> DefflowResult<()> {
        if path.exists() {
            let prompt = format!(
                "The file {} already exists - do you want to overwrite it?",
                path.display()
            );
            if !confirm.confirm(&prompt) {
                return Err(DefflowError::UserAborted);
            }
        }

        let text = self.to_jsonc()?;
        std::fs::write(path, text).map_err(|e| DefflowError::FileWriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Check every field, failing with all problems at once
    pub fn validate(&self) -> DefflowResult<()> {
        let result = ConfigValidator::validate(self);

        for warning in &result.warnings {
            tracing::warn!("{}", warning);
        }

        if result.is_valid() {
            Ok(())
        } else {
            Err(DefflowError::invalid_config(result.errors))
        }
    }

    /// Typed resource elements, in file order
    pub fn resource_elements(&self) -> DefflowResult<Vec<ResourceElement>> {
        self.resource_element_templates
            .iter()
            .map(ResourceElementConfig::resolve)
            .collect()
    }

    /// Resolve a path from the config file against its directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Artifact manifest holding this version's artifacts
    pub fn acr_manifest_name(&self) -> String {
        format!(
            "{}-nsd-manifest-{}",
            self.nsd_name,
            self.nsd_version.replace('.', "-")
        )
    }

    /// NFVI site every network function of the design lands on
    pub fn nfvi_site_name(&self) -> String {
        format!("{}_NFVI", self.nsd_name)
    }
}

fn describe(key: &str, element_type: &str) -> Option<&'static str> {
    let text = match (element_type, key) {
        (_, "location") => "Azure location to use when creating resources e.g uksouth",
        (_, "publisher_name") => {
            "Name of the Publisher resource you want your design published to.\n\
             Will be created if it does not exist."
        }
        (_, "publisher_resource_group_name") => {
            "Resource group for the Publisher resource.\n\
             Will be created if it does not exist."
        }
        (_, "acr_artifact_store_name") => {
            "Name of the ACR Artifact Store resource.\n\
             Will be created if it does not exist."
        }
        (_, "nsd_name") => "Network Service Design (NSD) name. This is the collection of Network Service Design Versions. Will be created if it does not exist.",
        (_, "nsd_version") => {
            "Version of the NSD to be created. This should be in the format A.B.C"
        }
        (_, "nsdv_description") => "Optional. Description of the Network Service Design Version (NSDV).",
        (_, "resource_element_templates") => {
            "List of Resource Element Templates (RETs).\n\
             There must be at least one element in this list.\n\
             Each element should be of type ArmTemplate or NF."
        }
        (_, "resource_element_type") => "Type of Resource Element. Either NF or ArmTemplate",
        (_, "properties") => "Properties of the Resource Element.",
        (ARM_TEMPLATE_TYPE, "artifact_name") => "Name of the artifact. Used as internal reference only.",
        (ARM_TEMPLATE_TYPE, "version") => "Version of the artifact in A.B.C format.",
        (ARM_TEMPLATE_TYPE, "file_path") => {
            "File path (absolute or relative to this configuration file) of the ARM template."
        }
        (ARM_TEMPLATE_TYPE, "expose_all_parameters") => {
            "Optional. Set to true to let operators override every template parameter,\n\
             including those with a default. Otherwise defaulted parameters are fixed."
        }
        (NETWORK_FUNCTION_TYPE, "name") => {
            "Name of the existing Network Function Definition Group to deploy using this NSD."
        }
        (NETWORK_FUNCTION_TYPE, "version") => {
            "Version of the existing Network Function Definition to deploy using this NSD.\n\
             This should be in the format A.B.C"
        }
        (NETWORK_FUNCTION_TYPE, "publisher") => {
            "Name of the Publisher resource for an existing Network Function Definition Group."
        }
        (NETWORK_FUNCTION_TYPE, "publisher_resource_group") => {
            "Resource group of the Publisher of the existing Network Function Definition Group."
        }
        (NETWORK_FUNCTION_TYPE, "publisher_offering_location") => {
            "The region that the NFDV is published to."
        }
        (NETWORK_FUNCTION_TYPE, "publisher_scope") => {
            "Scope of the Publisher. Only 'private' is supported."
        }
        _ => return None,
    };
    Some(text)
}
