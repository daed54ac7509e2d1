// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Deploy-time parameters
//!
//! The flat set of names `publish` and `delete` work from. `build` writes it
//! as the parameters element of a definition folder; it can also be edited
//! or written by hand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::design::DesignConfig;
use super::jsonc;
use crate::control_plane::{DefinitionKind, PublisherScope, ResourceId};
use crate::errors::{DefflowError, DefflowResult};

/// Names of the resources a publish creates and a delete removes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployParameters {
    pub location: String,
    pub publisher_name: String,
    pub publisher_resource_group_name: String,
    pub acr_artifact_store_name: String,
    pub acr_manifest_name: String,

    /// Storage account store, only for designs with disk images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sa_artifact_store_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sa_manifest_name: Option<String>,

    /// What the definition publishes
    #[serde(flatten)]
    pub target: DefinitionTarget,
}

/// The group/version pair a definition lives in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinitionTarget {
    NetworkService {
        #[serde(rename = "nsDesignGroup")]
        group: String,
        #[serde(rename = "nsDesignVersion")]
        version: String,
        #[serde(rename = "nfviSiteName")]
        nfvi_site_name: String,
    },
    NetworkFunction {
        #[serde(rename = "nfDefinitionGroup")]
        group: String,
        #[serde(rename = "nfDefinitionVersion")]
        version: String,
    },
}

impl DefinitionTarget {
    pub fn kind(&self) -> DefinitionKind {
        match self {
            Self::NetworkService { .. } => DefinitionKind::NetworkService,
            Self::NetworkFunction { .. } => DefinitionKind::NetworkFunction,
        }
    }

    pub fn group(&self) -> &str {
        match self {
            Self::NetworkService { group, .. } | Self::NetworkFunction { group, .. } => group,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Self::NetworkService { version, .. } | Self::NetworkFunction { version, .. } => version,
        }
    }
}

impl DeployParameters {
    /// Parameters for publishing a network service design
    pub fn for_design(config: &DesignConfig) -> Self {
        Self {
            location: config.location.clone(),
            publisher_name: config.publisher_name.clone(),
            publisher_resource_group_name: config.publisher_resource_group_name.clone(),
            acr_artifact_store_name: config.acr_artifact_store_name.clone(),
            acr_manifest_name: config.acr_manifest_name(),
            sa_artifact_store_name: None,
            sa_manifest_name: None,
            target: DefinitionTarget::NetworkService {
                group: config.nsd_name.clone(),
                version: config.nsd_version.clone(),
                nfvi_site_name: config.nfvi_site_name(),
            },
        }
    }

    /// Load from a JSON (or JSONC) file
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

        serde_json::from_str(&jsonc::strip_comments(&content)).map_err(|e| {
            DefflowError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })
    }

    /// Field name to value, as template parameters see them
    pub fn to_map(&self) -> DefflowResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    pub fn scope(&self) -> PublisherScope {
        PublisherScope {
            resource_group: self.publisher_resource_group_name.clone(),
            publisher: self.publisher_name.clone(),
        }
    }

    pub fn publisher_id(&self) -> ResourceId {
        ResourceId::Publisher(self.scope())
    }

    pub fn acr_store_id(&self) -> ResourceId {
        ResourceId::ArtifactStore {
            scope: self.scope(),
            store: self.acr_artifact_store_name.clone(),
        }
    }

    pub fn sa_store_id(&self) -> Option<ResourceId> {
        self.sa_artifact_store_name
            .as_ref()
            .map(|store| ResourceId::ArtifactStore {
                scope: self.scope(),
                store: store.clone(),
            })
    }

    /// Every artifact store, container registry first
    pub fn store_ids(&self) -> Vec<ResourceId> {
        let mut ids = vec![self.acr_store_id()];
        ids.extend(self.sa_store_id());
        ids
    }

    pub fn acr_manifest_id(&self) -> ResourceId {
        ResourceId::ArtifactManifest {
            scope: self.scope(),
            store: self.acr_artifact_store_name.clone(),
            manifest: self.acr_manifest_name.clone(),
        }
    }

    /// Every manifest the definition publishes, container registry first
    pub fn manifest_ids(&self) -> Vec<ResourceId> {
        let mut ids = vec![self.acr_manifest_id()];
        if let (Some(store), Some(manifest)) = (&self.sa_artifact_store_name, &self.sa_manifest_name)
        {
            ids.push(ResourceId::ArtifactManifest {
                scope: self.scope(),
                store: store.clone(),
                manifest: manifest.clone(),
            });
        }
        ids
    }

    pub fn group_id(&self) -> ResourceId {
        ResourceId::DefinitionGroup {
            scope: self.scope(),
            kind: self.target.kind(),
            group: self.target.group().to_string(),
        }
    }

    pub fn version_id(&self) -> ResourceId {
        ResourceId::DefinitionVersion {
            scope: self.scope(),
            kind: self.target.kind(),
            group: self.target.group().to_string(),
            version: self.target.version().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESIGN_PARAMS: &str = r#"{
    "location": "uksouth",
    "publisherName": "pub",
    "publisherResourceGroupName": "rg",
    "acrArtifactStoreName": "acr",
    "acrManifestName": "nsd-manifest-1-0-0",
    "nsDesignGroup": "nsd",
    "nsDesignVersion": "1.0.0",
    "nfviSiteName": "nsd_NFVI"
}"#;

    #[test]
    fn test_parse_design_parameters() {
        let params: DeployParameters = serde_json::from_str(DESIGN_PARAMS).unwrap();

        assert_eq!(params.target.kind(), DefinitionKind::NetworkService);
        assert_eq!(params.target.group(), "nsd");
        assert!(params.sa_artifact_store_name.is_none());
        assert_eq!(params.manifest_ids().len(), 1);
    }

    #[test]
    fn test_parse_function_parameters_with_storage_account() {
        let params: DeployParameters = serde_json::from_str(
            r#"{
                "location": "uksouth",
                "publisherName": "pub",
                "publisherResourceGroupName": "rg",
                "acrArtifactStoreName": "acr",
                "acrManifestName": "acr-manifest",
                "saArtifactStoreName": "sa",
                "saManifestName": "sa-manifest",
                "nfDefinitionGroup": "nfdg",
                "nfDefinitionVersion": "2.0.0"
            }"#,
        )
        .unwrap();

        assert_eq!(params.target.kind(), DefinitionKind::NetworkFunction);
        assert_eq!(params.store_ids().len(), 2);
        assert_eq!(params.manifest_ids().len(), 2);
    }

    #[test]
    fn test_to_map_uses_template_parameter_names() {
        let params: DeployParameters = serde_json::from_str(DESIGN_PARAMS).unwrap();
        let map = params.to_map().unwrap();

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "location",
                "publisherName",
                "publisherResourceGroupName",
                "acrArtifactStoreName",
                "acrManifestName",
                "nsDesignGroup",
                "nsDesignVersion",
                "nfviSiteName"
            ]
        );
    }
}
