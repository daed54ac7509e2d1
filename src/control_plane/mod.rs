// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Remote control plane boundary
//!
//! The engines only ever talk to the cloud through [`ControlPlane`], which
//! names resources with [`ResourceId`] and submits opaque templates as
//! deployments. Every call blocks until the remote operation is terminal.

mod az_cli;
mod compiler;

pub use az_cli::AzCliControlPlane;
pub use compiler::{BicepCompiler, TemplateCompiler};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::constants::RESOURCE_PROVIDER;
use crate::errors::DefflowResult;

/// Resource group and publisher every managed resource lives under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublisherScope {
    pub resource_group: String,
    pub publisher: String,
}

/// What a definition group/version describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    NetworkFunction,
    NetworkService,
}

impl DefinitionKind {
    fn group_segment(self) -> &'static str {
        match self {
            Self::NetworkFunction => "networkFunctionDefinitionGroups",
            Self::NetworkService => "networkServiceDesignGroups",
        }
    }

    fn version_segment(self) -> &'static str {
        match self {
            Self::NetworkFunction => "networkFunctionDefinitionVersions",
            Self::NetworkService => "networkServiceDesignVersions",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::NetworkFunction => "network function definition",
            Self::NetworkService => "network service design",
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A resource managed through the control plane
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Publisher(PublisherScope),
    ArtifactStore {
        scope: PublisherScope,
        store: String,
    },
    ArtifactManifest {
        scope: PublisherScope,
        store: String,
        manifest: String,
    },
    DefinitionGroup {
        scope: PublisherScope,
        kind: DefinitionKind,
        group: String,
    },
    DefinitionVersion {
        scope: PublisherScope,
        kind: DefinitionKind,
        group: String,
        version: String,
    },
}

impl ResourceId {
    pub fn scope(&self) -> &PublisherScope {
        match self {
            Self::Publisher(scope)
            | Self::ArtifactStore { scope, .. }
            | Self::ArtifactManifest { scope, .. }
            | Self::DefinitionGroup { scope, .. }
            | Self::DefinitionVersion { scope, .. } => scope,
        }
    }

    /// Last name segment of the resource
    pub fn name(&self) -> &str {
        match self {
            Self::Publisher(scope) => &scope.publisher,
            Self::ArtifactStore { store, .. } => store,
            Self::ArtifactManifest { manifest, .. } => manifest,
            Self::DefinitionGroup { group, .. } => group,
            Self::DefinitionVersion { version, .. } => version,
        }
    }

    /// ARM path below the subscription
    pub fn path(&self) -> String {
        let scope = self.scope();
        let publisher = format!(
            "resourceGroups/{}/providers/{}/publishers/{}",
            scope.resource_group, RESOURCE_PROVIDER, scope.publisher
        );

        match self {
            Self::Publisher(_) => publisher,
            Self::ArtifactStore { store, .. } => {
                format!("{}/artifactStores/{}", publisher, store)
            }
            Self::ArtifactManifest {
                store, manifest, ..
            } => format!(
                "{}/artifactStores/{}/artifactManifests/{}",
                publisher, store, manifest
            ),
            Self::DefinitionGroup { kind, group, .. } => {
                format!("{}/{}/{}", publisher, kind.group_segment(), group)
            }
            Self::DefinitionVersion {
                kind,
                group,
                version,
                ..
            } => format!(
                "{}/{}/{}/{}/{}",
                publisher,
                kind.group_segment(),
                group,
                kind.version_segment(),
                version
            ),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publisher(scope) => write!(f, "publisher '{}'", scope.publisher),
            Self::ArtifactStore { store, .. } => write!(f, "artifact store '{}'", store),
            Self::ArtifactManifest { manifest, .. } => {
                write!(f, "artifact manifest '{}'", manifest)
            }
            Self::DefinitionGroup { kind, group, .. } => {
                write!(f, "{} group '{}'", kind.label(), group)
            }
            Self::DefinitionVersion {
                kind,
                group,
                version,
                ..
            } => write!(f, "{} version '{}/{}'", kind.label(), group, version),
        }
    }
}

/// A template deployment into a resource group
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRequest {
    pub resource_group: String,
    pub name: String,
    /// Template in the control plane's native (ARM JSON) format
    pub template: Value,
    /// `{ name: { "value": v } }`
    pub parameters: Map<String, Value>,
}

/// Error payload the control plane attaches to a rejected validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<RemoteErrorBody>,
}

impl fmt::Display for RemoteErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        for detail in &self.details {
            write!(f, "\n  {}", detail)?;
        }
        Ok(())
    }
}

/// Result of a validate call that returned a response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub error: Option<RemoteErrorBody>,
}

/// Terminal state of a create-or-update deployment
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentOutcome {
    pub provisioning_state: String,
    pub outputs: Option<Value>,
}

impl DeploymentOutcome {
    pub fn succeeded(&self) -> bool {
        self.provisioning_state == "Succeeded"
    }
}

/// An artifact inside a manifest's store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactTarget {
    /// The manifest listing this artifact
    pub manifest: ResourceId,
    pub name: String,
    pub version: String,
}

impl fmt::Display for ArtifactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Operations the pipeline needs from the cloud control plane
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetch a resource, `None` when it does not exist
    async fn get(&self, id: &ResourceId) -> DefflowResult<Option<Value>>;

    /// Delete a resource; deleting an absent resource succeeds
    async fn delete(&self, id: &ResourceId) -> DefflowResult<()>;

    /// Validate a deployment without applying it
    async fn validate_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> DefflowResult<Option<ValidationReport>>;

    /// Apply a deployment and wait for it to finish
    async fn create_or_update_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> DefflowResult<DeploymentOutcome>;

    /// Whether an artifact has already been pushed
    async fn artifact_exists(&self, target: &ArtifactTarget) -> DefflowResult<bool>;

    /// Push an artifact's bytes into its store
    async fn upload_artifact(&self, target: &ArtifactTarget, content: &[u8]) -> DefflowResult<()>;

    async fn exists(&self, id: &ResourceId) -> DefflowResult<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> PublisherScope {
        PublisherScope {
            resource_group: "rg".into(),
            publisher: "pub".into(),
        }
    }

    #[test]
    fn test_version_path() {
        let id = ResourceId::DefinitionVersion {
            scope: scope(),
            kind: DefinitionKind::NetworkService,
            group: "nsd".into(),
            version: "1.0.0".into(),
        };

        assert_eq!(
            id.path(),
            "resourceGroups/rg/providers/Microsoft.HybridNetwork/publishers/pub/\
             networkServiceDesignGroups/nsd/networkServiceDesignVersions/1.0.0"
        );
        assert_eq!(id.to_string(), "network service design version 'nsd/1.0.0'");
        assert_eq!(id.name(), "1.0.0");
    }

    #[test]
    fn test_manifest_display() {
        let id = ResourceId::ArtifactManifest {
            scope: scope(),
            store: "acr".into(),
            manifest: "m1".into(),
        };

        assert_eq!(id.to_string(), "artifact manifest 'm1'");
        assert!(id.path().ends_with("/artifactStores/acr/artifactManifests/m1"));
    }

    #[test]
    fn test_error_body_display() {
        let body = RemoteErrorBody {
            code: "InvalidTemplate".into(),
            message: "bad".into(),
            details: vec![RemoteErrorBody {
                code: "Inner".into(),
                message: "cause".into(),
                details: vec![],
            }],
        };

        assert_eq!(body.to_string(), "InvalidTemplate: bad\n  Inner: cause");
    }
}
