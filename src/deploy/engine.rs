// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Deploy engine
//!
//! Walks a definition folder in order. Elements that own remote resources
//! first probe for them and skip when everything already exists, so a
//! second publish of the same folder changes nothing. Everything else is
//! validated, then applied.

use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::parameters::{parameter_set, ExtraParameters};
use super::retry::RetryPolicy;
use crate::config::DeployParameters;
use crate::constants::LINKED_RESOURCES_FILENAME;
use crate::control_plane::{
    ArtifactTarget, ControlPlane, DeploymentRequest, ResourceId, TemplateCompiler,
};
use crate::definition::{ArtifactDetail, ArtifactType, DefinitionElement, DefinitionFolder, ElementKind};
use crate::errors::{DefflowError, DefflowResult};
use crate::utils::{print_failure, print_skipped, print_step, print_success};

/// Publish step to leave out
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SkipStep {
    /// Apply no templates, only upload artifacts
    BicepPublish,
    /// Upload no artifacts, only apply templates
    ArtifactUpload,
}

/// Options for one deploy run
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub skip: Option<SkipStep>,
    /// Retry for validate calls that failed without a response
    pub validation_retry: RetryPolicy,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            skip: None,
            validation_retry: RetryPolicy::validation(),
        }
    }
}

/// How many of a set of expected resources exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    None,
    Some,
    All,
}

impl Existence {
    /// Classify probe results; an empty set counts as all present
    pub fn classify(present: &[bool]) -> Self {
        let found = present.iter().filter(|p| **p).count();
        if found == present.len() {
            Self::All
        } else if found == 0 {
            Self::None
        } else {
            Self::Some
        }
    }
}

/// What happened to one element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementOutcome {
    /// Template applied; the deployment's outputs, if any
    Deployed { outputs: Option<Value> },
    /// Artifacts pushed, and artifacts already present
    Uploaded { uploaded: usize, existing: usize },
    /// Nothing to do
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementReport {
    pub path: String,
    pub kind: ElementKind,
    pub outcome: ElementOutcome,
}

/// Result of deploying a folder
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub elements: Vec<ElementReport>,
    pub duration: Duration,
}

impl DeployReport {
    pub fn outcome(&self, kind: ElementKind) -> Option<&ElementOutcome> {
        self.elements.iter().find(|e| e.kind == kind).map(|e| &e.outcome)
    }
}

/// Applies definition folders against a control plane
pub struct DeployEngine<'a> {
    client: &'a dyn ControlPlane,
    compiler: &'a dyn TemplateCompiler,
    params: &'a DeployParameters,
    options: DeployOptions,
}

impl<'a> DeployEngine<'a> {
    pub fn new(
        client: &'a dyn ControlPlane,
        compiler: &'a dyn TemplateCompiler,
        params: &'a DeployParameters,
        options: DeployOptions,
    ) -> Self {
        Self {
            client,
            compiler,
            params,
            options,
        }
    }

    /// Deploy every element in folder order; the first failure stops the run
    pub async fn deploy(&self, folder: &DefinitionFolder) -> DefflowResult<DeployReport> {
        let start = Instant::now();
        let mut elements = Vec::with_capacity(folder.elements.len());

        for element in &folder.elements {
            print_step(&format!("{} ({})", element.path, element.kind));

            let outcome = match self.deploy_element(folder, element).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    print_failure(&format!("{} failed", element.path));
                    return Err(e);
                }
            };

            match &outcome {
                ElementOutcome::Skipped { reason } => print_skipped(&element.path, reason),
                ElementOutcome::Uploaded { uploaded, existing } => print_success(&format!(
                    "{} ({} uploaded, {} already present)",
                    element.path, uploaded, existing
                )),
                ElementOutcome::Deployed { .. } => print_success(&element.path),
            }

            elements.push(ElementReport {
                path: element.path.clone(),
                kind: element.kind,
                outcome,
            });
        }

        Ok(DeployReport {
            elements,
            duration: start.elapsed(),
        })
    }

    async fn deploy_element(
        &self,
        folder: &DefinitionFolder,
        element: &DefinitionElement,
    ) -> DefflowResult<ElementOutcome> {
        let skip_templates = self.options.skip == Some(SkipStep::BicepPublish);

        match element.kind {
            ElementKind::Parameters => Ok(skipped("nothing to deploy")),
            ElementKind::ArtifactList => {
                if self.options.skip == Some(SkipStep::ArtifactUpload) {
                    return Ok(skipped("artifact upload skipped"));
                }
                self.upload_artifacts(folder, element).await
            }
            _ if skip_templates => Ok(skipped("template publishing skipped")),
            ElementKind::Base => {
                if self.base_exists().await? {
                    tracing::info!("Publisher, artifact stores and group already exist");
                    return Ok(skipped("already exists"));
                }
                self.apply(folder, element, None).await
            }
            ElementKind::Manifest => match self.classify_manifests().await? {
                Existence::All => Ok(skipped("manifests already exist")),
                _ => self.apply(folder, element, None).await,
            },
            ElementKind::Definition => {
                let version = self.params.version_id();
                if self.client.exists(&version).await? {
                    tracing::info!("{} already exists", version);
                    return Ok(skipped("version already exists"));
                }
                self.apply(folder, element, None).await
            }
            ElementKind::SiteNetworkService => {
                let extra = match element.supporting_file(LINKED_RESOURCES_FILENAME) {
                    Some(file) => ExtraParameters::from_slice(&file.contents)?,
                    None => ExtraParameters::default(),
                };
                self.apply(folder, element, Some(&extra)).await
            }
        }
    }

    /// Whether the publisher, every artifact store and the group exist
    pub async fn base_exists(&self) -> DefflowResult<bool> {
        let mut ids = vec![self.params.publisher_id()];
        ids.extend(self.params.store_ids());
        ids.push(self.params.group_id());

        for id in &ids {
            if !self.client.exists(id).await? {
                tracing::debug!("{} does not exist", id);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Probe the artifact manifests
    ///
    /// A partial set is an error: which manifest is stale cannot be told
    /// apart, so nothing is applied.
    pub async fn classify_manifests(&self) -> DefflowResult<Existence> {
        let ids = self.params.manifest_ids();
        let mut present = Vec::with_capacity(ids.len());
        for id in &ids {
            present.push(self.client.exists(id).await?);
        }

        let state = Existence::classify(&present);
        if state == Existence::Some {
            let mut found = Vec::new();
            let mut missing = Vec::new();
            for (id, exists) in ids.iter().zip(&present) {
                let name = id.name().to_string();
                if *exists {
                    found.push(name);
                } else {
                    missing.push(name);
                }
            }
            return Err(DefflowError::inconsistent_manifests(found, missing));
        }
        Ok(state)
    }

    async fn upload_artifacts(
        &self,
        folder: &DefinitionFolder,
        element: &DefinitionElement,
    ) -> DefflowResult<ElementOutcome> {
        let details: Vec<ArtifactDetail> = serde_json::from_slice(&element.content)?;
        let dir = folder.root.join(element.directory());
        let mut uploaded = 0;
        let mut existing = 0;

        for detail in &details {
            let target = ArtifactTarget {
                manifest: self.manifest_for(detail.artifact_type),
                name: detail.artifact_name.clone(),
                version: detail.artifact_version.clone(),
            };

            if self.client.artifact_exists(&target).await? {
                tracing::info!("Artifact {} already uploaded", target);
                existing += 1;
                continue;
            }

            let content = self.artifact_content(element, &dir, detail).await?;
            tracing::info!("Uploading artifact {}", target);
            self.client.upload_artifact(&target, &content).await?;
            uploaded += 1;
        }

        Ok(ElementOutcome::Uploaded { uploaded, existing })
    }

    /// Manifest an artifact is pushed through
    fn manifest_for(&self, artifact_type: ArtifactType) -> ResourceId {
        if artifact_type == ArtifactType::VhdImageFile {
            if let Some(id) = self.params.manifest_ids().into_iter().nth(1) {
                return id;
            }
        }
        self.params.acr_manifest_id()
    }

    /// Bytes to push: bicep artifacts are compiled first
    async fn artifact_content(
        &self,
        element: &DefinitionElement,
        dir: &Path,
        detail: &ArtifactDetail,
    ) -> DefflowResult<Vec<u8>> {
        if detail.file.ends_with(".bicep") {
            let template = self.compiler.compile(&dir.join(&detail.file)).await?;
            return Ok(serde_json::to_vec(&template)?);
        }

        element
            .supporting_file(&detail.file)
            .map(|f| f.contents.clone())
            .ok_or_else(|| DefflowError::InvalidDefinitionFolder {
                path: dir.to_path_buf(),
                reason: format!(
                    "artifact '{}' names missing file '{}'",
                    detail.artifact_name, detail.file
                ),
            })
    }

    /// Validate, then create or update, one element's template
    pub async fn apply(
        &self,
        folder: &DefinitionFolder,
        element: &DefinitionElement,
        extra: Option<&ExtraParameters>,
    ) -> DefflowResult<ElementOutcome> {
        let template_path = folder.root.join(element.primary_path());
        let template = self.compiler.compile(&template_path).await?;

        let mut values = self.params.to_map()?;
        if let Some(extra) = extra {
            extra.apply(&mut values);
        }
        let parameters = parameter_set(
            &element.primary_path().display().to_string(),
            &template,
            &values,
        )?;

        let request = DeploymentRequest {
            resource_group: self.params.publisher_resource_group_name.clone(),
            name: deployment_name(&self.params.publisher_resource_group_name, &element.path),
            template,
            parameters,
        };

        tracing::debug!("Validating deployment {}", request.name);
        let report = self
            .options
            .validation_retry
            .run(
                "Template validation",
                || self.client.validate_deployment(&request),
                DefflowError::is_client_side,
            )
            .await?;

        let body = match report {
            None => Some("the control plane returned no validation result".to_string()),
            Some(report) => report.error.map(|e| e.to_string()),
        };
        if let Some(body) = body {
            return Err(DefflowError::TemplateValidationFailed {
                deployment: request.name.clone(),
                help: Some(format!("Control plane response: {}", body)),
                body,
            });
        }

        tracing::info!("Deploying {}", request.name);
        let outcome = self.client.create_or_update_deployment(&request).await?;
        if !outcome.succeeded() {
            return Err(DefflowError::ProvisioningFailed {
                deployment: request.name,
                state: outcome.provisioning_state,
                help: Some("Inspect the deployment in the resource group for details".into()),
            });
        }

        Ok(ElementOutcome::Deployed {
            outputs: outcome.outputs,
        })
    }
}

fn skipped(reason: &str) -> ElementOutcome {
    ElementOutcome::Skipped {
        reason: reason.to_string(),
    }
}

/// `<resource group>-<element>-<unix seconds>`
pub fn deployment_name(resource_group: &str, element_path: &str) -> String {
    let stem = Path::new(element_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(element_path);
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{}-{}-{}", resource_group, stem, secs)
}
