// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use defflow::config::{ArmTemplateProperties, DeployParameters, ResourceElement};
use defflow::control_plane::{
    ArtifactTarget, ControlPlane, DeploymentOutcome, DeploymentRequest, RemoteErrorBody,
    ResourceId, TemplateCompiler, ValidationReport,
};
use defflow::constants::{
    BASE_FOLDER_NAME, MANIFEST_FOLDER_NAME, NSD_DEFINITION_FOLDER_NAME, NSD_OUTPUT_FOLDER_NAME,
};
use defflow::definition::NsdDefinitionBuilder;
use defflow::processors::build_processors;
use defflow::{DefflowError, DefflowResult, DefinitionFolder, DesignConfig};

/// A call the fake control plane received
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(ResourceId),
    Delete(ResourceId),
    Validate(DeploymentRequest),
    Deploy(DeploymentRequest),
    ArtifactExists(ArtifactTarget),
    Upload(ArtifactTarget),
}

impl Call {
    /// Whether the call changes remote state
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Delete(_) | Self::Deploy(_) | Self::Upload(_))
    }
}

/// In-memory control plane recording every call
///
/// A successful deployment creates the resources its element owns, so a
/// second publish sees them.
pub struct FakeControlPlane {
    params: DeployParameters,
    resources: Mutex<HashSet<ResourceId>>,
    artifacts: Mutex<HashSet<ArtifactTarget>>,
    calls: Mutex<Vec<Call>>,
    drop_next_validation: AtomicBool,
    /// Answer to every validate call that is not dropped
    validation: Mutex<Option<ValidationReport>>,
    provisioning_state: Mutex<String>,
    conflicts_remaining: AtomicU32,
}

impl FakeControlPlane {
    pub fn new(params: &DeployParameters) -> Self {
        Self {
            params: params.clone(),
            resources: Mutex::new(HashSet::new()),
            artifacts: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            drop_next_validation: AtomicBool::new(false),
            validation: Mutex::new(Some(ValidationReport::default())),
            provisioning_state: Mutex::new("Succeeded".into()),
            conflicts_remaining: AtomicU32::new(0),
        }
    }

    pub fn with_resources(self, ids: impl IntoIterator<Item = ResourceId>) -> Self {
        self.resources.lock().unwrap().extend(ids);
        self
    }

    /// The next validate call fails without a response
    pub fn drop_next_validation(self) -> Self {
        self.drop_next_validation.store(true, Ordering::SeqCst);
        self
    }

    /// Validation answers with an error body
    pub fn reject_validation(self, code: &str, message: &str) -> Self {
        *self.validation.lock().unwrap() = Some(ValidationReport {
            error: Some(RemoteErrorBody {
                code: code.into(),
                message: message.into(),
                details: Vec::new(),
            }),
        });
        self
    }

    /// Validation answers with no result at all
    pub fn without_validation_result(self) -> Self {
        *self.validation.lock().unwrap() = None;
        self
    }

    /// Deployments finish in this provisioning state
    pub fn with_provisioning_state(self, state: &str) -> Self {
        *self.provisioning_state.lock().unwrap() = state.into();
        self
    }

    /// Publisher deletes conflict this many times before succeeding
    pub fn with_publisher_conflicts(self, count: u32) -> Self {
        self.conflicts_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn deleted(&self) -> Vec<ResourceId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Requests that reached create-or-update, in order
    pub fn deployments(&self) -> Vec<DeploymentRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Deploy(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn validations(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Validate(_)))
            .count()
    }

    pub fn has(&self, id: &ResourceId) -> bool {
        self.resources.lock().unwrap().contains(id)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Resources a deployment of the named element creates
    fn created_by(&self, deployment: &str) -> Vec<ResourceId> {
        let stem = |folder: &str| deployment.contains(&format!("-{}-", folder));

        if stem(BASE_FOLDER_NAME) {
            let mut ids = vec![self.params.publisher_id()];
            ids.extend(self.params.store_ids());
            ids.push(self.params.group_id());
            ids
        } else if stem(MANIFEST_FOLDER_NAME) {
            self.params.manifest_ids()
        } else if stem(NSD_DEFINITION_FOLDER_NAME) {
            vec![self.params.version_id()]
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get(&self, id: &ResourceId) -> DefflowResult<Option<Value>> {
        self.record(Call::Get(id.clone()));
        Ok(self.has(id).then(|| json!({ "name": id.name() })))
    }

    async fn delete(&self, id: &ResourceId) -> DefflowResult<()> {
        self.record(Call::Delete(id.clone()));

        if matches!(id, ResourceId::Publisher(_)) {
            let remaining = self.conflicts_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts_remaining.store(remaining - 1, Ordering::SeqCst);
                return Err(DefflowError::conflict(id, "nested resources exist"));
            }
        }

        self.resources.lock().unwrap().remove(id);
        Ok(())
    }

    async fn validate_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> DefflowResult<Option<ValidationReport>> {
        self.record(Call::Validate(request.clone()));

        if self.drop_next_validation.swap(false, Ordering::SeqCst) {
            return Err(DefflowError::RemoteRequestFailed {
                operation: "deployment validate".into(),
                status: None,
                message: "connection reset".into(),
            });
        }
        Ok(self.validation.lock().unwrap().clone())
    }

    async fn create_or_update_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> DefflowResult<DeploymentOutcome> {
        self.record(Call::Deploy(request.clone()));

        let provisioning_state = self.provisioning_state.lock().unwrap().clone();
        if provisioning_state == "Succeeded" {
            let created = self.created_by(&request.name);
            self.resources.lock().unwrap().extend(created);
        }
        Ok(DeploymentOutcome {
            provisioning_state,
            outputs: None,
        })
    }

    async fn artifact_exists(&self, target: &ArtifactTarget) -> DefflowResult<bool> {
        self.record(Call::ArtifactExists(target.clone()));
        Ok(self.artifacts.lock().unwrap().contains(target))
    }

    async fn upload_artifact(&self, target: &ArtifactTarget, _content: &[u8]) -> DefflowResult<()> {
        self.record(Call::Upload(target.clone()));
        self.artifacts.lock().unwrap().insert(target.clone());
        Ok(())
    }
}

/// Hands back a fixed template declaring two parameters
pub struct PassthroughCompiler;

#[async_trait]
impl TemplateCompiler for PassthroughCompiler {
    async fn compile(&self, template: &Path) -> DefflowResult<Value> {
        if !template.exists() {
            return Err(DefflowError::FileReadError {
                path: template.to_path_buf(),
                error: "no such file".into(),
            });
        }
        Ok(json!({
            "parameters": {
                "location": {"type": "string"},
                "publisherName": {"type": "string"},
                "unused": {"type": "string", "defaultValue": "x"}
            },
            "resources": []
        }))
    }
}

/// Hands back the same compiled template for every file
pub struct FixedCompiler(pub Value);

#[async_trait]
impl TemplateCompiler for FixedCompiler {
    async fn compile(&self, _template: &Path) -> DefflowResult<Value> {
        Ok(self.0.clone())
    }
}

pub const ARM_TEMPLATE: &str = r#"{
    "$schema": "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#",
    "parameters": {
        "vmName": {"type": "string"},
        "count": {"type": "int", "defaultValue": 1}
    },
    "resources": []
}"#;

/// A valid design with one ARM template element per name, templates
/// written into `dir`
pub fn design(dir: &Path, names: &[&str]) -> DesignConfig {
    let mut config = DesignConfig {
        location: "uksouth".into(),
        publisher_name: "pub".into(),
        publisher_resource_group_name: "rg".into(),
        acr_artifact_store_name: "acr".into(),
        nsd_name: "ubuntu".into(),
        nsd_version: "1.0.0".into(),
        nsdv_description: "Plain \"ubuntu\" VM".into(),
        base_dir: dir.to_path_buf(),
        ..Default::default()
    };

    for name in names {
        let file = format!("{}.json", name);
        std::fs::write(dir.join(&file), ARM_TEMPLATE).unwrap();
        config.resource_element_templates.push(
            ResourceElement::ArmTemplate(ArmTemplateProperties {
                artifact_name: name.to_string(),
                version: "1.0.0".into(),
                file_path: file,
                ..Default::default()
            })
            .into(),
        );
    }
    config
}

/// Build and write the definition folder of `design(dir, names)`
pub async fn built_folder(dir: &Path, names: &[&str]) -> (DesignConfig, DefinitionFolder) {
    let config = design(dir, names);
    config.validate().unwrap();

    let processors = build_processors(&config, None).await.unwrap();
    let folder = NsdDefinitionBuilder::new(&config, &processors)
        .unwrap()
        .build(dir.join(NSD_OUTPUT_FOLDER_NAME))
        .unwrap();
    folder.write(false).await.unwrap();

    (config, folder)
}

/// Parse a JSON file written into a definition folder
pub fn read_json(path: &Path) -> Map<String, Value> {
    let text = std::fs::read_to_string(path).unwrap();
    match serde_json::from_str(&text).unwrap() {
        Value::Object(map) => map,
        other => panic!("expected an object in {}, got {}", path.display(), other),
    }
}
