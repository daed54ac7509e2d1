// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Control plane over the Azure CLI
//!
//! Shells out to `az` for resource and deployment calls and to `oras` for
//! artifact pushes. Every command runs to completion before returning, so
//! long-running operations are terminal once a method returns.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio::sync::{Mutex, OnceCell};

use super::{
    ArtifactTarget, ControlPlane, DeploymentOutcome, DeploymentRequest, RemoteErrorBody,
    ResourceId, ValidationReport,
};
use crate::constants::API_VERSION;
use crate::deploy::RetryPolicy;
use crate::errors::{DefflowError, DefflowResult};
use crate::utils::create_spinner;

/// Control plane backed by the `az` command line
pub struct AzCliControlPlane {
    /// Path to az binary
    az_bin: PathBuf,
    /// Subscription name or id passed with `--subscription`
    subscription: Option<String>,
    subscription_id: OnceCell<String>,
    credentials: CredentialCache,
}

/// Short-lived registry token for one artifact manifest
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryCredential {
    username: String,
    acr_token: String,
    acr_server_url: String,
}

impl RegistryCredential {
    fn reference(&self, target: &ArtifactTarget) -> String {
        let server = self
            .acr_server_url
            .trim_start_matches("https://")
            .trim_end_matches('/');
        format!("{}/{}:{}", server, target.name, target.version)
    }
}

/// Registry credentials per artifact manifest, fetched once per run
#[derive(Debug, Default)]
struct CredentialCache {
    entries: Mutex<HashMap<ResourceId, RegistryCredential>>,
}

impl CredentialCache {
    async fn get_or_fetch<F, Fut>(&self, manifest: &ResourceId, fetch: F) -> DefflowResult<RegistryCredential>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DefflowResult<RegistryCredential>>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(credential) = entries.get(manifest) {
            return Ok(credential.clone());
        }

        let credential = fetch().await?;
        entries.insert(manifest.clone(), credential.clone());
        Ok(credential)
    }
}

/// Captured result of one tool invocation
struct ToolOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl AzCliControlPlane {
    /// Create a control plane using `az` from PATH
    pub fn new(subscription: Option<String>) -> DefflowResult<Self> {
        let az_bin = which::which("az").map_err(|_| DefflowError::tool_not_found("az"))?;

        Ok(Self {
            az_bin,
            subscription,
            subscription_id: OnceCell::new(),
            credentials: CredentialCache::default(),
        })
    }

    async fn az<I, S>(&self, args: I) -> DefflowResult<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.az_bin);
        cmd.args(args);
        if let Some(ref subscription) = self.subscription {
            cmd.arg("--subscription").arg(subscription);
        }
        cmd.arg("--only-show-errors");

        run_tool("az", cmd).await
    }

    async fn subscription_id(&self) -> DefflowResult<&str> {
        let id = self
            .subscription_id
            .get_or_try_init(|| async {
                let output = self
                    .az(["account", "show", "--query", "id", "--output", "tsv"])
                    .await?;
                if !output.success {
                    return Err(DefflowError::ToolExecutionFailed {
                        tool: "az".into(),
                        error: output.stderr,
                        help: Some("Sign in with 'az login'".into()),
                    });
                }
                Ok(output.stdout.trim().to_string())
            })
            .await?;
        Ok(id.as_str())
    }

    async fn arm_id(&self, id: &ResourceId) -> DefflowResult<String> {
        Ok(format!(
            "/subscriptions/{}/{}",
            self.subscription_id().await?,
            id.path()
        ))
    }

    async fn registry_credential(&self, manifest: &ResourceId) -> DefflowResult<RegistryCredential> {
        let retry = RetryPolicy::credential();
        self.credentials
            .get_or_fetch(manifest, || {
                retry.run(
                    "listCredential",
                    || self.fetch_credential(manifest),
                    DefflowError::is_client_side,
                )
            })
            .await
    }

    async fn fetch_credential(&self, manifest: &ResourceId) -> DefflowResult<RegistryCredential> {
        let url = format!(
            "{}/listCredential?api-version={}",
            self.arm_id(manifest).await?,
            API_VERSION
        );
        let output = self
            .az(["rest", "--method", "post", "--url", url.as_str(), "--output", "json"])
            .await?;
        let stdout = expect_success("listCredential", output)?;

        Ok(serde_json::from_str(&stdout)?)
    }

    fn oras(&self) -> DefflowResult<PathBuf> {
        which::which("oras").map_err(|_| DefflowError::tool_not_found("oras"))
    }

    async fn push_once(
        &self,
        oras: &Path,
        credential: &RegistryCredential,
        target: &ArtifactTarget,
        staging: &Path,
        file_name: &str,
    ) -> DefflowResult<()> {
        let mut cmd = Command::new(oras);
        cmd.current_dir(staging)
            .args(["push", "--username"])
            .arg(&credential.username)
            .arg("--password")
            .arg(&credential.acr_token)
            .arg(credential.reference(target))
            .arg(file_name);
        let output = run_tool("oras", cmd).await?;

        if output.success {
            Ok(())
        } else {
            Err(DefflowError::ToolExecutionFailed {
                tool: "oras".into(),
                error: output.stderr,
                help: None,
            })
        }
    }
}

#[async_trait]
impl ControlPlane for AzCliControlPlane {
    async fn get(&self, id: &ResourceId) -> DefflowResult<Option<Value>> {
        let arm_id = self.arm_id(id).await?;
        tracing::debug!("Probing {}", id);

        let output = self
            .az([
                "resource",
                "show",
                "--ids",
                arm_id.as_str(),
                "--api-version",
                API_VERSION,
                "--output",
                "json",
            ])
            .await?;

        if !output.success && http_status(&output.stderr) == Some(404) {
            return Ok(None);
        }
        let stdout = expect_success("get", output)?;
        Ok(Some(serde_json::from_str(&stdout)?))
    }

    async fn delete(&self, id: &ResourceId) -> DefflowResult<()> {
        let arm_id = self.arm_id(id).await?;
        let spinner = create_spinner(&format!("Deleting {}", id));

        let output = self
            .az([
                "resource",
                "delete",
                "--ids",
                arm_id.as_str(),
                "--api-version",
                API_VERSION,
            ])
            .await;
        spinner.finish_and_clear();
        let output = output?;

        if output.success {
            return Ok(());
        }
        match http_status(&output.stderr) {
            Some(404) => {
                tracing::debug!("{} already absent", id);
                Ok(())
            }
            Some(409) => Err(DefflowError::conflict(id, output.stderr.trim())),
            status => Err(DefflowError::RemoteRequestFailed {
                operation: "delete".into(),
                status,
                message: output.stderr.trim().to_string(),
            }),
        }
    }

    async fn validate_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> DefflowResult<Option<ValidationReport>> {
        let files = DeploymentFiles::write(request)?;
        let output = self
            .az(deployment_args("validate", request, &files))
            .await?;

        if !output.success {
            return match http_status(&output.stderr) {
                // the service answered: this is a rejection, not a transport failure
                Some(_) => Ok(Some(ValidationReport {
                    error: Some(RemoteErrorBody {
                        code: "ValidationFailed".into(),
                        message: output.stderr.trim().to_string(),
                        details: vec![],
                    }),
                })),
                None => Err(DefflowError::RemoteRequestFailed {
                    operation: "validate".into(),
                    status: None,
                    message: output.stderr.trim().to_string(),
                }),
            };
        }

        if output.stdout.trim().is_empty() {
            return Ok(None);
        }
        let response: Value = serde_json::from_str(&output.stdout)?;
        let error = match response.get("error") {
            Some(Value::Null) | None => None,
            Some(body) => Some(serde_json::from_value(body.clone())?),
        };
        Ok(Some(ValidationReport { error }))
    }

    async fn create_or_update_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> DefflowResult<DeploymentOutcome> {
        let files = DeploymentFiles::write(request)?;
        let spinner = create_spinner(&format!("Deploying {}", request.name));
        let output = self.az(deployment_args("create", request, &files)).await;
        spinner.finish_and_clear();

        let stdout = expect_success("create_or_update", output?)?;
        let response: Value = serde_json::from_str(&stdout)?;
        let properties = &response["properties"];

        Ok(DeploymentOutcome {
            provisioning_state: properties["provisioningState"]
                .as_str()
                .unwrap_or("Unknown")
                .to_string(),
            outputs: properties.get("outputs").filter(|v| !v.is_null()).cloned(),
        })
    }

    async fn artifact_exists(&self, target: &ArtifactTarget) -> DefflowResult<bool> {
        let oras = self.oras()?;
        let credential = self.registry_credential(&target.manifest).await?;

        let mut cmd = Command::new(oras);
        cmd.args(["manifest", "fetch", "--username"])
            .arg(&credential.username)
            .arg("--password")
            .arg(&credential.acr_token)
            .arg(credential.reference(target));
        let output = run_tool("oras", cmd).await?;

        if output.success {
            return Ok(true);
        }
        if output.stderr.contains("not found") || output.stderr.contains("NOT_FOUND") {
            return Ok(false);
        }
        Err(DefflowError::ToolExecutionFailed {
            tool: "oras".into(),
            error: output.stderr,
            help: None,
        })
    }

    async fn upload_artifact(&self, target: &ArtifactTarget, content: &[u8]) -> DefflowResult<()> {
        let oras = self.oras()?;
        let credential = self.registry_credential(&target.manifest).await?;

        let staging = tempfile::tempdir()?;
        let file_name = format!("{}.json", target.name);
        std::fs::write(staging.path().join(&file_name), content)?;

        let spinner = create_spinner(&format!("Uploading {}", target));
        let result = RetryPolicy::artifact_push()
            .run(
                "oras push",
                || self.push_once(&oras, &credential, target, staging.path(), &file_name),
                is_push_failure,
            )
            .await;
        spinner.finish_and_clear();

        if result.is_err() {
            tracing::error!("Failed to upload {} to {}", file_name, credential.reference(target));
        }
        result
    }
}

/// Template and parameter files handed to `az deployment group`
struct DeploymentFiles {
    template: tempfile::NamedTempFile,
    parameters: tempfile::NamedTempFile,
}

impl DeploymentFiles {
    fn write(request: &DeploymentRequest) -> DefflowResult<Self> {
        let parameters = json!({
            "$schema": "https://schema.management.azure.com/schemas/2019-04-01/deploymentParameters.json#",
            "contentVersion": "1.0.0.0",
            "parameters": request.parameters,
        });

        Ok(Self {
            template: json_temp_file(&request.template)?,
            parameters: json_temp_file(&parameters)?,
        })
    }
}

fn json_temp_file(value: &Value) -> DefflowResult<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    serde_json::to_writer(&mut file, value)?;
    file.flush()?;
    Ok(file)
}

fn deployment_args(verb: &str, request: &DeploymentRequest, files: &DeploymentFiles) -> Vec<String> {
    vec![
        "deployment".into(),
        "group".into(),
        verb.into(),
        "--resource-group".into(),
        request.resource_group.clone(),
        "--name".into(),
        request.name.clone(),
        "--template-file".into(),
        files.template.path().display().to_string(),
        "--parameters".into(),
        format!("@{}", files.parameters.path().display()),
        "--mode".into(),
        "Incremental".into(),
        "--output".into(),
        "json".into(),
    ]
}

async fn run_tool(tool: &str, mut cmd: Command) -> DefflowResult<ToolOutput> {
    let output = cmd
        .output()
        .await
        .map_err(|e| DefflowError::ToolExecutionFailed {
            tool: tool.to_string(),
            error: e.to_string(),
            help: None,
        })?;

    Ok(ToolOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

fn expect_success(operation: &str, output: ToolOutput) -> DefflowResult<String> {
    if output.success {
        Ok(output.stdout)
    } else {
        Err(DefflowError::RemoteRequestFailed {
            operation: operation.to_string(),
            status: http_status(&output.stderr),
            message: output.stderr.trim().to_string(),
        })
    }
}

/// A push the registry refused or that never completed
fn is_push_failure(error: &DefflowError) -> bool {
    matches!(error, DefflowError::ToolExecutionFailed { tool, .. } if tool == "oras")
}

/// Best-effort HTTP status behind an `az` error message
///
/// The ARM error code `az` prints in parentheses decides; free text is only
/// scanned when there is none. `None` means the failure never reached the
/// service.
fn http_status(stderr: &str) -> Option<u16> {
    const CODES: &[(&str, u16)] = &[
        ("Conflict", 409),
        ("CannotDeleteResource", 409),
        ("ResourceNotFound", 404),
        ("NotFound", 404),
        ("could not be found", 404),
        ("AuthorizationFailed", 403),
        ("Forbidden", 403),
        ("InvalidTemplate", 400),
        ("BadRequest", 400),
        ("InvalidDeployment", 400),
        ("DeploymentFailed", 400),
        ("InternalServerError", 500),
    ];

    let status_of = |code: &str| {
        CODES
            .iter()
            .find(|(marker, _)| *marker == code)
            .map(|(_, status)| *status)
    };

    stderr
        .split('(')
        .skip(1)
        .filter_map(|rest| rest.split_once(')'))
        .find_map(|(code, _)| status_of(code))
        .or_else(|| {
            CODES
                .iter()
                .find(|(marker, _)| stderr.contains(marker))
                .map(|(_, status)| *status)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_http_status_markers() {
        assert_eq!(
            http_status("ERROR: (ResourceNotFound) The Resource was not found"),
            Some(404)
        );
        assert_eq!(http_status("ERROR: (Conflict) still has children"), Some(409));
        assert_eq!(
            http_status("ERROR: HTTPSConnectionPool: Max retries exceeded"),
            None
        );
    }

    #[test]
    fn test_http_status_prefers_error_code() {
        assert_eq!(
            http_status("ERROR: (Conflict) Nested resource 'nsd' could not be found yet"),
            Some(409)
        );
        assert_eq!(
            http_status("ERROR: (ResourceNotFound) Publisher is in Conflict state"),
            Some(404)
        );
        assert_eq!(
            http_status("ERROR: CannotDeleteResource: child could not be found"),
            Some(409)
        );
    }

    fn credential(token: &str) -> RegistryCredential {
        RegistryCredential {
            username: "u".into(),
            acr_token: token.into(),
            acr_server_url: "https://store.azurecr.io".into(),
        }
    }

    fn manifest(name: &str) -> ResourceId {
        ResourceId::ArtifactManifest {
            scope: crate::control_plane::PublisherScope {
                resource_group: "rg".into(),
                publisher: "p".into(),
            },
            store: "acr".into(),
            manifest: name.into(),
        }
    }

    #[tokio::test]
    async fn test_credentials_fetched_once_per_manifest() {
        let cache = CredentialCache::default();
        let fetches = AtomicU32::new(0);
        let fetch = |token: &'static str| {
            let fetches = &fetches;
            move || async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(credential(token))
            }
        };

        let first = cache.get_or_fetch(&manifest("m1"), fetch("a")).await.unwrap();
        let again = cache.get_or_fetch(&manifest("m1"), fetch("b")).await.unwrap();
        let other = cache.get_or_fetch(&manifest("m2"), fetch("c")).await.unwrap();

        assert_eq!(first.acr_token, "a");
        assert_eq!(again.acr_token, "a");
        assert_eq!(other.acr_token, "c");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_credential_fetch_is_not_cached() {
        let cache = CredentialCache::default();

        let failed = cache
            .get_or_fetch(&manifest("m1"), || async {
                Err(DefflowError::RemoteRequestFailed {
                    operation: "listCredential".into(),
                    status: None,
                    message: "connection reset".into(),
                })
            })
            .await;
        assert!(failed.is_err());

        let fetched = cache
            .get_or_fetch(&manifest("m1"), || async { Ok(credential("a")) })
            .await
            .unwrap();
        assert_eq!(fetched.acr_token, "a");
    }

    #[tokio::test]
    async fn test_refused_push_is_retried() {
        let attempts = AtomicU32::new(0);
        let calls = &attempts;

        let result = RetryPolicy::artifact_push()
            .without_delay()
            .run(
                "oras push",
                move || async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                        Err(DefflowError::ToolExecutionFailed {
                            tool: "oras".into(),
                            error: "name unknown: repository not ready".into(),
                            help: None,
                        })
                    } else {
                        Ok(())
                    }
                },
                is_push_failure,
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert!(!is_push_failure(&DefflowError::tool_not_found("oras")));
    }

    #[test]
    fn test_registry_reference() {
        let credential = RegistryCredential {
            username: "u".into(),
            acr_token: "t".into(),
            acr_server_url: "https://store.azurecr.io".into(),
        };
        let target = ArtifactTarget {
            manifest: ResourceId::Publisher(crate::control_plane::PublisherScope {
                resource_group: "rg".into(),
                publisher: "p".into(),
            }),
            name: "svc1".into(),
            version: "1.0.0".into(),
        };

        assert_eq!(credential.reference(&target), "store.azurecr.io/svc1:1.0.0");
    }

    #[test]
    fn test_deployment_args_use_incremental_mode() {
        let request = DeploymentRequest {
            resource_group: "rg".into(),
            name: "rg-base-1".into(),
            template: json!({}),
            parameters: Default::default(),
        };
        let files = DeploymentFiles::write(&request).unwrap();
        let args = deployment_args("validate", &request, &files);

        assert_eq!(&args[..3], &["deployment", "group", "validate"]);
        assert!(args.windows(2).any(|w| w[0] == "--mode" && w[1] == "Incremental"));
    }

    #[tokio::test]
    async fn test_requires_az() {
        if which::which("az").is_err() {
            assert!(matches!(
                AzCliControlPlane::new(None),
                Err(DefflowError::ToolNotFound { .. })
            ));
        }
    }
}
