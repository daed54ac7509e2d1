// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Delete engine
//!
//! Children always go before the resources that own them. The publisher is
//! last and is retried while its children finish tearing down.

use super::retry::RetryPolicy;
use crate::config::DeployParameters;
use crate::control_plane::{ControlPlane, ResourceId};
use crate::errors::{DefflowError, DefflowResult};
use crate::utils::{print_success, Confirm};

/// How much to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// The definition version and its artifact manifests
    Shallow,
    /// Everything down to and including the publisher
    Clean,
}

/// Result of a delete run
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Resources removed, in order
    Deleted(Vec<ResourceId>),
    /// The operator declined
    Aborted,
}

/// Resources to delete, in call order
pub fn plan(params: &DeployParameters, mode: DeleteMode) -> Vec<ResourceId> {
    let mut ids = vec![params.version_id()];
    ids.extend(params.manifest_ids());

    if mode == DeleteMode::Clean {
        ids.push(params.group_id());
        ids.extend(params.store_ids());
        ids.push(params.publisher_id());
    }
    ids
}

/// Confirmation text naming every resource in the plan
pub fn confirmation_prompt(mode: DeleteMode, ids: &[ResourceId]) -> String {
    let header = match mode {
        DeleteMode::Shallow => "Delete the definition version and its artifact manifests?",
        DeleteMode::Clean => {
            "Delete EVERY resource below, including the publisher? \
             Other definitions published under it will also be lost."
        }
    };

    let mut prompt = String::from(header);
    for id in ids {
        prompt.push_str(&format!("\n  - {}", id));
    }
    prompt.push_str("\nContinue?");
    prompt
}

/// Tears down what a publish created
pub struct DeleteEngine<'a> {
    client: &'a dyn ControlPlane,
    params: &'a DeployParameters,
    confirm: &'a dyn Confirm,
    publisher_retry: RetryPolicy,
}

impl<'a> DeleteEngine<'a> {
    pub fn new(
        client: &'a dyn ControlPlane,
        params: &'a DeployParameters,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            client,
            params,
            confirm,
            publisher_retry: RetryPolicy::publisher_delete(),
        }
    }

    pub fn with_publisher_retry(mut self, policy: RetryPolicy) -> Self {
        self.publisher_retry = policy;
        self
    }

    /// Confirm, then delete every planned resource
    pub async fn delete(&self, mode: DeleteMode) -> DefflowResult<DeleteOutcome> {
        let ids = plan(self.params, mode);

        if !self.confirm.confirm(&confirmation_prompt(mode, &ids)) {
            tracing::info!("Delete declined, nothing removed");
            return Ok(DeleteOutcome::Aborted);
        }

        for id in &ids {
            tracing::info!("Deleting {}", id);
            match id {
                ResourceId::Publisher(_) => {
                    self.publisher_retry
                        .run(
                            &format!("Deleting {}", id),
                            || self.client.delete(id),
                            DefflowError::is_conflict,
                        )
                        .await?
                }
                _ => self.client.delete(id).await?,
            }
            print_success(&format!("Deleted {}", id));
        }

        Ok(DeleteOutcome::Deleted(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionTarget;

    fn params(with_sa: bool) -> DeployParameters {
        DeployParameters {
            location: "uksouth".into(),
            publisher_name: "pub".into(),
            publisher_resource_group_name: "rg".into(),
            acr_artifact_store_name: "acr".into(),
            acr_manifest_name: "acr-manifest".into(),
            sa_artifact_store_name: with_sa.then(|| "sa".to_string()),
            sa_manifest_name: with_sa.then(|| "sa-manifest".to_string()),
            target: DefinitionTarget::NetworkFunction {
                group: "nfdg".into(),
                version: "1.0.0".into(),
            },
        }
    }

    fn names(ids: &[ResourceId]) -> Vec<String> {
        ids.iter().map(|id| id.name().to_string()).collect()
    }

    #[test]
    fn test_shallow_plan() {
        let ids = plan(&params(false), DeleteMode::Shallow);
        assert_eq!(names(&ids), vec!["1.0.0", "acr-manifest"]);
    }

    #[test]
    fn test_clean_plan_ends_with_publisher() {
        let ids = plan(&params(true), DeleteMode::Clean);

        assert_eq!(
            names(&ids),
            vec!["1.0.0", "acr-manifest", "sa-manifest", "nfdg", "acr", "sa", "pub"]
        );
        assert!(matches!(ids.last(), Some(ResourceId::Publisher(_))));
    }

    #[test]
    fn test_prompts_differ_and_name_resources() {
        let shallow_ids = plan(&params(false), DeleteMode::Shallow);
        let clean_ids = plan(&params(false), DeleteMode::Clean);
        let shallow = confirmation_prompt(DeleteMode::Shallow, &shallow_ids);
        let clean = confirmation_prompt(DeleteMode::Clean, &clean_ids);

        assert_ne!(shallow.lines().next(), clean.lines().next());
        assert!(shallow.contains("acr-manifest"));
        assert!(clean.contains("publisher 'pub'"));
    }
}
