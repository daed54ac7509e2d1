// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Deleting published definitions

mod common;

use common::FakeControlPlane;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use defflow::control_plane::ResourceId;
use defflow::deploy::{
    confirmation_prompt, plan, DeleteEngine, DeleteMode, DeleteOutcome, RetryPolicy,
};
use defflow::utils::{AlwaysConfirm, NeverConfirm};
use defflow::DeployParameters;

fn design_params() -> DeployParameters {
    serde_json::from_value(json!({
        "location": "uksouth",
        "publisherName": "pub",
        "publisherResourceGroupName": "rg",
        "acrArtifactStoreName": "acr",
        "acrManifestName": "ubuntu-nsd-manifest-1-0-0",
        "nsDesignGroup": "ubuntu",
        "nsDesignVersion": "1.0.0",
        "nfviSiteName": "ubuntu_NFVI"
    }))
    .unwrap()
}

fn function_params() -> DeployParameters {
    serde_json::from_value(json!({
        "location": "uksouth",
        "publisherName": "pub",
        "publisherResourceGroupName": "rg",
        "acrArtifactStoreName": "acr",
        "acrManifestName": "acr-manifest",
        "saArtifactStoreName": "sa",
        "saManifestName": "sa-manifest",
        "nfDefinitionGroup": "nfdg",
        "nfDefinitionVersion": "1.0.0"
    }))
    .unwrap()
}

fn no_wait() -> RetryPolicy {
    RetryPolicy::publisher_delete().without_delay()
}

#[tokio::test]
async fn test_clean_delete_order() {
    for params in [design_params(), function_params()] {
        let client = FakeControlPlane::new(&params);
        let engine = DeleteEngine::new(&client, &params, &AlwaysConfirm).with_publisher_retry(no_wait());

        let outcome = assert_ok!(engine.delete(DeleteMode::Clean).await);

        let mut expected = vec![params.version_id()];
        expected.extend(params.manifest_ids());
        expected.push(params.group_id());
        expected.extend(params.store_ids());
        expected.push(params.publisher_id());

        assert_eq!(client.deleted(), expected);
        assert_eq!(outcome, DeleteOutcome::Deleted(expected));
    }
}

#[tokio::test]
async fn test_shallow_delete_keeps_publisher() {
    let params = function_params();
    let client = FakeControlPlane::new(&params);
    let engine = DeleteEngine::new(&client, &params, &AlwaysConfirm);

    assert_ok!(engine.delete(DeleteMode::Shallow).await);

    let deleted = client.deleted();
    assert_eq!(deleted.len(), 3);
    assert!(matches!(deleted[0], ResourceId::DefinitionVersion { .. }));
    assert!(deleted
        .iter()
        .all(|id| !matches!(id, ResourceId::Publisher(_) | ResourceId::ArtifactStore { .. })));
}

#[tokio::test]
async fn test_declined_delete_calls_nothing() {
    let params = design_params();
    let client = FakeControlPlane::new(&params);
    let engine = DeleteEngine::new(&client, &params, &NeverConfirm);

    let outcome = assert_ok!(engine.delete(DeleteMode::Clean).await);

    assert_eq!(outcome, DeleteOutcome::Aborted);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_publisher_conflict_is_retried() {
    let params = design_params();
    let client = FakeControlPlane::new(&params).with_publisher_conflicts(2);
    let engine = DeleteEngine::new(&client, &params, &AlwaysConfirm).with_publisher_retry(no_wait());

    assert_ok!(engine.delete(DeleteMode::Clean).await);

    let publisher_deletes = client
        .deleted()
        .iter()
        .filter(|id| matches!(id, ResourceId::Publisher(_)))
        .count();
    assert_eq!(publisher_deletes, 3);
}

#[tokio::test]
async fn test_publisher_conflict_gives_up() {
    let params = design_params();
    let client = FakeControlPlane::new(&params).with_publisher_conflicts(10);
    let engine = DeleteEngine::new(&client, &params, &AlwaysConfirm).with_publisher_retry(no_wait());

    let err = assert_err!(engine.delete(DeleteMode::Clean).await);

    assert!(err.is_conflict());
    // four children, then every publisher attempt
    assert_eq!(client.deleted().len(), 4 + 6);
}

#[test]
fn test_shallow_prompt() {
    let params = design_params();
    let prompt = confirmation_prompt(DeleteMode::Shallow, &plan(&params, DeleteMode::Shallow));

    insta::assert_snapshot!(prompt, @r###"
    Delete the definition version and its artifact manifests?
      - network service design version 'ubuntu/1.0.0'
      - artifact manifest 'ubuntu-nsd-manifest-1-0-0'
    Continue?
    "###);
}
