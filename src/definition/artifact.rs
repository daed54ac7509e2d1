// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Artifact records
//!
//! What the manifest element declares and the artifact-list element uploads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of artifact stored in an artifact store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactType {
    ArmTemplate,
    OCIArtifact,
    VhdImageFile,
    ImageFile,
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ArmTemplate => "ArmTemplate",
            Self::OCIArtifact => "OCIArtifact",
            Self::VhdImageFile => "VhdImageFile",
            Self::ImageFile => "ImageFile",
        };
        write!(f, "{}", name)
    }
}

/// An artifact entry of a publish manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestArtifact {
    pub artifact_name: String,
    pub artifact_type: ArtifactType,
    pub artifact_version: String,
}

/// An artifact to upload, with the local file holding its content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDetail {
    pub artifact_name: String,
    pub artifact_type: ArtifactType,
    pub artifact_version: String,
    /// Path relative to the artifact-list element's directory
    pub file: String,
}

/// Keep the first occurrence of every item
pub fn dedup<T: Clone + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
