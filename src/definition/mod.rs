// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Definition folders
//!
//! A definition folder is the ordered set of deployable elements a build
//! produces. Each element owns a primary file (a template, the artifact
//! list, or the parameters file) plus supporting files, and the folder's
//! `index.json` records the order they must be applied in.

mod artifact;
mod builder;
mod graph;
mod reader;
pub mod templates;

pub use artifact::{dedup, ArtifactDetail, ArtifactType, ManifestArtifact};
pub use builder::{DefinitionFolderBuilder, NsdDefinitionBuilder};
pub use graph::ElementGraph;
pub use templates::TemplateRenderer;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::jsonc;
use crate::constants::{ARTIFACT_LIST_FILENAME, TEMPLATE_FILENAME};
use crate::errors::DefflowResult;

/// Current `index.json` format
pub const INDEX_VERSION: u32 = 1;

/// What an element deploys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    /// Publisher, artifact store and group
    Base,
    /// Artifact manifest listing every artifact
    Manifest,
    /// Artifacts to upload into the stores
    ArtifactList,
    /// Definition or design version
    Definition,
    /// Site network service consuming a published design
    SiteNetworkService,
    /// Flat deploy-time values, nothing to apply
    Parameters,
}

impl ElementKind {
    /// Primary file name inside the element directory; `None` when the
    /// element path is the file itself
    pub fn primary_file(self) -> Option<&'static str> {
        match self {
            Self::ArtifactList => Some(ARTIFACT_LIST_FILENAME),
            Self::Parameters => None,
            _ => Some(TEMPLATE_FILENAME),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base => "base",
            Self::Manifest => "manifest",
            Self::ArtifactList => "artifact list",
            Self::Definition => "definition",
            Self::SiteNetworkService => "site network service",
            Self::Parameters => "parameters",
        };
        write!(f, "{}", name)
    }
}

/// A file stored next to an element's primary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportingFile {
    /// Name relative to the element directory
    pub name: String,
    pub contents: Vec<u8>,
}

impl SupportingFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Pretty-printed JSON
    pub fn json(name: impl Into<String>, value: &Value) -> DefflowResult<Self> {
        Ok(Self::new(name, jsonc::to_pretty_string(value)?))
    }
}

/// One deployable unit of a definition folder
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionElement {
    /// Path relative to the folder root: a directory, or the file itself
    /// for parameters
    pub path: String,
    pub kind: ElementKind,
    /// Content of the primary file
    pub content: Vec<u8>,
    pub supporting_files: Vec<SupportingFile>,
    /// Paths of elements that must be applied first
    pub depends_on: Vec<String>,
}

impl DefinitionElement {
    pub fn new(path: impl Into<String>, kind: ElementKind, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            kind,
            content: content.into(),
            supporting_files: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_supporting_files(mut self, files: Vec<SupportingFile>) -> Self {
        self.supporting_files = files;
        self
    }

    pub fn depends_on(mut self, path: impl Into<String>) -> Self {
        self.depends_on.push(path.into());
        self
    }

    /// Directory holding the element's files, relative to the root
    pub fn directory(&self) -> PathBuf {
        match self.kind.primary_file() {
            Some(_) => PathBuf::from(&self.path),
            None => Path::new(&self.path)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    /// Primary file, relative to the root
    pub fn primary_path(&self) -> PathBuf {
        match self.kind.primary_file() {
            Some(file) => Path::new(&self.path).join(file),
            None => PathBuf::from(&self.path),
        }
    }

    pub fn supporting_file(&self, name: &str) -> Option<&SupportingFile> {
        self.supporting_files.iter().find(|f| f.name == name)
    }
}

/// An ordered collection of definition elements rooted in one directory
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionFolder {
    pub root: PathBuf,
    pub elements: Vec<DefinitionElement>,
}

impl DefinitionFolder {
    /// First element of a kind
    pub fn element(&self, kind: ElementKind) -> Option<&DefinitionElement> {
        self.elements.iter().find(|e| e.kind == kind)
    }

    /// Element kinds in order
    pub fn kinds(&self) -> Vec<ElementKind> {
        self.elements.iter().map(|e| e.kind).collect()
    }
}

/// On-disk form of a folder's element list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FolderIndex {
    pub version: u32,
    pub elements: Vec<IndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexEntry {
    pub path: String,
    pub kind: ElementKind,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub supporting_files: Vec<String>,
}

impl From<&DefinitionElement> for IndexEntry {
    fn from(element: &DefinitionElement) -> Self {
        Self {
            path: element.path.clone(),
            kind: element.kind,
            depends_on: element.depends_on.clone(),
            supporting_files: element
                .supporting_files
                .iter()
                .map(|f| f.name.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_element_paths() {
        let element = DefinitionElement::new("base", ElementKind::Base, "x");

        assert_eq!(element.directory(), PathBuf::from("base"));
        assert_eq!(element.primary_path(), PathBuf::from("base/deploy.bicep"));
    }

    #[test]
    fn test_parameters_element_is_a_file() {
        let element = DefinitionElement::new(
            "all_deploy.parameters.json",
            ElementKind::Parameters,
            "{}",
        );

        assert_eq!(element.directory(), PathBuf::new());
        assert_eq!(
            element.primary_path(),
            PathBuf::from("all_deploy.parameters.json")
        );
    }

    #[test]
    fn test_kind_serializes_camel_case() {
        assert_eq!(
            serde_json::to_value(ElementKind::SiteNetworkService).unwrap(),
            "siteNetworkService"
        );
        assert_eq!(
            serde_json::to_value(ElementKind::ArtifactList).unwrap(),
            "artifactList"
        );
    }
}
