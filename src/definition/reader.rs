// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Loading a definition folder written by `build`

use std::path::Path;
use tokio::fs;

use super::graph::ElementGraph;
use super::{DefinitionElement, DefinitionFolder, FolderIndex, SupportingFile, INDEX_VERSION};
use crate::constants::INDEX_FILENAME;
use crate::errors::{DefflowError, DefflowResult};

impl DefinitionFolder {
    /// Read a folder and its index, in dependency order
    pub async fn load(root: &Path) -> DefflowResult<Self> {
        if !fs::try_exists(root).await.unwrap_or(false) {
            return Err(DefflowError::DefinitionFolderNotFound {
                path: root.to_path_buf(),
            });
        }

        let invalid = |reason: String| DefflowError::InvalidDefinitionFolder {
            path: root.to_path_buf(),
            reason,
        };

        let index_path = root.join(INDEX_FILENAME);
        let index_text = fs::read_to_string(&index_path)
            .await
            .map_err(|e| invalid(format!("cannot read {}: {}", INDEX_FILENAME, e)))?;
        let index: FolderIndex = serde_json::from_str(&index_text)
            .map_err(|e| invalid(format!("malformed {}: {}", INDEX_FILENAME, e)))?;

        if index.version != INDEX_VERSION {
            return Err(invalid(format!(
                "unsupported index version {} (expected {})",
                index.version, INDEX_VERSION
            )));
        }

        let mut elements = Vec::with_capacity(index.elements.len());
        for entry in index.elements {
            let mut element = DefinitionElement::new(entry.path, entry.kind, Vec::new());
            element.depends_on = entry.depends_on;

            let primary = root.join(element.primary_path());
            element.content = read(&primary).await?;

            let dir = root.join(element.directory());
            for name in entry.supporting_files {
                let contents = read(&dir.join(&name)).await?;
                element.supporting_files.push(SupportingFile::new(name, contents));
            }

            elements.push(element);
        }

        let order = ElementGraph::build(&elements)?.order();
        let mut slots: Vec<Option<DefinitionElement>> = elements.into_iter().map(Some).collect();
        let elements = order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();

        tracing::debug!("Loaded definition folder {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            elements,
        })
    }
}

async fn read(path: &Path) -> DefflowResult<Vec<u8>> {
    fs::read(path).await.map_err(|e| DefflowError::FileReadError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{DefinitionFolderBuilder, ElementKind};
    use tempfile::TempDir;

    fn folder(root: &Path) -> DefinitionFolder {
        let mut builder = DefinitionFolderBuilder::new(root);
        builder
            .add_element(DefinitionElement::new("base", ElementKind::Base, "base"))
            .add_element(
                DefinitionElement::new("artifacts", ElementKind::ArtifactList, "[]")
                    .with_supporting_files(vec![
                        SupportingFile::new("b.json", "b"),
                        SupportingFile::new("a.json", "a"),
                    ])
                    .depends_on("base"),
            )
            .add_element(
                DefinitionElement::new("all_deploy.parameters.json", ElementKind::Parameters, "{}")
                    .depends_on("artifacts"),
            );
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");
        let written = folder(&root);
        written.write(false).await.unwrap();

        let loaded = DefinitionFolder::load(&root).await.unwrap();

        assert_eq!(loaded, written);
        let names: Vec<_> = loaded.elements[1]
            .supporting_files
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["b.json", "a.json"]);
    }

    #[tokio::test]
    async fn test_order_rederived_from_dependencies() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");
        folder(&root).write(false).await.unwrap();

        // list parameters first in the index; dependencies still put it last
        let index_path = root.join(INDEX_FILENAME);
        let mut index: FolderIndex =
            serde_json::from_str(&std::fs::read_to_string(&index_path).unwrap()).unwrap();
        index.elements.rotate_right(1);
        std::fs::write(&index_path, serde_json::to_string(&index).unwrap()).unwrap();

        let loaded = DefinitionFolder::load(&root).await.unwrap();
        assert_eq!(
            loaded.kinds(),
            vec![ElementKind::Base, ElementKind::ArtifactList, ElementKind::Parameters]
        );
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let temp = TempDir::new().unwrap();
        let result = DefinitionFolder::load(&temp.path().join("nope")).await;

        assert!(matches!(
            result,
            Err(DefflowError::DefinitionFolderNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_index() {
        let temp = TempDir::new().unwrap();
        let result = DefinitionFolder::load(temp.path()).await;

        assert!(matches!(
            result,
            Err(DefflowError::InvalidDefinitionFolder { .. })
        ));
    }
}
