// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Definition folder building and persistence
//!
//! The whole folder is assembled in memory first; nothing touches the disk
//! until [`DefinitionFolder::write`] is called on a complete folder.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tera::Context;
use tokio::fs;

use super::graph::ElementGraph;
use super::templates::{NSD_BASE_TEMPLATE, NSD_DEFINITION_TEMPLATE, NSD_MANIFEST_TEMPLATE};
use super::{
    dedup, DefinitionElement, DefinitionFolder, ElementKind, FolderIndex, IndexEntry,
    SupportingFile, TemplateRenderer, INDEX_VERSION,
};
use crate::config::{jsonc, DeployParameters, DesignConfig};
use crate::constants::{
    ALL_PARAMETERS_FILENAME, ARTIFACT_LIST_FOLDER_NAME, BASE_FOLDER_NAME, CGS_FILENAME, CGS_NAME,
    INDEX_FILENAME, MANIFEST_FOLDER_NAME, NSD_DEFINITION_FOLDER_NAME,
};
use crate::errors::{DefflowError, DefflowResult};
use crate::processors::schema::schema_document;
use crate::processors::{mappings_file_name, NfviType, Processor};

/// Collects elements into a folder, checking their dependencies
pub struct DefinitionFolderBuilder {
    root: PathBuf,
    elements: Vec<DefinitionElement>,
}

impl DefinitionFolderBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            elements: Vec::new(),
        }
    }

    pub fn add_element(&mut self, element: DefinitionElement) -> &mut Self {
        self.elements.push(element);
        self
    }

    /// Finish the folder; every dependency must name an added element
    pub fn build(self) -> DefflowResult<DefinitionFolder> {
        ElementGraph::build(&self.elements)?;
        Ok(DefinitionFolder {
            root: self.root,
            elements: self.elements,
        })
    }
}

impl DefinitionFolder {
    /// Persist every element and the index under `root`
    ///
    /// An existing folder is only replaced when `overwrite` is set.
    pub async fn write(&self, overwrite: bool) -> DefflowResult<()> {
        if fs::try_exists(&self.root).await.unwrap_or(false) {
            if !overwrite {
                return Err(DefflowError::OutputExists {
                    path: self.root.clone(),
                });
            }
            tracing::debug!("Removing existing folder {}", self.root.display());
            fs::remove_dir_all(&self.root)
                .await
                .map_err(|e| write_error(&self.root, e))?;
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| write_error(&self.root, e))?;

        for element in &self.elements {
            let dir = self.root.join(element.directory());
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| write_error(&dir, e))?;

            write_file(&self.root.join(element.primary_path()), &element.content).await?;
            for file in &element.supporting_files {
                write_file(&dir.join(&file.name), &file.contents).await?;
            }
            tracing::debug!("Wrote {} element '{}'", element.kind, element.path);
        }

        let index = FolderIndex {
            version: INDEX_VERSION,
            elements: self.elements.iter().map(IndexEntry::from).collect(),
        };
        let index_path = self.root.join(INDEX_FILENAME);
        write_file(&index_path, jsonc::to_pretty_string(&index)?.as_bytes()).await?;

        tracing::info!("Definition folder written to {}", self.root.display());
        Ok(())
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> DefflowResult<()> {
    fs::write(path, contents)
        .await
        .map_err(|e| write_error(path, e))
}

fn write_error(path: &Path, e: std::io::Error) -> DefflowError {
    DefflowError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

/// Builds the definition folder of a network service design
pub struct NsdDefinitionBuilder<'a, P> {
    config: &'a DesignConfig,
    processors: &'a [P],
    renderer: TemplateRenderer,
}

impl<'a, P: Processor> NsdDefinitionBuilder<'a, P> {
    pub fn new(config: &'a DesignConfig, processors: &'a [P]) -> DefflowResult<Self> {
        Ok(Self {
            config,
            processors,
            renderer: TemplateRenderer::new()?,
        })
    }

    /// Assemble base, manifest, artifact list, definition and parameters
    pub fn build(&self, root: impl Into<PathBuf>) -> DefflowResult<DefinitionFolder> {
        let mut folder = DefinitionFolderBuilder::new(root);

        folder
            .add_element(self.base_element()?)
            .add_element(self.manifest_element()?)
            .add_element(self.artifact_list_element()?)
            .add_element(self.definition_element()?)
            .add_element(self.parameters_element()?);

        folder.build()
    }

    fn base_element(&self) -> DefflowResult<DefinitionElement> {
        let content = self.renderer.render(NSD_BASE_TEMPLATE, &Context::new())?;
        Ok(DefinitionElement::new(BASE_FOLDER_NAME, ElementKind::Base, content))
    }

    fn manifest_element(&self) -> DefflowResult<DefinitionElement> {
        let artifacts = dedup(
            self.processors
                .iter()
                .flat_map(|p| p.artifact_manifest_list())
                .collect(),
        );

        let mut context = Context::new();
        context.insert("acr_artifacts", &artifacts);
        let content = self.renderer.render(NSD_MANIFEST_TEMPLATE, &context)?;

        Ok(DefinitionElement::new(MANIFEST_FOLDER_NAME, ElementKind::Manifest, content)
            .depends_on(BASE_FOLDER_NAME))
    }

    fn artifact_list_element(&self) -> DefflowResult<DefinitionElement> {
        let mut details = Vec::new();
        let mut files = Vec::new();
        let mut names = HashSet::new();

        for processor in self.processors {
            let (artifacts, supporting) = processor.artifact_details()?;
            details.extend(artifacts);
            for file in supporting {
                if names.insert(file.name.clone()) {
                    files.push(file);
                }
            }
        }

        let details = dedup(details);
        let content = jsonc::to_pretty_string(&details)?;

        Ok(
            DefinitionElement::new(ARTIFACT_LIST_FOLDER_NAME, ElementKind::ArtifactList, content)
                .with_supporting_files(files)
                .depends_on(MANIFEST_FOLDER_NAME),
        )
    }

    fn definition_element(&self) -> DefflowResult<DefinitionElement> {
        let mut rets = Vec::new();
        let mut files = Vec::new();
        let mut properties = Map::new();
        // every element must get a config-group entry, even one exposing nothing
        let mut required: Vec<String> = Vec::new();

        for processor in self.processors {
            rets.push(processor.resource_element_template()?);
            if !required.iter().any(|name| name == processor.name()) {
                required.push(processor.name().to_string());
            }

            let mappings = processor.generate_values_mappings()?;
            files.push(SupportingFile::json(
                mappings_file_name(processor.name()),
                &Value::Object(mappings),
            )?);

            for (key, value) in processor.generate_schema()? {
                if properties.insert(key.clone(), value).is_some() {
                    tracing::warn!(
                        "Schema properties for '{}' were already generated; '{}' replaces them",
                        key,
                        processor.name()
                    );
                }
            }
        }

        let schema = schema_document(CGS_NAME, properties, required);
        files.push(SupportingFile::json(CGS_FILENAME, &schema)?);

        let mut context = Context::new();
        context.insert("cgs_name", CGS_NAME);
        context.insert("cgs_file", CGS_FILENAME);
        context.insert("nsdv_description", &self.config.nsdv_description);
        context.insert("nfvi_types", &self.nfvi_types());
        context.insert("rets", &rets);
        let content = self.renderer.render(NSD_DEFINITION_TEMPLATE, &context)?;

        Ok(
            DefinitionElement::new(NSD_DEFINITION_FOLDER_NAME, ElementKind::Definition, content)
                .with_supporting_files(files)
                .depends_on(ARTIFACT_LIST_FOLDER_NAME),
        )
    }

    fn parameters_element(&self) -> DefflowResult<DefinitionElement> {
        let parameters = DeployParameters::for_design(self.config);
        let content = jsonc::to_pretty_string(&parameters)?;

        Ok(
            DefinitionElement::new(ALL_PARAMETERS_FILENAME, ElementKind::Parameters, content)
                .depends_on(NSD_DEFINITION_FOLDER_NAME),
        )
    }

    /// NFVI types the design version declares
    ///
    /// A design that only lands on Azure Core needs a single entry.
    fn nfvi_types(&self) -> Vec<String> {
        let types: Vec<NfviType> = self.processors.iter().filter_map(|p| p.nfvi_type()).collect();

        if types.iter().all(|t| *t == NfviType::AzureCore) {
            return vec![NfviType::AzureCore.to_string()];
        }
        dedup(types).into_iter().map(|t| t.to_string()).collect()
    }
}
