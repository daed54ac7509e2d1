// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Well-known names shared by the builder, the reader and the CLI
//!
//! A definition folder written by one invocation is read back by another,
//! so every path segment comes from here.

/// Default name of the design input file
pub const NSD_INPUT_FILENAME: &str = "nsd-input.jsonc";

/// Default name of the built definition folder
pub const NSD_OUTPUT_FOLDER_NAME: &str = "nsd-cli-output";

/// Element index at the root of a definition folder
pub const INDEX_FILENAME: &str = "index.json";

pub const BASE_FOLDER_NAME: &str = "base";
pub const MANIFEST_FOLDER_NAME: &str = "artifactManifest";
pub const ARTIFACT_LIST_FOLDER_NAME: &str = "artifacts";
pub const NSD_DEFINITION_FOLDER_NAME: &str = "nsdDefinition";

/// Primary file of every template element
pub const TEMPLATE_FILENAME: &str = "deploy.bicep";

/// Primary file of the artifact-list element
pub const ARTIFACT_LIST_FILENAME: &str = "artifacts.json";

/// The parameters element is a single top-level file
pub const ALL_PARAMETERS_FILENAME: &str = "all_deploy.parameters.json";

/// Sibling file carrying the extra parameters of a site network service
pub const LINKED_RESOURCES_FILENAME: &str = "linked-resources.json";

pub const CGS_NAME: &str = "ConfigGroupSchema";
pub const CGS_FILENAME: &str = "config-group-schema.json";

/// Suffix of the per-processor parameter mapping files
pub const MAPPINGS_SUFFIX: &str = "-mappings.json";

pub const SCHEMA_DRAFT: &str = "https://json-schema.org/draft-07/schema#";

/// API version used for every control-plane resource
pub const API_VERSION: &str = "2023-09-01";

/// Resource provider owning publishers and everything below them
pub const RESOURCE_PROVIDER: &str = "Microsoft.HybridNetwork";
