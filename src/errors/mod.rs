// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Error types
//!
//! Every failure the pipeline can surface, grouped by the stage that raises
//! it. Variants carry enough context for the CLI to print a useful diagnostic
//! and a recovery suggestion.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::control_plane::ResourceId;

/// Result type for defflow operations
pub type DefflowResult<T> = Result<T, DefflowError>;

/// Main error type for defflow
#[derive(Error, Debug, Diagnostic)]
pub enum DefflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(defflow::config_not_found),
        help("Generate a starting point with 'defflow generate-config'")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse configuration file '{path}': {message}")]
    #[diagnostic(
        code(defflow::config_parse),
        help("Only full-line '//' comments are allowed; the rest must be valid JSON")
    )]
    ConfigParse { path: PathBuf, message: String },

    #[error("Configuration is invalid ({} problem(s))", errors.len())]
    #[diagnostic(code(defflow::invalid_config))]
    InvalidConfig {
        errors: Vec<String>,
        #[help]
        help: Option<String>,
    },

    #[error("Unknown resource element type '{element_type}'")]
    #[diagnostic(
        code(defflow::unknown_resource_element_type),
        help("Supported resource element types: ArmTemplate, NF")
    )]
    UnknownResourceElementType { element_type: String },

    #[error("Aborted by user")]
    #[diagnostic(code(defflow::user_aborted))]
    UserAborted,

    // ─────────────────────────────────────────────────────────────────────────
    // Build Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid ARM template '{path}': {reason}")]
    #[diagnostic(code(defflow::invalid_arm_template))]
    InvalidArmTemplate { path: PathBuf, reason: String },

    #[error("Network function definition version '{name}' cannot be referenced: {reason}")]
    #[diagnostic(code(defflow::invalid_nfdv))]
    InvalidDefinitionVersion {
        name: String,
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to render template '{template}': {message}")]
    #[diagnostic(code(defflow::template_render))]
    TemplateRender { template: String, message: String },

    #[error("Output folder already exists: {path}")]
    #[diagnostic(
        code(defflow::output_exists),
        help("Re-run with --force to replace it")
    )]
    OutputExists { path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────────
    // Definition Folder Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Definition folder not found: {path}")]
    #[diagnostic(
        code(defflow::definition_folder_not_found),
        help("Build one first with 'defflow build'")
    )]
    DefinitionFolderNotFound { path: PathBuf },

    #[error("Invalid definition folder '{path}': {reason}")]
    #[diagnostic(code(defflow::invalid_definition_folder))]
    InvalidDefinitionFolder { path: PathBuf, reason: String },

    #[error("Circular dependency detected between definition elements")]
    #[diagnostic(
        code(defflow::circular_dependency),
        help("Edit dependsOn in index.json or rebuild the definition folder")
    )]
    CircularDependency { elements: Vec<String> },

    #[error("Element '{element}' depends on unknown element '{dependency}'")]
    #[diagnostic(
        code(defflow::unknown_dependency),
        help("Check that '{dependency}' is listed in index.json")
    )]
    UnknownDependency { element: String, dependency: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Tool '{tool}' not found")]
    #[diagnostic(code(defflow::tool_not_found), help("{suggestion}"))]
    ToolNotFound { tool: String, suggestion: String },

    #[error("Tool '{tool}' execution failed: {error}")]
    #[diagnostic(code(defflow::tool_execution_failed))]
    ToolExecutionFailed {
        tool: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to compile template '{path}'")]
    #[diagnostic(code(defflow::template_compilation_failed))]
    TemplateCompilationFailed {
        path: PathBuf,
        stderr: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Remote Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Remote call '{operation}' failed: {message}")]
    #[diagnostic(code(defflow::remote_request_failed))]
    RemoteRequestFailed {
        operation: String,
        /// HTTP status reported by the control plane; `None` for failures that
        /// never produced a response
        status: Option<u16>,
        message: String,
    },

    #[error("Template validation failed for deployment '{deployment}'")]
    #[diagnostic(code(defflow::template_validation_failed))]
    TemplateValidationFailed {
        deployment: String,
        /// Error body returned by the control plane
        body: String,
        #[help]
        help: Option<String>,
    },

    #[error("Template '{template}' is missing required parameters: {}", parameters.join(", "))]
    #[diagnostic(
        code(defflow::missing_template_parameters),
        help("Add the missing values to the deploy parameters file")
    )]
    MissingTemplateParameters {
        template: String,
        parameters: Vec<String>,
    },

    #[error("Deployment '{deployment}' finished in state '{state}'")]
    #[diagnostic(code(defflow::provisioning_failed))]
    ProvisioningFailed {
        deployment: String,
        state: String,
        #[help]
        help: Option<String>,
    },

    #[error("Only a subset of the artifact manifests exist. Cannot proceed.")]
    #[diagnostic(code(defflow::inconsistent_remote_state))]
    InconsistentRemoteState {
        present: Vec<String>,
        missing: Vec<String>,
        #[help]
        help: Option<String>,
    },

    #[error("Conflict deleting {resource}: {message}")]
    #[diagnostic(
        code(defflow::resource_conflict),
        help("A child resource is still being torn down; wait and retry the delete")
    )]
    ResourceConflict { resource: String, message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(defflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(defflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(defflow::io_error))]
    Io { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(defflow::json_error))]
    Json { message: String },
}

impl From<std::io::Error> for DefflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for DefflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            message: e.to_string(),
        }
    }
}

impl DefflowError {
    /// Create a tool not found error with installation suggestion
    pub fn tool_not_found(tool: &str) -> Self {
        let suggestion = match tool {
            "az" => "Install the Azure CLI: https://learn.microsoft.com/cli/azure/install-azure-cli"
                .to_string(),
            "oras" => "Install ORAS: https://oras.land/docs/installation".to_string(),
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::ToolNotFound {
            tool: tool.to_string(),
            suggestion,
        }
    }

    /// Wrap a tera failure, keeping the nested cause tera hides in its source chain
    pub fn template_render(template: &str, e: &tera::Error) -> Self {
        let mut message = e.to_string();
        let mut source = std::error::Error::source(e);
        while let Some(inner) = source {
            message = format!("{}: {}", message, inner);
            source = inner.source();
        }
        Self::TemplateRender {
            template: template.to_string(),
            message,
        }
    }

    /// Aggregate validation problems into one error
    pub fn invalid_config(errors: Vec<String>) -> Self {
        let help = if errors.is_empty() {
            None
        } else {
            Some(
                errors
                    .iter()
                    .map(|e| format!("• {}", e))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        };
        Self::InvalidConfig { errors, help }
    }

    /// A manifest probe found some, but not all, of the expected manifests
    pub fn inconsistent_manifests(present: Vec<String>, missing: Vec<String>) -> Self {
        let help = Some(format!(
            "Present: {}. Missing: {}. Delete the definition version and its manifests \
             (defflow delete) and publish again.",
            present.join(", "),
            missing.join(", ")
        ));
        Self::InconsistentRemoteState {
            present,
            missing,
            help,
        }
    }

    /// Build a conflict error for a resource
    pub fn conflict(resource: &ResourceId, message: impl Into<String>) -> Self {
        Self::ResourceConflict {
            resource: resource.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error is a declined confirmation rather than a failure
    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::UserAborted)
    }

    /// Whether this is a remote failure that never produced an HTTP response
    pub fn is_client_side(&self) -> bool {
        matches!(self, Self::RemoteRequestFailed { status: None, .. })
    }

    /// Whether this is a "resource still has children" conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ResourceConflict { .. } | Self::RemoteRequestFailed { status: Some(409), .. }
        )
    }

    /// Recovery suggestion for errors an operator can act on
    pub fn recovery(&self) -> Option<RecoverySuggestion> {
        match self {
            Self::ToolNotFound { tool, .. } => Some(RecoverySuggestion::install_tool(tool)),
            Self::ConfigNotFound { path } => Some(RecoverySuggestion::generate_config(path)),
            Self::InconsistentRemoteState { missing, .. } => {
                Some(RecoverySuggestion::delete_partial_publish(missing))
            }
            Self::ResourceConflict { resource, .. } => {
                Some(RecoverySuggestion::retry_delete(resource))
            }
            Self::TemplateValidationFailed { deployment, .. } => {
                Some(RecoverySuggestion::inspect_validation(deployment))
            }
            _ => None,
        }
    }
}
