// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use std::path::Path;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest installing a missing tool
    pub fn install_tool(tool: &str) -> Self {
        match tool {
            "az" => Self {
                action: "Install the Azure CLI".into(),
                steps: vec![
                    "The Azure CLI compiles bicep templates and talks to the control plane".into(),
                    "Install it, then sign in".into(),
                ],
                commands: vec![
                    "# Linux:".into(),
                    "curl -sL https://aka.ms/InstallAzureCLIDeb | sudo bash".into(),
                    "".into(),
                    "# Homebrew (macOS/Linux):".into(),
                    "brew install azure-cli".into(),
                    "".into(),
                    "az login".into(),
                ],
            },
            "oras" => Self {
                action: "Install ORAS".into(),
                steps: vec!["ORAS pushes template artifacts into the artifact store".into()],
                commands: vec![
                    "# Homebrew (macOS/Linux):".into(),
                    "brew install oras".into(),
                ],
            },
            _ => Self {
                action: format!("Install {}", tool),
                steps: vec![format!("Install {} and ensure it's in your PATH", tool)],
                commands: vec![],
            },
        }
    }

    /// Suggest generating a configuration file
    pub fn generate_config(path: &Path) -> Self {
        Self {
            action: "Create a design configuration".into(),
            steps: vec![
                format!("No configuration found at {}", path.display()),
                "Generate a commented template and fill it in".into(),
            ],
            commands: vec![format!(
                "defflow generate-config --output-file {}",
                path.display()
            )],
        }
    }

    /// Suggest clearing a half-published version
    pub fn delete_partial_publish(missing: &[String]) -> Self {
        Self {
            action: "Delete the partially published version".into(),
            steps: vec![
                format!("Missing manifests: {}", missing.join(", ")),
                "defflow never guesses which manifest is stale".into(),
                "Delete the version and its manifests, then publish again".into(),
            ],
            commands: vec![
                "defflow delete --parameters-file all_deploy.parameters.json".into(),
                "defflow publish".into(),
            ],
        }
    }

    /// Suggest retrying a delete that hit a conflict
    pub fn retry_delete(resource: &str) -> Self {
        Self {
            action: format!("Retry deleting {}", resource),
            steps: vec![
                "Nested resources were still being removed when retries ran out".into(),
                "Wait a few minutes for the control plane to finish".into(),
            ],
            commands: vec!["defflow delete --clean --parameters-file all_deploy.parameters.json"
                .into()],
        }
    }

    /// Suggest inspecting a rejected deployment
    pub fn inspect_validation(deployment: &str) -> Self {
        Self {
            action: "Inspect the rejected deployment".into(),
            steps: vec![
                format!("The control plane rejected '{}'", deployment),
                "Check the parameter values against the template".into(),
            ],
            commands: vec!["defflow --verbose publish".into()],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
