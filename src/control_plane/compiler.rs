// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Template compilation
//!
//! Converts an element's template into the JSON the control plane accepts.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::errors::{DefflowError, DefflowResult};

/// Turns a template file into a native ARM template
#[async_trait]
pub trait TemplateCompiler: Send + Sync {
    async fn compile(&self, template: &Path) -> DefflowResult<Value>;
}

/// Compiles bicep with `az bicep build`; JSON templates pass through
pub struct BicepCompiler {
    /// Path to az binary
    az_bin: PathBuf,
}

impl BicepCompiler {
    /// Create a new compiler
    pub fn new() -> DefflowResult<Self> {
        let az_bin = which::which("az").map_err(|_| DefflowError::tool_not_found("az"))?;

        Ok(Self { az_bin })
    }
}

#[async_trait]
impl TemplateCompiler for BicepCompiler {
    async fn compile(&self, template: &Path) -> DefflowResult<Value> {
        if template.extension().and_then(|e| e.to_str()) == Some("json") {
            return read_json_template(template).await;
        }

        tracing::debug!("Compiling {}", template.display());

        let output = Command::new(&self.az_bin)
            .args(["bicep", "build", "--stdout", "--file"])
            .arg(template)
            .output()
            .await
            .map_err(|e| DefflowError::ToolExecutionFailed {
                tool: "az".into(),
                error: e.to_string(),
                help: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let help = if stderr.contains("bicep") && stderr.contains("install") {
                Some("Install bicep with 'az bicep install'".to_string())
            } else {
                None
            };
            return Err(DefflowError::TemplateCompilationFailed {
                path: template.to_path_buf(),
                stderr,
                help,
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| DefflowError::TemplateCompilationFailed {
            path: template.to_path_buf(),
            stderr: format!("compiler output is not JSON: {}", e),
            help: None,
        })
    }
}

/// Read an ARM template that needs no compilation
pub async fn read_json_template(path: &Path) -> DefflowResult<Value> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| DefflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

    serde_json::from_slice(&content).map_err(|e| DefflowError::InvalidArmTemplate {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_passes_through() {
        let Ok(compiler) = BicepCompiler::new() else {
            // az not installed, skip
            return;
        };

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.json");
        std::fs::write(&path, r#"{"parameters": {"a": {"type": "string"}}}"#).unwrap();

        let template = compiler.compile(&path).await.unwrap();
        assert_eq!(template["parameters"]["a"]["type"], "string");
    }

    #[tokio::test]
    async fn test_read_invalid_json_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            read_json_template(&path).await,
            Err(DefflowError::InvalidArmTemplate { .. })
        ));
    }
}
