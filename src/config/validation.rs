// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Design configuration validation
//!
//! Runs every check before a build starts and reports all problems together,
//! so a half-written definition folder is never left behind.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::design::{
    ArmTemplateProperties, DesignConfig, NetworkFunctionProperties, ResourceElement,
};
use crate::errors::DefflowError;

/// Publisher scopes a referenced network function definition may have
pub const SUPPORTED_PUBLISHER_SCOPES: &[&str] = &["private"];

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("Invalid version pattern"))
}

/// Whether `version` has the `A.B.C` shape the control plane accepts
pub fn is_valid_version(version: &str) -> bool {
    version_pattern().is_match(version)
}

/// Design configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a design configuration
    pub fn validate(config: &DesignConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        let required = [
            ("location", &config.location),
            ("publisher_name", &config.publisher_name),
            (
                "publisher_resource_group_name",
                &config.publisher_resource_group_name,
            ),
            ("acr_artifact_store_name", &config.acr_artifact_store_name),
            ("nsd_name", &config.nsd_name),
            ("nsd_version", &config.nsd_version),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                result.add_error(&format!("{} must be set", field));
            }
        }

        if !config.nsd_version.is_empty() && !is_valid_version(&config.nsd_version) {
            result.add_error(&format!(
                "nsd_version '{}' must be in the format A.B.C",
                config.nsd_version
            ));
        }

        if config.resource_element_templates.is_empty() {
            result.add_error("At least one resource element template is required");
        }

        let mut seen_names = HashSet::new();
        for (idx, element) in config.resource_element_templates.iter().enumerate() {
            let label = format!("resource_element_templates[{}]", idx);

            match element.resolve() {
                Ok(ResourceElement::ArmTemplate(props)) => {
                    Self::validate_arm_template(config, &label, &props, &mut result);
                    Self::check_duplicate(&label, &props.artifact_name, &mut seen_names, &mut result);
                }
                Ok(ResourceElement::NetworkFunction(props)) => {
                    Self::validate_network_function(&label, &props, &mut result);
                    Self::check_duplicate(&label, &props.name, &mut seen_names, &mut result);
                }
                Err(DefflowError::UnknownResourceElementType { element_type }) => {
                    result.add_error(&format!(
                        "{}: unknown resource_element_type '{}' (expected ArmTemplate or NF)",
                        label, element_type
                    ));
                }
                Err(DefflowError::InvalidConfig { errors, .. }) => {
                    for error in errors {
                        result.add_error(&format!("{}: {}", label, error));
                    }
                }
                Err(e) => result.add_error(&format!("{}: {}", label, e)),
            }
        }

        result
    }

    fn validate_arm_template(
        config: &DesignConfig,
        label: &str,
        props: &ArmTemplateProperties,
        result: &mut ValidationResult,
    ) {
        Self::require(label, "artifact_name", &props.artifact_name, result);
        Self::require(label, "version", &props.version, result);
        Self::require(label, "file_path", &props.file_path, result);

        if !props.version.is_empty() && !is_valid_version(&props.version) {
            result.add_error(&format!(
                "{}: version '{}' must be in the format A.B.C",
                label, props.version
            ));
        }

        if !props.file_path.is_empty() {
            let path = config.resolve_path(&props.file_path);
            if !path.is_file() {
                result.add_error(&format!(
                    "{}: ARM template not found at {}",
                    label,
                    path.display()
                ));
            }
        }
    }

    fn validate_network_function(
        label: &str,
        props: &NetworkFunctionProperties,
        result: &mut ValidationResult,
    ) {
        Self::require(label, "name", &props.name, result);
        Self::require(label, "version", &props.version, result);
        Self::require(label, "publisher", &props.publisher, result);
        Self::require(
            label,
            "publisher_resource_group",
            &props.publisher_resource_group,
            result,
        );
        Self::require(
            label,
            "publisher_offering_location",
            &props.publisher_offering_location,
            result,
        );

        if !props.version.is_empty() && !is_valid_version(&props.version) {
            result.add_error(&format!(
                "{}: version '{}' must be in the format A.B.C",
                label, props.version
            ));
        }

        let scope = props.publisher_scope.to_lowercase();
        if !SUPPORTED_PUBLISHER_SCOPES.contains(&scope.as_str()) {
            result.add_error(&format!(
                "{}: publisher_scope '{}' is not supported (expected one of: {})",
                label,
                props.publisher_scope,
                SUPPORTED_PUBLISHER_SCOPES.join(", ")
            ));
        }
    }

    fn require(label: &str, field: &str, value: &str, result: &mut ValidationResult) {
        if value.trim().is_empty() {
            result.add_error(&format!("{}: {} must be set", label, field));
        }
    }

    fn check_duplicate(
        label: &str,
        name: &str,
        seen: &mut HashSet<String>,
        result: &mut ValidationResult,
    ) {
        if !name.is_empty() && !seen.insert(name.to_string()) {
            result.add_warning(&format!(
                "{}: name '{}' is used by an earlier element; its schema entry will be replaced",
                label, name
            ));
        }
    }
}

/// Validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
