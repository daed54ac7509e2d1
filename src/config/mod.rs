// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Configuration model
//!
//! Two files drive the pipeline: the design input a user writes before
//! `build`, and the deploy parameters `build` emits for `publish`/`delete`.

mod design;
pub mod jsonc;
mod parameters;
mod validation;

pub use design::{
    ArmTemplateProperties, DesignConfig, NetworkFunctionProperties, ResourceElement,
    ResourceElementConfig, ARM_TEMPLATE_TYPE, NETWORK_FUNCTION_TYPE,
};
pub use parameters::{DefinitionTarget, DeployParameters};
pub use validation::{is_valid_version, ConfigValidator, ValidationResult};
