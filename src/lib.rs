// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! # defflow - Definition build and deploy pipeline
//!
//! `defflow` turns a network service design into an ordered folder of
//! deployable elements and reconciles that folder with the cloud control
//! plane.
//!
//! ## Features
//!
//! - **Build** - Processors per resource element feed one definition folder
//! - **Publish** - Existence probes make re-runs skip finished work
//! - **Delete** - Children first, publisher last, with retry on conflicts
//!
//! ## Quick Start
//!
//! ```bash
//! # Write an empty design input
//! defflow generate-config
//!
//! # Build the definition folder
//! defflow build --config-file nsd-input.jsonc
//!
//! # Publish it
//! defflow publish
//!
//! # Remove the version again
//! defflow delete --parameters-file nsd-cli-output/all_deploy.parameters.json
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod control_plane;
pub mod definition;
pub mod deploy;
pub mod errors;
pub mod processors;
pub mod utils;

// Re-export commonly used types
pub use config::{DeployParameters, DesignConfig};
pub use definition::{DefinitionElement, DefinitionFolder, ElementKind};
pub use errors::{DefflowError, DefflowResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
