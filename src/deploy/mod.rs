// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Publishing and tearing down definitions
//!
//! Everything here talks to the control plane through the
//! [`ControlPlane`](crate::control_plane::ControlPlane) trait and runs one
//! remote call at a time.

mod delete;
mod engine;
mod parameters;
mod retry;

pub use delete::{confirmation_prompt, plan, DeleteEngine, DeleteMode, DeleteOutcome};
pub use engine::{
    deployment_name, DeployEngine, DeployOptions, DeployReport, ElementOutcome, ElementReport,
    Existence, SkipStep,
};
pub use parameters::{parameter_set, ExtraParameters};
pub use retry::{Backoff, RetryPolicy};
