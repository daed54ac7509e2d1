// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Utility modules
//!
//! Terminal output and prompts shared by the CLI and the engines.

pub mod colors;
pub mod prompt;
pub mod spinner;

pub use colors::*;
pub use prompt::*;
pub use spinner::*;
