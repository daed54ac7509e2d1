// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Generate-config command - write an empty design input

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::finish;
use crate::config::DesignConfig;
use crate::utils::{print_success, TerminalConfirm};

/// Run the generate-config command
pub async fn run(output_file: PathBuf, _verbose: bool) -> Result<()> {
    let result = DesignConfig::template().write_to(&output_file, &TerminalConfirm);
    if result.is_ok() {
        print_success(&format!("Empty design input written to {}", output_file.display()));
        println!(
            "Fill it in, then run: {}",
            format!("defflow build --config-file {}", output_file.display()).cyan()
        );
    }
    finish(result)
}
