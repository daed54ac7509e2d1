// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Build command - design input to definition folder

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::finish;
use crate::config::{DesignConfig, ResourceElement};
use crate::constants::NSD_OUTPUT_FOLDER_NAME;
use crate::control_plane::{AzCliControlPlane, ControlPlane};
use crate::definition::NsdDefinitionBuilder;
use crate::errors::{DefflowError, DefflowResult};
use crate::processors::{build_processors, Processor};
use crate::utils::{confirmer, print_header, print_step, print_success, print_summary};

/// Run the build command
pub async fn run(
    config_file: PathBuf,
    output_folder: Option<PathBuf>,
    force: bool,
    subscription: Option<String>,
    verbose: bool,
) -> Result<()> {
    print_header("Building definition folder...");

    finish(build(config_file, output_folder, force, subscription, verbose).await)
}

async fn build(
    config_file: PathBuf,
    output_folder: Option<PathBuf>,
    force: bool,
    subscription: Option<String>,
    verbose: bool,
) -> DefflowResult<()> {
    let config = DesignConfig::from_file(&config_file)?;
    config.validate()?;
    print_success(&format!("{} is valid", config_file.display()));

    // only network function elements need to read from the control plane
    let needs_client = config
        .resource_elements()?
        .iter()
        .any(|e| matches!(e, ResourceElement::NetworkFunction(_)));
    let client = if needs_client {
        Some(AzCliControlPlane::new(subscription)?)
    } else {
        None
    };

    let processors =
        build_processors(&config, client.as_ref().map(|c| c as &dyn ControlPlane)).await?;
    if verbose {
        for processor in &processors {
            print_step(processor.name());
        }
    }

    let root = output_folder.unwrap_or_else(|| PathBuf::from(NSD_OUTPUT_FOLDER_NAME));
    let folder = NsdDefinitionBuilder::new(&config, &processors)?.build(&root)?;

    let mut overwrite = false;
    if root.exists() {
        let prompt = format!(
            "The folder {} already exists - do you want to overwrite it?",
            root.display()
        );
        if !confirmer(force).confirm(&prompt) {
            return Err(DefflowError::UserAborted);
        }
        overwrite = true;
    }

    folder.write(overwrite).await?;

    print_success(&format!("{} elements written", folder.elements.len()));
    print_summary(&format!("Definition folder built at {}", root.display()), true);
    println!(
        "Publish it with: {}",
        format!("defflow publish --definition-folder {}", root.display()).cyan()
    );
    Ok(())
}
