// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Publish command - apply a definition folder

use miette::Result;
use std::path::PathBuf;

use super::finish;
use crate::config::DeployParameters;
use crate::constants::{ALL_PARAMETERS_FILENAME, NSD_OUTPUT_FOLDER_NAME};
use crate::control_plane::{AzCliControlPlane, BicepCompiler};
use crate::definition::DefinitionFolder;
use crate::deploy::{DeployEngine, DeployOptions, SkipStep};
use crate::errors::DefflowResult;
use crate::utils::{print_header, print_summary};

/// Run the publish command
pub async fn run(
    definition_folder: Option<PathBuf>,
    parameters_file: Option<PathBuf>,
    skip: Option<SkipStep>,
    subscription: Option<String>,
    _verbose: bool,
) -> Result<()> {
    finish(publish(definition_folder, parameters_file, skip, subscription).await)
}

async fn publish(
    definition_folder: Option<PathBuf>,
    parameters_file: Option<PathBuf>,
    skip: Option<SkipStep>,
    subscription: Option<String>,
) -> DefflowResult<()> {
    let root = definition_folder.unwrap_or_else(|| PathBuf::from(NSD_OUTPUT_FOLDER_NAME));
    let parameters_file = parameters_file.unwrap_or_else(|| root.join(ALL_PARAMETERS_FILENAME));

    let folder = DefinitionFolder::load(&root).await?;
    let params = DeployParameters::from_file(&parameters_file)?;
    let client = AzCliControlPlane::new(subscription)?;
    let compiler = BicepCompiler::new()?;

    print_header(&format!(
        "Publishing {} '{}' version {}...",
        params.target.kind(),
        params.target.group(),
        params.target.version()
    ));

    let options = DeployOptions {
        skip,
        ..Default::default()
    };
    let report = DeployEngine::new(&client, &compiler, &params, options)
        .deploy(&folder)
        .await?;

    print_summary(
        &format!(
            "Published {} elements in {:.2}s",
            report.elements.len(),
            report.duration.as_secs_f64()
        ),
        true,
    );
    Ok(())
}
