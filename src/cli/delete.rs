// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Delete command - tear down a published definition

use miette::Result;
use std::path::PathBuf;

use super::finish;
use crate::config::DeployParameters;
use crate::control_plane::AzCliControlPlane;
use crate::deploy::{DeleteEngine, DeleteMode, DeleteOutcome};
use crate::errors::{DefflowError, DefflowResult};
use crate::utils::{confirmer, print_summary};

/// Run the delete command
pub async fn run(
    parameters_file: PathBuf,
    clean: bool,
    force: bool,
    subscription: Option<String>,
    _verbose: bool,
) -> Result<()> {
    finish(delete(parameters_file, clean, force, subscription).await)
}

async fn delete(
    parameters_file: PathBuf,
    clean: bool,
    force: bool,
    subscription: Option<String>,
) -> DefflowResult<()> {
    let params = DeployParameters::from_file(&parameters_file)?;
    let client = AzCliControlPlane::new(subscription)?;
    let confirm = confirmer(force);
    let mode = if clean {
        DeleteMode::Clean
    } else {
        DeleteMode::Shallow
    };

    match DeleteEngine::new(&client, &params, confirm.as_ref())
        .delete(mode)
        .await?
    {
        DeleteOutcome::Aborted => Err(DefflowError::UserAborted),
        DeleteOutcome::Deleted(ids) => {
            print_summary(&format!("Deleted {} resources", ids.len()), true);
            Ok(())
        }
    }
}
