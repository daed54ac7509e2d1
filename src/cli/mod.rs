// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! CLI command definitions and handlers

pub mod build;
pub mod delete;
pub mod generate_config;
pub mod publish;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::constants::NSD_INPUT_FILENAME;
use crate::deploy::SkipStep;
use crate::errors::DefflowError;

/// Build and publish network service designs
#[derive(Parser, Debug)]
#[clap(
    name = "defflow",
    version,
    about = "Build, publish and delete network service designs",
    long_about = None,
    after_help = "Examples:\n\
        defflow generate-config                     Write an empty design input\n\
        defflow build --config-file nsd-input.jsonc Build the definition folder\n\
        defflow publish                             Publish the built folder\n\
        defflow delete --parameters-file nsd-cli-output/all_deploy.parameters.json --clean\n\n\
        See 'defflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Subscription to work in (defaults to the az CLI's current one)
    #[clap(long, global = true, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a definition folder from a design input file
    Build {
        /// Design input file
        #[clap(short, long, default_value = NSD_INPUT_FILENAME)]
        config_file: PathBuf,

        /// Where to write the folder (default: ./nsd-cli-output)
        #[clap(short, long)]
        output_folder: Option<PathBuf>,

        /// Replace an existing folder without asking
        #[clap(long)]
        force: bool,
    },

    /// Write an empty design input file with field descriptions
    GenerateConfig {
        /// File to write
        #[clap(short, long, default_value = NSD_INPUT_FILENAME)]
        output_file: PathBuf,
    },

    /// Publish a built definition folder
    Publish {
        /// Folder written by 'defflow build' (default: ./nsd-cli-output)
        #[clap(short, long)]
        definition_folder: Option<PathBuf>,

        /// Deploy parameters (default: the folder's all_deploy.parameters.json)
        #[clap(short, long)]
        parameters_file: Option<PathBuf>,

        /// Leave out one publish step
        #[clap(long, value_enum)]
        skip: Option<SkipStep>,
    },

    /// Delete a published definition
    Delete {
        /// Deploy parameters naming the resources to delete
        #[clap(short, long)]
        parameters_file: PathBuf,

        /// Also delete the group, artifact stores and publisher
        #[clap(long)]
        clean: bool,

        /// Do not ask for confirmation
        #[clap(long)]
        force: bool,
    },
}

/// Turn a pipeline result into the command's exit result
///
/// A declined confirmation is not a failure. Other errors get their
/// recovery suggestion printed before the diagnostic.
pub fn finish<T>(result: Result<T, DefflowError>) -> miette::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_user_abort() => {
            println!("{}", "Aborted, nothing changed.".dimmed());
            Ok(())
        }
        Err(e) => {
            if let Some(suggestion) = e.recovery() {
                eprintln!();
                eprintln!("{}", suggestion.to_string().yellow());
            }
            Err(e.into())
        }
    }
}
