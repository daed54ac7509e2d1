// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! defflow - build and publish network service designs

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use defflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "defflow=debug" } else { "defflow=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if !defflow::utils::should_use_colors() {
        colored::control::set_override(false);
    }

    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    match cli.command {
        Commands::Build {
            config_file,
            output_folder,
            force,
        } => {
            defflow::cli::build::run(config_file, output_folder, force, cli.subscription, cli.verbose)
                .await
        }
        Commands::GenerateConfig { output_file } => {
            defflow::cli::generate_config::run(output_file, cli.verbose).await
        }
        Commands::Publish {
            definition_folder,
            parameters_file,
            skip,
        } => {
            defflow::cli::publish::run(
                definition_folder,
                parameters_file,
                skip,
                cli.subscription,
                cli.verbose,
            )
            .await
        }
        Commands::Delete {
            parameters_file,
            clean,
            force,
        } => {
            defflow::cli::delete::run(parameters_file, clean, force, cli.subscription, cli.verbose)
                .await
        }
    }
}
