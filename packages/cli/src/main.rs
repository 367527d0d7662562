#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for deploying a static website to an S3 bucket.
//!
//! Uses `indicatif-log-bridge` (via [`site_deploy_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the upload bar never fight for the terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use site_deploy::{DeployError, DeployFlags, Outcome, RemoveFlags};
use site_deploy_cli_utils::{ConfirmPrompt, IndicatifProgress, MultiProgress};
use site_deploy_config::{DEFAULT_CONFIG_FILE, DeployConfig};
use site_deploy_gateway::s3::S3Gateway;

#[derive(Parser)]
#[command(name = "site_deploy", about = "Deploy a static website to an S3 bucket")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and configure the bucket, then upload the distribution folder
    Deploy {
        #[command(flatten)]
        common: CommonArgs,
        /// Keep the existing bucket contents instead of deleting them first
        #[arg(long)]
        no_delete_contents: bool,
        /// Keep the existing website configuration
        #[arg(long)]
        no_config_change: bool,
        /// Keep the existing bucket policy
        #[arg(long)]
        no_policy_change: bool,
        /// Keep the existing CORS rules
        #[arg(long)]
        no_cors_change: bool,
    },
    /// Delete the deployed files and, when it is left empty, the bucket
    Remove {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Region of the bucket (overrides the configuration file)
    #[arg(long)]
    region: Option<String>,
    /// Do not ask for confirmation
    #[arg(long)]
    no_confirm: bool,
}

impl CommonArgs {
    /// Loads the configuration and connects to S3 in the effective region:
    /// the flag, then the configuration file, then the provider chain.
    async fn connect(&self) -> Result<(DeployConfig, S3Gateway), DeployError> {
        let config = site_deploy_config::from_file(&self.config)?.with_region(self.region.clone());
        let gateway = S3Gateway::from_env(config.region.as_deref()).await;
        let region = gateway.region().map(ToString::to_string);
        log::debug!("Using region {region:?}");

        Ok((config.with_region(region), gateway))
    }
}

async fn run(cli: Cli, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let prompt = ConfirmPrompt::new(multi.clone());

    match cli.command {
        Commands::Deploy {
            common,
            no_delete_contents,
            no_config_change,
            no_policy_change,
            no_cors_change,
        } => {
            let (config, gateway) = common.connect().await?;
            let flags = DeployFlags {
                delete_contents: !no_delete_contents,
                config_change: !no_config_change,
                policy_change: !no_policy_change,
                cors_change: !no_cors_change,
                confirm: !common.no_confirm,
            };
            let progress = IndicatifProgress::upload_bar(multi, "Waiting to upload...");

            match site_deploy::deploy(&gateway, &config, &flags, &prompt, &progress).await? {
                Outcome::Completed(report) => log::debug!("Deploy finished: {report:?}"),
                Outcome::Cancelled => {}
            }
        }
        Commands::Remove { common } => {
            let (config, gateway) = common.connect().await?;
            let flags = RemoveFlags {
                confirm: !common.no_confirm,
            };

            match site_deploy::remove(&gateway, &config, &flags, &prompt).await? {
                Outcome::Completed(report) => log::debug!("Remove finished: {report:?}"),
                Outcome::Cancelled => {}
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let multi = site_deploy_cli_utils::init_logger();
    let cli = Cli::parse();

    match run(cli, &multi).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
