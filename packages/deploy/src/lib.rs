#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deploys a static website to a bucket and tears it down again.
//!
//! [`deploy()`] reconciles the bucket (create or empty, then website,
//! policy, tags and CORS) and uploads the distribution folder.
//! [`remove()`] empties the bucket and deletes it when that is safe.
//!
//! Both flows log a line per step and ask for confirmation through a
//! [`Prompt`] unless told not to. A declined prompt is reported as
//! [`Outcome::Cancelled`], not as an error.

mod deploy;
mod remove;

pub use deploy::{DeployReport, DeployStep, deploy, describe};
pub use remove::{RemoveReport, remove};

use site_deploy_bucket::BucketError;
use site_deploy_config::ConfigError;
use site_deploy_gateway::GatewayError;
use site_deploy_upload::UploadError;

/// Errors from the deploy and remove flows.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The bucket is missing and this tool may not create it.
    #[error(
        "Bucket {bucket} does not exist, and manageResources has been set to \"false\". \
         Ensure that bucket exists or that all resources are deployed first"
    )]
    BucketMissing {
        /// Bucket that was looked up.
        bucket: String,
    },

    /// A bucket configuration step failed.
    #[error(transparent)]
    Bucket(#[from] BucketError),

    /// The object store rejected a call.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Uploading the distribution folder failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The confirmation prompt could not be shown.
    #[error("Failed to read confirmation: {source}")]
    Prompt {
        /// Underlying terminal error.
        source: std::io::Error,
    },
}

/// Asks the operator a yes/no question.
pub trait Prompt: Send + Sync {
    /// Returns whether the operator answered yes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the terminal cannot be read.
    fn confirm(&self, question: &str) -> std::io::Result<bool>;
}

/// How a flow ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operator declined the confirmation prompt. Nothing was changed.
    Cancelled,
    /// The flow ran to completion.
    Completed(T),
}

/// Switches for [`deploy()`]. Everything is enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DeployFlags {
    /// Empty an existing bucket (or its key prefix) before uploading.
    pub delete_contents: bool,
    /// Overwrite the website configuration.
    pub config_change: bool,
    /// Overwrite the bucket policy.
    pub policy_change: bool,
    /// Overwrite the CORS rules.
    pub cors_change: bool,
    /// Ask before changing anything.
    pub confirm: bool,
}

impl Default for DeployFlags {
    fn default() -> Self {
        Self {
            delete_contents: true,
            config_change: true,
            policy_change: true,
            cors_change: true,
            confirm: true,
        }
    }
}

/// Switches for [`remove()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveFlags {
    /// Ask before deleting anything.
    pub confirm: bool,
}

impl Default for RemoveFlags {
    fn default() -> Self {
        Self { confirm: true }
    }
}

/// Asks `question` when `enabled`, otherwise assumes yes.
fn confirmed(prompt: &dyn Prompt, enabled: bool, question: &str) -> Result<bool, DeployError> {
    if !enabled {
        return Ok(true);
    }
    prompt
        .confirm(question)
        .map_err(|source| DeployError::Prompt { source })
}
