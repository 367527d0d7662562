#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deployment configuration.
//!
//! The configuration file is TOML with `camelCase` keys:
//!
//! ```toml
//! bucketName = "my-website-bucket"
//! distributionFolder = "client/dist"
//! keyPrefix = "releases/v1"
//! uploadOrder = ["\\.html$"]
//!
//! [tags]
//! team = "web"
//!
//! [[objectHeaders.ALL_OBJECTS]]
//! name = "Cache-Control"
//! value = "max-age=5"
//! ```
//!
//! [`load`] only parses the file into [`ClientOptions`], where every field
//! is optional. [`ClientOptions::validate`] then checks everything at once
//! and either produces a [`DeployConfig`] or reports every problem it found.

pub mod regions;
mod validate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use site_deploy_bucket_models::BucketDesiredState;
use site_deploy_upload::UploadSpec;

/// Configuration file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "site_deploy.toml";

/// Distribution folder used when none is configured, relative to the
/// configuration file.
pub const DEFAULT_DISTRIBUTION_FOLDER: &str = "client/dist";

/// Errors loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`ClientOptions`].
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// Configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: Box<toml::de::Error>,
    },

    /// The configuration parsed but is not deployable.
    #[error("configuration errors:{}", bullet_list(messages))]
    Invalid {
        /// Every problem found, in check order.
        messages: Vec<String>,
    },
}

fn bullet_list(messages: &[String]) -> String {
    messages
        .iter()
        .map(|message| format!("\n- {message}"))
        .collect()
}

// ── Raw file format ──────────────────────────────────────────────────────

/// The configuration file as written, before validation.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    /// Target bucket. Required.
    pub bucket_name: Option<String>,
    /// Directory to upload, relative to the configuration file.
    pub distribution_folder: Option<PathBuf>,
    /// Index document suffix.
    pub index_document: Option<String>,
    /// Error document key.
    pub error_document: Option<String>,
    /// Redirect every request elsewhere instead of serving documents.
    pub redirect_all_requests_to: Option<RedirectAllOptions>,
    /// Conditional redirects.
    pub routing_rules: Option<Vec<RoutingRuleOptions>>,
    /// Header rules keyed by scope (`ALL_OBJECTS`, glob, folder or file).
    pub object_headers: Option<BTreeMap<String, Vec<HeaderOptions>>>,
    /// Upload-order regular expressions.
    pub upload_order: Option<Vec<String>>,
    /// JSON file holding a custom bucket policy.
    pub bucket_policy_file: Option<PathBuf>,
    /// JSON file holding a custom CORS rule list.
    pub cors_file: Option<PathBuf>,
    /// Bucket tags.
    pub tags: Option<BTreeMap<String, String>>,
    /// Prefix for every uploaded key and for the remove sweep.
    pub key_prefix: Option<String>,
    /// Server-side encryption for uploaded objects.
    pub sse: Option<String>,
    /// Whether the bucket itself is managed. Defaults to `true`.
    pub manage_resources: Option<bool>,
    /// Region of the bucket.
    pub region: Option<String>,
}

/// `redirectAllRequestsTo` table.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAllOptions {
    pub host_name: Option<String>,
    pub protocol: Option<String>,
}

/// One `routingRules` entry.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRuleOptions {
    pub redirect: Option<RedirectOptions>,
    pub condition: Option<ConditionOptions>,
}

/// `redirect` half of a routing rule.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectOptions {
    pub host_name: Option<String>,
    pub http_redirect_code: Option<u16>,
    pub protocol: Option<String>,
    pub replace_key_prefix_with: Option<String>,
    pub replace_key_with: Option<String>,
}

/// `condition` half of a routing rule.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOptions {
    pub http_error_code_returned_equals: Option<u16>,
    pub key_prefix_equals: Option<String>,
}

/// One header rule as written. Both fields are required by validation.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct HeaderOptions {
    pub name: Option<String>,
    pub value: Option<String>,
}

// ── Validated configuration ──────────────────────────────────────────────

/// A validated, ready-to-run deployment.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// What the bucket should look like.
    pub bucket: BucketDesiredState,
    /// Absolute or config-relative directory that gets uploaded.
    pub distribution_folder: PathBuf,
    /// Key and header mapping for the upload.
    pub upload: UploadSpec,
    /// Region from the configuration file.
    pub region: Option<String>,
}

impl DeployConfig {
    /// Overrides the configured region when `region` is set.
    #[must_use]
    pub fn with_region(mut self, region: Option<String>) -> Self {
        if region.is_some() {
            self.region = region;
        }
        self
    }
}

/// Parses the configuration file at `path`.
///
/// # Errors
///
/// * [`ConfigError::Read`] if the file cannot be read
/// * [`ConfigError::Parse`] if it is not valid TOML or has mistyped fields
pub fn load(path: &Path) -> Result<ClientOptions, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

/// Parses configuration from a TOML string.
///
/// # Errors
///
/// Returns the [`toml::de::Error`] if `contents` does not describe
/// [`ClientOptions`].
pub fn parse(contents: &str) -> Result<ClientOptions, toml::de::Error> {
    toml::from_str(contents)
}

/// Loads and validates the configuration file at `path`. Relative paths in
/// the file are resolved against the file's directory.
///
/// # Errors
///
/// Returns any [`ConfigError`] from loading or validation.
pub fn from_file(path: &Path) -> Result<DeployConfig, ConfigError> {
    let options = load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    log::debug!("Loaded configuration from {}", path.display());
    options.validate(base_dir)
}
