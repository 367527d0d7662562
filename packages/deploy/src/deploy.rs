#![allow(clippy::module_name_repetitions)]

//! The deploy flow.

use std::sync::Arc;

use site_deploy_bucket::configure::{
    configure_cors, configure_policy, configure_tags, configure_website,
};
use site_deploy_bucket::{bucket_exists, create_bucket, empty_bucket};
use site_deploy_config::DeployConfig;
use site_deploy_config::regions::site_url;
use site_deploy_gateway::Gateway;
use site_deploy_upload::progress::ProgressCallback;
use site_deploy_upload::{UploadStats, upload_directory};

use crate::{DeployError, DeployFlags, Outcome, Prompt, confirmed};

/// A mutating step that a deployment carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    CreateBucket,
    EmptyBucket,
    ConfigureWebsite,
    ConfigurePolicy,
    ConfigureTags,
    ConfigureCors,
    Upload,
}

/// What a completed deployment did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Steps carried out, in order. Skipped steps are absent.
    pub steps: Vec<DeployStep>,
    /// Upload totals.
    pub upload: UploadStats,
    /// Public URL of the site, when the region's website endpoint is known.
    pub url: Option<String>,
}

/// Lines describing what [`deploy()`] is about to do, headed by
/// `This deployment will:`.
#[must_use]
pub fn describe(config: &DeployConfig, flags: &DeployFlags) -> Vec<String> {
    let bucket = &config.bucket.name;
    let managed = config.bucket.manage_resources;
    let mut lines = vec!["This deployment will:".to_string()];

    if flags.delete_contents {
        match &config.bucket.key_prefix {
            Some(prefix) => lines.push(format!(
                "- Remove all existing files under '{prefix}' from bucket '{bucket}'"
            )),
            None => lines.push(format!("- Remove all existing files from bucket '{bucket}'")),
        }
    }

    let under_prefix = config
        .bucket
        .key_prefix
        .as_ref()
        .map(|prefix| format!(" under the prefix '{prefix}'"))
        .unwrap_or_default();
    lines.push(format!(
        "- Upload all files from '{}' to bucket '{bucket}'{under_prefix}",
        config.distribution_folder.display()
    ));

    if flags.config_change && managed {
        lines.push(format!("- Set (and overwrite) bucket '{bucket}' configuration"));
    }
    if flags.policy_change && managed {
        lines.push(format!("- Set (and overwrite) bucket '{bucket}' bucket policy"));
    }
    if !config.bucket.tags.is_empty() {
        lines.push(format!("- Set (and overwrite) bucket '{bucket}' tags"));
    }
    if flags.cors_change && managed {
        lines.push(format!("- Set (and overwrite) bucket '{bucket}' CORS policy"));
    }

    lines
}

/// Deploys `config` through `gateway`.
///
/// Steps run strictly in order: look up the bucket, create it or empty it,
/// apply website, policy, tags and CORS, then upload the distribution
/// folder. The first failure stops the flow and later steps never run.
///
/// # Errors
///
/// * [`DeployError::BucketMissing`] if the bucket does not exist and
///   `manage_resources` is off (nothing is changed)
/// * [`DeployError::Prompt`] if the confirmation cannot be read
/// * [`DeployError::Gateway`], [`DeployError::Bucket`] or
///   [`DeployError::Upload`] if a step fails
pub async fn deploy(
    gateway: &dyn Gateway,
    config: &DeployConfig,
    flags: &DeployFlags,
    prompt: &dyn Prompt,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Outcome<DeployReport>, DeployError> {
    for line in describe(config, flags) {
        log::info!("{line}");
    }
    if !confirmed(prompt, flags.confirm, "Do you want to proceed?")? {
        log::info!("Deployment cancelled");
        return Ok(Outcome::Cancelled);
    }

    let desired = &config.bucket;
    let bucket = desired.name.as_str();
    let managed = desired.manage_resources;
    let mut steps = Vec::new();

    log::info!("Looking for bucket...");
    if bucket_exists(gateway, bucket).await? {
        log::info!("Bucket found...");
        if flags.delete_contents {
            match &desired.key_prefix {
                Some(prefix) => log::info!("Deleting objects under {prefix} from bucket..."),
                None => log::info!("Deleting all objects from bucket..."),
            }
            empty_bucket(gateway, bucket, desired.key_prefix.as_deref()).await?;
            steps.push(DeployStep::EmptyBucket);
        } else {
            log::info!("Keeping current bucket contents...");
        }
    } else {
        if !managed {
            return Err(DeployError::BucketMissing {
                bucket: bucket.to_string(),
            });
        }
        log::info!("Bucket does not exist. Creating bucket...");
        create_bucket(gateway, bucket).await?;
        steps.push(DeployStep::CreateBucket);
    }

    if flags.config_change && managed {
        log::info!("Configuring bucket...");
        configure_website(gateway, bucket, &desired.website).await?;
        steps.push(DeployStep::ConfigureWebsite);
    } else {
        log::info!("Retaining existing bucket configuration...");
    }

    if flags.policy_change && managed {
        log::info!("Configuring policy for bucket...");
        configure_policy(gateway, bucket, &desired.policy).await?;
        steps.push(DeployStep::ConfigurePolicy);
    } else {
        log::info!("Retaining existing bucket policy...");
    }

    if desired.tags.is_empty() {
        log::info!("Retaining existing tags...");
    } else {
        log::info!("Configuring tags for bucket...");
        configure_tags(gateway, bucket, &desired.tags).await?;
        steps.push(DeployStep::ConfigureTags);
    }

    if flags.cors_change && managed {
        log::info!("Configuring CORS for bucket...");
        configure_cors(gateway, bucket, &desired.cors).await?;
        steps.push(DeployStep::ConfigureCors);
    } else {
        log::info!("Retaining existing bucket CORS configuration...");
    }

    log::info!("Uploading client files to bucket...");
    let upload = upload_directory(
        gateway,
        bucket,
        &config.distribution_folder,
        &config.upload,
        progress,
    )
    .await?;
    steps.push(DeployStep::Upload);
    log::debug!("Uploaded {upload}");

    let url = config
        .region
        .as_deref()
        .and_then(|region| site_url(bucket, region));
    match (&url, config.region.as_deref()) {
        (Some(url), _) => log::info!("Success! Your site should be available at {url}"),
        (None, Some(region)) => log::warn!(
            "Success! Your files were uploaded, but no website endpoint is known for \
             region '{region}'"
        ),
        (None, None) => log::warn!(
            "Success! Your files were uploaded, but no region is configured to derive \
             the site URL from"
        ),
    }

    Ok(Outcome::Completed(DeployReport { steps, upload, url }))
}
