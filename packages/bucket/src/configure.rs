//! Overwrites bucket-level configuration: website hosting, policy, tags
//! and CORS. Each call replaces whatever the bucket had before.

use std::collections::BTreeMap;

use site_deploy_bucket_models::{BucketPolicy, CorsConfiguration, WebsiteConfiguration, tag_set};
use site_deploy_gateway::{Gateway, GatewayError, Request};

use crate::BucketError;

/// Applies the website hosting configuration.
///
/// # Errors
///
/// Returns the [`GatewayError`] of the `putBucketWebsite` call.
pub async fn configure_website(
    gateway: &dyn Gateway,
    bucket: &str,
    website: &WebsiteConfiguration,
) -> Result<(), GatewayError> {
    gateway
        .send(Request::PutBucketWebsite {
            bucket: bucket.to_string(),
            configuration: website.clone(),
        })
        .await
}

/// Applies the bucket policy.
///
/// # Errors
///
/// Returns [`BucketError::Policy`] if the document cannot be rendered, or
/// the [`GatewayError`] of the `putBucketPolicy` call.
pub async fn configure_policy(
    gateway: &dyn Gateway,
    bucket: &str,
    policy: &BucketPolicy,
) -> Result<(), BucketError> {
    let policy = policy
        .document(bucket)
        .map_err(|source| BucketError::Policy {
            bucket: bucket.to_string(),
            source,
        })?;

    gateway
        .send(Request::PutBucketPolicy {
            bucket: bucket.to_string(),
            policy,
        })
        .await?;
    Ok(())
}

/// Replaces the bucket tags with `tags`.
///
/// # Errors
///
/// Returns the [`GatewayError`] of the `putBucketTagging` call.
pub async fn configure_tags(
    gateway: &dyn Gateway,
    bucket: &str,
    tags: &BTreeMap<String, String>,
) -> Result<(), GatewayError> {
    gateway
        .send(Request::PutBucketTagging {
            bucket: bucket.to_string(),
            tags: tag_set(tags),
        })
        .await
}

/// Applies the CORS rules.
///
/// # Errors
///
/// Returns the [`GatewayError`] of the `putBucketCors` call.
pub async fn configure_cors(
    gateway: &dyn Gateway,
    bucket: &str,
    cors: &CorsConfiguration,
) -> Result<(), GatewayError> {
    gateway
        .send(Request::PutBucketCors {
            bucket: bucket.to_string(),
            rules: cors.rules(),
        })
        .await
}
