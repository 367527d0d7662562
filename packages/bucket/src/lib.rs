#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bucket-level operations used by the deploy and remove flows.
//!
//! Each function issues the minimal sequence of gateway calls for one
//! reconciliation step. Ordering between steps is the caller's job.

pub mod configure;

use site_deploy_gateway::{Gateway, GatewayError, Request};

/// Errors from bucket reconciliation steps.
#[derive(Debug, thiserror::Error)]
pub enum BucketError {
    /// The object store rejected a call.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A policy document could not be rendered.
    #[error("Failed to render policy for bucket {bucket}: {source}")]
    Policy {
        /// Bucket being configured.
        bucket: String,
        /// Underlying serialization error.
        source: serde_json::Error,
    },
}

/// Whether a bucket named exactly `bucket` is visible to the credentials.
///
/// # Errors
///
/// Returns the [`GatewayError`] of the `listBuckets` call.
pub async fn bucket_exists(gateway: &dyn Gateway, bucket: &str) -> Result<bool, GatewayError> {
    let names = gateway.list_buckets().await?;
    Ok(names.iter().any(|name| name == bucket))
}

/// Lists every key in `bucket`.
///
/// # Errors
///
/// Returns the [`GatewayError`] of the `listObjectsV2` call.
pub async fn list_objects(
    gateway: &dyn Gateway,
    bucket: &str,
) -> Result<Vec<String>, GatewayError> {
    gateway.list_objects(bucket).await
}

/// Creates `bucket`.
///
/// # Errors
///
/// Returns the [`GatewayError`] of the `createBucket` call.
pub async fn create_bucket(gateway: &dyn Gateway, bucket: &str) -> Result<(), GatewayError> {
    gateway
        .send(Request::CreateBucket {
            bucket: bucket.to_string(),
        })
        .await
}

/// Deletes `bucket`, which must already be empty.
///
/// # Errors
///
/// Returns the [`GatewayError`] of the `deleteBucket` call.
pub async fn delete_bucket(gateway: &dyn Gateway, bucket: &str) -> Result<(), GatewayError> {
    gateway
        .send(Request::DeleteBucket {
            bucket: bucket.to_string(),
        })
        .await
}

/// Deletes the objects of `bucket`, optionally only those whose key starts
/// with the literal `key_prefix`.
///
/// Returns whether the delete covered every object in the bucket. That is
/// `false` exactly when a prefix left objects outside it untouched, and
/// `true` for a bucket that was already empty.
///
/// A single `deleteObjects` call is issued, and only when something matched.
///
/// # Errors
///
/// Returns the [`GatewayError`] of the listing or delete call.
pub async fn empty_bucket(
    gateway: &dyn Gateway,
    bucket: &str,
    key_prefix: Option<&str>,
) -> Result<bool, GatewayError> {
    let contents = list_objects(gateway, bucket).await?;
    let total = contents.len();

    let keys: Vec<String> = match key_prefix.filter(|prefix| !prefix.is_empty()) {
        Some(prefix) => contents
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect(),
        None => contents,
    };
    let covers_everything = keys.len() == total;

    if keys.is_empty() {
        log::debug!("Nothing to delete in {bucket}");
        return Ok(covers_everything);
    }

    log::debug!("Deleting {} of {total} objects in {bucket}", keys.len());
    gateway
        .send(Request::DeleteObjects {
            bucket: bucket.to_string(),
            keys,
        })
        .await?;

    Ok(covers_everything)
}

#[cfg(test)]
mod tests {
    use site_deploy_gateway::Operation;
    use site_deploy_gateway::memory::MemoryGateway;

    use super::*;

    fn deleted_keys(gateway: &MemoryGateway) -> Vec<Vec<String>> {
        gateway
            .requests_for(Operation::DeleteObjects)
            .into_iter()
            .filter_map(|request| match request {
                Request::DeleteObjects { keys, .. } => Some(keys),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn bucket_exists_requires_exact_name() {
        let gateway = MemoryGateway::new()
            .with_bucket("my-website-bucket-2", Vec::<String>::new())
            .with_bucket("existing-bucket", Vec::<String>::new());

        assert!(bucket_exists(&gateway, "existing-bucket").await.unwrap());
        assert!(!bucket_exists(&gateway, "my-website-bucket").await.unwrap());
    }

    #[tokio::test]
    async fn prefix_outside_objects_reports_partial_coverage() {
        let gateway =
            MemoryGateway::new().with_bucket("site", ["file-a", "d/a/b/x", "a/b/c/d"]);

        let covered = empty_bucket(&gateway, "site", Some("a/b")).await.unwrap();

        assert!(!covered);
        assert_eq!(deleted_keys(&gateway), [vec!["a/b/c/d".to_string()]]);
        assert_eq!(gateway.object_keys("site"), ["d/a/b/x", "file-a"]);
    }

    #[tokio::test]
    async fn prefix_matching_everything_reports_full_coverage() {
        let gateway = MemoryGateway::new().with_bucket("site", ["foo/1", "foo/2"]);

        let covered = empty_bucket(&gateway, "site", Some("foo")).await.unwrap();

        assert!(covered);
        assert_eq!(
            deleted_keys(&gateway),
            [vec!["foo/1".to_string(), "foo/2".to_string()]]
        );
        assert!(gateway.object_keys("site").is_empty());
    }

    #[tokio::test]
    async fn no_prefix_deletes_everything() {
        let gateway = MemoryGateway::new().with_bucket("site", ["a", "b/c"]);

        assert!(empty_bucket(&gateway, "site", None).await.unwrap());
        assert!(gateway.object_keys("site").is_empty());
    }

    #[tokio::test]
    async fn empty_bucket_issues_no_delete() {
        let gateway = MemoryGateway::new().with_bucket("site", Vec::<String>::new());

        assert!(empty_bucket(&gateway, "site", Some("foo")).await.unwrap());
        assert_eq!(gateway.operations(), [Operation::ListObjectsV2]);
    }

    #[tokio::test]
    async fn unmatched_prefix_issues_no_delete() {
        let gateway = MemoryGateway::new().with_bucket("site", ["other/file"]);

        assert!(!empty_bucket(&gateway, "site", Some("foo")).await.unwrap());
        assert!(deleted_keys(&gateway).is_empty());
    }

    #[tokio::test]
    async fn prefix_is_matched_literally() {
        let gateway =
            MemoryGateway::new().with_bucket("site", ["v1.0/index.html", "v1x0/index.html"]);

        let covered = empty_bucket(&gateway, "site", Some("v1.0")).await.unwrap();

        assert!(!covered);
        assert_eq!(gateway.object_keys("site"), ["v1x0/index.html"]);
    }

    #[tokio::test]
    async fn create_then_delete_bucket() {
        let gateway = MemoryGateway::new();

        create_bucket(&gateway, "site").await.unwrap();
        assert!(gateway.has_bucket("site"));
        delete_bucket(&gateway, "site").await.unwrap();
        assert!(!gateway.has_bucket("site"));
    }
}
