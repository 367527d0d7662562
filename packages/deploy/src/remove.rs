#![allow(clippy::module_name_repetitions)]

//! The remove flow.

use site_deploy_bucket::{bucket_exists, delete_bucket, empty_bucket};
use site_deploy_config::DeployConfig;
use site_deploy_gateway::Gateway;

use crate::{DeployError, Outcome, Prompt, RemoveFlags, confirmed};

/// What a completed removal did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveReport {
    /// Whether the bucket existed.
    pub found: bool,
    /// Whether the bucket itself was deleted.
    pub bucket_deleted: bool,
}

/// Removes the deployed files and, when safe, the bucket.
///
/// With a key prefix only objects under it are deleted. The bucket is
/// deleted only when resources are managed and the sweep left it empty, so
/// objects outside the prefix are never lost.
///
/// # Errors
///
/// * [`DeployError::Prompt`] if the confirmation cannot be read
/// * [`DeployError::Gateway`] if listing, emptying or deleting fails
pub async fn remove(
    gateway: &dyn Gateway,
    config: &DeployConfig,
    flags: &RemoveFlags,
    prompt: &dyn Prompt,
) -> Result<Outcome<RemoveReport>, DeployError> {
    let desired = &config.bucket;
    let bucket = desired.name.as_str();

    let question = format!("Are you sure you want to delete bucket '{bucket}'?");
    if !confirmed(prompt, flags.confirm, &question)? {
        log::info!("Bucket not removed");
        return Ok(Outcome::Cancelled);
    }

    log::info!("Looking for bucket...");
    if !bucket_exists(gateway, bucket).await? {
        log::info!("Bucket does not exist");
        return Ok(Outcome::Completed(RemoveReport::default()));
    }

    match &desired.key_prefix {
        Some(prefix) => log::info!("Deleting objects under {prefix}..."),
        None => log::info!("Deleting all objects..."),
    }
    let emptied = empty_bucket(gateway, bucket, desired.key_prefix.as_deref()).await?;

    let bucket_deleted = if !desired.manage_resources {
        log::info!("manageResources has been set to \"false\". Bucket will not be deleted");
        false
    } else if !emptied {
        log::info!("Bucket is not empty and will not be deleted");
        false
    } else {
        log::info!("Removing bucket...");
        delete_bucket(gateway, bucket).await?;
        true
    };

    if bucket_deleted {
        log::info!("Success! Your files have been removed and your bucket has been deleted");
    } else {
        log::info!("Success! Your files have been removed");
    }

    Ok(Outcome::Completed(RemoveReport {
        found: true,
        bucket_deleted,
    }))
}

#[cfg(test)]
mod tests {
    use site_deploy_bucket_models::BucketDesiredState;
    use site_deploy_gateway::Operation;
    use site_deploy_gateway::memory::MemoryGateway;
    use site_deploy_upload::UploadSpec;

    use super::*;
    use crate::test_support::ScriptedPrompt;

    const CONTENTS: [&str; 3] = [
        "existing-file-1",
        "existing-file-2",
        "some-prefix/another-file",
    ];

    fn config(key_prefix: Option<&str>) -> DeployConfig {
        DeployConfig {
            bucket: BucketDesiredState {
                key_prefix: key_prefix.map(String::from),
                ..BucketDesiredState::new("my-website-bucket")
            },
            distribution_folder: "client/dist".into(),
            upload: UploadSpec::default(),
            region: None,
        }
    }

    async fn run(gateway: &MemoryGateway, config: &DeployConfig) -> RemoveReport {
        let outcome = remove(
            gateway,
            config,
            &RemoveFlags { confirm: false },
            &ScriptedPrompt::answering(true),
        )
        .await
        .unwrap();
        match outcome {
            Outcome::Completed(report) => report,
            Outcome::Cancelled => panic!("removal was cancelled"),
        }
    }

    #[tokio::test]
    async fn empties_and_deletes_bucket() {
        let gateway = MemoryGateway::new().with_bucket("my-website-bucket", CONTENTS);

        let report = run(&gateway, &config(None)).await;

        assert!(report.bucket_deleted);
        assert!(!gateway.has_bucket("my-website-bucket"));
        assert_eq!(
            gateway.operations(),
            [
                Operation::ListBuckets,
                Operation::ListObjectsV2,
                Operation::DeleteObjects,
                Operation::DeleteBucket,
            ]
        );
    }

    #[tokio::test]
    async fn prefix_with_outside_objects_keeps_bucket() {
        let gateway = MemoryGateway::new().with_bucket("my-website-bucket", CONTENTS);

        let report = run(&gateway, &config(Some("some-prefix"))).await;

        assert!(report.found);
        assert!(!report.bucket_deleted);
        assert!(gateway.requests_for(Operation::DeleteBucket).is_empty());
        assert_eq!(
            gateway.object_keys("my-website-bucket"),
            ["existing-file-1", "existing-file-2"]
        );
    }

    #[tokio::test]
    async fn prefix_covering_everything_deletes_bucket() {
        let gateway = MemoryGateway::new()
            .with_bucket("my-website-bucket", ["some-prefix/a", "some-prefix/b"]);

        let report = run(&gateway, &config(Some("some-prefix"))).await;

        assert!(report.bucket_deleted);
        assert!(!gateway.has_bucket("my-website-bucket"));
    }

    #[tokio::test]
    async fn unmanaged_bucket_is_only_emptied() {
        let gateway = MemoryGateway::new().with_bucket("my-website-bucket", CONTENTS);
        let mut config = config(None);
        config.bucket.manage_resources = false;

        let report = run(&gateway, &config).await;

        assert!(!report.bucket_deleted);
        assert!(gateway.has_bucket("my-website-bucket"));
        assert!(gateway.object_keys("my-website-bucket").is_empty());
    }

    #[tokio::test]
    async fn missing_bucket_finishes_quietly() {
        let gateway = MemoryGateway::new();

        let report = run(&gateway, &config(None)).await;

        assert_eq!(report, RemoveReport::default());
        assert_eq!(gateway.operations(), [Operation::ListBuckets]);
    }

    #[tokio::test]
    async fn declined_confirmation_keeps_everything() {
        let gateway = MemoryGateway::new().with_bucket("my-website-bucket", CONTENTS);
        let prompt = ScriptedPrompt::answering(false);

        let outcome = remove(&gateway, &config(None), &RemoveFlags::default(), &prompt)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(
            prompt.questions(),
            ["Are you sure you want to delete bucket 'my-website-bucket'?"]
        );
        assert!(gateway.requests().is_empty());
    }
}
