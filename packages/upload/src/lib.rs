#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Uploads a local directory tree to a bucket.
//!
//! [`upload_directory`] scans the whole tree first ([`plan::plan_uploads`]),
//! then runs the upload groups strictly one after another. All uploads of a
//! group are issued concurrently and joined; if any of them failed, the
//! first failure is returned once the group has settled and later groups
//! never start.

pub mod files;
pub mod headers;
pub mod order;
pub mod plan;
pub mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use site_deploy_gateway::{Gateway, GatewayError, Request};
use site_deploy_upload_models::UploadTask;

use crate::headers::HeaderResolver;
use crate::order::OrderSpec;
use crate::progress::ProgressCallback;

/// Errors that can occur while uploading a directory.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The upload root could not be listed.
    #[error("Failed to list files under {}: {source}", root.display())]
    List {
        /// Upload root.
        root: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// File being uploaded.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The object store rejected an upload.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// How files are mapped to objects.
#[derive(Debug, Clone, Default)]
pub struct UploadSpec {
    /// Compiled header rules.
    pub headers: HeaderResolver,
    /// Upload ordering. Everything goes in one group when `None`.
    pub order: Option<OrderSpec>,
    /// Prefix prepended to every key.
    pub key_prefix: Option<String>,
    /// Server-side encryption requested for every object.
    pub server_side_encryption: Option<String>,
}

/// Totals of a finished upload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadStats {
    /// Non-empty groups uploaded.
    pub groups: usize,
    /// Files uploaded.
    pub files: u64,
    /// Bytes uploaded.
    pub bytes: u64,
}

impl std::fmt::Display for UploadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        #[allow(clippy::cast_precision_loss)] // display-only MB value
        let mb = self.bytes as f64 / 1_048_576.0;
        write!(
            f,
            "{} files ({mb:.1} MB) in {} groups",
            self.files, self.groups
        )
    }
}

/// Uploads every file under `root` to `bucket`.
///
/// # Errors
///
/// * [`UploadError::List`] if `root` cannot be scanned (nothing is uploaded)
/// * [`UploadError::Read`] if a file cannot be read
/// * [`UploadError::Gateway`] if an upload is rejected
pub async fn upload_directory(
    gateway: &dyn Gateway,
    bucket: &str,
    root: &Path,
    spec: &UploadSpec,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<UploadStats, UploadError> {
    let groups = plan::plan_uploads(root, spec)?;
    let total: usize = groups.iter().map(Vec::len).sum();
    progress.set_total(total as u64);
    log::debug!(
        "Planned {total} uploads in {} groups from {}",
        groups.len(),
        root.display()
    );

    let mut stats = UploadStats::default();
    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        log::debug!("Uploading group {index} ({} files)", group.len());

        let results = join_all(
            group
                .iter()
                .map(|task| upload_file(gateway, bucket, task, spec, progress)),
        )
        .await;

        for bytes in results {
            stats.bytes += bytes?;
            stats.files += 1;
        }
        stats.groups += 1;
    }

    progress.finish(format!("Uploaded {stats}"));
    Ok(stats)
}

/// Reads and uploads a single file, returning its size.
async fn upload_file(
    gateway: &dyn Gateway,
    bucket: &str,
    task: &UploadTask,
    spec: &UploadSpec,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<u64, UploadError> {
    let body = tokio::fs::read(&task.source_path)
        .await
        .map_err(|source| UploadError::Read {
            path: task.source_path.clone(),
            source,
        })?;
    let size = body.len() as u64;

    let request = plan::put_object_request(
        bucket,
        task,
        body,
        spec.server_side_encryption.as_deref(),
    );
    gateway.send(Request::PutObject(request)).await?;

    log::debug!("Uploaded {} -> {bucket}/{}", task.source_path.display(), task.key);
    progress.set_message(task.key.clone());
    progress.inc(1);
    Ok(size)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use site_deploy_gateway::Operation;
    use site_deploy_gateway::memory::MemoryGateway;
    use site_deploy_upload_models::{ALL_OBJECTS, HeaderRule, HeaderSpec};

    use super::*;
    use crate::progress::null_progress;

    const BUCKET: &str = "my-bucket";

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::create_dir_all(dir.path().join("other/nested")).unwrap();
        fs::write(dir.path().join("file.txt"), "010101").unwrap();
        fs::write(dir.path().join("nested/file.html"), "010101").unwrap();
        fs::write(dir.path().join("other/nested/file.html"), "010101").unwrap();
        dir
    }

    fn uploaded_keys(gateway: &MemoryGateway) -> Vec<String> {
        gateway
            .requests_for(Operation::PutObject)
            .into_iter()
            .filter_map(|request| match request {
                Request::PutObject(object) => Some(object.key),
                _ => None,
            })
            .collect()
    }

    fn spec_with_headers(headers: &[(&str, &str, &str)]) -> UploadSpec {
        let mut spec = HeaderSpec::new();
        for (scope, name, value) in headers {
            spec.entry((*scope).to_string())
                .or_default()
                .push(HeaderRule::new(*name, *value));
        }
        UploadSpec {
            headers: HeaderResolver::new(&spec).unwrap(),
            ..UploadSpec::default()
        }
    }

    #[tokio::test]
    async fn uploads_every_file_with_contents() {
        let dir = fixture();
        let gateway = MemoryGateway::new().with_bucket(BUCKET, Vec::<String>::new());

        let stats = upload_directory(
            &gateway,
            BUCKET,
            dir.path(),
            &UploadSpec::default(),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(stats.files, 3);
        assert_eq!(stats.bytes, 18);
        assert_eq!(
            gateway.object_keys(BUCKET),
            ["file.txt", "nested/file.html", "other/nested/file.html"]
        );

        let object = gateway.object(BUCKET, "file.txt").unwrap();
        assert_eq!(object.body, b"010101");
        assert_eq!(object.content_type.as_deref(), Some("text/plain"));
        assert_eq!(object.server_side_encryption, None);
    }

    #[tokio::test]
    async fn all_objects_headers_become_metadata() {
        let dir = fixture();
        let gateway = MemoryGateway::new().with_bucket(BUCKET, Vec::<String>::new());
        let spec = spec_with_headers(&[(ALL_OBJECTS, "globalHeader", "globalHeaderValue")]);

        upload_directory(&gateway, BUCKET, dir.path(), &spec, &null_progress())
            .await
            .unwrap();

        for key in gateway.object_keys(BUCKET) {
            let object = gateway.object(BUCKET, &key).unwrap();
            assert_eq!(
                object.metadata.get("globalHeader").map(String::as_str),
                Some("globalHeaderValue"),
                "{key}"
            );
        }
    }

    #[tokio::test]
    async fn scoped_headers_reach_only_their_files() {
        let dir = fixture();
        let gateway = MemoryGateway::new().with_bucket(BUCKET, Vec::<String>::new());
        let spec = spec_with_headers(&[
            ("file.txt", "file", "yes"),
            ("nested/", "folder", "yes"),
            ("other/**/*", "glob", "yes"),
        ]);

        upload_directory(&gateway, BUCKET, dir.path(), &spec, &null_progress())
            .await
            .unwrap();

        let metadata = |key: &str| gateway.object(BUCKET, key).unwrap().metadata;
        assert_eq!(metadata("file.txt").keys().collect::<Vec<_>>(), ["file"]);
        assert_eq!(
            metadata("nested/file.html").keys().collect::<Vec<_>>(),
            ["folder"]
        );
        assert_eq!(
            metadata("other/nested/file.html").keys().collect::<Vec<_>>(),
            ["glob"]
        );
    }

    #[tokio::test]
    async fn groups_upload_in_order() {
        let dir = fixture();
        let gateway = MemoryGateway::new().with_bucket(BUCKET, Vec::<String>::new());
        let spec = UploadSpec {
            order: Some(
                OrderSpec::new(["nested/file.html", "file.txt", "other/nested/file.html"])
                    .unwrap(),
            ),
            ..UploadSpec::default()
        };

        let stats = upload_directory(&gateway, BUCKET, dir.path(), &spec, &null_progress())
            .await
            .unwrap();

        assert_eq!(stats.groups, 3);
        assert_eq!(
            uploaded_keys(&gateway),
            ["nested/file.html", "file.txt", "other/nested/file.html"]
        );
    }

    #[tokio::test]
    async fn key_prefix_and_encryption_apply_to_every_object() {
        let dir = fixture();
        let gateway = MemoryGateway::new().with_bucket(BUCKET, Vec::<String>::new());
        let spec = UploadSpec {
            key_prefix: Some("some-prefix".to_string()),
            server_side_encryption: Some("AES256".to_string()),
            ..UploadSpec::default()
        };

        upload_directory(&gateway, BUCKET, dir.path(), &spec, &null_progress())
            .await
            .unwrap();

        let keys = gateway.object_keys(BUCKET);
        assert_eq!(keys.len(), 3);
        for key in keys {
            assert!(key.starts_with("some-prefix/"), "{key}");
            let object = gateway.object(BUCKET, &key).unwrap();
            assert_eq!(object.server_side_encryption.as_deref(), Some("AES256"));
        }
    }

    #[tokio::test]
    async fn failed_group_stops_later_groups() {
        let dir = fixture();
        let gateway = MemoryGateway::new().fail_on(Operation::PutObject);
        let spec = UploadSpec {
            order: Some(OrderSpec::new(["other"]).unwrap()),
            ..UploadSpec::default()
        };

        let err = upload_directory(&gateway, BUCKET, dir.path(), &spec, &null_progress())
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Gateway(_)));
        // Group 0 holds two files; the `other` group never starts.
        let keys = uploaded_keys(&gateway);
        assert_eq!(keys.len(), 2);
        assert!(!keys.contains(&"other/nested/file.html".to_string()));
    }

    #[tokio::test]
    async fn missing_root_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = MemoryGateway::new().with_bucket(BUCKET, Vec::<String>::new());

        let err = upload_directory(
            &gateway,
            BUCKET,
            &dir.path().join("dist"),
            &UploadSpec::default(),
            &null_progress(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, UploadError::List { .. }));
        assert!(gateway.requests().is_empty());
    }
}
