#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Object store gateway.
//!
//! Every call the deployer makes against the storage provider goes through
//! the [`Gateway`] trait as a single `(operation, parameters)` [`Request`].
//! Keeping the seam this narrow lets the reconciler and uploader run
//! unchanged against the real provider ([`s3::S3Gateway`]) or an in-memory
//! store (`memory::MemoryGateway`, behind the `memory` feature).
//!
//! The gateway performs no retries. A failed request surfaces as a
//! [`GatewayError`] carrying the operation and its target.

pub mod s3;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use site_deploy_bucket_models::{CorsRule, Tag, WebsiteConfiguration};
use strum_macros::{AsRefStr, Display, EnumIter};

/// Service identifier passed along with every operation.
pub const SERVICE: &str = "object-store";

/// Operations the deployer issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum Operation {
    /// List every bucket visible to the credentials.
    ListBuckets,
    /// List the objects of a bucket.
    #[strum(serialize = "listObjectsV2")]
    ListObjectsV2,
    /// Delete a batch of objects.
    DeleteObjects,
    /// Create a bucket.
    CreateBucket,
    /// Delete an empty bucket.
    DeleteBucket,
    /// Replace the website hosting configuration.
    PutBucketWebsite,
    /// Replace the bucket policy.
    PutBucketPolicy,
    /// Replace the CORS rules.
    PutBucketCors,
    /// Replace the bucket tags.
    PutBucketTagging,
    /// Upload one object.
    PutObject,
}

/// Parameters of a single object upload.
///
/// Serializes to the provider's parameter document. The body is never part
/// of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    #[serde(skip)]
    pub body: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// HTTP date after which the object is stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_redirect_location: Option<String>,
    /// User metadata for every header without a dedicated field.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<String>,
}

/// A single call against the object store.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ListBuckets,
    ListObjectsV2 {
        bucket: String,
    },
    DeleteObjects {
        bucket: String,
        keys: Vec<String>,
    },
    CreateBucket {
        bucket: String,
    },
    DeleteBucket {
        bucket: String,
    },
    PutBucketWebsite {
        bucket: String,
        configuration: WebsiteConfiguration,
    },
    PutBucketPolicy {
        bucket: String,
        /// Policy document as a compact JSON string.
        policy: String,
    },
    PutBucketCors {
        bucket: String,
        rules: Vec<CorsRule>,
    },
    PutBucketTagging {
        bucket: String,
        tags: Vec<Tag>,
    },
    PutObject(PutObjectRequest),
}

impl Request {
    /// The operation this request performs.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::ListBuckets => Operation::ListBuckets,
            Self::ListObjectsV2 { .. } => Operation::ListObjectsV2,
            Self::DeleteObjects { .. } => Operation::DeleteObjects,
            Self::CreateBucket { .. } => Operation::CreateBucket,
            Self::DeleteBucket { .. } => Operation::DeleteBucket,
            Self::PutBucketWebsite { .. } => Operation::PutBucketWebsite,
            Self::PutBucketPolicy { .. } => Operation::PutBucketPolicy,
            Self::PutBucketCors { .. } => Operation::PutBucketCors,
            Self::PutBucketTagging { .. } => Operation::PutBucketTagging,
            Self::PutObject(_) => Operation::PutObject,
        }
    }

    /// The bucket this request targets, if any.
    #[must_use]
    pub fn bucket(&self) -> Option<&str> {
        match self {
            Self::ListBuckets => None,
            Self::ListObjectsV2 { bucket }
            | Self::DeleteObjects { bucket, .. }
            | Self::CreateBucket { bucket }
            | Self::DeleteBucket { bucket }
            | Self::PutBucketWebsite { bucket, .. }
            | Self::PutBucketPolicy { bucket, .. }
            | Self::PutBucketCors { bucket, .. }
            | Self::PutBucketTagging { bucket, .. } => Some(bucket),
            Self::PutObject(object) => Some(&object.bucket),
        }
    }

    /// Human-readable target used in logs and errors (`bucket` or
    /// `bucket/key`).
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::PutObject(object) => format!("{}/{}", object.bucket, object.key),
            other => other.bucket().unwrap_or("account").to_string(),
        }
    }

    /// Renders the provider parameter document for this request.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if a nested value fails to serialize.
    pub fn to_document(&self) -> Result<serde_json::Value, serde_json::Error> {
        let document = match self {
            Self::ListBuckets => json!({}),
            Self::ListObjectsV2 { bucket }
            | Self::CreateBucket { bucket }
            | Self::DeleteBucket { bucket } => json!({ "Bucket": bucket }),
            Self::DeleteObjects { bucket, keys } => {
                let objects: Vec<_> = keys.iter().map(|key| json!({ "Key": key })).collect();
                json!({ "Bucket": bucket, "Delete": { "Objects": objects } })
            }
            Self::PutBucketWebsite {
                bucket,
                configuration,
            } => json!({
                "Bucket": bucket,
                "WebsiteConfiguration": serde_json::to_value(configuration)?,
            }),
            Self::PutBucketPolicy { bucket, policy } => {
                json!({ "Bucket": bucket, "Policy": policy })
            }
            Self::PutBucketCors { bucket, rules } => json!({
                "Bucket": bucket,
                "CORSConfiguration": { "CORSRules": serde_json::to_value(rules)? },
            }),
            Self::PutBucketTagging { bucket, tags } => json!({
                "Bucket": bucket,
                "Tagging": { "TagSet": serde_json::to_value(tags)? },
            }),
            Self::PutObject(object) => serde_json::to_value(object)?,
        };
        Ok(document)
    }
}

/// Result of a successful [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Bucket names, from [`Request::ListBuckets`].
    Buckets(Vec<String>),
    /// Object keys, from [`Request::ListObjectsV2`].
    Objects(Vec<String>),
    /// Any request without a payload.
    Done,
}

/// Errors returned by a [`Gateway`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The provider rejected the request or could not be reached.
    #[error("{operation} failed for {target}: {source}")]
    Request {
        /// Operation that failed.
        operation: Operation,
        /// Bucket or `bucket/key` the request targeted.
        target: String,
        /// Underlying provider error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A request parameter could not be converted for the provider.
    #[error("invalid {operation} parameter for {target}: {message}")]
    InvalidParameter {
        /// Operation being prepared.
        operation: Operation,
        /// Bucket or `bucket/key` the request targeted.
        target: String,
        /// What was wrong with the parameter.
        message: String,
    },

    /// The gateway answered with a response of the wrong shape.
    #[error("unexpected response to {operation}")]
    UnexpectedResponse {
        /// Operation that was answered.
        operation: Operation,
    },
}

impl GatewayError {
    /// Builds a [`GatewayError::Request`] for `request`.
    #[must_use]
    pub fn request(
        request: &Request,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Request {
            operation: request.operation(),
            target: request.target(),
            source: source.into(),
        }
    }

    /// The operation this error belongs to.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Request { operation, .. }
            | Self::InvalidParameter { operation, .. }
            | Self::UnexpectedResponse { operation } => *operation,
        }
    }
}

/// Issues storage operations.
///
/// Implementors only provide [`Gateway::request`]; the typed helpers unwrap
/// the expected [`Response`] shape.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Sends one request to the object store.
    async fn request(&self, request: Request) -> Result<Response, GatewayError>;

    /// Lists the names of all buckets.
    async fn list_buckets(&self) -> Result<Vec<String>, GatewayError> {
        match self.request(Request::ListBuckets).await? {
            Response::Buckets(names) => Ok(names),
            _ => Err(GatewayError::UnexpectedResponse {
                operation: Operation::ListBuckets,
            }),
        }
    }

    /// Lists every object key in `bucket`.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, GatewayError> {
        let request = Request::ListObjectsV2 {
            bucket: bucket.to_string(),
        };
        match self.request(request).await? {
            Response::Objects(keys) => Ok(keys),
            _ => Err(GatewayError::UnexpectedResponse {
                operation: Operation::ListObjectsV2,
            }),
        }
    }

    /// Sends a request that carries no response payload.
    async fn send(&self, request: Request) -> Result<(), GatewayError> {
        let operation = request.operation();
        match self.request(request).await? {
            Response::Done => Ok(()),
            _ => Err(GatewayError::UnexpectedResponse { operation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use site_deploy_bucket_models::{CorsConfiguration, tag_set};
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn operation_names_match_provider_methods() {
        let names: Vec<String> = Operation::iter().map(|op| op.to_string()).collect();
        assert_eq!(
            names,
            [
                "listBuckets",
                "listObjectsV2",
                "deleteObjects",
                "createBucket",
                "deleteBucket",
                "putBucketWebsite",
                "putBucketPolicy",
                "putBucketCors",
                "putBucketTagging",
                "putObject",
            ]
        );
    }

    #[test]
    fn delete_objects_document_lists_keys() {
        let request = Request::DeleteObjects {
            bucket: "site".to_string(),
            keys: vec!["a".to_string(), "b/c".to_string()],
        };
        assert_eq!(
            request.to_document().unwrap(),
            json!({
                "Bucket": "site",
                "Delete": { "Objects": [{ "Key": "a" }, { "Key": "b/c" }] }
            })
        );
    }

    #[test]
    fn website_document_nests_configuration() {
        let request = Request::PutBucketWebsite {
            bucket: "site".to_string(),
            configuration: WebsiteConfiguration::default(),
        };
        assert_eq!(
            request.to_document().unwrap(),
            json!({
                "Bucket": "site",
                "WebsiteConfiguration": {
                    "IndexDocument": { "Suffix": "index.html" },
                    "ErrorDocument": { "Key": "error.html" }
                }
            })
        );
    }

    #[test]
    fn cors_and_tagging_documents_use_provider_keys() {
        let cors = Request::PutBucketCors {
            bucket: "site".to_string(),
            rules: CorsConfiguration::Default.rules(),
        };
        let document = cors.to_document().unwrap();
        assert_eq!(
            document["CORSConfiguration"]["CORSRules"][1]["AllowedOrigins"],
            json!(["*"])
        );

        let tags = BTreeMap::from([("env".to_string(), "prod".to_string())]);
        let tagging = Request::PutBucketTagging {
            bucket: "site".to_string(),
            tags: tag_set(&tags),
        };
        assert_eq!(
            tagging.to_document().unwrap(),
            json!({
                "Bucket": "site",
                "Tagging": { "TagSet": [{ "Key": "env", "Value": "prod" }] }
            })
        );
    }

    #[test]
    fn put_object_document_omits_body_and_unset_fields() {
        let request = Request::PutObject(PutObjectRequest {
            bucket: "site".to_string(),
            key: "index.html".to_string(),
            body: b"<html></html>".to_vec(),
            content_type: Some("text/html".to_string()),
            metadata: BTreeMap::from([("x-build".to_string(), "42".to_string())]),
            ..PutObjectRequest::default()
        });
        assert_eq!(
            request.to_document().unwrap(),
            json!({
                "Bucket": "site",
                "Key": "index.html",
                "ContentType": "text/html",
                "Metadata": { "x-build": "42" }
            })
        );
        assert_eq!(request.target(), "site/index.html");
    }

    #[test]
    fn list_buckets_targets_account() {
        assert_eq!(Request::ListBuckets.bucket(), None);
        assert_eq!(Request::ListBuckets.target(), "account");
        assert_eq!(Request::ListBuckets.to_document().unwrap(), json!({}));
    }
}
