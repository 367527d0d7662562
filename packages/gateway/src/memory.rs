//! In-memory [`Gateway`] for tests.
//!
//! Buckets hold the last [`PutObjectRequest`] written to each key. Every
//! request is recorded, including ones that fail, so tests can assert on the
//! exact sequence of calls a flow made.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{Gateway, GatewayError, Operation, PutObjectRequest, Request, Response};

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, BTreeMap<String, PutObjectRequest>>,
    requests: Vec<Request>,
    failures: BTreeSet<Operation>,
}

/// Object store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
}

impl MemoryGateway {
    /// Creates an empty store with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bucket containing empty objects at `keys`.
    #[must_use]
    pub fn with_bucket<I, K>(self, bucket: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        {
            let mut state = self.lock();
            let objects = state.buckets.entry(bucket.to_string()).or_default();
            for key in keys {
                let key = key.into();
                objects.insert(
                    key.clone(),
                    PutObjectRequest {
                        bucket: bucket.to_string(),
                        key,
                        ..PutObjectRequest::default()
                    },
                );
            }
        }
        self
    }

    /// Makes every request for `operation` fail.
    #[must_use]
    pub fn fail_on(self, operation: Operation) -> Self {
        self.lock().failures.insert(operation);
        self
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// Requests received for `operation`, in order.
    #[must_use]
    pub fn requests_for(&self, operation: Operation) -> Vec<Request> {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.operation() == operation)
            .cloned()
            .collect()
    }

    /// Operations received so far, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.lock()
            .requests
            .iter()
            .map(Request::operation)
            .collect()
    }

    /// Whether `bucket` currently exists.
    #[must_use]
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().buckets.contains_key(bucket)
    }

    /// Keys currently stored in `bucket`, sorted.
    #[must_use]
    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The last upload stored at `bucket/key`.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<PutObjectRequest> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Gateway for MemoryGateway {
    async fn request(&self, request: Request) -> Result<Response, GatewayError> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        if state.failures.contains(&request.operation()) {
            return Err(GatewayError::request(&request, "injected failure"));
        }

        match request {
            Request::ListBuckets => {
                Ok(Response::Buckets(state.buckets.keys().cloned().collect()))
            }
            Request::ListObjectsV2 { ref bucket } => state
                .buckets
                .get(bucket)
                .map(|objects| Response::Objects(objects.keys().cloned().collect()))
                .ok_or_else(|| GatewayError::request(&request, "NoSuchBucket")),
            Request::DeleteObjects {
                ref bucket,
                ref keys,
            } => {
                let objects = state
                    .buckets
                    .get_mut(bucket)
                    .ok_or_else(|| GatewayError::request(&request, "NoSuchBucket"))?;
                for key in keys {
                    objects.remove(key);
                }
                Ok(Response::Done)
            }
            Request::CreateBucket { ref bucket } => {
                if state.buckets.contains_key(bucket) {
                    return Err(GatewayError::request(&request, "BucketAlreadyOwnedByYou"));
                }
                state.buckets.insert(bucket.clone(), BTreeMap::new());
                Ok(Response::Done)
            }
            Request::DeleteBucket { ref bucket } => {
                let Some(objects) = state.buckets.get(bucket) else {
                    return Err(GatewayError::request(&request, "NoSuchBucket"));
                };
                if !objects.is_empty() {
                    return Err(GatewayError::request(&request, "BucketNotEmpty"));
                }
                state.buckets.remove(bucket);
                Ok(Response::Done)
            }
            Request::PutBucketWebsite { ref bucket, .. }
            | Request::PutBucketPolicy { ref bucket, .. }
            | Request::PutBucketCors { ref bucket, .. }
            | Request::PutBucketTagging { ref bucket, .. } => {
                if state.buckets.contains_key(bucket) {
                    Ok(Response::Done)
                } else {
                    Err(GatewayError::request(&request, "NoSuchBucket"))
                }
            }
            Request::PutObject(object) => {
                let Some(objects) = state.buckets.get_mut(&object.bucket) else {
                    return Err(GatewayError::request(
                        &Request::PutObject(object),
                        "NoSuchBucket",
                    ));
                };
                objects.insert(object.key.clone(), object);
                Ok(Response::Done)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_seeded_buckets_and_objects() {
        let gateway = MemoryGateway::new().with_bucket("site", ["b", "a"]);

        assert_eq!(gateway.list_buckets().await.unwrap(), ["site"]);
        assert_eq!(gateway.list_objects("site").await.unwrap(), ["a", "b"]);
        assert_eq!(
            gateway.operations(),
            [Operation::ListBuckets, Operation::ListObjectsV2]
        );
    }

    #[tokio::test]
    async fn refuses_to_delete_non_empty_bucket() {
        let gateway = MemoryGateway::new().with_bucket("site", ["a"]);

        let err = gateway
            .send(Request::DeleteBucket {
                bucket: "site".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.operation(), Operation::DeleteBucket);
        assert!(gateway.has_bucket("site"));
    }

    #[tokio::test]
    async fn injected_failures_are_recorded() {
        let gateway = MemoryGateway::new().fail_on(Operation::ListBuckets);

        assert!(gateway.list_buckets().await.is_err());
        assert_eq!(gateway.requests(), [Request::ListBuckets]);
    }

    #[tokio::test]
    async fn put_object_requires_bucket() {
        let gateway = MemoryGateway::new();
        let request = Request::PutObject(PutObjectRequest {
            bucket: "missing".to_string(),
            key: "index.html".to_string(),
            ..PutObjectRequest::default()
        });

        let err = gateway.send(request).await.unwrap_err();
        assert!(err.to_string().contains("missing/index.html"));
    }
}
