//! [`Gateway`] backed by `aws-sdk-s3`.
//!
//! Credentials and the default region come from the standard AWS provider
//! chain (`AWS_PROFILE`, `AWS_ACCESS_KEY_ID`, `~/.aws/config`, ...).

use std::collections::HashMap;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::{ByteStream, DateTime, DateTimeFormat};
use aws_sdk_s3::types as s3;
use site_deploy_bucket_models as models;

use crate::{Gateway, GatewayError, Operation, PutObjectRequest, Request, Response};

/// Maximum number of keys a single `DeleteObjects` call accepts.
const DELETE_BATCH_SIZE: usize = 1000;

/// Region whose buckets must be created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Object store client for S3 (and S3-compatible) providers.
pub struct S3Gateway {
    client: aws_sdk_s3::Client,
    region: Option<String>,
}

impl S3Gateway {
    /// Creates a gateway from the AWS environment.
    ///
    /// `region` overrides whatever region the provider chain resolves.
    pub async fn from_env(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;
        let region = config.region().map(ToString::to_string);

        Self {
            client: aws_sdk_s3::Client::new(&config),
            region,
        }
    }

    /// The region requests are sent to, if one could be resolved.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    async fn list_buckets(&self, call: &Call) -> Result<Vec<String>, GatewayError> {
        let mut names = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_buckets()
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| call.failed(e))?;

            names.extend(
                output
                    .buckets()
                    .iter()
                    .filter_map(|bucket| bucket.name().map(String::from)),
            );

            match output.continuation_token() {
                Some(token) if !token.is_empty() => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn list_objects(&self, call: &Call, bucket: &str) -> Result<Vec<String>, GatewayError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| call.failed(e))?;

            for object in output.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        log::debug!("Found {} objects in {bucket}", keys.len());
        Ok(keys)
    }

    async fn delete_objects(
        &self,
        call: &Call,
        bucket: &str,
        keys: &[String],
    ) -> Result<(), GatewayError> {
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = batch
                .iter()
                .map(|key| s3::ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| call.invalid(&e))?;
            let delete = s3::Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(|e| call.invalid(&e))?;

            let output = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| call.failed(e))?;

            let errors = output.errors();
            if !errors.is_empty() {
                for error in errors {
                    log::warn!(
                        "Could not delete {}/{}: {}",
                        bucket,
                        error.key().unwrap_or_default(),
                        error.message().unwrap_or_default()
                    );
                }
                return Err(call.failed(format!(
                    "{} objects could not be deleted",
                    errors.len()
                )));
            }
        }

        Ok(())
    }

    async fn create_bucket(&self, call: &Call, bucket: &str) -> Result<(), GatewayError> {
        let configuration = self
            .region()
            .filter(|region| *region != DEFAULT_REGION)
            .map(|region| {
                s3::CreateBucketConfiguration::builder()
                    .location_constraint(s3::BucketLocationConstraint::from(region))
                    .build()
            });

        self.client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(configuration)
            .send()
            .await
            .map_err(|e| call.failed(e))?;

        Ok(())
    }

    async fn put_object(&self, call: &Call, object: PutObjectRequest) -> Result<(), GatewayError> {
        let expires = object
            .expires
            .as_deref()
            .map(|value| DateTime::from_str(value, DateTimeFormat::HttpDate))
            .transpose()
            .map_err(|e| call.invalid(&e))?;
        let metadata = (!object.metadata.is_empty())
            .then(|| object.metadata.into_iter().collect::<HashMap<_, _>>());

        self.client
            .put_object()
            .bucket(object.bucket)
            .key(object.key)
            .body(ByteStream::from(object.body))
            .set_cache_control(object.cache_control)
            .set_content_disposition(object.content_disposition)
            .set_content_encoding(object.content_encoding)
            .set_content_language(object.content_language)
            .set_content_type(object.content_type)
            .set_expires(expires)
            .set_website_redirect_location(object.website_redirect_location)
            .set_metadata(metadata)
            .set_server_side_encryption(
                object
                    .server_side_encryption
                    .as_deref()
                    .map(s3::ServerSideEncryption::from),
            )
            .send()
            .await
            .map_err(|e| call.failed(e))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Gateway for S3Gateway {
    async fn request(&self, request: Request) -> Result<Response, GatewayError> {
        let call = Call {
            operation: request.operation(),
            target: request.target(),
        };
        log::debug!("{} {} {}", crate::SERVICE, call.operation, call.target);

        match request {
            Request::ListBuckets => Ok(Response::Buckets(self.list_buckets(&call).await?)),
            Request::ListObjectsV2 { bucket } => Ok(Response::Objects(
                self.list_objects(&call, &bucket).await?,
            )),
            Request::DeleteObjects { bucket, keys } => {
                self.delete_objects(&call, &bucket, &keys).await?;
                Ok(Response::Done)
            }
            Request::CreateBucket { bucket } => {
                self.create_bucket(&call, &bucket).await?;
                Ok(Response::Done)
            }
            Request::DeleteBucket { bucket } => {
                self.client
                    .delete_bucket()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| call.failed(e))?;
                Ok(Response::Done)
            }
            Request::PutBucketWebsite {
                bucket,
                configuration,
            } => {
                let configuration = website_configuration(&call, &configuration)?;
                self.client
                    .put_bucket_website()
                    .bucket(bucket)
                    .website_configuration(configuration)
                    .send()
                    .await
                    .map_err(|e| call.failed(e))?;
                Ok(Response::Done)
            }
            Request::PutBucketPolicy { bucket, policy } => {
                self.client
                    .put_bucket_policy()
                    .bucket(bucket)
                    .policy(policy)
                    .send()
                    .await
                    .map_err(|e| call.failed(e))?;
                Ok(Response::Done)
            }
            Request::PutBucketCors { bucket, rules } => {
                let configuration = cors_configuration(&call, &rules)?;
                self.client
                    .put_bucket_cors()
                    .bucket(bucket)
                    .cors_configuration(configuration)
                    .send()
                    .await
                    .map_err(|e| call.failed(e))?;
                Ok(Response::Done)
            }
            Request::PutBucketTagging { bucket, tags } => {
                let tagging = tagging(&call, &tags)?;
                self.client
                    .put_bucket_tagging()
                    .bucket(bucket)
                    .tagging(tagging)
                    .send()
                    .await
                    .map_err(|e| call.failed(e))?;
                Ok(Response::Done)
            }
            Request::PutObject(object) => {
                self.put_object(&call, object).await?;
                Ok(Response::Done)
            }
        }
    }
}

/// Operation and target of the request being sent, for error reporting.
struct Call {
    operation: Operation,
    target: String,
}

impl Call {
    fn failed(
        &self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> GatewayError {
        GatewayError::Request {
            operation: self.operation,
            target: self.target.clone(),
            source: source.into(),
        }
    }

    fn invalid(&self, error: &impl std::fmt::Display) -> GatewayError {
        GatewayError::InvalidParameter {
            operation: self.operation,
            target: self.target.clone(),
            message: error.to_string(),
        }
    }
}

// ── Conversions to SDK types ────────────────────────────────────────────

fn protocol(protocol: Option<models::Protocol>) -> Option<s3::Protocol> {
    protocol.map(|protocol| s3::Protocol::from(protocol.as_ref()))
}

fn website_configuration(
    call: &Call,
    configuration: &models::WebsiteConfiguration,
) -> Result<s3::WebsiteConfiguration, GatewayError> {
    match configuration {
        models::WebsiteConfiguration::Documents {
            index_document,
            error_document,
            routing_rules,
        } => {
            let index = s3::IndexDocument::builder()
                .suffix(index_document)
                .build()
                .map_err(|e| call.invalid(&e))?;
            let error = s3::ErrorDocument::builder()
                .key(error_document)
                .build()
                .map_err(|e| call.invalid(&e))?;
            let rules = (!routing_rules.is_empty())
                .then(|| routing_rules.iter().map(routing_rule).collect());

            Ok(s3::WebsiteConfiguration::builder()
                .index_document(index)
                .error_document(error)
                .set_routing_rules(rules)
                .build())
        }
        models::WebsiteConfiguration::RedirectAll(redirect) => {
            let redirect = s3::RedirectAllRequestsTo::builder()
                .host_name(&redirect.host_name)
                .set_protocol(protocol(redirect.protocol))
                .build()
                .map_err(|e| call.invalid(&e))?;

            Ok(s3::WebsiteConfiguration::builder()
                .redirect_all_requests_to(redirect)
                .build())
        }
    }
}

fn routing_rule(rule: &models::RoutingRule) -> s3::RoutingRule {
    let redirect = &rule.redirect;
    let condition = rule.condition.as_ref().map(|condition| {
        s3::Condition::builder()
            .set_http_error_code_returned_equals(
                condition
                    .http_error_code_returned_equals
                    .map(|code| code.to_string()),
            )
            .set_key_prefix_equals(condition.key_prefix_equals.clone())
            .build()
    });

    s3::RoutingRule::builder()
        .redirect(
            s3::Redirect::builder()
                .set_host_name(redirect.host_name.clone())
                .set_http_redirect_code(redirect.http_redirect_code.map(|code| code.to_string()))
                .set_protocol(protocol(redirect.protocol))
                .set_replace_key_prefix_with(redirect.replace_key_prefix_with.clone())
                .set_replace_key_with(redirect.replace_key_with.clone())
                .build(),
        )
        .set_condition(condition)
        .build()
}

fn cors_configuration(
    call: &Call,
    rules: &[models::CorsRule],
) -> Result<s3::CorsConfiguration, GatewayError> {
    let rules = rules
        .iter()
        .map(|rule| {
            s3::CorsRule::builder()
                .set_id(rule.id.clone())
                .set_allowed_headers(Some(rule.allowed_headers.clone()))
                .set_allowed_methods(Some(rule.allowed_methods.clone()))
                .set_allowed_origins(Some(rule.allowed_origins.clone()))
                .set_expose_headers(
                    (!rule.expose_headers.is_empty()).then(|| rule.expose_headers.clone()),
                )
                .set_max_age_seconds(rule.max_age_seconds)
                .build()
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| call.invalid(&e))?;

    s3::CorsConfiguration::builder()
        .set_cors_rules(Some(rules))
        .build()
        .map_err(|e| call.invalid(&e))
}

fn tagging(call: &Call, tags: &[models::Tag]) -> Result<s3::Tagging, GatewayError> {
    let tag_set = tags
        .iter()
        .map(|tag| s3::Tag::builder().key(&tag.key).value(&tag.value).build())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| call.invalid(&e))?;

    s3::Tagging::builder()
        .set_tag_set(Some(tag_set))
        .build()
        .map_err(|e| call.invalid(&e))
}
