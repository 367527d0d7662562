#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Desired state of a website bucket.
//!
//! These types describe what the bucket should look like once a deployment
//! has reconciled it: website hosting configuration, bucket policy, CORS
//! rules and tags. They are built once per invocation from validated
//! configuration and never mutated afterwards.
//!
//! Every type serializes to the parameter document shape the storage
//! provider expects (`PascalCase` field names, stringified status codes).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Index document used when none is configured.
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";

/// Error document used when none is configured.
pub const DEFAULT_ERROR_DOCUMENT: &str = "error.html";

/// Policy language version used by the default public-read policy.
const POLICY_VERSION: &str = "2012-10-17";

/// Origins allowed to issue mutating requests by the default CORS rules.
const PROVIDER_ORIGIN: &str = "https://*.amazonaws.com";

/// URL scheme used for redirects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTPS.
    Https,
}

/// How the bucket serves HTTP requests.
///
/// Redirecting every request and serving index/error documents are mutually
/// exclusive on the provider side, so they are separate variants here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebsiteConfiguration {
    /// Serve objects directly, falling back to the given documents.
    Documents {
        /// Suffix appended to directory requests (e.g. `index.html`).
        index_document: String,
        /// Object returned for 4xx errors.
        error_document: String,
        /// Conditional redirects evaluated in order.
        routing_rules: Vec<RoutingRule>,
    },
    /// Redirect every request to another host.
    RedirectAll(RedirectAllRequestsTo),
}

impl Default for WebsiteConfiguration {
    fn default() -> Self {
        Self::Documents {
            index_document: DEFAULT_INDEX_DOCUMENT.to_string(),
            error_document: DEFAULT_ERROR_DOCUMENT.to_string(),
            routing_rules: Vec::new(),
        }
    }
}

/// Target of a bucket-wide redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RedirectAllRequestsTo {
    /// Host every request is redirected to.
    pub host_name: String,
    /// Scheme of the redirect; the original request's scheme when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
}

/// A conditional redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingRule {
    /// Where matching requests are sent.
    pub redirect: Redirect,
    /// When the rule applies. Applies to every request when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// Redirect half of a [`RoutingRule`].
///
/// An empty `replace_key_with` / `replace_key_prefix_with` is meaningful: it
/// sends the request to the index document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Redirect {
    /// Host to redirect to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    /// HTTP status code of the redirect response.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_status_code"
    )]
    pub http_redirect_code: Option<u16>,
    /// Scheme of the redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Replaces the matched key prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_key_prefix_with: Option<String>,
    /// Replaces the whole key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_key_with: Option<String>,
}

/// Condition half of a [`RoutingRule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Condition {
    /// Matches when the object lookup returned this status code.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_status_code"
    )]
    pub http_error_code_returned_equals: Option<u16>,
    /// Matches keys starting with this prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix_equals: Option<String>,
}

/// The provider expects status codes as strings.
#[allow(clippy::ref_option)] // signature fixed by `serialize_with`
fn serialize_status_code<S: Serializer>(
    code: &Option<u16>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match code {
        Some(code) => serializer.serialize_str(&code.to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct IndexDocument<'a> {
    suffix: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDocument<'a> {
    key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WebsiteDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    index_document: Option<IndexDocument<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_document: Option<ErrorDocument<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_all_requests_to: Option<&'a RedirectAllRequestsTo>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    routing_rules: &'a [RoutingRule],
}

impl Serialize for WebsiteConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let document = match self {
            Self::Documents {
                index_document,
                error_document,
                routing_rules,
            } => WebsiteDocument {
                index_document: Some(IndexDocument {
                    suffix: index_document,
                }),
                error_document: Some(ErrorDocument {
                    key: error_document,
                }),
                redirect_all_requests_to: None,
                routing_rules,
            },
            Self::RedirectAll(redirect) => WebsiteDocument {
                index_document: None,
                error_document: None,
                redirect_all_requests_to: Some(redirect),
                routing_rules: &[],
            },
        };
        document.serialize(serializer)
    }
}

// ── Bucket policy ────────────────────────────────────────────────────────

/// Access policy applied to the bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BucketPolicy {
    /// Anyone may read any object.
    #[default]
    PublicRead,
    /// A user-supplied policy document.
    Custom(serde_json::Value),
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyDocument<'a> {
    version: &'a str,
    statement: [PolicyStatement<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyStatement<'a> {
    effect: &'a str,
    principal: PolicyPrincipal<'a>,
    action: &'a str,
    resource: String,
}

#[derive(Serialize)]
struct PolicyPrincipal<'a> {
    #[serde(rename = "AWS")]
    aws: &'a str,
}

impl BucketPolicy {
    /// Renders the policy as the compact JSON string sent to the provider.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the document cannot be serialized.
    pub fn document(&self, bucket: &str) -> Result<String, serde_json::Error> {
        match self {
            Self::PublicRead => serde_json::to_string(&PolicyDocument {
                version: POLICY_VERSION,
                statement: [PolicyStatement {
                    effect: "Allow",
                    principal: PolicyPrincipal { aws: "*" },
                    action: "s3:GetObject",
                    resource: format!("arn:aws:s3:::{bucket}/*"),
                }],
            }),
            Self::Custom(policy) => serde_json::to_string(policy),
        }
    }
}

// ── CORS ─────────────────────────────────────────────────────────────────

/// A single CORS rule, in the provider's document format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorsRule {
    /// Optional rule identifier.
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Request headers allowed in preflight requests.
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// HTTP methods the origins may use.
    pub allowed_methods: Vec<String>,
    /// Origins allowed to make cross-origin requests.
    pub allowed_origins: Vec<String>,
    /// Response headers exposed to the client.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expose_headers: Vec<String>,
    /// How long browsers may cache the preflight response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<i32>,
}

/// CORS rules applied to the bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsConfiguration {
    /// Mutations from the provider's own domain, reads from anywhere.
    #[default]
    Default,
    /// A user-supplied rule list.
    Custom(Vec<CorsRule>),
}

impl CorsConfiguration {
    /// Returns the rules to apply.
    #[must_use]
    pub fn rules(&self) -> Vec<CorsRule> {
        match self {
            Self::Default => vec![
                cors_rule(&["PUT", "POST", "DELETE"], PROVIDER_ORIGIN),
                cors_rule(&["GET"], "*"),
            ],
            Self::Custom(rules) => rules.clone(),
        }
    }
}

fn cors_rule(methods: &[&str], origin: &str) -> CorsRule {
    CorsRule {
        id: None,
        allowed_headers: vec!["*".to_string()],
        allowed_methods: methods.iter().map(ToString::to_string).collect(),
        allowed_origins: vec![origin.to_string()],
        expose_headers: Vec::new(),
        max_age_seconds: Some(0),
    }
}

// ── Tags ─────────────────────────────────────────────────────────────────

/// A bucket tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag name.
    pub key: String,
    /// Tag value.
    pub value: String,
}

/// Converts a tag mapping into the provider's tag set, ordered by key.
#[must_use]
pub fn tag_set(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

// ── Desired state ────────────────────────────────────────────────────────

/// Everything a deployment needs to know about the target bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketDesiredState {
    /// Bucket name.
    pub name: String,
    /// Website hosting configuration.
    pub website: WebsiteConfiguration,
    /// Bucket policy.
    pub policy: BucketPolicy,
    /// CORS rules.
    pub cors: CorsConfiguration,
    /// Bucket tags. Existing tags are kept when empty.
    pub tags: BTreeMap<String, String>,
    /// Namespace for this deployment's objects within the bucket.
    pub key_prefix: Option<String>,
    /// Server-side encryption applied to every uploaded object
    /// (`AES256`, `aws:kms`).
    pub server_side_encryption: Option<String>,
    /// Whether this tool owns the bucket lifecycle (create, configure,
    /// delete) or only its contents.
    pub manage_resources: bool,
}

impl BucketDesiredState {
    /// Creates a managed, public-read website bucket with default documents.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: WebsiteConfiguration::default(),
            policy: BucketPolicy::default(),
            cors: CorsConfiguration::default(),
            tags: BTreeMap::new(),
            key_prefix: None,
            server_side_encryption: None,
            manage_resources: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_website_serializes_suffix_and_key() {
        let value = serde_json::to_value(WebsiteConfiguration::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "IndexDocument": { "Suffix": "index.html" },
                "ErrorDocument": { "Key": "error.html" }
            })
        );
    }

    #[test]
    fn redirect_website_has_no_documents() {
        let website = WebsiteConfiguration::RedirectAll(RedirectAllRequestsTo {
            host_name: "example.com".to_string(),
            protocol: Some(Protocol::Https),
        });
        let value = serde_json::to_value(website).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "RedirectAllRequestsTo": { "HostName": "example.com", "Protocol": "https" }
            })
        );
    }

    #[test]
    fn routing_rules_stringify_status_codes() {
        let website = WebsiteConfiguration::Documents {
            index_document: "index.html".to_string(),
            error_document: "index.html".to_string(),
            routing_rules: vec![RoutingRule {
                redirect: Redirect {
                    replace_key_with: Some(String::new()),
                    http_redirect_code: Some(301),
                    ..Redirect::default()
                },
                condition: Some(Condition {
                    http_error_code_returned_equals: Some(404),
                    key_prefix_equals: None,
                }),
            }],
        };
        let value = serde_json::to_value(website).unwrap();
        assert_eq!(
            value["RoutingRules"],
            serde_json::json!([{
                "Redirect": { "ReplaceKeyWith": "", "HttpRedirectCode": "301" },
                "Condition": { "HttpErrorCodeReturnedEquals": "404" }
            }])
        );
    }

    #[test]
    fn public_read_policy_keeps_field_order() {
        let policy = BucketPolicy::PublicRead.document("my-website-bucket").unwrap();
        assert_eq!(
            policy,
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"AWS":"*"},"Action":"s3:GetObject","Resource":"arn:aws:s3:::my-website-bucket/*"}]}"#
        );
    }

    #[test]
    fn custom_policy_is_rendered_verbatim() {
        let custom = serde_json::json!({ "Statement": [] });
        let policy = BucketPolicy::Custom(custom).document("ignored").unwrap();
        assert_eq!(policy, r#"{"Statement":[]}"#);
    }

    #[test]
    fn default_cors_rules() {
        let value = serde_json::to_value(CorsConfiguration::Default.rules()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {
                    "AllowedMethods": ["PUT", "POST", "DELETE"],
                    "AllowedOrigins": ["https://*.amazonaws.com"],
                    "AllowedHeaders": ["*"],
                    "MaxAgeSeconds": 0
                },
                {
                    "AllowedMethods": ["GET"],
                    "AllowedOrigins": ["*"],
                    "AllowedHeaders": ["*"],
                    "MaxAgeSeconds": 0
                }
            ])
        );
    }

    #[test]
    fn custom_cors_rules_parse_provider_format() {
        let rules: Vec<CorsRule> = serde_json::from_str(
            r#"[{"AllowedMethods":["GET"],"AllowedOrigins":["https://example.com"],"AllowedHeaders":["*"],"MaxAgeSeconds":0}]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].allowed_origins, vec!["https://example.com"]);
        assert_eq!(rules[0].max_age_seconds, Some(0));
    }

    #[test]
    fn tag_set_is_sorted_by_key() {
        let tags = BTreeMap::from([
            ("tagKey2".to_string(), "tagValue2".to_string()),
            ("tagKey".to_string(), "tagvalue".to_string()),
        ]);
        let set = tag_set(&tags);
        assert_eq!(set[0].key, "tagKey");
        assert_eq!(set[1].value, "tagValue2");
    }

    #[test]
    fn protocol_parses_case_insensitively() {
        assert_eq!("HTTPS".parse::<Protocol>().unwrap(), Protocol::Https);
        assert_eq!(Protocol::Http.to_string(), "http");
        assert!("ftp".parse::<Protocol>().is_err());
    }
}
