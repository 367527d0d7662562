//! Validation of [`ClientOptions`] into a [`DeployConfig`].

use std::fmt::Display;
use std::path::Path;

use site_deploy_bucket_models::{
    BucketDesiredState, BucketPolicy, Condition, CorsConfiguration, CorsRule,
    DEFAULT_ERROR_DOCUMENT, DEFAULT_INDEX_DOCUMENT, Protocol, Redirect, RedirectAllRequestsTo,
    RoutingRule, WebsiteConfiguration,
};
use site_deploy_upload::UploadSpec;
use site_deploy_upload::headers::{HeaderResolver, compile_glob, is_glob};
use site_deploy_upload::order::{OrderSpec, compile_pattern};
use site_deploy_upload::plan::normalize_key;
use site_deploy_upload_models::{HeaderRule, HeaderSpec};

use crate::{
    ClientOptions, ConfigError, DEFAULT_DISTRIBUTION_FOLDER, DeployConfig, HeaderOptions,
    RedirectAllOptions, RoutingRuleOptions,
};

/// Accumulates validation messages.
#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    fn check<T, E: Display>(&mut self, result: Result<T, E>) -> Option<T> {
        result.map_err(|e| self.push(e.to_string())).ok()
    }
}

impl ClientOptions {
    /// Checks the whole configuration and builds the deployment from it.
    ///
    /// Relative paths are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every problem found.
    pub fn validate(&self, base_dir: &Path) -> Result<DeployConfig, ConfigError> {
        let mut problems = Problems::default();

        let distribution_folder = base_dir.join(
            self.distribution_folder
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_DISTRIBUTION_FOLDER)),
        );
        if !distribution_folder.is_dir() {
            problems.push(format!(
                "Could not find '{}' folder in your project root",
                distribution_folder.display()
            ));
        }

        let bucket_name = self.bucket_name.as_deref().filter(|name| !name.is_empty());
        if bucket_name.is_none() {
            problems.push("Please specify a bucket name in the configuration file");
        }

        let headers = self.header_resolver(&mut problems);
        let order = self.order_spec(&mut problems);
        let policy = self.bucket_policy(base_dir, &mut problems);
        let cors = self.cors_configuration(base_dir, &mut problems);
        let website = self.website_configuration(&mut problems);

        let (
            Some(bucket_name),
            Some(headers),
            Some(order),
            Some(policy),
            Some(cors),
            Some(website),
        ) = (bucket_name, headers, order, policy, cors, website)
        else {
            return Err(ConfigError::Invalid {
                messages: problems.0,
            });
        };
        if !problems.0.is_empty() {
            return Err(ConfigError::Invalid {
                messages: problems.0,
            });
        }

        let key_prefix = self
            .key_prefix
            .as_deref()
            .map(normalize_key)
            .filter(|prefix| !prefix.is_empty());
        let server_side_encryption = self.sse.clone().filter(|sse| !sse.is_empty());

        Ok(DeployConfig {
            bucket: BucketDesiredState {
                website,
                policy,
                cors,
                tags: self.tags.clone().unwrap_or_default(),
                key_prefix: key_prefix.clone(),
                server_side_encryption: server_side_encryption.clone(),
                manage_resources: self.manage_resources.unwrap_or(true),
                ..BucketDesiredState::new(bucket_name)
            },
            distribution_folder,
            upload: UploadSpec {
                headers,
                order,
                key_prefix,
                server_side_encryption,
            },
            region: self.region.clone().filter(|region| !region.is_empty()),
        })
    }

    fn header_resolver(&self, problems: &mut Problems) -> Option<HeaderResolver> {
        let Some(object_headers) = &self.object_headers else {
            return Some(HeaderResolver::default());
        };

        let before = problems.0.len();
        let mut spec = HeaderSpec::new();
        for (scope, rules) in object_headers {
            if is_glob(scope) {
                problems.check(compile_glob(scope));
            }
            let rules = rules
                .iter()
                .filter_map(|rule| header_rule(rule, problems))
                .collect();
            spec.insert(scope.clone(), rules);
        }

        if problems.0.len() > before {
            return None;
        }
        problems.check(HeaderResolver::new(&spec))
    }

    fn order_spec(&self, problems: &mut Problems) -> Option<Option<OrderSpec>> {
        let Some(patterns) = &self.upload_order else {
            return Some(None);
        };

        let before = problems.0.len();
        for pattern in patterns {
            if let Err(e) = compile_pattern(pattern) {
                problems.push(format!("Invalid uploadOrder pattern {pattern:?}: {e}"));
            }
        }

        if problems.0.len() > before {
            return None;
        }
        problems.check(OrderSpec::new(patterns)).map(Some)
    }

    fn bucket_policy(&self, base_dir: &Path, problems: &mut Problems) -> Option<BucketPolicy> {
        let Some(file) = &self.bucket_policy_file else {
            return Some(BucketPolicy::PublicRead);
        };

        let policy = read_json(&base_dir.join(file)).map(BucketPolicy::Custom);
        if policy.is_none() {
            problems.push(
                "Failed to read and/or parse specified policy. Make sure it is valid JSON.",
            );
        }
        policy
    }

    fn cors_configuration(
        &self,
        base_dir: &Path,
        problems: &mut Problems,
    ) -> Option<CorsConfiguration> {
        let Some(file) = &self.cors_file else {
            return Some(CorsConfiguration::Default);
        };

        let cors = read_json::<Vec<CorsRule>>(&base_dir.join(file)).map(CorsConfiguration::Custom);
        if cors.is_none() {
            problems.push(
                "Failed to read and/or parse specified CORS configuration. \
                 Make sure it is valid JSON.",
            );
        }
        cors
    }

    fn website_configuration(&self, problems: &mut Problems) -> Option<WebsiteConfiguration> {
        if let Some(redirect) = &self.redirect_all_requests_to {
            return self.redirect_all(redirect, problems);
        }

        let before = problems.0.len();
        let routing_rules: Vec<RoutingRule> = self
            .routing_rules
            .iter()
            .flatten()
            .enumerate()
            .filter_map(|(index, rule)| routing_rule(index, rule, problems))
            .collect();

        if problems.0.len() > before {
            return None;
        }
        Some(WebsiteConfiguration::Documents {
            index_document: self
                .index_document
                .clone()
                .unwrap_or_else(|| DEFAULT_INDEX_DOCUMENT.to_string()),
            error_document: self
                .error_document
                .clone()
                .unwrap_or_else(|| DEFAULT_ERROR_DOCUMENT.to_string()),
            routing_rules,
        })
    }

    fn redirect_all(
        &self,
        redirect: &RedirectAllOptions,
        problems: &mut Problems,
    ) -> Option<WebsiteConfiguration> {
        let before = problems.0.len();
        for (field, present) in [
            ("indexDocument", self.index_document.is_some()),
            ("errorDocument", self.error_document.is_some()),
            ("routingRules", self.routing_rules.is_some()),
        ] {
            if present {
                problems.push(format!("{field} cannot be specified with redirectAllRequestsTo"));
            }
        }

        let host_name = redirect.host_name.clone();
        if host_name.is_none() {
            problems.push(
                "redirectAllRequestsTo.hostName is required if redirectAllRequestsTo is specified",
            );
        }
        let protocol = redirect.protocol.as_deref().map(|protocol| {
            parse_protocol(protocol).ok_or_else(|| {
                problems.push("redirectAllRequestsTo.protocol must be either http or https");
            })
        });

        if problems.0.len() > before {
            return None;
        }
        Some(WebsiteConfiguration::RedirectAll(RedirectAllRequestsTo {
            host_name: host_name?,
            protocol: protocol.transpose().ok()?,
        }))
    }
}

fn header_rule(rule: &HeaderOptions, problems: &mut Problems) -> Option<HeaderRule> {
    let name = rule.name.as_deref().filter(|name| !name.is_empty());
    if name.is_none() {
        problems.push("Each object header must have a (string) 'name' attribute");
    }
    if rule.value.is_none() {
        problems.push("Each object header must have a (string) 'value' attribute");
    }
    Some(HeaderRule::new(name?, rule.value.as_deref()?))
}

fn routing_rule(
    index: usize,
    rule: &RoutingRuleOptions,
    problems: &mut Problems,
) -> Option<RoutingRule> {
    let before = problems.0.len();
    let mut fail = |message: &str| problems.push(format!("routingRules[{index}]: {message}"));

    let Some(redirect) = &rule.redirect else {
        fail("redirect must be specified for each member of routingRules");
        return None;
    };
    if redirect.replace_key_prefix_with.is_some() && redirect.replace_key_with.is_some() {
        fail("replaceKeyPrefixWith and replaceKeyWith cannot both be specified");
    }
    let protocol = match redirect.protocol.as_deref().map(parse_protocol) {
        Some(None) => {
            fail("redirect.protocol must be either http or https");
            None
        }
        Some(protocol) => protocol,
        None => None,
    };

    let condition = rule.condition.as_ref().map(|condition| {
        if condition.http_error_code_returned_equals.is_none()
            && condition.key_prefix_equals.is_none()
        {
            fail(
                "condition.httpErrorCodeReturnedEquals or condition.keyPrefixEquals \
                 must be defined",
            );
        }
        Condition {
            http_error_code_returned_equals: condition.http_error_code_returned_equals,
            key_prefix_equals: condition.key_prefix_equals.clone(),
        }
    });

    if problems.0.len() > before {
        return None;
    }
    Some(RoutingRule {
        redirect: Redirect {
            host_name: redirect.host_name.clone(),
            http_redirect_code: redirect.http_redirect_code,
            protocol,
            replace_key_prefix_with: redirect.replace_key_prefix_with.clone(),
            replace_key_with: redirect.replace_key_with.clone(),
        },
        condition,
    })
}

fn parse_protocol(protocol: &str) -> Option<Protocol> {
    protocol.parse().ok()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| log::debug!("Failed to read {}: {e}", path.display()))
        .ok()?;
    serde_json::from_str(&contents)
        .map_err(|e| log::debug!("Failed to parse {}: {e}", path.display()))
        .ok()
}
