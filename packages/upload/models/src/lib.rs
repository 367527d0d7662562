#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Header rules, upload tasks and the recognized object header set.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// [`HeaderSpec`] key whose rules apply to every uploaded object.
pub const ALL_OBJECTS: &str = "ALL_OBJECTS";

/// A single header (or metadata entry) attached to matching objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    /// Header name, e.g. `Cache-Control` or a custom metadata key.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl HeaderRule {
    /// Creates a header rule.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Header rules keyed by scope.
///
/// A scope is [`ALL_OBJECTS`], a glob pattern, a folder path ending in a
/// separator, or an exact path relative to the upload root.
pub type HeaderSpec = BTreeMap<String, Vec<HeaderRule>>;

/// Headers that map to dedicated put-object fields instead of user metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
pub enum ObjectHeader {
    /// `Cache-Control`
    #[strum(serialize = "Cache-Control")]
    CacheControl,
    /// `Content-Disposition`
    #[strum(serialize = "Content-Disposition")]
    ContentDisposition,
    /// `Content-Encoding`
    #[strum(serialize = "Content-Encoding")]
    ContentEncoding,
    /// `Content-Language`
    #[strum(serialize = "Content-Language")]
    ContentLanguage,
    /// `Content-Type`
    #[strum(serialize = "Content-Type")]
    ContentType,
    /// `Expires`
    #[strum(serialize = "Expires")]
    Expires,
    /// `Website-Redirect-Location`
    #[strum(serialize = "Website-Redirect-Location")]
    WebsiteRedirectLocation,
}

impl ObjectHeader {
    /// Looks up a recognized header by its exact name.
    ///
    /// Returns `None` for anything that should become user metadata.
    #[must_use]
    pub fn recognize(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// Absolute path of the local file.
    pub source_path: PathBuf,
    /// Destination key: `/`-separated, no leading slash, prefix included.
    pub key: String,
    /// Resolved headers, before classification into fields and metadata.
    pub headers: BTreeMap<String, String>,
    /// Upload group index. Group 0 holds files matching no order pattern.
    pub order: usize,
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn recognizes_exact_header_names_only() {
        assert_eq!(
            ObjectHeader::recognize("Cache-Control"),
            Some(ObjectHeader::CacheControl)
        );
        assert_eq!(ObjectHeader::recognize("cache-control"), None);
        assert_eq!(ObjectHeader::recognize("x-custom"), None);
    }

    #[test]
    fn every_header_is_recognized_by_its_display_name() {
        for header in ObjectHeader::iter() {
            assert_eq!(ObjectHeader::recognize(&header.to_string()), Some(header));
        }
    }
}
