//! Upload planning: derives keys and headers for every file before anything
//! is uploaded.

use std::path::{Component, Path};

use site_deploy_gateway::PutObjectRequest;
use site_deploy_upload_models::{ObjectHeader, UploadTask};

use crate::{UploadError, UploadSpec, files, order};

/// Joins the non-empty segments of `path` (split on `/` or `\`) with `/`.
///
/// The result never has a leading, trailing or doubled separator, and
/// normalizing it again returns it unchanged.
#[must_use]
pub fn normalize_key(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Path of `file` relative to `root`, `/`-separated.
#[must_use]
pub fn relative_path(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Object key for a file at `relative`, under an optional key prefix.
#[must_use]
pub fn destination_key(relative: &str, key_prefix: Option<&str>) -> String {
    let key = normalize_key(relative);
    match key_prefix.map(normalize_key) {
        Some(prefix) if !prefix.is_empty() && !key.is_empty() => format!("{prefix}/{key}"),
        Some(prefix) if !prefix.is_empty() => prefix,
        _ => key,
    }
}

/// Lists, groups and resolves every file under `root`.
///
/// The outer vector holds the upload groups in the order they must run.
///
/// # Errors
///
/// Returns [`UploadError::List`] if the directory cannot be read.
pub fn plan_uploads(root: &Path, spec: &UploadSpec) -> Result<Vec<Vec<UploadTask>>, UploadError> {
    let list_error = |source| UploadError::List {
        root: root.to_path_buf(),
        source,
    };
    let root = std::path::absolute(root).map_err(list_error)?;
    let files = files::list_files(&root).map_err(list_error)?;

    let groups = order::group_by_order(files, spec.order.as_ref())
        .into_iter()
        .enumerate()
        .map(|(order, files)| {
            files
                .into_iter()
                .map(|source_path| {
                    let relative = relative_path(&root, &source_path);
                    UploadTask {
                        key: destination_key(&relative, spec.key_prefix.as_deref()),
                        headers: spec.headers.resolve(&relative),
                        source_path,
                        order,
                    }
                })
                .collect()
        })
        .collect();

    Ok(groups)
}

/// Builds the put-object parameters for `task`.
///
/// The content type is guessed from the file extension first, so an
/// explicit `Content-Type` rule replaces it. Headers without a dedicated
/// field become user metadata.
#[must_use]
pub fn put_object_request(
    bucket: &str,
    task: &UploadTask,
    body: Vec<u8>,
    server_side_encryption: Option<&str>,
) -> PutObjectRequest {
    let mut request = PutObjectRequest {
        bucket: bucket.to_string(),
        key: task.key.clone(),
        body,
        content_type: mime_guess::from_path(&task.source_path)
            .first_raw()
            .map(String::from),
        server_side_encryption: server_side_encryption.map(String::from),
        ..PutObjectRequest::default()
    };

    for (name, value) in &task.headers {
        let field = match ObjectHeader::recognize(name) {
            Some(ObjectHeader::CacheControl) => &mut request.cache_control,
            Some(ObjectHeader::ContentDisposition) => &mut request.content_disposition,
            Some(ObjectHeader::ContentEncoding) => &mut request.content_encoding,
            Some(ObjectHeader::ContentLanguage) => &mut request.content_language,
            Some(ObjectHeader::ContentType) => &mut request.content_type,
            Some(ObjectHeader::Expires) => &mut request.expires,
            Some(ObjectHeader::WebsiteRedirectLocation) => &mut request.website_redirect_location,
            None => {
                request.metadata.insert(name.clone(), value.clone());
                continue;
            }
        };
        *field = Some(value.clone());
    }

    request
}
