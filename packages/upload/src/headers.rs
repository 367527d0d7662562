//! Header-rule resolution.
//!
//! Rules are applied in four tiers, each later tier overwriting headers set
//! by an earlier one:
//!
//! 1. [`ALL_OBJECTS`] rules.
//! 2. Glob scopes that match the file, shortest pattern first.
//! 3. Folder scopes that contain the file, shortest folder first.
//! 4. The scope naming exactly this file.
//!
//! Within a tier, scopes of equal length are applied in [`HeaderSpec`]
//! order.

use std::collections::BTreeMap;

use globset::{GlobBuilder, GlobMatcher};
use site_deploy_upload_models::{ALL_OBJECTS, HeaderRule, HeaderSpec};

/// Errors building a [`HeaderResolver`].
#[derive(Debug, thiserror::Error)]
pub enum HeaderSpecError {
    /// A glob scope failed to compile.
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Glob {
        /// The offending scope key.
        pattern: String,
        /// Underlying glob error.
        source: globset::Error,
    },
}

/// Whether a scope key is treated as a glob pattern.
#[must_use]
pub fn is_glob(scope: &str) -> bool {
    scope.contains(['*', '?', '[', ']'])
}

/// Whether a scope key names a folder.
#[must_use]
pub fn is_folder(scope: &str) -> bool {
    scope.ends_with(['/', '\\'])
}

/// Normalizes a scope key to the `/`-separated relative form file paths are
/// matched in.
///
/// Backslashes become `/`, `.` and empty segments are dropped, and a
/// trailing separator is kept so folders stay distinguishable.
#[must_use]
pub fn normalize_scope(scope: &str) -> String {
    let scope = scope.replace('\\', "/");
    let mut normalized = scope
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    if scope.ends_with('/') && !normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Compiles a glob scope.
///
/// `*` and `?` do not cross `/`, `**` does. Patterns without a `/` are
/// matched against the file name alone. Matching a dotfile or a dot folder
/// is left to [`HeaderResolver`], which requires a literal leading `.`.
///
/// # Errors
///
/// Returns [`HeaderSpecError::Glob`] if the pattern is malformed.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher, HeaderSpecError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| HeaderSpecError::Glob {
            pattern: pattern.to_string(),
            source,
        })
}

#[derive(Debug, Clone)]
struct GlobScope {
    matcher: GlobMatcher,
    segments: Vec<String>,
    match_base: bool,
    rules: Vec<HeaderRule>,
}

impl GlobScope {
    fn matches(&self, relative: &str) -> bool {
        let target = if self.match_base {
            relative.rsplit('/').next().unwrap_or(relative)
        } else {
            relative
        };
        let path = target.split('/').collect::<Vec<_>>();
        let pattern = self.segments.iter().map(String::as_str).collect::<Vec<_>>();

        dots_are_explicit(&pattern, &path) && self.matcher.is_match(target)
    }
}

/// Whether `pattern` can line up with `path` so that every path segment
/// starting with `.` sits under a pattern segment that starts with `.`.
///
/// `**` never spans a dot segment and wildcards never match a leading dot.
fn dots_are_explicit(pattern: &[&str], path: &[&str]) -> bool {
    match (pattern.split_first(), path.split_first()) {
        (None, None) => true,
        (Some((&"**", rest)), _) => {
            dots_are_explicit(rest, path)
                || path.split_first().is_some_and(|(segment, tail)| {
                    !segment.starts_with('.') && dots_are_explicit(pattern, tail)
                })
        }
        (Some((glob, rest)), Some((segment, tail))) => {
            (!segment.starts_with('.') || glob.starts_with('.')) && dots_are_explicit(rest, tail)
        }
        _ => false,
    }
}

/// Resolves the headers of a file from a compiled [`HeaderSpec`].
#[derive(Debug, Clone, Default)]
pub struct HeaderResolver {
    all_objects: Vec<HeaderRule>,
    globs: Vec<GlobScope>,
    folders: Vec<(String, Vec<HeaderRule>)>,
    files: Vec<(String, Vec<HeaderRule>)>,
}

impl HeaderResolver {
    /// Compiles `spec`.
    ///
    /// A scope key may belong to several tiers at once (e.g. `assets/*/`
    /// is both a glob and a folder); it then takes part in each of them.
    ///
    /// # Errors
    ///
    /// Returns the first [`HeaderSpecError`] among the glob scopes.
    pub fn new(spec: &HeaderSpec) -> Result<Self, HeaderSpecError> {
        let mut resolver = Self::default();

        for (scope, rules) in spec {
            if scope == ALL_OBJECTS {
                resolver.all_objects.clone_from(rules);
                continue;
            }
            if is_glob(scope) {
                resolver.globs.push(GlobScope {
                    matcher: compile_glob(scope)?,
                    segments: scope.split('/').map(String::from).collect(),
                    match_base: !scope.contains('/'),
                    rules: rules.clone(),
                });
            }
            if is_folder(scope) {
                resolver
                    .folders
                    .push((normalize_scope(scope), rules.clone()));
            }
            resolver.files.push((normalize_scope(scope), rules.clone()));
        }

        resolver
            .globs
            .sort_by_key(|scope| scope.matcher.glob().glob().len());
        resolver.folders.sort_by_key(|(folder, _)| folder.len());

        Ok(resolver)
    }

    /// Resolves the headers for a file at `relative` (`/`-separated, relative
    /// to the upload root).
    #[must_use]
    pub fn resolve(&self, relative: &str) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();

        apply(&mut headers, &self.all_objects);

        for scope in self.globs.iter().filter(|scope| scope.matches(relative)) {
            apply(&mut headers, &scope.rules);
        }

        for (_, rules) in self
            .folders
            .iter()
            .filter(|(folder, _)| !folder.is_empty() && relative.starts_with(folder.as_str()))
        {
            apply(&mut headers, rules);
        }

        for (_, rules) in self.files.iter().filter(|(file, _)| file == relative) {
            apply(&mut headers, rules);
        }

        headers
    }
}

fn apply(headers: &mut BTreeMap<String, String>, rules: &[HeaderRule]) {
    for rule in rules {
        headers.insert(rule.name.clone(), rule.value.clone());
    }
}
