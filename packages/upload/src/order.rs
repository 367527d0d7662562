//! Upload ordering.
//!
//! An [`OrderSpec`] is a list of case-insensitive regular expressions. Files
//! are partitioned into `N + 1` groups: group 0 holds files no pattern
//! matches, group `i` holds files whose recorded order is pattern `i - 1`.
//! Groups are uploaded one after another, so files matching later patterns
//! land in the bucket after everything before them.

use std::path::PathBuf;

use regex::{Regex, RegexBuilder};

/// Compiled upload-order patterns.
#[derive(Debug, Clone)]
pub struct OrderSpec {
    patterns: Vec<Regex>,
}

impl OrderSpec {
    /// Compiles `patterns` case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns the first [`regex::Error`] among the patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| compile_pattern(pattern.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether there are no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Group index for `path`.
    ///
    /// Every pattern is tested and a later match overwrites an earlier one,
    /// so the last matching pattern decides.
    #[must_use]
    pub fn order_of(&self, path: &str) -> usize {
        self.patterns
            .iter()
            .rposition(|pattern| pattern.is_match(path))
            .map_or(0, |index| index + 1)
    }
}

/// Compiles a single upload-order pattern the way [`OrderSpec::new`] does.
///
/// # Errors
///
/// Returns a [`regex::Error`] if `pattern` is not a valid expression.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Partitions `files` into upload groups.
///
/// Without a spec every file lands in a single group. With a spec of `N`
/// patterns the result always has `N + 1` groups (some possibly empty), and
/// each group keeps the listing order of its files.
#[must_use]
pub fn group_by_order(files: Vec<PathBuf>, spec: Option<&OrderSpec>) -> Vec<Vec<PathBuf>> {
    let Some(spec) = spec else {
        return vec![files];
    };

    let mut groups = vec![Vec::new(); spec.len() + 1];
    for file in files {
        let order = spec.order_of(&file.to_string_lossy());
        groups[order].push(file);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn no_spec_yields_single_group() {
        let files = paths(&["/site/b.js", "/site/a.html"]);
        assert_eq!(group_by_order(files.clone(), None), [files]);
    }

    #[test]
    fn unmatched_files_go_first() {
        let spec = OrderSpec::new([".*\\.js$", "index\\.html$"]).unwrap();
        let groups = group_by_order(
            paths(&["/site/index.html", "/site/app.js", "/site/logo.png"]),
            Some(&spec),
        );
        assert_eq!(
            groups,
            [
                paths(&["/site/logo.png"]),
                paths(&["/site/app.js"]),
                paths(&["/site/index.html"]),
            ]
        );
    }

    #[test]
    fn last_matching_pattern_wins() {
        let spec = OrderSpec::new(["\\.html$", "index"]).unwrap();
        assert_eq!(spec.order_of("/site/index.html"), 2);
        assert_eq!(spec.order_of("/site/about.html"), 1);
    }

    #[test]
    fn matching_ignores_case() {
        let spec = OrderSpec::new(["\\.HTML$"]).unwrap();
        assert_eq!(spec.order_of("/site/Index.html"), 1);
    }

    #[test]
    fn groups_partition_files() {
        let spec = OrderSpec::new(["a", "b", "zzz"]).unwrap();
        let files = paths(&["/x/a", "/x/b", "/x/ab", "/x/c", "/x/ba"]);
        let groups = group_by_order(files.clone(), Some(&spec));

        assert_eq!(groups.len(), 4);
        assert!(groups[3].is_empty());
        let mut flattened: Vec<_> = groups.iter().flatten().cloned().collect();
        flattened.sort();
        let mut expected = files;
        expected.sort();
        assert_eq!(flattened, expected);
        for (index, group) in groups.iter().enumerate().skip(1) {
            for file in group {
                assert_eq!(spec.order_of(&file.to_string_lossy()), index);
            }
        }
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(OrderSpec::new(["(unclosed"]).is_err());
    }
}
