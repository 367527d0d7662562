//! Upload progress hooks.
//!
//! [`upload_directory`](crate::upload_directory) reports the file count once
//! the plan is known, then one tick per stored object. Rendering is left to
//! the caller.

use std::sync::Arc;

/// Observer of a directory upload.
///
/// Uploads inside a group complete concurrently, so ticks may arrive from
/// several tasks at once.
pub trait ProgressCallback: Send + Sync {
    /// Number of files in the plan, across all groups.
    fn set_total(&self, total: u64);

    /// `delta` more objects were stored.
    fn inc(&self, delta: u64);

    /// Key of the object just stored.
    fn set_message(&self, msg: String);

    /// Summary line after the last group, e.g. `Uploaded 12 files (0.3 MB) in 2 groups`.
    fn finish(&self, msg: String);
}

/// Discards every update. Used by tests and non-interactive callers.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
