#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `site_deploy` binary.
//!
//! The deploy and remove flows only see the [`ProgressCallback`] and
//! [`Prompt`] seams. This crate backs them with an `indicatif` file counter
//! and a `dialoguer` yes/no question, both sharing one [`MultiProgress`]
//! with the step log set up by [`init_logger`].

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use site_deploy::Prompt;
use site_deploy_upload::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Upload counter drawn under the step log.
pub struct IndicatifProgress {
    bar: ProgressBar,
    counting: ProgressStyle,
}

impl IndicatifProgress {
    /// Spinner showing `message` until the upload plan reports its file
    /// count, then a `stored/total files` bar.
    #[must_use]
    pub fn upload_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let counting = ProgressStyle::with_template(
            "  {wide_bar:.green/dim} {pos}/{len} files uploaded [{elapsed}] {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, counting })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(self.counting.clone());
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// A [`Prompt`] that asks on the terminal, defaulting to no.
pub struct ConfirmPrompt {
    multi: MultiProgress,
}

impl ConfirmPrompt {
    /// Creates a prompt that hides `multi`'s bars while waiting for input.
    #[must_use]
    pub const fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

impl Prompt for ConfirmPrompt {
    fn confirm(&self, question: &str) -> std::io::Result<bool> {
        self.multi.suspend(|| {
            dialoguer::Confirm::new()
                .with_prompt(question)
                .default(false)
                .interact()
                .map_err(std::io::Error::other)
        })
    }
}

/// Installs the step logger: `pretty_env_logger` at `info` (overridable
/// with `RUST_LOG`), routed through `indicatif-log-bridge` so step lines
/// print above the upload counter.
///
/// The returned [`MultiProgress`] owns the terminal. The upload bar and the
/// confirmation prompt must go through it.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already installed

    log::set_max_level(level);

    multi
}
