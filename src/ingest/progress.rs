//! Row progress reporting for long imports.
//!
//! With the `progress` feature, [`RowProgress`] drives an `indicatif` spinner showing the rows
//! processed, the throughput and the running error count. Without it every method is a
//! no-op, so importers call it unconditionally.
#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "progress")]
use std::time::Duration;

#[cfg(feature = "progress")]
pub struct RowProgress {
    bar: ProgressBar,
}

#[cfg(feature = "progress")]
impl RowProgress {
    pub fn start(label: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {prefix} {pos} rows | {per_sec} | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(200));
        RowProgress { bar }
    }

    pub fn row_done(&self, errors: u64) {
        self.bar.inc(1);
        if errors > 0 {
            self.bar.set_message(format!("{errors} errors"));
        }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(not(feature = "progress"))]
pub struct RowProgress;

#[cfg(not(feature = "progress"))]
impl RowProgress {
    pub fn start(_label: &str) -> Self {
        RowProgress
    }

    pub fn row_done(&self, _errors: u64) {}

    pub fn finish(self) {}
}
