//! CLI-specific progress handling for splitfetch
//!
//! Renders the byte counter shared by all range fetches as one progress bar.

use indicatif::{ProgressBar, ProgressStyle};
use splitfetch::ProgressCallback;
use std::sync::Arc;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {bytes_per_sec} ETA: {eta}";

/// Creates a progress bar for CLI display
pub fn create_progress_bar(total_size: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Progress bar fed by the download callback
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_size: u64, message: &str) -> Self {
        let pb = create_progress_bar(total_size);

        eprintln!("{message}");

        Self { pb }
    }

    /// Callback to hand to the downloader; the total is only known after probing
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |downloaded, total| {
            if pb.length() != Some(total) {
                pb.set_length(total);
            }
            pb.set_position(downloaded);
        })
    }

    pub fn finish(&self, message: &'static str) {
        self.pb.finish_with_message(message);
    }

    pub fn abandon(&self) {
        self.pb.abandon();
    }
}
