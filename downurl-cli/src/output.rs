use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Terminal progress rendering for a run, mirroring the engine's one
/// `(completed, total)` callback per finished job.
pub struct DownurlOutput {
    quiet: bool,
    bar: Option<ProgressBar>,
}

impl DownurlOutput {
    pub fn new(quiet: bool, no_progress: bool, total: usize) -> Self {
        let bar = if quiet || no_progress {
            None
        } else {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(bar)
        };
        DownurlOutput { quiet, bar }
    }

    /// Wrap as a callback the pool can invoke after every completed job.
    pub fn into_progress_callback(self: Arc<Self>) -> downurl_core::ProgressCallback {
        Arc::new(move |completed, total| {
            if let Some(ref bar) = self.bar {
                bar.set_position(completed as u64);
                bar.set_message(format!("{completed}/{total}"));
            }
        })
    }

    pub fn finish(&self, succeeded: usize, failed: usize) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        if !self.quiet {
            println!("{} {} succeeded, {} failed", style("done:").bold(), style(succeeded).green(), style(failed).red());
        }
    }

    pub fn warn(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("warning:").yellow().bold(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("downurl:").red().bold(), message);
    }
}
