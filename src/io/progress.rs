//! Batch progress display for multi-section runs

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::LazyLock;

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "[{{elapsed_precise}}] Sections: [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
});

/// Progress bar over a batch of sections
///
/// Quiet mode produces a hidden bar so call sites stay unconditional.
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    /// Create a bar over `total` sections, hidden when `quiet`
    pub fn new(total: usize, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(BATCH_STYLE.clone());
            bar
        };
        Self { bar }
    }

    /// Mark one section done, showing its identifier
    pub fn advance(&self, section: &str) {
        self.bar.set_message(section.to_owned());
        self.bar.inc(1);
    }

    /// Finish the bar and clear it from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
