//! A concrete, terminal-visible [`pipeline_common::Progress`] implementation.
//! The core stays UI-agnostic; this is the only place indicatif is used.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use pipeline_common::Progress;

pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    pub fn new(total: u64) -> Arc<Self> {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Arc::new(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Progress for IndicatifProgress {
    fn tick(&self) {
        // ProgressBar::inc on a finished bar is a no-op in indicatif, which
        // already gives us the "ticking a closed sink must not block or
        // panic" guarantee the core requires.
        self.bar.inc(1);
    }
}
