//! The progress-observer interface.
//!
//! A `Progress` implementation is a side effect, not a computational stage:
//! it is what [`crate::operators::tap`] typically drives. It must never
//! block the worker that calls it, and if its underlying sink has gone away
//! (a closed terminal, a dropped progress bar), ticking it must silently
//! no-op rather than propagate an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Something that can be ticked once per envelope, success or failure.
pub trait Progress: Send + Sync {
    /// Advance the counter by one. Must not block and must not panic.
    fn tick(&self);
}

impl<P: Progress + ?Sized> Progress for Arc<P> {
    fn tick(&self) {
        (**self).tick();
    }
}

/// A trivial, lock-free `Progress` backed by an atomic counter. Useful in
/// tests and as a building block for richer implementations (a TTY spinner
/// can wrap one of these and read `count()` on its own redraw cadence).
#[derive(Debug, Default)]
pub struct AtomicProgress(AtomicU64);

impl AtomicProgress {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Progress for AtomicProgress {
    fn tick(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_progress_counts_every_tick() {
        let p = AtomicProgress::new();
        for _ in 0..5 {
            p.tick();
        }
        assert_eq!(p.count(), 5);
    }
}
