//! Shared per-run bookkeeping.
//!
//! A single [`Meta`] is created when a pipeline is built with [`crate::pipeline::from_values`]
//! and is shared by reference across every stage derived from that source,
//! including type-changing ones produced by `map`. It is the only place the
//! otherwise channel-only (CSP) design admits shared-memory coordination, so
//! its surface is kept deliberately small: an immutable count, a concurrent
//! attribute bag, and a latch.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

/// Per-pipeline-run shared state.
///
/// Cheap to clone: callers normally hold it wrapped in an `Arc` (see
/// [`crate::pipeline::Stream`]), and `Meta` itself stores only an `Arc`'d
/// attribute map and an atomic flag behind `&self`, so methods take `&self`
/// rather than `&mut self`.
#[derive(Debug)]
pub struct Meta {
    origin_total_items: usize,
    attributes: DashMap<String, Arc<dyn Any + Send + Sync>>,
    error_occurred: AtomicBool,
}

impl Meta {
    /// Create a fresh `Meta` for a source that will emit `origin_total_items`
    /// envelopes.
    pub fn new(origin_total_items: usize) -> Self {
        Self {
            origin_total_items,
            attributes: DashMap::new(),
            error_occurred: AtomicBool::new(false),
        }
    }

    /// Number of items the originating source will emit. Immutable after
    /// construction.
    pub fn origin_total_items(&self) -> usize {
        self.origin_total_items
    }

    /// Record a free-form attribute under `key`. No semantics are enforced
    /// by the pipeline; this exists purely for user code to stash
    /// cross-stage state (e.g. a start time, a run id).
    pub fn set_attribute<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) {
        self.attributes.insert(key.into(), Arc::new(value));
    }

    /// Retrieve a previously-set attribute, if present and of type `V`.
    pub fn get_attribute<V: Any + Send + Sync + Clone>(&self, key: &str) -> Option<V> {
        self.attributes
            .get(key)
            .and_then(|entry| entry.value().clone().downcast::<V>().ok())
            .map(|v| (*v).clone())
    }

    /// Latch the error flag. Once set, it is never cleared: this is a
    /// "did anything go wrong during this run" sticky bit, not a per-stage
    /// error count.
    pub fn latch_error(&self) {
        self.error_occurred.store(true, Ordering::Relaxed);
    }

    /// Whether any stage has latched an error since this `Meta` was created.
    pub fn error_occurred(&self) -> bool {
        self.error_occurred.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_roundtrip_by_type() {
        let meta = Meta::new(0);
        meta.set_attribute("count", 42usize);
        meta.set_attribute("label", "hello".to_string());

        assert_eq!(meta.get_attribute::<usize>("count"), Some(42));
        assert_eq!(
            meta.get_attribute::<String>("label"),
            Some("hello".to_string())
        );
        assert_eq!(meta.get_attribute::<usize>("missing"), None);
        // wrong type for an existing key fails the downcast, not a panic
        assert_eq!(meta.get_attribute::<String>("count"), None);
    }

    #[test]
    fn error_latch_never_resets() {
        let meta = Meta::new(0);
        assert!(!meta.error_occurred());
        meta.latch_error();
        assert!(meta.error_occurred());
        meta.latch_error();
        assert!(meta.error_occurred());
    }
}
