//! Helpers shared by this crate's own tests and by downstream integration
//! tests. Not meant for production use.

use crate::envelope::Envelope;
use crate::topology::EnvelopeReceiver;

/// Drain a receiver into a `Vec`, for assertions in tests. Not for
/// production use: it buffers the entire stream in memory.
pub async fn drain_all<T>(mut rx: EnvelopeReceiver<T>) -> Vec<Envelope<T>> {
    let mut out = Vec::new();
    while let Some(env) = rx.recv().await {
        out.push(env);
    }
    out
}

/// Install a test-scoped `tracing` subscriber so `debug!`/`error!` calls in
/// the core show up in `cargo test -- --nocapture` output. Safe to call from
/// more than one test; only the first call wins.
#[cfg(test)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
