//! Cooperative cancellation.
//!
//! The pipeline core does not invent its own cancellation primitive: it
//! reuses [`tokio_util::sync::CancellationToken`], which is already
//! `Clone + Send + Sync` and cheap to pass through every stage. A single
//! token is threaded through an entire pipeline run; cancelling it (or
//! letting a deadline token expire) propagates to every stage's suspension
//! points within one scheduler tick.

use std::time::Duration;

pub use tokio_util::sync::CancellationToken;

/// Returns a child of `parent` that is cancelled either when `parent` is
/// cancelled, or when `timeout` elapses, whichever happens first.
///
/// The returned token should be used as the pipeline's governing context;
/// it never outlives `parent` and dropping it early simply abandons the
/// background timer task.
pub fn with_timeout(parent: &CancellationToken, timeout: Duration) -> CancellationToken {
    let child = parent.child_token();
    let timer_token = child.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => timer_token.cancel(),
            _ = timer_token.cancelled() => {}
        }
    });
    child
}
