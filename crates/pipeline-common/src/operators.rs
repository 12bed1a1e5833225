//! `Map`, `Transform`, `Filter` and `Tap`: the four stage shapes every
//! pipeline is assembled from.
//!
//! All four share one internal worker-pool runner ([`spawn_stage`]):
//! `workers == 1` runs a plain sequential loop (order-preserving),
//! `workers > 1` fans the shared input out over that many tasks and merges
//! their outputs back with [`fan_in`] (order is then non-deterministic). A
//! panic raised inside a user callback is caught per-envelope and turned
//! into a `Panic`-tagged envelope rather than taking down the worker: the
//! next envelope is still processed.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::error;

use crate::cancellation::CancellationToken;
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::meta::Meta;
use crate::topology::{DEFAULT_CHANNEL_CAPACITY, EnvelopeReceiver, SharedReceiver, fan_in};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}

/// Shared worker-pool runner backing `map`/`filter`/`tap`.
///
/// `step` returns `Some(envelope)` to forward an item (transformed or not)
/// and `None` to drop it. It is invoked by every worker, so it must be
/// `Send + Sync`.
fn spawn_stage<T, U, F>(
    token: CancellationToken,
    input: EnvelopeReceiver<T>,
    workers: usize,
    step: F,
) -> EnvelopeReceiver<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(Envelope<T>) -> Option<Envelope<U>> + Send + Sync + 'static,
{
    let workers = workers.max(1);

    if workers == 1 {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let mut input = input;
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    item = input.recv() => item,
                };
                let Some(env) = next else { break };
                if let Some(out) = step(env)
                    && tx.send(out).await.is_err()
                {
                    break;
                }
            }
        });
        return rx;
    }

    let shared = SharedReceiver::new(input);
    let step = Arc::new(step);
    let outs: Vec<EnvelopeReceiver<U>> = (0..workers)
        .map(|_| {
            let shared = shared.clone();
            let token = token.clone();
            let step = step.clone();
            let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
            tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        item = shared.recv() => item,
                    };
                    let Some(env) = next else { break };
                    if let Some(out) = step(env)
                        && tx.send(out).await.is_err()
                    {
                        break;
                    }
                }
            });
            rx
        })
        .collect();
    fan_in(token, outs)
}

/// Apply `f` over `workers` parallel workers sharing the input. Output
/// order is non-deterministic when `workers > 1`. Every output envelope
/// that carries an error latches `meta.error_occurred()`.
pub fn map<T, U, F>(
    token: CancellationToken,
    meta: Arc<Meta>,
    input: EnvelopeReceiver<T>,
    workers: usize,
    f: F,
) -> EnvelopeReceiver<U>
where
    T: Send + 'static,
    U: Default + Send + 'static,
    F: Fn(&Meta, Envelope<T>) -> Envelope<U> + Send + Sync + 'static,
{
    spawn_stage(token, input, workers, move |env| {
        let out = match std::panic::catch_unwind(AssertUnwindSafe(|| f(&meta, env))) {
            Ok(out) => out,
            Err(payload) => {
                let message = panic_message(&*payload);
                error!(error = %message, "map transformer panicked");
                Envelope::<U>::failed(CoreError::Panic(message))
            }
        };
        if out.is_err() {
            meta.latch_error();
        }
        Some(out)
    })
}

/// Type-preserving alias of [`map`]; chains naturally on a [`crate::pipeline::Pipeline<T>`].
pub fn transform<T, F>(
    token: CancellationToken,
    meta: Arc<Meta>,
    input: EnvelopeReceiver<T>,
    workers: usize,
    f: F,
) -> EnvelopeReceiver<T>
where
    T: Default + Send + 'static,
    F: Fn(&Meta, Envelope<T>) -> Envelope<T> + Send + Sync + 'static,
{
    map(token, meta, input, workers, f)
}

/// Drop envelopes for which `predicate` returns `false`. The predicate may
/// inspect `env.err` but must be pure: it decides only whether to drop, it
/// never mutates shared state.
///
/// A panicking predicate does not cause a drop: the envelope is forwarded
/// unchanged except for a `Panic` error attached to it, since a worker that
/// crashed mid-decision cannot be trusted to have meant "drop".
pub fn filter<T, F>(
    token: CancellationToken,
    meta: Arc<Meta>,
    input: EnvelopeReceiver<T>,
    workers: usize,
    predicate: F,
) -> EnvelopeReceiver<T>
where
    T: Send + 'static,
    F: Fn(&Meta, &Envelope<T>) -> bool + Send + Sync + 'static,
{
    spawn_stage(token, input, workers, move |env| {
        match std::panic::catch_unwind(AssertUnwindSafe(|| predicate(&meta, &env))) {
            Ok(true) => Some(env),
            Ok(false) => None,
            Err(payload) => {
                let message = panic_message(&*payload);
                error!(error = %message, "filter predicate panicked");
                let mut env = env;
                env.err = Some(CoreError::Panic(message));
                meta.latch_error();
                Some(env)
            }
        }
    })
}

/// Call `observer` for every envelope, then forward it unchanged. Side
/// effects (logging, progress ticks) run before the envelope is forwarded.
/// A panicking observer attaches a `Panic` error to the envelope instead of
/// losing it.
pub fn tap<T, F>(
    token: CancellationToken,
    meta: Arc<Meta>,
    input: EnvelopeReceiver<T>,
    workers: usize,
    observer: F,
) -> EnvelopeReceiver<T>
where
    T: Send + 'static,
    F: Fn(&Meta, &Envelope<T>) + Send + Sync + 'static,
{
    spawn_stage(token, input, workers, move |env| {
        match std::panic::catch_unwind(AssertUnwindSafe(|| observer(&meta, &env))) {
            Ok(()) => Some(env),
            Err(payload) => {
                let message = panic_message(&*payload);
                error!(error = %message, "tap observer panicked");
                let mut env = env;
                env.err = Some(CoreError::Panic(message));
                meta.latch_error();
                Some(env)
            }
        }
    })
}
