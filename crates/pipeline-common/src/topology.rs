//! Channel-of-envelope combinators.
//!
//! These are the primitives the rest of the crate is built from: a finite
//! source, a cancellation guard, work-stealing fan-out/fan-in, a fair tee,
//! and sequential stream-of-streams concatenation. Every spawned worker
//! below terminates on cancellation OR its input closing, whichever comes
//! first, and owns the only `Sender` clone that matters for its output, so
//! closing falls out of normal drop semantics rather than manual bookkeeping.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::envelope::Envelope;

/// Default bound on channels between stages. Matches the pipeline's default
/// worker-pool sizing order of magnitude; large enough to absorb a burst
/// without the producer blocking on every single send.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

pub type EnvelopeReceiver<T> = mpsc::Receiver<Envelope<T>>;
pub type EnvelopeSender<T> = mpsc::Sender<Envelope<T>>;

/// A receiver shared by multiple work-stealing workers.
///
/// `recv` briefly locks the inner mutex to pull the next item, then releases
/// it before the caller processes the value, so slow processing in one
/// worker never blocks the others from claiming the next envelope.
pub struct SharedReceiver<T>(Arc<Mutex<EnvelopeReceiver<T>>>);

impl<T> SharedReceiver<T> {
    pub fn new(rx: EnvelopeReceiver<T>) -> Self {
        Self(Arc::new(Mutex::new(rx)))
    }

    pub async fn recv(&self) -> Option<Envelope<T>> {
        self.0.lock().await.recv().await
    }
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Produce a finite envelope stream from a fixed sequence of values.
///
/// Emission stops early if `token` is cancelled; the output channel is
/// always closed once the source is exhausted or cancellation is observed.
pub fn source<T: Send + 'static>(token: CancellationToken, values: Vec<T>) -> EnvelopeReceiver<T> {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        for (index, value) in values.into_iter().enumerate() {
            let env = Envelope::ok(value);
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(emitted = index, "source cancelled before exhausting input");
                    break;
                }
                res = tx.send(env) => if res.is_err() { break },
            }
        }
    });
    rx
}

/// Wrap `input` so cancelling `token` closes the output promptly even if
/// `input` itself never closes.
pub fn or_done<T: Send + 'static>(
    token: CancellationToken,
    mut input: EnvelopeReceiver<T>,
) -> EnvelopeReceiver<T> {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                item = input.recv() => item,
            };
            match next {
                Some(env) => {
                    if tx.send(env).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    });
    rx
}

/// Apply `transform` over `workers` work-stealing tasks sharing `input`,
/// returning one output stream per worker. Pair with [`fan_in`] to merge
/// them back into a single stream. `workers == 0` is promoted to 1.
pub fn fan_out<T, U, F>(
    token: CancellationToken,
    input: SharedReceiver<T>,
    workers: usize,
    transform: F,
) -> Vec<EnvelopeReceiver<U>>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(Envelope<T>) -> Envelope<U> + Send + Sync + 'static,
{
    let workers = workers.max(1);
    let transform = Arc::new(transform);
    (0..workers)
        .map(|_| {
            let input = input.clone();
            let token = token.clone();
            let transform = transform.clone();
            let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
            tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            debug!("fan_out worker cancelled");
                            break;
                        }
                        item = input.recv() => item,
                    };
                    let Some(env) = next else { break };
                    let out = transform(env);
                    if tx.send(out).await.is_err() {
                        break;
                    }
                }
            });
            rx
        })
        .collect()
}

/// Merge any number of streams into one. Ordering is non-deterministic. The
/// merged output closes once every input has closed, or promptly on
/// cancellation.
pub fn fan_in<T: Send + 'static>(
    token: CancellationToken,
    receivers: Vec<EnvelopeReceiver<T>>,
) -> EnvelopeReceiver<T> {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    for mut input in receivers {
        let tx = tx.clone();
        let token = token.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    item = input.recv() => item,
                };
                match next {
                    Some(env) => {
                        if tx.send(env).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        });
    }
    // Drop our own clone: the channel stays open exactly as long as the
    // spawned forwarding tasks hold a sender, i.e. until every input has
    // closed.
    drop(tx);
    rx
}

/// Duplicate every envelope to exactly two consumers, sending to whichever
/// branch is ready first and then to the other, before reading the next
/// envelope. Neither branch can starve the other of envelopes it already
/// has a sent obligation for.
pub fn tee<T: Clone + Send + 'static>(
    token: CancellationToken,
    mut input: EnvelopeReceiver<T>,
) -> (EnvelopeReceiver<T>, EnvelopeReceiver<T>) {
    let (tx1, rx1) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let (tx2, rx2) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("tee cancelled");
                    break;
                }
                item = input.recv() => item,
            };
            let Some(env) = next else { break };

            let mut sent_to_1 = false;
            let mut sent_to_2 = false;
            while !(sent_to_1 && sent_to_2) {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("tee cancelled mid-send");
                        return;
                    }
                    res = tx1.send(env.clone()), if !sent_to_1 => {
                        if res.is_err() { return; }
                        sent_to_1 = true;
                    }
                    res = tx2.send(env.clone()), if !sent_to_2 => {
                        if res.is_err() { return; }
                        sent_to_2 = true;
                    }
                }
            }
        }
    });
    (rx1, rx2)
}

/// Sequentially concatenate a stream of streams into one.
pub fn bridge<T: Send + 'static>(
    token: CancellationToken,
    mut streams: mpsc::Receiver<EnvelopeReceiver<T>>,
) -> EnvelopeReceiver<T> {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        'outer: loop {
            let next_stream = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                s = streams.recv() => s,
            };
            let Some(mut stream) = next_stream else {
                break;
            };
            loop {
                let item = tokio::select! {
                    biased;
                    _ = token.cancelled() => break 'outer,
                    item = stream.recv() => item,
                };
                match item {
                    Some(env) => {
                        if tx.send(env).await.is_err() {
                            break 'outer;
                        }
                    }
                    None => break,
                }
            }
        }
    });
    rx
}
