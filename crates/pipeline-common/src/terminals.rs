//! Terminal reducers: the only place a `Pipeline` description is actually
//! drained. Every terminal shares the same cancellation contract — if
//! `token` is cancelled while it runs, it returns `Err(PipelineError::Cancelled)`
//! within the time it takes to observe one blocked channel receive, never
//! longer.

use crate::cancellation::CancellationToken;
use crate::envelope::Envelope;
use crate::error::PipelineError;
use crate::pipeline::Stream;

/// Consume and discard every envelope.
pub async fn drain<T: Send + 'static>(
    token: CancellationToken,
    stream: Stream<T>,
) -> Result<(), PipelineError> {
    let mut rx = stream.data;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            item = rx.recv() => match item {
                Some(_) => {}
                None => return Ok(()),
            },
        }
    }
}

/// Gather up to `cap` envelopes, stopping early once reached.
pub async fn collect<T: Send + 'static>(
    token: CancellationToken,
    stream: Stream<T>,
    cap: usize,
) -> Result<Vec<Envelope<T>>, PipelineError> {
    let mut rx = stream.data;
    let mut out = Vec::with_capacity(cap.min(1024));
    while out.len() < cap {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            item = rx.recv() => match item {
                Some(env) => out.push(env),
                None => break,
            },
        }
    }
    Ok(out)
}

/// Sequentially fold the stream. The reducer is called from a single task,
/// so it needs no internal locking.
pub async fn reduce<T, Acc, F>(
    token: CancellationToken,
    stream: Stream<T>,
    initial: Acc,
    mut reducer: F,
) -> Result<Acc, PipelineError>
where
    T: Send + 'static,
    F: FnMut(Acc, Envelope<T>) -> Acc,
{
    let mut rx = stream.data;
    let mut acc = initial;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            item = rx.recv() => match item {
                Some(env) => acc = reducer(acc, env),
                None => return Ok(acc),
            },
        }
    }
}

/// Drain the stream into two vectors, keyed on `env.err.is_none()`. Order
/// within each vector is the order of arrival.
pub async fn partition<T: Send + 'static>(
    token: CancellationToken,
    stream: Stream<T>,
) -> Result<(Vec<Envelope<T>>, Vec<Envelope<T>>), PipelineError> {
    let mut rx = stream.data;
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            item = rx.recv() => match item {
                Some(env) => {
                    if env.is_err() {
                        failures.push(env);
                    } else {
                        successes.push(env);
                    }
                }
                None => return Ok((successes, failures)),
            },
        }
    }
}

/// Call `consumer` per envelope, aborting on its first error.
pub async fn sink<T, F>(
    token: CancellationToken,
    stream: Stream<T>,
    mut consumer: F,
) -> Result<(), PipelineError>
where
    T: Send + 'static,
    F: FnMut(Envelope<T>) -> Result<(), PipelineError>,
{
    let mut rx = stream.data;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            item = rx.recv() => match item {
                Some(env) => consumer(env)?,
                None => return Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::from_values;
    use std::time::Duration;

    #[tokio::test]
    async fn reduce_rebuilds_source_order_single_worker() {
        let pipeline = from_values(vec![1, 2, 3, 4]);
        let token = CancellationToken::new();
        let stream = pipeline.run(token.clone());
        let result = reduce(token, stream, Vec::new(), |mut acc, env| {
            acc.push(env.value);
            acc
        })
        .await
        .unwrap();
        assert_eq!(result, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn partition_splits_on_error_presence() {
        let pipeline = from_values(vec![1, 2, 3]).map(1, |_, env| {
            if env.value == 2 {
                crate::envelope::Envelope::with_error(
                    env.value,
                    crate::error::CoreError::Validation("bad".into()),
                )
            } else {
                crate::envelope::Envelope::ok(env.value)
            }
        });
        let token = CancellationToken::new();
        let stream = pipeline.run(token.clone());
        let (successes, failures) = partition(token, stream).await.unwrap();
        assert_eq!(successes.len(), 2);
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn empty_source_terminals_return_ok() {
        let pipeline: crate::pipeline::Pipeline<i32> = from_values(vec![]);
        let token = CancellationToken::new();
        assert!(drain(token.clone(), pipeline.run(token)).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancellation_makes_drain_return_promptly() {
        crate::test_utils::init_tracing();
        let pipeline = from_values((0..1_000_000).collect()).transform(4, |_, env| {
            // Emulates per-element work heavy enough that cancellation must
            // be observed between elements, not just between stages.
            std::thread::sleep(Duration::from_millis(10));
            env
        });
        let token = CancellationToken::new();
        let stream = pipeline.run(token.clone());

        let token2 = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token2.cancel();
        });

        let start = std::time::Instant::now();
        let result = drain(token, stream).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn sink_aborts_on_first_consumer_error() {
        let pipeline = from_values(vec![1, 2, 3]);
        let token = CancellationToken::new();
        let stream = pipeline.run(token.clone());
        let mut seen = Vec::new();
        let result = sink(token, stream, |env| {
            if env.value == 2 {
                return Err(PipelineError::ChannelClosed("stop"));
            }
            seen.push(env.value);
            Ok(())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(seen, vec![1]);
    }
}
