//! The lazy, fluent pipeline builder.
//!
//! A `Pipeline<T>` is, true to the design, nothing but a description: a
//! `Fn(CancellationToken) -> Stream<T>` stored behind an `Arc`. Building one
//! with [`from_values`] or chaining `.map()`/`.filter()`/`.tap()` never
//! spawns a task; only [`Pipeline::run`] — or one of the terminals in
//! [`crate::terminals`], which calls it for you — materialises the channel
//! graph. Because the description is an `Arc<dyn Fn>` rather than an
//! `Arc<dyn FnOnce>`, the same `Pipeline` value can be run more than once;
//! each run builds an independent graph sharing no channels with the last.

use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::envelope::Envelope;
use crate::meta::Meta;
use crate::operators;
use crate::topology::{self, EnvelopeReceiver};

/// The materialised output of [`Pipeline::run`]: the envelope channel paired
/// with the `Meta` shared across every stage derived from the same source.
pub struct Stream<T> {
    pub data: EnvelopeReceiver<T>,
    pub meta: Arc<Meta>,
}

type BuildFn<T> = dyn Fn(CancellationToken) -> Stream<T> + Send + Sync;

/// A lazy description of a chain of stages over `T`.
pub struct Pipeline<T> {
    inner: Arc<BuildFn<T>>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Pipeline {
            inner: self.inner.clone(),
        }
    }
}

/// Build a pipeline from a fixed, owned sequence of values. `values.len()`
/// becomes `Meta::origin_total_items`.
///
/// `T: Clone` is required so the same `Pipeline` can be re-run: each call to
/// `run` needs its own copy of the original values to hand to a fresh
/// `source` task.
pub fn from_values<T>(values: Vec<T>) -> Pipeline<T>
where
    T: Clone + Send + 'static,
{
    let values = Arc::new(values);
    Pipeline {
        inner: Arc::new(move |token: CancellationToken| {
            let values = (*values).clone();
            let meta = Arc::new(Meta::new(values.len()));
            let data = topology::source(token, values);
            Stream { data, meta }
        }),
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Apply `f` with `workers` parallel workers, producing a `Pipeline<U>`.
    /// See [`operators::map`] for the ordering and error-latching contract.
    pub fn map<U, F>(self, workers: usize, f: F) -> Pipeline<U>
    where
        U: Default + Send + 'static,
        F: Fn(&Meta, Envelope<T>) -> Envelope<U> + Send + Sync + 'static,
    {
        let prev = self.inner;
        let f = Arc::new(f);
        Pipeline {
            inner: Arc::new(move |token: CancellationToken| {
                let Stream { data, meta } = prev(token.clone());
                let f = f.clone();
                let data = operators::map(token, meta.clone(), data, workers, move |m, env| {
                    f(m, env)
                });
                Stream { data, meta }
            }),
        }
    }

    /// Drop envelopes for which `predicate` returns `false`. See
    /// [`operators::filter`].
    pub fn filter<F>(self, workers: usize, predicate: F) -> Pipeline<T>
    where
        F: Fn(&Meta, &Envelope<T>) -> bool + Send + Sync + 'static,
    {
        let prev = self.inner;
        let predicate = Arc::new(predicate);
        Pipeline {
            inner: Arc::new(move |token: CancellationToken| {
                let Stream { data, meta } = prev(token.clone());
                let predicate = predicate.clone();
                let data = operators::filter(token, meta.clone(), data, workers, move |m, env| {
                    predicate(m, env)
                });
                Stream { data, meta }
            }),
        }
    }

    /// Call `observer` for every envelope and forward it unchanged. See
    /// [`operators::tap`].
    pub fn tap<F>(self, workers: usize, observer: F) -> Pipeline<T>
    where
        F: Fn(&Meta, &Envelope<T>) + Send + Sync + 'static,
    {
        let prev = self.inner;
        let observer = Arc::new(observer);
        Pipeline {
            inner: Arc::new(move |token: CancellationToken| {
                let Stream { data, meta } = prev(token.clone());
                let observer = observer.clone();
                let data = operators::tap(token, meta.clone(), data, workers, move |m, env| {
                    observer(m, env)
                });
                Stream { data, meta }
            }),
        }
    }

    /// Insert an `or_done` guard so cancellation closes this stage's output
    /// promptly even if the upstream never closes on its own. Idempotent in
    /// effect: stacking it more than once cannot change what is observed
    /// downstream, since every guard watches the same token.
    pub fn until_done(self) -> Pipeline<T> {
        let prev = self.inner;
        Pipeline {
            inner: Arc::new(move |token: CancellationToken| {
                let Stream { data, meta } = prev(token.clone());
                let data = topology::or_done(token, data);
                Stream { data, meta }
            }),
        }
    }
}

impl<T: Default + Send + 'static> Pipeline<T> {
    /// Type-preserving alias of [`Pipeline::map`]; reads naturally when a
    /// stage does not change `T`.
    pub fn transform<F>(self, workers: usize, f: F) -> Pipeline<T>
    where
        F: Fn(&Meta, Envelope<T>) -> Envelope<T> + Send + Sync + 'static,
    {
        self.map(workers, f)
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Materialise the description into a live `Stream`. Each call spawns a
    /// fresh, independent graph of tasks.
    pub fn run(&self, token: CancellationToken) -> Stream<T> {
        (self.inner)(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::drain_all;

    #[tokio::test]
    async fn empty_source_closes_immediately() {
        let pipeline: Pipeline<i32> = from_values(vec![]);
        let stream = pipeline.run(CancellationToken::new());
        let out = drain_all(stream.data).await;
        assert!(out.is_empty());
        assert_eq!(stream.meta.origin_total_items(), 0);
    }

    #[tokio::test]
    async fn filter_then_map_matches_expected_order() {
        let pipeline = from_values((0..100).collect())
            .filter(1, |_, env| env.value % 2 == 1)
            .map(1, |_, env| env.map_value(|v| v * v));
        let stream = pipeline.run(CancellationToken::new());
        let values: Vec<i32> = drain_all(stream.data)
            .await
            .into_iter()
            .map(|e| e.value)
            .collect();
        let expected: Vec<i32> = (0..100).filter(|v| v % 2 == 1).map(|v| v * v).collect();
        assert_eq!(values, expected);
    }

    #[tokio::test]
    async fn pipeline_can_be_run_more_than_once() {
        let pipeline = from_values(vec![1, 2, 3]).map(1, |_, env| env.map_value(|v| v + 1));
        let first = drain_all(pipeline.run(CancellationToken::new()).data).await;
        let second = drain_all(pipeline.run(CancellationToken::new()).data).await;
        let fv: Vec<i32> = first.into_iter().map(|e| e.value).collect();
        let sv: Vec<i32> = second.into_iter().map(|e| e.value).collect();
        assert_eq!(fv, vec![2, 3, 4]);
        assert_eq!(fv, sv);
    }

    #[tokio::test]
    async fn until_done_is_idempotent_in_effect() {
        let once = from_values(vec![1, 2, 3]).until_done();
        let twice = from_values(vec![1, 2, 3]).until_done().until_done();
        let a = drain_all(once.run(CancellationToken::new()).data).await;
        let b = drain_all(twice.run(CancellationToken::new()).data).await;
        let av: Vec<i32> = a.into_iter().map(|e| e.value).collect();
        let bv: Vec<i32> = b.into_iter().map(|e| e.value).collect();
        assert_eq!(av, bv);
    }
}
