//! Worker-count defaults and caps, exposed as tunables rather than baked
//! into the operators themselves.

/// Default worker count for a type-changing or type-preserving `Map`/
/// `Transform` stage when the caller has no stronger opinion.
pub const DEFAULT_MAP_WORKERS: usize = 8;

/// `Filter` and `Tap` default to a single worker so that, by default, they
/// preserve input order.
pub const DEFAULT_SEQUENTIAL_WORKERS: usize = 1;

/// A soft upper bound on worker counts: `ceil(1.5 * available parallelism)`.
/// Callers are free to exceed it; this is advice, not a hard limit enforced
/// by the operators.
pub fn max_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus as f64 * 1.5).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_concurrency_is_at_least_one() {
        assert!(max_concurrency() >= 1);
    }
}
