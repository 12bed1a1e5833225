//! The analyze pipeline: `Source(paths) -> Map(workers, analyzeFile) -> Tap(progress)`,
//! plus the handle-analysis-result policy that decides whether a run with
//! partial failures may proceed.

use std::path::PathBuf;
use std::sync::Arc;

use pipeline_common::{CancellationToken, Envelope, Meta, Pipeline, Progress, Stream, from_values, limits};
use tracing::debug;

use crate::approval::confirm_continue;
use crate::checksum::{FileChecksum, analyze_file};
use crate::error::{CliError, Result};

/// Build the analyze pipeline over `paths`. `workers` is clamped to at least
/// one and at most `paths.len()`, since spinning up more hashing workers
/// than there are files to hash buys nothing.
pub fn build_analyze_pipeline(
    paths: Vec<PathBuf>,
    workers: usize,
    progress: Arc<dyn Progress>,
) -> Pipeline<FileChecksum> {
    let workers = workers.clamp(1, paths.len().max(1));
    from_values(paths)
        .map(workers, |_meta: &Meta, env: Envelope<PathBuf>| {
            let requested_path = env.value.clone();
            match analyze_file(&env.value) {
                Ok(fc) => Envelope::ok(fc),
                // Keep the path that was requested (not FileChecksum::default's
                // empty one) so a failed envelope can still be logged usefully.
                Err(err) => Envelope::with_error(
                    FileChecksum {
                        path: requested_path,
                        checksum: String::new(),
                    },
                    err,
                ),
            }
        })
        .tap(limits::DEFAULT_SEQUENTIAL_WORKERS, move |_meta: &Meta, env: &Envelope<FileChecksum>| {
            if env.is_err() {
                debug!(path = %env.value.path.display(), "file analysis failed");
            } else {
                debug!(path = %env.value.path.display(), "file analyzed");
            }
            progress.tick();
        })
}

/// The drained result of an analyze run, kept split by outcome so the
/// handle-analysis-result policy can size its approval prompt. Unlike
/// [`pipeline_common::terminals::partition`], cancellation does not discard
/// what had already arrived — the policy needs those partial counts.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub successes: Vec<FileChecksum>,
    pub failures: Vec<Envelope<FileChecksum>>,
    pub cancelled: bool,
}

async fn drain_analysis(token: CancellationToken, stream: Stream<FileChecksum>) -> AnalysisReport {
    let mut rx = stream.data;
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    let mut cancelled = false;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                cancelled = true;
                break;
            }
            item = rx.recv() => match item {
                Some(env) if env.is_err() => failures.push(env),
                Some(env) => successes.push(env.value),
                None => break,
            },
        }
    }
    AnalysisReport { successes, failures, cancelled }
}

/// Run the analyze pipeline over `paths` and apply the handle-analysis-result
/// policy: a total failure is fatal, a partial failure needs approval (or
/// `assume_yes`), and cancellation is reported as such.
pub async fn analyze_with_policy(
    paths: Vec<PathBuf>,
    workers: usize,
    assume_yes: bool,
    token: CancellationToken,
) -> Result<AnalysisReport> {
    let total = paths.len();
    let progress = crate::progress::IndicatifProgress::new(total as u64);
    let pipeline = build_analyze_pipeline(paths, workers, progress.clone());
    let stream = pipeline.run(token.clone());
    let report = drain_analysis(token.clone(), stream).await;
    progress.finish();

    if report.cancelled {
        let completed = report.successes.len() + report.failures.len();
        debug!(completed, total, "analyze run cancelled before completion");
        return Err(CliError::Cancelled {
            completed,
            total,
            report: Box::new(report),
        });
    }
    if report.successes.is_empty() && !report.failures.is_empty() {
        return Err(CliError::NoSuccesses);
    }
    if !report.failures.is_empty() {
        let approved = confirm_continue(&token, report.failures.len(), total, assume_yes).await?;
        if !approved {
            return Err(CliError::Unapproved { failed: report.failures.len(), total });
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::IndicatifProgress;
    use std::io::Write;

    #[tokio::test]
    async fn analyze_two_readable_files_has_no_failures() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::File::create(&a).unwrap().write_all(b"hello").unwrap();
        std::fs::File::create(&b).unwrap();

        let token = CancellationToken::new();
        let report = analyze_with_policy(vec![a.clone(), b.clone()], 8, true, token)
            .await
            .unwrap();

        assert_eq!(report.successes.len(), 2);
        assert!(report.failures.is_empty());
        let checksums: Vec<&str> = report.successes.iter().map(|fc| fc.checksum.as_str()).collect();
        assert!(checksums.contains(&"2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"));
        assert!(checksums.contains(&"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"));
    }

    #[tokio::test]
    async fn analyze_with_missing_file_latches_error_and_proceeds_non_interactively() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        std::fs::File::create(&a).unwrap().write_all(b"hello").unwrap();
        let missing = dir.path().join("missing");

        let token = CancellationToken::new();
        let report = analyze_with_policy(vec![a, missing], 8, true, token).await.unwrap();

        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].err,
            Some(pipeline_common::CoreError::ReadFailure { .. })
        ));
    }

    #[tokio::test]
    async fn all_files_missing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let token = CancellationToken::new();
        let result = analyze_with_policy(vec![missing], 8, true, token).await;
        assert!(matches!(result, Err(CliError::NoSuccesses)));
    }

    #[tokio::test]
    async fn non_interactive_without_assume_yes_fails_on_partial_failure() {
        // stdin in a test harness is never an interactive TTY, so this
        // exercises the NonInteractiveStdin path without needing a pty.
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        std::fs::File::create(&a).unwrap().write_all(b"hello").unwrap();
        let missing = dir.path().join("missing");

        let token = CancellationToken::new();
        let result = analyze_with_policy(vec![a, missing], 8, false, token).await;
        assert!(matches!(result, Err(CliError::NonInteractiveStdin)));
    }

    #[tokio::test]
    async fn cancelling_before_the_run_surfaces_the_partial_report() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::File::create(&a).unwrap().write_all(b"hello").unwrap();
        std::fs::File::create(&b).unwrap().write_all(b"world").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let result = analyze_with_policy(vec![a, b], 2, true, token).await;

        match result {
            Err(CliError::Cancelled { completed, total, report }) => {
                assert_eq!(total, 2);
                assert_eq!(completed, report.successes.len() + report.failures.len());
                assert!(report.cancelled);
            }
            other => panic!("expected CliError::Cancelled, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn progress_ticks_once_per_file_including_failures() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        std::fs::File::create(&a).unwrap().write_all(b"x").unwrap();
        let missing = dir.path().join("missing");
        let progress = IndicatifProgress::new(2);

        let pipeline = build_analyze_pipeline(vec![a, missing], 2, progress.clone());
        let token = CancellationToken::new();
        let stream = pipeline.run(token.clone());
        let mut rx = stream.data;
        let mut count = 0;
        while rx.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
