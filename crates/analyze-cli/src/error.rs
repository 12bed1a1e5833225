use std::path::PathBuf;

use pipeline_common::{CoreError, PipelineError};

use crate::analyze::AnalysisReport;

/// Errors surfaced at the CLI boundary. Wraps the core error taxonomy and
/// adds the failure modes specific to the analyze/manifest actions.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no files matched pattern {pattern:?}")]
    NoMatches { pattern: String },

    /// The run was cancelled (or its deadline elapsed) before every file was
    /// analyzed. `report` carries whatever was completed so far, per the
    /// "return partial results alongside the cancellation" policy.
    #[error("cancelled after analyzing {completed} of {total} files")]
    Cancelled {
        completed: usize,
        total: usize,
        report: Box<AnalysisReport>,
    },

    #[error("failed to analyze {failed} out of {total} files")]
    Unapproved { failed: usize, total: usize },

    #[error("no files were successfully analyzed")]
    NoSuccesses,

    #[error("approval is required but standard input is not an interactive terminal")]
    NonInteractiveStdin,

    #[error("failed to write manifest to {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read manifest from {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest is not valid YAML: {0}")]
    ManifestFormat(#[from] serde_yaml::Error),

    #[error("manifest entry has an invalid checksum: {0:?}")]
    InvalidChecksum(String),

    #[error("glob pattern {pattern:?} is invalid: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, CliError>;
