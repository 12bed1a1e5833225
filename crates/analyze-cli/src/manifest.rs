//! The manifest accumulator, its YAML wire format, and the file write/read
//! that backs the `manifest` verb and E2E round-trip checks.

use std::fs;
use std::path::{Path, PathBuf};

use pipeline_common::{CancellationToken, PipelineError, Stream, terminals};
use serde::{Deserialize, Serialize};

use crate::checksum::{FileChecksum, is_valid_checksum};
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub checksum: String,
}

impl Manifest {
    fn push(&mut self, fc: FileChecksum) {
        self.files.push(ManifestEntry {
            path: fc.path,
            checksum: fc.checksum,
        });
    }
}

/// Fold an already-analyzed stream of successes into a [`Manifest`], the
/// same terminal-reduce step the core's `Reduce` is built for. Envelopes
/// whose `FileChecksum` is still zero/empty (an analysis failure that
/// reached this far) are dropped rather than written.
pub async fn reduce_into_manifest(
    token: CancellationToken,
    stream: Stream<FileChecksum>,
) -> std::result::Result<Manifest, PipelineError> {
    terminals::reduce(token, stream, Manifest::default(), |mut acc, env| {
        if !env.value.is_empty() {
            acc.push(env.value);
        }
        acc
    })
    .await
}

/// Write `manifest` as YAML in a single call, mode 0644, truncating any
/// existing file. No partial writes: the whole document is serialised to a
/// string first.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    let yaml = serde_yaml::to_string(manifest)?;
    write_atomic(path, yaml.as_bytes())
        .map_err(|source| CliError::ManifestWrite { path: path.to_path_buf(), source })
}

#[cfg(unix)]
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(path, bytes)
}

/// Read and validate a manifest file. Rejects any entry whose checksum is
/// not exactly 64 lowercase hex characters.
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let contents = fs::read_to_string(path)
        .map_err(|source| CliError::ManifestRead { path: path.to_path_buf(), source })?;
    let manifest: Manifest = serde_yaml::from_str(&contents)?;
    for entry in &manifest.files {
        if !is_valid_checksum(&entry.checksum) {
            return Err(CliError::InvalidChecksum(entry.checksum.clone()));
        }
    }
    Ok(manifest)
}
