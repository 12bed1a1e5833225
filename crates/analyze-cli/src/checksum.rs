//! Per-file SHA-256 hashing, the unit of work behind `analyzeFile`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use pipeline_common::CoreError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const READ_CHUNK: usize = 64 * 1024;

/// `{path, checksum}` — the action layer's output entity. Zero-valued (empty
/// path, empty checksum) is the placeholder used when an envelope carries an
/// error instead of a real result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChecksum {
    pub path: PathBuf,
    pub checksum: String,
}

impl FileChecksum {
    pub fn is_empty(&self) -> bool {
        self.path.as_os_str().is_empty() || self.checksum.is_empty()
    }
}

/// Resolve `path` to an absolute path, open it, and hash its contents
/// incrementally. Never holds the whole file in memory.
pub fn analyze_file(path: &Path) -> Result<FileChecksum, CoreError> {
    let abs_path = std::path::absolute(path).map_err(|e| CoreError::ReadFailure {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut file = File::open(&abs_path).map_err(|e| CoreError::read_failure(abs_path.clone(), e))?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| CoreError::read_failure(abs_path.clone(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(FileChecksum {
        path: abs_path,
        checksum: hex::encode(hasher.finalize()),
    })
}

/// `true` iff `checksum` is exactly 64 lowercase hex characters.
pub fn is_valid_checksum(checksum: &str) -> bool {
    checksum.len() == 64 && checksum.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
