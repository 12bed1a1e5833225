//! Glob expansion: turns the CLI's shell-style pattern argument into the
//! concrete path list the analyze pipeline is built from.

use std::path::PathBuf;

use crate::error::{CliError, Result};

pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|source| CliError::BadPattern { pattern: pattern.to_string(), source })?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();

    if paths.is_empty() {
        return Err(CliError::NoMatches { pattern: pattern.to_string() });
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn expands_matching_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("a.bin")).unwrap().write_all(b"x").unwrap();
        std::fs::File::create(dir.path().join("b.bin")).unwrap().write_all(b"y").unwrap();
        std::fs::create_dir(dir.path().join("sub.bin")).unwrap();

        let pattern = format!("{}/*.bin", dir.path().display());
        let mut paths = expand_pattern(&pattern).unwrap();
        paths.sort();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn no_matches_is_an_error() {
        let pattern = "/definitely/not/a/real/path/*.nope";
        assert!(matches!(expand_pattern(pattern), Err(CliError::NoMatches { .. })));
    }
}
