use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "analyze", version, about = "File checksum analysis and manifest generation")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Answer "yes" to any approval prompt instead of asking interactively.
    #[arg(long, global = true)]
    pub assume_yes: bool,

    /// Hashing worker count (default: min(8, number of matched files)).
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Deadline for the whole run, in seconds (default: 1800 for `load`, 60
    /// for `manifest`).
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Emit debug-level logs.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze every file matched by a glob pattern and print its checksum.
    Load {
        /// Shell-style glob, e.g. "data/**/*.bin".
        pattern: String,
    },
    /// Analyze every file matched by a glob pattern and write a YAML manifest.
    Manifest {
        /// Shell-style glob, e.g. "data/**/*.bin".
        pattern: String,
        /// Manifest output path; its parent directory must already exist.
        outfile: PathBuf,
    },
}
