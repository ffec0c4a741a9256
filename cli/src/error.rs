//! The one place this workspace uses `Result` instead of diagnostics: the CLI boundary's hard
//! failure conditions (`spec.md` §7 — unreadable input file, unreadable prelude file) plus usage
//! errors `clap` raises on its own before `main` ever runs.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("couldn't read source file {path}: {source}")]
    ReadSource { path: PathBuf, #[source] source: std::io::Error },

    #[error("couldn't read prelude file {path}: {source}")]
    ReadPrelude { path: PathBuf, #[source] source: std::io::Error },
}
