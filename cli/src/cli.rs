//! Argument parsing. `spec.md` §6 fixes the whole surface:
//!
//! ```text
//! linter [-f fancy|tool] [-b <prelude-file>] <source-file>
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Diagnostic renderer choice. `Tool` is the default — stable, one line per diagnostic, matches
/// the original's `DiagPrinterTool`. `Fancy` renders source-line context with a caret/tilde marker
/// and ANSI color, matching `DiagPrinterFancy`.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum Format {
    #[default]
    Tool,
    Fancy,
}

#[derive(Parser, Debug)]
#[command(name = "linter", bin_name = "linter", about = "Front-end linter for a small scripting language")]
pub struct Cli {
    /// Diagnostic renderer.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Tool)]
    pub format: Format,

    /// A prelude file defining built-in names, parsed first and loaded as the root scope's parent.
    #[arg(short = 'b', long = "builtins", value_name = "PRELUDE_FILE")]
    pub builtins: Option<PathBuf>,

    /// The file to lint.
    pub source: PathBuf,
}
