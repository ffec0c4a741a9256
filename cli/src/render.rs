//! The two reference diagnostic sinks `spec.md` §6 describes as external collaborators: `tool`
//! (one stable, machine-parsable line per diagnostic) and `fancy` (colorized source-line context
//! with a caret/tilde marker). Grounded on the original's `DiagPrinterTool.cpp` and
//! `DiagPrinterFancyCore.cpp`/`DiagPrinterFancyUnix.cpp` — this implementation folds the original's
//! platform-split `SetColor`/`ResetColor` (`DiagPrinterFancyUnix.cpp` vs. `DiagPrinterFancyWin32.cpp`)
//! into one portable renderer via the `colored` crate, since ANSI escapes are what ships on every
//! target this workspace cares about.

use colored::{Color, Colorize};

use linter_core::{Diag, Severity, Source};

fn severity_name(s: Severity) -> &'static str {
    match s {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

fn severity_color(s: Severity) -> Color {
    match s {
        Severity::Info => Color::BrightCyan,
        Severity::Warning => Color::BrightYellow,
        Severity::Error => Color::BrightRed,
    }
}

/// `[line:column: ] [l:c-l:c: ] severity: message`, one line, no color. Stable and
/// machine-parsable — `caret`/`range` each print only when valid.
pub fn render_tool(d: &Diag) -> String {
    let mut out = String::new();
    if d.caret.is_valid() {
        out.push_str(&format!("{}:{}: ", d.caret.line, d.caret.column));
    }
    if d.range.is_valid() {
        out.push_str(&format!(
            "{}:{}-{}:{}: ",
            d.range.beg.line, d.range.beg.column, d.range.end.line, d.range.end.column
        ));
    }
    out.push_str(&format!("{}: {}", severity_name(d.severity), d.message));
    out
}

/// A header line (severity, position, message) followed by the source line(s) the diagnostic's
/// range covers, each with a caret/tilde marker line underneath. Multi-line ranges render only
/// their first and last source lines, headed "starting at line N with:" / "ending at line N with:".
pub fn render_fancy(d: &Diag, source: &dyn Source) -> String {
    let mut out = String::new();
    let color = severity_color(d.severity);
    out.push_str(&format!("[{}] ", severity_name(d.severity).color(color).bold()));

    if d.caret.is_valid() {
        out.push_str(&format!("{}:{}", d.caret.line, d.caret.column));
    }
    if d.range.is_valid() && d.caret.is_valid() {
        out.push_str(&format!(
            " ({}:{} to {}:{})",
            d.range.beg.line, d.range.beg.column, d.range.end.line, d.range.end.column
        ));
    }
    if d.range.is_valid() && !d.caret.is_valid() {
        out.push_str(&format!(
            "{}:{} to {}:{}",
            d.range.beg.line, d.range.beg.column, d.range.end.line, d.range.end.column
        ));
    }
    out.push_str(&format!(": {}\n", d.message));

    let range = if d.range.is_valid() {
        d.range
    } else if d.caret.is_valid() {
        linter_core::Range::cols(d.caret, 1)
    } else {
        out.pop();
        return out;
    };

    for line in range.beg.line..=range.end.line {
        let multi_line = range.end.line - range.beg.line > 1;
        if multi_line {
            if line == range.beg.line {
                out.push_str(&format!("[{}] starting at line {} with:\n", severity_name(d.severity).color(color).bold(), line));
            } else if line == range.end.line {
                out.push_str(&format!("[{}] ending at line {} with:\n", severity_name(d.severity).color(color).bold(), line));
            } else {
                continue;
            }
        }

        let line_text = source.get_line(line);
        let beg_col = if line == range.beg.line { range.beg.column } else { 1 };
        let end_col = if line == range.end.line { range.end.column } else { line_text.chars().count() as i32 + 1 };

        let width = line_text.chars().count() + 1;
        let mut marker: Vec<char> = vec![' '; width];
        for (j, slot) in marker.iter_mut().enumerate() {
            let col = j as i32 + 1;
            if d.caret.is_valid() && d.caret.line == line && col == d.caret.column {
                *slot = '^';
            } else if col >= beg_col && col < end_col {
                *slot = '~';
            }
        }
        let marker: String = marker.into_iter().collect();

        out.push_str(&format!("[{}] >>> {}\n", severity_name(d.severity).color(color).bold(), line_text));
        out.push_str(&format!("[{}] >>> {}\n", severity_name(d.severity).color(color).bold(), marker.color(color)));
    }

    out
}
