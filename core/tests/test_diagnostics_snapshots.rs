//! Snapshot-tests the rendered message text for a handful of representative diagnostics, mirroring
//! the teacher's `diagnostics_snapshots.rs`. Inline snapshots (`@"..."`) rather than a `tests/snapshots/`
//! fixture directory, since the expected text is short and self-documenting at the call site.

use insta::assert_snapshot;
use linter_core::{BorrowedSource, Diagnostics, parse};

fn messages_for(text: &str) -> String {
    let source = BorrowedSource::new(text);
    let mut diags = Vec::new();
    {
        let mut diag = Diagnostics::collecting(&mut diags);
        parse(&source, None, &mut diag);
    }
    diags
        .iter()
        .map(|d| format!("{}:{}: {:?}: {}", d.caret.line, d.caret.column, d.severity, d.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn yield_at_top_level() {
    assert_snapshot!(messages_for("yield 1;"), @"1:1: Error: yield can only be used in sequences");
}

#[test]
fn break_at_top_level() {
    assert_snapshot!(messages_for("break;"), @"1:1: Error: break can only be used in loops");
}

#[test]
fn switch_duplicate_default_and_non_constant_case() {
    // A switch body is a `Block` scope rather than a `Loop` one, so the bare `break` here is
    // flagged just like it would be outside any loop at all.
    assert_snapshot!(
        messages_for("switch (x) { case 1: case y: break; default: default: }"),
        @r"
    1:9: Error: undeclared identifier 'x'
    1:27: Error: undeclared identifier 'y'
    1:30: Error: break can only be used in loops
    1:27: Error: case value not a constant
    1:46: Error: duplicate default case, already defined at 1:37
    "
    );
}

#[test]
fn mutating_a_constant() {
    assert_snapshot!(
        messages_for("var x = 1; const y = 2; y = 3;"),
        @"1:26: Error: can't change constant 'y' declared at 1:18"
    );
}

#[test]
fn unnecessary_pointy_arrow_before_a_block_body_is_an_info() {
    assert_snapshot!(
        messages_for("fun f() -> { return 1; }"),
        @"1:9: Info: unnecessary '->'"
    );
}
