//! Black-box parser tests: the children-within-parent range invariant, switch/slice/lambda
//! disambiguation on slightly larger programs than the in-module unit tests use, and error
//! recovery producing a usable (if partial) AST.

use linter_core::ast::{Expr, ExprKind, Stmt, StmtKind};
use linter_core::span::Range;
use linter_core::{BorrowedSource, Diagnostics, parse};

fn parse_str(text: &str) -> (Vec<Stmt>, Vec<linter_core::Diag>) {
    let source = BorrowedSource::new(text);
    let mut diags = Vec::new();
    let out = {
        let mut diag = Diagnostics::collecting(&mut diags);
        parse(&source, None, &mut diag)
    };
    (out.stmts, diags)
}

fn contains(outer: Range, inner: Range) -> bool {
    outer.beg <= inner.beg && inner.end <= outer.end
}

fn check_expr(e: &Expr) {
    match &e.kind {
        ExprKind::Identifier(_)
        | ExprKind::NumberLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::SimpleLiteral(_) => {}
        ExprKind::ArrayLiteral(items) => {
            for it in items {
                assert!(contains(e.range, it.range));
                check_expr(it);
            }
        }
        ExprKind::ObjectLiteral(entries) => {
            for entry in entries {
                if let linter_core::ast::ObjectEntry::KeyValue { range, value, .. } = entry {
                    assert!(contains(e.range, *range));
                    if let Some(v) = value {
                        check_expr(v);
                    }
                }
            }
        }
        ExprKind::Call { callee, args } => {
            assert!(contains(e.range, callee.range));
            check_expr(callee);
            for a in args {
                assert!(contains(e.range, a.range));
                check_expr(a);
            }
        }
        ExprKind::IndexAccess { target, index } => {
            assert!(contains(e.range, target.range));
            check_expr(target);
            if let Some(i) = index {
                assert!(contains(e.range, i.range));
                check_expr(i);
            }
        }
        ExprKind::FieldAccess { target, .. } => {
            assert!(contains(e.range, target.range));
            check_expr(target);
        }
        ExprKind::ArraySlice { target, start, end, step } => {
            for child in [target.as_deref(), start.as_deref(), end.as_deref(), step.as_deref()].into_iter().flatten() {
                assert!(contains(e.range, child.range));
                check_expr(child);
            }
        }
        ExprKind::UnaryOp { operand, .. } => {
            if let Some(o) = operand {
                assert!(contains(e.range, o.range));
                check_expr(o);
            }
        }
        ExprKind::BinaryOp { left, right, .. } => {
            assert!(contains(e.range, left.range));
            check_expr(left);
            if let Some(r) = right {
                assert!(contains(e.range, r.range));
                check_expr(r);
            }
        }
        ExprKind::TernaryOp { cond, then_branch, else_branch } => {
            assert!(contains(e.range, cond.range));
            check_expr(cond);
            for child in [then_branch.as_deref(), else_branch.as_deref()].into_iter().flatten() {
                assert!(contains(e.range, child.range));
                check_expr(child);
            }
        }
        ExprKind::Lambda { body, .. } => {
            if let Some(b) = body {
                assert!(contains(e.range, b.range));
                check_stmt(b);
            }
        }
        ExprKind::Yield(value) => {
            if let Some(v) = value {
                assert!(contains(e.range, v.range));
                check_expr(v);
            }
        }
    }
}

fn check_stmt(s: &Stmt) {
    match &s.kind {
        StmtKind::Block(stmts) => {
            for c in stmts {
                assert!(contains(s.range, c.range));
                check_stmt(c);
            }
        }
        StmtKind::Control(_) => {}
        StmtKind::DoWhile { body, cond } => {
            if let Some(b) = body {
                assert!(contains(s.range, b.range));
                check_stmt(b);
            }
            if let Some(c) = cond {
                check_expr(c);
            }
        }
        StmtKind::For { init, cond, steps, body } => {
            if let Some(i) = init {
                check_stmt(i);
            }
            if let Some(c) = cond {
                check_expr(c);
            }
            for s in steps {
                check_expr(s);
            }
            if let Some(b) = body {
                assert!(contains(s.range, b.range));
                check_stmt(b);
            }
        }
        StmtKind::Foreach { iterable, body, .. } => {
            if let Some(i) = iterable {
                check_expr(i);
            }
            if let Some(b) = body {
                assert!(contains(s.range, b.range));
                check_stmt(b);
            }
        }
        StmtKind::FunDecl(decl) => {
            if let Some(b) = &decl.body {
                check_stmt(b);
            }
        }
        StmtKind::IfElse { cond, then_branch, else_branch } => {
            if let Some(c) = cond {
                check_expr(c);
            }
            for b in [then_branch.as_deref(), else_branch.as_deref()].into_iter().flatten() {
                assert!(contains(s.range, b.range));
                check_stmt(b);
            }
        }
        StmtKind::NakedExpr(e) => {
            if let Some(e) = e {
                assert!(contains(s.range, e.range));
                check_expr(e);
            }
        }
        StmtKind::Return(v) => {
            if let Some(v) = v {
                check_expr(v);
            }
        }
        StmtKind::Switch { value, cases } => {
            if let Some(v) = value {
                check_expr(v);
            }
            for case in cases {
                if let Some(v) = &case.value {
                    check_expr(v);
                }
                for c in &case.body {
                    check_stmt(c);
                }
            }
        }
        StmtKind::VarDecl { bindings, .. } => {
            for b in bindings {
                if let Some(init) = &b.init {
                    check_expr(init);
                }
            }
        }
        StmtKind::While { cond, body } => {
            if let Some(c) = cond {
                check_expr(c);
            }
            if let Some(b) = body {
                assert!(contains(s.range, b.range));
                check_stmt(b);
            }
        }
    }
}

#[test]
fn children_are_within_parent_ranges_across_a_larger_program() {
    let text = r#"
        var xs = [1, 2, 3];
        fun sum(...args) {
            var total = 0;
            foreach (var x in args) {
                total += x;
            }
            return total;
        }
        seq evens(n) {
            for (var i = 0; i < n; i += 1) {
                if (i % 2 == 0) {
                    yield i;
                }
            }
        }
        var obj = { a: 1, b: xs[0:2], c: sum(1, 2, 3) };
        while (obj.a > 0) {
            switch (obj.a) {
                case 1:
                    break;
                default:
                    break;
            }
            obj.a -= 1;
        }
    "#;
    let (stmts, diags) = parse_str(text);
    assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    for s in &stmts {
        check_stmt(s);
    }
}

#[test]
fn unterminated_object_literal_recovers_with_a_usable_partial_ast() {
    let (stmts, diags) = parse_str("var o = { a: 1, b: 2");
    assert!(diags.iter().any(|d| d.message_id == linter_core::MessageId::ParseUnterminatedObjectLiteral));
    assert_eq!(stmts.len(), 1);
}

#[test]
fn stray_closing_brace_is_reported_and_skipped() {
    let (stmts, diags) = parse_str("var x = 1; } var y = 2;");
    assert!(diags.iter().any(|d| d.message_id == linter_core::MessageId::ParseMismatchedToken));
    assert_eq!(stmts.len(), 2);
}

#[test]
fn list_comprehension_like_colon_form_is_treated_as_a_slice_expression() {
    // `spec.md` §8 scenario 6 flags this as a historical list-comprehension production that isn't
    // required; the colon-after-first-expression rule still has to parse *something* sensible
    // instead of desyncing, which here is an array slice on the bracketed expression.
    let (stmts, diags) = parse_str("var xs = [1, 2]; var x = 0; xs[x : x * 2];");
    assert!(diags.is_empty(), "{diags:?}");
    match &stmts[2].kind {
        StmtKind::NakedExpr(Some(Expr { kind: ExprKind::ArraySlice { .. }, .. })) => {}
        other => panic!("expected array slice, got {other:?}"),
    }
}
