//! Semantic analysis: a lexical scope tree, declaration bookkeeping, and the closed set of
//! static rules from §4.6.
//!
//! Grounded on the original's `Sema.hpp`/`Sema.cpp`: `Scope`/`Decl` records, `PushScope`/
//! `PopScope`, `Declare`, the `Visit` overloads (collapsed here into two dispatchers,
//! `visit_expr`/`visit_stmt`, since the tagged-variant AST design (note 9) replaces the visitor
//! base class), `IsInSeq`/`IsInLoop`, `CheckMutable`, and `FindDecl` (unified into `resolve`, per
//! SPEC_FULL §2). The parser calls these directly as it finishes building each node — the same
//! "hand the node to Sema right after construction" order the original uses, so scope-entry and
//! declaration order match the original's interleaved parse/analyze pass exactly.
//!
//! The built-in prelude scope (if any) is a second, independently-owned [`ScopeArena`] built by a
//! prior linter run over the prelude file; [`Sema`] only ever borrows it, walking outward into it
//! once the main file's own scope chain is exhausted.

use std::collections::HashMap;

use tracing::debug;

use crate::ast;
use crate::diagnostics::{Diagnostics, MessageId};
use crate::span::Range;
use crate::token::TokenType;

pub type ScopeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Block,
    Loop,
    Function,
    Sequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Variable,
    Constant,
    Function,
    Sequence,
    Argument,
}

/// A recorded declaration. The original also stores a back-pointer to the declaring AST node;
/// nothing in this implementation ever dereferences it (resolution only needs `kind`/`range`), so
/// it is dropped rather than threaded through as dead weight — see DESIGN.md.
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub range: Range,
}

struct ScopeNode {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    decls: HashMap<String, Decl>,
}

/// An owned scope tree. Used both as the main file's working tree (inside [`Sema`]) and,
/// standalone, as the finished tree of a prelude run that a later `Sema` borrows as its builtin
/// ancestor.
pub struct ScopeArena {
    nodes: Vec<ScopeNode>,
}

impl ScopeArena {
    fn new() -> Self {
        ScopeArena {
            nodes: vec![ScopeNode { kind: ScopeKind::Block, parent: None, decls: HashMap::new() }],
        }
    }

    pub const ROOT: ScopeId = 0;

    fn push(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        self.nodes.push(ScopeNode { kind, parent: Some(parent), decls: HashMap::new() });
        self.nodes.len() - 1
    }
}

/// Which arena a scope walk is currently in: the tree being built for the file under analysis, or
/// the borrowed builtin tree once the walk has crossed out of it.
#[derive(Clone, Copy)]
enum ScopeLoc {
    Own(ScopeId),
    Builtin(ScopeId),
}

pub struct Sema<'b> {
    arena: ScopeArena,
    current: ScopeId,
    builtin: Option<&'b ScopeArena>,
}

impl<'b> Sema<'b> {
    pub fn new(builtin: Option<&'b ScopeArena>) -> Self {
        Sema { arena: ScopeArena::new(), current: ScopeArena::ROOT, builtin }
    }

    /// Finish this run's scope tree so it can later be borrowed as another run's builtin scope
    /// (the `-b` prelude pipeline — §6).
    pub fn into_scope_arena(self) -> ScopeArena {
        self.arena
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        let new = self.arena.push(kind, self.current);
        debug!(?kind, scope = new, "push_scope");
        self.current = new;
    }

    pub fn pop_scope(&mut self) {
        let parent = self.arena.nodes[self.current]
            .parent
            .expect("pop_scope called on the root scope — unbalanced push/pop");
        debug!(scope = self.current, "pop_scope");
        self.current = parent;
    }

    /// Record a declaration of `name` in the current scope, first walking outward to check for a
    /// re-declaration. The original's two-message split (builtin vs. user scope) collapses into
    /// the single `SemaAlreadyDeclared` id already in the closed table, which always cites a
    /// location — see DESIGN.md.
    pub fn declare(&mut self, kind: DeclKind, range: Range, name: &str, diag: &mut Diagnostics) {
        let mut loc = Some(ScopeLoc::Own(self.current));
        while let Some(here) = loc {
            if let Some(prior) = self.decls_at(here).get(name) {
                debug!(name, "declare: re-declaration");
                diag.emit(
                    range,
                    MessageId::SemaAlreadyDeclared,
                    vec![name.into(), prior.range.beg.line.into(), prior.range.beg.column.into()],
                );
                break;
            }
            loc = self.parent_of(here);
        }

        debug!(name, ?kind, "declare");
        self.arena.nodes[self.current].decls.insert(name.to_string(), Decl { kind, range });
    }

    /// Look up `name` along the scope chain, including the builtin ancestor.
    pub fn resolve(&self, name: &str) -> Option<Decl> {
        let mut loc = Some(ScopeLoc::Own(self.current));
        while let Some(here) = loc {
            if let Some(decl) = self.decls_at(here).get(name) {
                return Some(decl.clone());
            }
            loc = self.parent_of(here);
        }
        None
    }

    pub fn in_sequence(&self) -> bool {
        let mut loc = Some(ScopeLoc::Own(self.current));
        while let Some(here) = loc {
            match self.kind_of(here) {
                ScopeKind::Function => return false,
                ScopeKind::Sequence => return true,
                _ => {}
            }
            loc = self.parent_of(here);
        }
        false
    }

    pub fn in_loop(&self) -> bool {
        let mut loc = Some(ScopeLoc::Own(self.current));
        while let Some(here) = loc {
            match self.kind_of(here) {
                ScopeKind::Loop => return true,
                ScopeKind::Function | ScopeKind::Sequence => return false,
                _ => {}
            }
            loc = self.parent_of(here);
        }
        false
    }

    /// `ExprId`: undeclared-identifier check.
    pub fn visit_identifier(&mut self, name: &str, range: Range, diag: &mut Diagnostics) {
        if self.resolve(name).is_none() {
            diag.emit(range, MessageId::SemaUndeclaredId, vec![name.into()]);
        }
    }

    /// `ExprYield`.
    pub fn visit_yield(&mut self, range: Range, diag: &mut Diagnostics) {
        if !self.in_sequence() {
            diag.emit(range, MessageId::SemaYieldNotInSequence, vec![]);
        }
    }

    /// `StmtControl` (`break`/`continue`).
    pub fn visit_control(&mut self, kind: TokenType, range: Range, diag: &mut Diagnostics) {
        if !self.in_loop() {
            let word = if kind == TokenType::KwBreak { "break" } else { "continue" };
            diag.emit(range, MessageId::SemaLoopControlNotInLoop, vec![word.into()]);
        }
    }

    /// `ExprBinaryOp`/`ExprUnaryOp` with a mutating operator: checks the target is storable and,
    /// if it's an identifier, not a constant.
    pub fn check_mutable(&mut self, target: &ast::Expr, diag: &mut Diagnostics) {
        if !target.is_storable() {
            diag.emit(target.range, MessageId::SemaExprNotStorable, vec![]);
            return;
        }

        if let ast::ExprKind::Identifier(name) = &target.kind {
            if let Some(decl) = self.resolve(name) {
                if decl.kind == DeclKind::Constant {
                    diag.emit(
                        target.range,
                        MessageId::SemaMutatingConstant,
                        vec![name.clone().into(), decl.range.beg.line.into(), decl.range.beg.column.into()],
                    );
                }
            }
        }
    }

    /// `StmtSwitch`: duplicate-`default` and non-constant-case-value checks, in case order.
    /// Duplicate non-default case *values* are a declared TODO in the original and are not
    /// enforced here either (spec.md §4.6).
    pub fn visit_switch(&mut self, cases: &[ast::SwitchCase], diag: &mut Diagnostics) {
        let mut default_head: Option<Range> = None;

        for case in cases {
            if case.is_default {
                if let Some(first) = default_head {
                    diag.emit(
                        case.head_range,
                        MessageId::SemaDuplicateDefaultCase,
                        vec![first.beg.line.into(), first.beg.column.into()],
                    );
                } else {
                    default_head = Some(case.head_range);
                }
            } else if let Some(value) = &case.value {
                if !value.is_syntactic_constant() {
                    diag.emit(value.range, MessageId::SemaCaseValueNotConstant, vec![]);
                }
            }
        }
    }

    fn kind_of(&self, loc: ScopeLoc) -> ScopeKind {
        match loc {
            ScopeLoc::Own(id) => self.arena.nodes[id].kind,
            ScopeLoc::Builtin(id) => self.builtin.expect("builtin scope location without a builtin arena").nodes[id].kind,
        }
    }

    fn decls_at(&self, loc: ScopeLoc) -> &HashMap<String, Decl> {
        match loc {
            ScopeLoc::Own(id) => &self.arena.nodes[id].decls,
            ScopeLoc::Builtin(id) => &self.builtin.expect("builtin scope location without a builtin arena").nodes[id].decls,
        }
    }

    /// The next scope outward, crossing from the file's own tree into the borrowed builtin tree
    /// at the own-root's implicit parent — mirroring the original's `m_root->parent =
    /// builtinScope.get()` wiring.
    fn parent_of(&self, loc: ScopeLoc) -> Option<ScopeLoc> {
        match loc {
            ScopeLoc::Own(id) => match self.arena.nodes[id].parent {
                Some(p) => Some(ScopeLoc::Own(p)),
                None => self.builtin.map(|_| ScopeLoc::Builtin(ScopeArena::ROOT)),
            },
            ScopeLoc::Builtin(id) => {
                let builtin = self.builtin.expect("builtin scope location without a builtin arena");
                builtin.nodes[id].parent.map(ScopeLoc::Builtin)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Pos;

    fn r(line: i32) -> Range {
        Range::cols(Pos::new(line, 1), 1)
    }

    #[test]
    fn resolve_finds_outer_declaration() {
        let mut sema = Sema::new(None);
        let mut out = Vec::new();
        let mut diag = Diagnostics::collecting(&mut out);
        sema.declare(DeclKind::Variable, r(1), "x", &mut diag);
        sema.push_scope(ScopeKind::Block);
        assert!(sema.resolve("x").is_some());
        sema.pop_scope();
        assert!(out.is_empty());
    }

    #[test]
    fn redeclaration_in_same_scope_emits_diagnostic() {
        let mut sema = Sema::new(None);
        let mut out = Vec::new();
        let mut diag = Diagnostics::collecting(&mut out);
        sema.declare(DeclKind::Variable, r(1), "x", &mut diag);
        sema.declare(DeclKind::Variable, r(2), "x", &mut diag);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message_id, MessageId::SemaAlreadyDeclared);
    }

    #[test]
    fn builtin_scope_is_visible_from_main_file_root() {
        let mut builtin_sema = Sema::new(None);
        let mut out = Vec::new();
        let mut diag = Diagnostics::collecting(&mut out);
        builtin_sema.declare(DeclKind::Function, r(1), "print", &mut diag);
        let builtin_arena = builtin_sema.into_scope_arena();

        let mut sema = Sema::new(Some(&builtin_arena));
        assert!(sema.resolve("print").is_some());
        assert!(sema.resolve("nope").is_none());
    }

    #[test]
    fn loop_and_sequence_classification_stops_at_function_boundary() {
        let mut sema = Sema::new(None);
        sema.push_scope(ScopeKind::Loop);
        assert!(sema.in_loop());
        sema.push_scope(ScopeKind::Function);
        assert!(!sema.in_loop());
        assert!(!sema.in_sequence());
        sema.pop_scope();
        sema.pop_scope();
    }

    #[test]
    fn mutating_constant_cites_declaration_site() {
        let mut sema = Sema::new(None);
        let mut out = Vec::new();
        let mut diag = Diagnostics::collecting(&mut out);
        sema.declare(DeclKind::Constant, r(3), "y", &mut diag);
        let target = ast::Expr {
            pos: Pos::new(5, 1),
            range: r(5),
            kind: ast::ExprKind::Identifier("y".to_string()),
        };
        sema.check_mutable(&target, &mut diag);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message_id, MessageId::SemaMutatingConstant);
    }
}
