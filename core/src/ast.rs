//! Tagged-variant AST.
//!
//! Grounded on the teacher's `Expr { id, span, tokens, kind: ExprKind }` shape (`analyzer/src/ast.rs`)
//! and on the original's `AstNode { pos, range }` base class plus its per-kind `Expr`/`Stmt`
//! subclasses (`MondX/AST.hpp`). Design note 9 replaces the original's class hierarchy and visitor
//! dispatch with a sum type per node category; a node's shared `pos`/`range` fields live on the
//! wrapper struct instead of being inherited.
//!
//! Children that parsing could not produce (a missing operand after a binary operator whose RHS
//! failed to parse, an unterminated slice, ...) are `None`/omitted rather than forcing the parser
//! to fabricate a placeholder node — Sema treats a missing child as simply nothing to visit.

use crate::span::{Pos, Range};
use crate::token::TokenType;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub pos: Pos,
    pub range: Range,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    NumberLiteral(f64),
    /// Decoded text. Escape-sequence decoding happens here (§4.4 point 6 / SPEC_FULL §2).
    StringLiteral(String),
    /// A literal-valued keyword (`global`, `null`, `undefined`, `true`, `false`, `NaN`, `Infinity`).
    SimpleLiteral(TokenType),
    ArrayLiteral(Vec<Expr>),
    ObjectLiteral(Vec<ObjectEntry>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    IndexAccess {
        target: Box<Expr>,
        index: Option<Box<Expr>>,
    },
    FieldAccess {
        target: Box<Expr>,
        name: String,
    },
    ArraySlice {
        target: Option<Box<Expr>>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    UnaryOp {
        op: TokenType,
        operand: Option<Box<Expr>>,
        post: bool,
    },
    BinaryOp {
        op: TokenType,
        left: Box<Expr>,
        right: Option<Box<Expr>>,
    },
    TernaryOp {
        cond: Box<Expr>,
        then_branch: Option<Box<Expr>>,
        else_branch: Option<Box<Expr>>,
    },
    Lambda {
        params: Vec<String>,
        varargs: bool,
        body: Option<Box<Stmt>>,
        sequence: bool,
    },
    Yield(Option<Box<Expr>>),
}

impl Expr {
    /// A "syntactic constant" per the glossary: a literal number, string, or simple-literal
    /// keyword, with no evaluation performed. Used by Sema's switch-case-value rule.
    pub fn is_syntactic_constant(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::NumberLiteral(_) | ExprKind::StringLiteral(_) | ExprKind::SimpleLiteral(_)
        )
    }

    /// A "storable expression": identifier, field access, or index access — the only forms that
    /// may appear on the left of a mutating operator.
    pub fn is_storable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Identifier(_) | ExprKind::FieldAccess { .. } | ExprKind::IndexAccess { .. }
        )
    }
}

/// One entry of an object literal: either a nested named function/sequence declaration parsed as
/// a method, or a key/expression pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEntry {
    Method(FunDecl),
    KeyValue {
        key: String,
        /// `None` for the key-only recovery form (identifier key, no `:` following).
        value: Option<Expr>,
        range: Range,
    },
}

/// The shared shape of a function/sequence declaration, used both as a statement
/// (`StmtKind::FunDecl`) and as an object-literal method entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub name: String,
    pub name_range: Range,
    pub params: Vec<String>,
    pub varargs: bool,
    pub body: Option<Box<Stmt>>,
    pub sequence: bool,
    pub pos: Pos,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub pos: Pos,
    pub range: Range,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    /// `break`/`continue`; `kind` is `KwBreak` or `KwContinue`.
    Control(TokenType),
    DoWhile {
        body: Option<Box<Stmt>>,
        cond: Option<Expr>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        steps: Vec<Expr>,
        body: Option<Box<Stmt>>,
    },
    Foreach {
        var_name: String,
        var_range: Range,
        iterable: Option<Expr>,
        body: Option<Box<Stmt>>,
    },
    FunDecl(FunDecl),
    IfElse {
        cond: Option<Expr>,
        then_branch: Option<Box<Stmt>>,
        else_branch: Option<Box<Stmt>>,
    },
    NakedExpr(Option<Expr>),
    Return(Option<Expr>),
    Switch {
        value: Option<Expr>,
        cases: Vec<SwitchCase>,
    },
    VarDecl {
        is_const: bool,
        bindings: Vec<VarBinding>,
    },
    While {
        cond: Option<Expr>,
        body: Option<Box<Stmt>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarBinding {
    pub name: String,
    pub name_range: Range,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub is_default: bool,
    pub value: Option<Expr>,
    pub head_range: Range,
    pub body: Vec<Stmt>,
}
