//! Structured diagnostics: a closed table of message ids with fixed formats, and a builder that
//! interpolates arguments into them.
//!
//! Grounded on the teacher's `diagnostics.rs` (a `Diagnostics` accumulator plus a `Diagnostic`
//! record) and on the original's `DiagBuilder`/`DiagMessage` pair. Design note 9 in the
//! specification recommends replacing the original's operator-chained fluent builder with a
//! single typed `emit(severity, range, id, args...)` call taking a small argument-kind enum —
//! that is what [`Diagnostics::emit`] does here, validated against the format string's specifiers
//! at push time rather than accumulated one `<<` at a time.

use crate::span::{Pos, Range};
use crate::token::{TokenType, token_type_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Closed set of diagnostic message ids, one per distinct static message in the linter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    LexUnexpectedCharacter,
    LexCrMustBeFollowedByLf,
    LexInvalidNumberLiteral,
    LexUnterminatedBlockComment,
    LexUnterminatedStringLiteral,

    ParseExpectedExpr,
    ParseExpectedStmt,
    ParseExpectedSwitchCase,
    ParseExpectedObjectEntry,
    ParseMismatchedToken,
    ParseExpectedTokenGotOther,
    ParseConstNotInitialized,
    ParseUnnecessaryPointyInFun,
    ParseUnterminatedArrayLiteral,
    ParseUnterminatedObjectLiteral,
    ParseUnterminatedFunctionCall,
    ParseUnterminatedArraySlice,

    SemaUndeclaredId,
    SemaAlreadyDeclared,
    SemaYieldNotInSequence,
    SemaLoopControlNotInLoop,
    SemaCaseValueNotConstant,
    SemaDuplicateDefaultCase,
    SemaExprNotStorable,
    SemaMutatingConstant,
}

impl MessageId {
    /// The fixed, per-id severity hint from the specification's message table.
    pub fn default_severity(self) -> Severity {
        match self {
            MessageId::ParseUnnecessaryPointyInFun => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// The fixed format string for this id. `%c`/`%t`/`%s`/`%d` are positional specifiers,
    /// consumed left to right by the [`Arg`]s passed to [`Diagnostics::emit`].
    fn format(self) -> &'static str {
        use MessageId::*;
        match self {
            LexUnexpectedCharacter => "unexpected character '%c'",
            LexCrMustBeFollowedByLf => "carriage return must be followed by line feed",
            LexInvalidNumberLiteral => "invalid number literal",
            LexUnterminatedBlockComment => "unterminated block comment",
            LexUnterminatedStringLiteral => "unterminated string literal",

            ParseExpectedExpr => "expected expression",
            ParseExpectedStmt => "expected statement",
            ParseExpectedSwitchCase => "expected switch case",
            ParseExpectedObjectEntry => "expected object entry",
            ParseMismatchedToken => "mismatched '%t'",
            ParseExpectedTokenGotOther => "expected '%t', got '%t'",
            ParseConstNotInitialized => "constant not initialized",
            ParseUnnecessaryPointyInFun => "unnecessary '->'",
            ParseUnterminatedArrayLiteral => "unterminated array literal",
            ParseUnterminatedObjectLiteral => "unterminated object literal",
            ParseUnterminatedFunctionCall => "unterminated function call",
            ParseUnterminatedArraySlice => "unterminated array slice",

            SemaUndeclaredId => "undeclared identifier '%s'",
            SemaAlreadyDeclared => "'%s' already declared at %d:%d",
            SemaYieldNotInSequence => "yield can only be used in sequences",
            SemaLoopControlNotInLoop => "%s can only be used in loops",
            SemaCaseValueNotConstant => "case value not a constant",
            SemaDuplicateDefaultCase => "duplicate default case, already defined at %d:%d",
            SemaExprNotStorable => "expression not storable",
            SemaMutatingConstant => "can't change constant '%s' declared at %d:%d",
        }
    }
}

/// One formatting argument. The kind must match the next unconsumed `%x` specifier in the
/// message's format string; a mismatch (wrong kind, or too few/many arguments) is a programmer
/// error and panics, per the specification's error-handling design (§7, condition ii).
#[derive(Debug, Clone)]
pub enum Arg {
    Codepoint(u32),
    Token(TokenType),
    Str(String),
    Int(i32),
}

impl From<u32> for Arg {
    fn from(c: u32) -> Self {
        Arg::Codepoint(c)
    }
}
impl From<TokenType> for Arg {
    fn from(t: TokenType) -> Self {
        Arg::Token(t)
    }
}
impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_string())
    }
}
impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}
impl From<i32> for Arg {
    fn from(n: i32) -> Self {
        Arg::Int(n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diag {
    pub caret: Pos,
    pub range: Range,
    pub severity: Severity,
    pub message_id: MessageId,
    pub message: String,
}

/// A caller-supplied sink that receives one fully-formatted [`Diag`] per emission, in source
/// order. Per the specification's concurrency model (§5), the sink must not be called
/// re-entrantly from within a format step — callers only ever see this invoked from
/// [`Diagnostics::emit`], never nested inside itself.
pub type DiagSink<'a> = Box<dyn FnMut(Diag) + 'a>;

/// Accumulates (or forwards) diagnostics built from the closed [`MessageId`] table.
pub struct Diagnostics<'a> {
    sink: DiagSink<'a>,
}

impl<'a> Diagnostics<'a> {
    pub fn new(sink: impl FnMut(Diag) + 'a) -> Self {
        Diagnostics { sink: Box::new(sink) }
    }

    /// Collects diagnostics into a `Vec` instead of forwarding them live.
    pub fn collecting(out: &'a mut Vec<Diag>) -> Self {
        Diagnostics::new(move |d| out.push(d))
    }

    /// Emit a diagnostic at `range`, with `caret` defaulting to `range.beg`.
    pub fn emit(&mut self, range: Range, id: MessageId, args: Vec<Arg>) {
        self.emit_at(range.beg, range, id, args);
    }

    /// Emit a diagnostic with an explicit caret distinct from `range.beg`.
    pub fn emit_at(&mut self, caret: Pos, range: Range, id: MessageId, args: Vec<Arg>) {
        let message = format_message(id, &args);
        let diag = Diag {
            caret,
            range,
            severity: id.default_severity(),
            message_id: id,
            message,
        };
        (self.sink)(diag);
    }
}

/// Render `id`'s format string, consuming one `Arg` per specifier in order.
///
/// Panics (a programmer error, per §7) if an argument's kind doesn't match the specifier it is
/// bound to, or if the argument count doesn't match the specifier count exactly.
fn format_message(id: MessageId, args: &[Arg]) -> String {
    let fmt = id.format();
    let mut out = String::with_capacity(fmt.len() + 8);
    let mut chars = fmt.chars().peekable();
    let mut args = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let spec = chars
            .next()
            .unwrap_or_else(|| panic!("invalid diagnostic format string for {id:?}"));
        let arg = args
            .next()
            .unwrap_or_else(|| panic!("missing diagnostic argument for {id:?}'s '%{spec}'"));
        match (spec, arg) {
            ('c', Arg::Codepoint(c)) => out.push_str(&render_codepoint(*c)),
            ('t', Arg::Token(t)) => out.push_str(token_type_name(*t)),
            ('s', Arg::Str(s)) => out.push_str(s),
            ('d', Arg::Int(n)) => out.push_str(&n.to_string()),
            (spec, arg) => panic!(
                "diagnostic argument {arg:?} does not match format specifier '%{spec}' for {id:?}"
            ),
        }
    }

    if args.next().is_some() {
        panic!("too many diagnostic arguments for {id:?}");
    }

    out
}

fn render_codepoint(c: u32) -> String {
    match char::from_u32(c) {
        Some(ch) if !ch.is_control() => ch.to_string(),
        _ => format!("<0x{c:02X}>"),
    }
}
