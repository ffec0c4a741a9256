//! `linter_core`: lexer, parser, AST, and semantic analyzer for a small dynamically-typed
//! scripting language, producing a stream of structured diagnostics.
//!
//! The crate has no knowledge of files, terminals, or process exit codes — its public surface is
//! [`lex`]/[`parse`] fed by an in-memory [`Source`], plus the [`Diag`]/[`Severity`] types a caller
//! renders however it likes. File I/O, argument parsing, and diagnostic rendering are left to the
//! CLI that sits on top of this crate (`spec.md` §1).

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod sema;
pub mod source;
pub mod span;
pub mod token;

pub use diagnostics::{Arg, Diag, DiagSink, Diagnostics, MessageId, Severity};
pub use parser::{ParseOutput, Parser, parse};
pub use sema::{ScopeArena, ScopeKind, Sema};
pub use source::{BorrowedSource, OwnedSource, Source};
pub use span::{Pos, Range, Slice};
pub use token::{Token, TokenType};

/// Lex `source` to completion, collecting every token (including EOF) and every diagnostic the
/// lexer itself emits. A thin convenience wrapper for callers (tests, the `-f` dump paths a future
/// CLI subcommand might want) that only need the token stream, not a parse.
pub fn lex(source: &dyn Source, diag: &mut Diagnostics) -> Vec<Token> {
    let mut lexer = lexer::Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next(diag);
        let eof = tok.kind == TokenType::Eof;
        tokens.push(tok);
        if eof {
            break;
        }
    }
    tokens
}
