//! The token table: a closed enumeration of token kinds plus the classification/precedence
//! contracts the lexer and parser build on.
//!
//! Grounded on the original's `Token.hpp`/`Token.cpp` (an X-macro-driven enum with name/precedence
//! tables) and `OperatorUtil.hpp`/`OperatorUtil.cpp` (the `OperatorLookup1`/`OperatorLookupN`
//! trie). The X-macro table is replaced here by plain `match` functions — the idiomatic shape for
//! a trie this size that is fixed at build time, per design note 9 in the specification.

use std::fmt;

use crate::span::{Range, Slice};

/// `Token { type, range, slice }` — the lexer's unit of output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenType,
    pub range: Range,
    pub slice: Slice,
}

/// Closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Eof,
    Unknown,
    Whitespace,
    LineComment,
    BlockComment,

    Identifier,
    NumberLiteral,
    StringLiteral,

    // Simple-literal keywords (literal-valued).
    KwGlobal,
    KwNull,
    KwUndefined,
    KwTrue,
    KwFalse,
    KwNaN,
    KwInfinity,

    // Structural keywords.
    KwIf,
    KwElse,
    KwDo,
    KwWhile,
    KwFor,
    KwForeach,
    KwIn,
    KwNotIn,
    KwBreak,
    KwContinue,
    KwReturn,
    KwVar,
    KwConst,
    KwFun,
    KwSeq,
    KwYield,
    KwSwitch,
    KwCase,
    KwDefault,

    // Punctuation.
    Colon,
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Assignment family.
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,

    // Arithmetic / bitwise / shift.
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    // Comparison.
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    NotEq,

    // Logical.
    AmpAmp,
    PipePipe,
    Bang,

    // Ternary, member access, misc.
    Question,
    Dot,
    Arrow,
    Ellipsis,
    PlusPlus,
    MinusMinus,
    Pipeline,
}

/// `classify_identifier(text) -> TokenType`: the keyword kind if `text` is a keyword, else the
/// generic identifier kind.
pub fn classify_identifier(text: &str) -> TokenType {
    use TokenType::*;
    match text {
        "global" => KwGlobal,
        "null" => KwNull,
        "undefined" => KwUndefined,
        "true" => KwTrue,
        "false" => KwFalse,
        "NaN" => KwNaN,
        "Infinity" => KwInfinity,

        "if" => KwIf,
        "else" => KwElse,
        "do" => KwDo,
        "while" => KwWhile,
        "for" => KwFor,
        "foreach" => KwForeach,
        "in" => KwIn,
        "notin" => KwNotIn,
        "break" => KwBreak,
        "continue" => KwContinue,
        "return" => KwReturn,
        "var" => KwVar,
        "const" => KwConst,
        "fun" => KwFun,
        "seq" => KwSeq,
        "yield" => KwYield,
        "switch" => KwSwitch,
        "case" => KwCase,
        "default" => KwDefault,

        _ => Identifier,
    }
}

/// `token_type_name(TokenType) -> string`: the canonical textual form, used both for `%t`
/// diagnostic interpolation and (by the token table's own callers) debugging output.
pub fn token_type_name(kind: TokenType) -> &'static str {
    use TokenType::*;
    match kind {
        Eof => "<eof>",
        Unknown => "<unknown>",
        Whitespace => "<whitespace>",
        LineComment => "<line comment>",
        BlockComment => "<block comment>",

        Identifier => "<identifier>",
        NumberLiteral => "<number>",
        StringLiteral => "<string>",

        KwGlobal => "global",
        KwNull => "null",
        KwUndefined => "undefined",
        KwTrue => "true",
        KwFalse => "false",
        KwNaN => "NaN",
        KwInfinity => "Infinity",

        KwIf => "if",
        KwElse => "else",
        KwDo => "do",
        KwWhile => "while",
        KwFor => "for",
        KwForeach => "foreach",
        KwIn => "in",
        KwNotIn => "notin",
        KwBreak => "break",
        KwContinue => "continue",
        KwReturn => "return",
        KwVar => "var",
        KwConst => "const",
        KwFun => "fun",
        KwSeq => "seq",
        KwYield => "yield",
        KwSwitch => "switch",
        KwCase => "case",
        KwDefault => "default",

        Colon => ":",
        Semicolon => ";",
        Comma => ",",
        LParen => "(",
        RParen => ")",
        LBrace => "{",
        RBrace => "}",
        LBracket => "[",
        RBracket => "]",

        Assign => "=",
        PlusAssign => "+=",
        MinusAssign => "-=",
        StarAssign => "*=",
        SlashAssign => "/=",
        PercentAssign => "%=",
        AmpAssign => "&=",
        PipeAssign => "|=",
        CaretAssign => "^=",
        ShlAssign => "<<=",
        ShrAssign => ">>=",

        Plus => "+",
        Minus => "-",
        Star => "*",
        Slash => "/",
        Percent => "%",
        Amp => "&",
        Pipe => "|",
        Caret => "^",
        Tilde => "~",
        Shl => "<<",
        Shr => ">>",

        Lt => "<",
        Gt => ">",
        Le => "<=",
        Ge => ">=",
        EqEq => "==",
        NotEq => "!=",

        AmpAmp => "&&",
        PipePipe => "||",
        Bang => "!",

        Question => "?",
        Dot => ".",
        Arrow => "->",
        Ellipsis => "...",
        PlusPlus => "++",
        MinusMinus => "--",
        Pipeline => "|>",
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(token_type_name(*self))
    }
}

/// `operator_lookup_first(codepoint) -> optional TokenType`: the operator kind for a
/// one-character start. Ellipsis is handled separately by the lexer (a three-byte lookahead on
/// `.`), since it is the one operator spelling the two-function trie can't express without an
/// unobservable intermediate state; everything else is a straight single-char-to-kind mapping.
pub fn operator_lookup_first(c: u32) -> Option<TokenType> {
    use TokenType::*;
    let c = char::from_u32(c)?;
    Some(match c {
        '=' => Assign,
        '!' => Bang,
        '<' => Lt,
        '>' => Gt,
        '+' => Plus,
        '-' => Minus,
        '*' => Star,
        '/' => Slash,
        '%' => Percent,
        '&' => Amp,
        '|' => Pipe,
        '^' => Caret,
        '~' => Tilde,
        '?' => Question,
        '.' => Dot,
        _ => return None,
    })
}

/// `operator_lookup_continue(current_kind, codepoint) -> optional TokenType`: extends a
/// partially-recognized operator by one character. Iteration using this and
/// [`operator_lookup_first`] implements a trie over operator spellings; when it returns `None`
/// the longest match has already been found.
pub fn operator_lookup_continue(current: TokenType, c: u32) -> Option<TokenType> {
    use TokenType::*;
    let c = char::from_u32(c)?;
    Some(match (current, c) {
        (Assign, '=') => EqEq,
        (Bang, '=') => NotEq,
        (Lt, '=') => Le,
        (Lt, '<') => Shl,
        (Shl, '=') => ShlAssign,
        (Gt, '=') => Ge,
        (Gt, '>') => Shr,
        (Shr, '=') => ShrAssign,
        (Plus, '=') => PlusAssign,
        (Plus, '+') => PlusPlus,
        (Minus, '=') => MinusAssign,
        (Minus, '-') => MinusMinus,
        (Minus, '>') => Arrow,
        (Star, '=') => StarAssign,
        (Slash, '=') => SlashAssign,
        (Percent, '=') => PercentAssign,
        (Amp, '=') => AmpAssign,
        (Amp, '&') => AmpAmp,
        (Pipe, '=') => PipeAssign,
        (Pipe, '|') => PipePipe,
        (Pipe, '>') => Pipeline,
        (Caret, '=') => CaretAssign,
        _ => return None,
    })
}

/// Is `kind` a valid prefix (unary, pre-position) operator?
pub fn is_prefix_operator(kind: TokenType) -> bool {
    use TokenType::*;
    matches!(kind, Minus | Tilde | Bang | PlusPlus | MinusMinus | Ellipsis)
}

/// Is `kind` a valid infix binary operator?
pub fn is_binary_operator(kind: TokenType) -> bool {
    use TokenType::*;
    matches!(
        kind,
        Assign
            | PlusAssign
            | MinusAssign
            | StarAssign
            | SlashAssign
            | PercentAssign
            | AmpAssign
            | PipeAssign
            | CaretAssign
            | ShlAssign
            | ShrAssign
            | PipePipe
            | AmpAmp
            | EqEq
            | NotEq
            | Lt
            | Gt
            | Le
            | Ge
            | Pipe
            | Caret
            | Amp
            | Shl
            | Shr
            | Plus
            | Minus
            | Star
            | Slash
            | Percent
            | Pipeline
    )
}

/// Is `kind` a valid postfix (post-position) operator?
pub fn is_postfix_operator(kind: TokenType) -> bool {
    matches!(kind, TokenType::PlusPlus | TokenType::MinusMinus)
}

/// Does applying `kind` mutate its operand (assignment family, plus increment/decrement)?
pub fn is_mutating_operator(kind: TokenType) -> bool {
    use TokenType::*;
    matches!(
        kind,
        Assign
            | PlusAssign
            | MinusAssign
            | StarAssign
            | SlashAssign
            | PercentAssign
            | AmpAssign
            | PipeAssign
            | CaretAssign
            | ShlAssign
            | ShrAssign
            | PlusPlus
            | MinusMinus
    )
}

/// Closed, strictly ordered precedence classes. Declaration order is significant: derived
/// `Ord`/`PartialOrd` implement the specification's `Invalid < Assign < Ternary < ConditionalOr <
/// ConditionalAnd < Equality < Relational < BitOr < BitXor < BitAnd < BitShift < Addition <
/// Multiplication < Misc` chain directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Invalid,
    Assign,
    Ternary,
    ConditionalOr,
    ConditionalAnd,
    Equality,
    Relational,
    BitOr,
    BitXor,
    BitAnd,
    BitShift,
    Addition,
    Multiplication,
    Misc,
}

/// `operator_precedence(TokenType) -> Precedence`. Total over every `TokenType`; non-operator
/// kinds and operators that never participate in precedence-climbing binary parsing (prefix-only,
/// postfix-only) resolve to `Precedence::Invalid`, which also serves as precedence climbing's
/// "stop, this isn't an operator at all" sentinel.
pub fn operator_precedence(kind: TokenType) -> Precedence {
    use TokenType::*;
    match kind {
        Assign | PlusAssign | MinusAssign | StarAssign | SlashAssign | PercentAssign
        | AmpAssign | PipeAssign | CaretAssign | ShlAssign | ShrAssign => Precedence::Assign,
        Question => Precedence::Ternary,
        PipePipe => Precedence::ConditionalOr,
        AmpAmp => Precedence::ConditionalAnd,
        EqEq | NotEq => Precedence::Equality,
        Lt | Gt | Le | Ge => Precedence::Relational,
        Pipe => Precedence::BitOr,
        Caret => Precedence::BitXor,
        Amp => Precedence::BitAnd,
        Shl | Shr => Precedence::BitShift,
        Plus | Minus => Precedence::Addition,
        Star | Slash | Percent => Precedence::Multiplication,
        Pipeline => Precedence::Misc,
        _ => Precedence::Invalid,
    }
}
