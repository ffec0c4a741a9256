//! Black-box lexer tests exercising the token-stream invariants from `spec.md` §8, independent of
//! the in-module unit tests in `src/lexer.rs`.

use linter_core::{BorrowedSource, Diagnostics, Source, TokenType, lex};

fn lex_all(text: &str) -> (Vec<linter_core::Token>, Vec<linter_core::Diag>) {
    let source = BorrowedSource::new(text);
    let mut diags = Vec::new();
    let tokens = {
        let mut diag = Diagnostics::collecting(&mut diags);
        lex(&source, &mut diag)
    };
    (tokens, diags)
}

#[test]
fn token_slices_cover_the_source_with_no_gaps_or_overlaps() {
    let text = "fun add(a, b) -> a + b;\nvar r = add(1, 2);\n";
    let source = BorrowedSource::new(text);
    let (tokens, _) = lex_all(text);

    let mut cursor = 0u32;
    for tok in &tokens {
        if tok.kind == TokenType::Eof {
            continue;
        }
        assert_eq!(tok.slice.beg, cursor, "gap or overlap before {tok:?}");
        cursor = tok.slice.end;
        assert_eq!(source.get_slice(tok.slice).len() as u32, tok.slice.len());
    }
    assert_eq!(cursor as usize, text.len());
}

#[test]
fn every_token_range_respects_line_ordering() {
    let (tokens, _) = lex_all("var x = 1;\nvar y = 2;\n");
    for tok in &tokens {
        assert!(tok.range.beg.line <= tok.range.end.line);
    }
}

#[test]
fn crlf_and_bare_cr_both_advance_exactly_one_line() {
    let (tokens, diags) = lex_all("var a;\r\nvar b;\rvar c;\n");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message_id, linter_core::MessageId::LexCrMustBeFollowedByLf);

    let ident_lines: Vec<i32> = tokens
        .iter()
        .filter(|t| t.kind == TokenType::Identifier)
        .map(|t| t.range.beg.line)
        .collect();
    assert_eq!(ident_lines, vec![1, 2, 3]);
}

#[test]
fn lexing_never_stalls_on_unrecognized_input() {
    let (tokens, diags) = lex_all("var x = @@@;");
    assert!(diags.iter().all(|d| d.message_id == linter_core::MessageId::LexUnexpectedCharacter));
    assert_eq!(diags.len(), 3);
    assert_eq!(tokens.last().unwrap().kind, TokenType::Eof);
}

#[test]
fn empty_source_lexes_to_a_single_eof_token() {
    let (tokens, diags) = lex_all("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenType::Eof);
    assert_eq!(tokens[0].range.beg, tokens[0].range.end);
    assert!(diags.is_empty());
}
