// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the scanner.

use super::{Scanner, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    let mut scanner = Scanner::new(source);
    let mut out = Vec::new();
    loop {
        let token = scanner.scan_token();
        out.push(token.kind);
        if token.kind == TokenKind::Eof {
            break;
        }
    }
    out
}

#[test]
fn scans_single_char_tokens() {
    assert_eq!(
        kinds("(){},.-+;/*"),
        vec![
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBrace,
            TokenKind::RightBrace,
            TokenKind::Comma,
            TokenKind::Dot,
            TokenKind::Minus,
            TokenKind::Plus,
            TokenKind::Semicolon,
            TokenKind::Slash,
            TokenKind::Star,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn scans_two_char_operators() {
    assert_eq!(
        kinds("! != = == < <= > >="),
        vec![
            TokenKind::Bang,
            TokenKind::BangEqual,
            TokenKind::Equal,
            TokenKind::EqualEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn scans_keywords_as_distinct_kinds() {
    assert_eq!(
        kinds("and class else false for fun if nil or print return super this true var while"),
        vec![
            TokenKind::And,
            TokenKind::Class,
            TokenKind::Else,
            TokenKind::False,
            TokenKind::For,
            TokenKind::Fun,
            TokenKind::If,
            TokenKind::Nil,
            TokenKind::Or,
            TokenKind::Print,
            TokenKind::Return,
            TokenKind::Super,
            TokenKind::This,
            TokenKind::True,
            TokenKind::Var,
            TokenKind::While,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn identifier_with_keyword_prefix_is_not_a_keyword() {
    let mut scanner = Scanner::new("forest");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Identifier);
    assert_eq!(token.lexeme, "forest");
}

#[test]
fn scans_number_literals_with_and_without_fraction() {
    let mut scanner = Scanner::new("123 45.67");
    let first = scanner.scan_token();
    assert_eq!(first.kind, TokenKind::Number);
    assert_eq!(first.lexeme, "123");
    let second = scanner.scan_token();
    assert_eq!(second.kind, TokenKind::Number);
    assert_eq!(second.lexeme, "45.67");
}

#[test]
fn a_trailing_dot_with_no_digits_is_not_consumed_as_a_fraction() {
    let mut scanner = Scanner::new("123.");
    let first = scanner.scan_token();
    assert_eq!(first.lexeme, "123");
    let second = scanner.scan_token();
    assert_eq!(second.kind, TokenKind::Dot);
}

#[test]
fn scans_string_literals_including_quotes() {
    let mut scanner = Scanner::new("\"hello world\"");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::String);
    assert_eq!(token.lexeme, "\"hello world\"");
}

#[test]
fn unterminated_string_produces_an_error_token() {
    let mut scanner = Scanner::new("\"hello");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Error);
    assert_eq!(token.lexeme, "Unterminated string.");
}

#[test]
fn strings_may_span_multiple_lines() {
    let mut scanner = Scanner::new("\"line one\nline two\"");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::String);
    let next = scanner.scan_token();
    assert_eq!(next.line, 2);
}

#[test]
fn comments_are_skipped_to_end_of_line() {
    assert_eq!(
        kinds("// a comment\nvar"),
        vec![TokenKind::Var, TokenKind::Eof]
    );
}

#[test]
fn unexpected_character_produces_an_error_token() {
    let mut scanner = Scanner::new("@");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Error);
}

#[test]
fn tracks_line_numbers_across_newlines() {
    let mut scanner = Scanner::new("var\nvar\nvar");
    assert_eq!(scanner.scan_token().line, 1);
    assert_eq!(scanner.scan_token().line, 2);
    assert_eq!(scanner.scan_token().line, 3);
}
