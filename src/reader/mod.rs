// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Lexical scanner.
//!
//! Converts source code text into a stream of tokens the compiler's Pratt
//! parser consumes one at a time.

#[cfg(test)]
mod lexer_test;

mod lexer;

pub use lexer::{Scanner, Token, TokenKind};
