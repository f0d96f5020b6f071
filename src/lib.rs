// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # lumen
//!
//! A bytecode compiler and stack-based virtual machine for a small
//! dynamically typed scripting language.
//!
//! This crate provides:
//! - A scanner/token layer for the language's C-like surface syntax
//! - A single-pass Pratt-parsing compiler that emits bytecode directly,
//!   no intermediate AST
//! - A stack-based VM with call frames, closures and single-inheritance
//!   classes
//! - A precise mark-and-sweep garbage collector
//! - A REPL and file-runner CLI shell
//!
//! The `nanboxing` feature builds an alternate 64-bit NaN-boxed
//! [`value::nanbox`] encoding alongside the default tagged-union
//! [`value::Value`], for inspection and comparison; it is not wired into
//! the VM, which always runs on [`value::Value`].

pub mod bytecode;
pub mod compiler;
pub mod heap;
pub mod reader;
pub mod repl;
pub mod value;
pub mod vm;

pub use compiler::{CompileError, compile};
pub use value::Value;
pub use vm::{RuntimeError, Vm};

/// Crate version, taken from `Cargo.toml` at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of interpreting a source string, mirroring clox's
/// `InterpretResult` enum but carrying the error payload needed to report
/// it, rather than only a bare status code.
pub enum InterpretResult {
    /// Program ran to completion.
    Ok,
    /// The source failed to compile; one message per panic-mode-recovered
    /// error, already formatted as `[line L] Error at 'token': message`.
    CompileError(Vec<String>),
    /// The program compiled but raised an unhandled error at runtime.
    RuntimeError(String),
}

/// Compile and run `source` in a fresh VM. This is the crate's single
/// embedder entry point.
#[must_use]
pub fn interpret(source: &str) -> InterpretResult {
    let mut vm = Vm::new();
    vm.interpret(source)
}

#[cfg(test)]
mod lib_test {
    use super::*;

    #[test]
    fn interprets_simple_arithmetic() {
        match interpret("print 1 + 2 * 3;") {
            InterpretResult::Ok => {}
            InterpretResult::CompileError(errs) => panic!("compile errors: {errs:?}"),
            InterpretResult::RuntimeError(msg) => panic!("runtime error: {msg}"),
        }
    }
}
