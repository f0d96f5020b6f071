// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the bytecode VM.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod function_test;
mod integration_test;
mod property_test;

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use super::Vm;
use crate::InterpretResult;

/// An `io::Write` sink backed by a shared buffer, so a test can keep
/// reading what the VM printed after handing the `Box<dyn Write>` half
/// away to the VM.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `source` in a fresh VM, capturing whatever it printed.
fn run_capturing(source: &str) -> (InterpretResult, String) {
    run_capturing_with(source, false)
}

/// Like [`run_capturing`], but lets the caller turn on `--stress-gc`
/// before the VM compiles or runs anything.
fn run_capturing_with(source: &str, stress_gc: bool) -> (InterpretResult, String) {
    let buffer = SharedBuffer::default();
    let mut vm = Vm::with_output(Box::new(buffer.clone()));
    vm.set_stress_gc(stress_gc);
    let result = vm.interpret(source);
    let bytes = buffer.0.borrow().clone();
    (result, String::from_utf8(bytes).expect("utf8 output"))
}

/// Run `source`, panicking with diagnostics unless it completes
/// successfully, and return everything it printed.
fn run_ok(source: &str) -> String {
    match run_capturing(source) {
        (InterpretResult::Ok, output) => output,
        (InterpretResult::CompileError(errors), _) => {
            panic!("expected successful run, got compile errors: {errors:?}")
        }
        (InterpretResult::RuntimeError(message), _) => {
            panic!("expected successful run, got runtime error: {message}")
        }
    }
}

/// Run `source`, panicking unless it raises a runtime error, and return
/// the formatted error (message line plus call-stack trace).
fn run_err(source: &str) -> String {
    match run_capturing(source) {
        (InterpretResult::RuntimeError(message), _) => message,
        (InterpretResult::Ok, output) => {
            panic!("expected a runtime error, program ran to completion printing: {output:?}")
        }
        (InterpretResult::CompileError(errors), _) => {
            panic!("expected a runtime error, got compile errors: {errors:?}")
        }
    }
}

/// Like [`run_err`], but returns just the first line: the error's
/// `Display` text, without the `[line N] in ...` trace beneath it.
fn run_err_message(source: &str) -> String {
    run_err(source)
        .lines()
        .next()
        .expect("a runtime error always prints at least one line")
        .to_string()
}
