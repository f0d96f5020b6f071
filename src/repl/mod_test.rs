// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the file-runner half of the REPL module. The interactive
//! loop itself talks to a real terminal through `rustyline` and is
//! exercised by hand, not here.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write as _;

use tempfile::NamedTempFile;

use super::run_file;
use crate::{InterpretResult, Vm};

fn script(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write script");
    file
}

#[test]
fn a_valid_script_runs_to_completion() {
    let file = script("print 1 + 1;");
    let mut vm = Vm::new();
    let result = run_file(file.path(), &mut vm).expect("read script");
    assert!(matches!(result, InterpretResult::Ok));
}

#[test]
fn a_script_with_a_syntax_error_reports_a_compile_error() {
    let file = script("1 +");
    let mut vm = Vm::new();
    let result = run_file(file.path(), &mut vm).expect("read script");
    assert!(matches!(result, InterpretResult::CompileError(_)));
}

#[test]
fn a_script_that_faults_at_runtime_reports_a_runtime_error() {
    let file = script("undefined_name;");
    let mut vm = Vm::new();
    let result = run_file(file.path(), &mut vm).expect("read script");
    assert!(matches!(result, InterpretResult::RuntimeError(_)));
}

#[test]
fn a_missing_file_is_an_io_error() {
    let mut vm = Vm::new();
    let result = run_file(
        std::path::Path::new("/nonexistent/path/to/script.lox"),
        &mut vm,
    );
    assert!(result.is_err());
}
