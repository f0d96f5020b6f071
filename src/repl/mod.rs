// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! REPL (Read-Eval-Print Loop) and file runner shells around [`Vm`].
//!
//! Both share the same contract: each program is compiled and run to
//! completion before the next one starts, and output goes wherever the
//! `Vm` was constructed to write it. The REPL keeps a single `Vm` alive
//! across lines, so variables and functions defined on one line are
//! visible on the next; the file runner uses a fresh one-shot `Vm`.

#[cfg(test)]
mod mod_test;

use std::fs;
use std::io;
use std::path::Path;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::{InterpretResult, Vm};

/// Read lines from the terminal until EOF (Ctrl-D), compiling and
/// running each one against the same `Vm`. Errors are reported to
/// stderr and do not stop the loop, matching clox's line-at-a-time REPL.
pub fn run(vm: &mut Vm) -> io::Result<()> {
    let mut editor = DefaultEditor::new().map_err(|e| io::Error::other(e.to_string()))?;

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                report(vm.interpret(&line));
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(()),
            Err(e) => return Err(io::Error::other(e.to_string())),
        }
    }
}

/// Read `path`, then compile and run its contents in a single fresh `Vm`.
///
/// # Errors
///
/// Returns an error if `path` can't be read.
pub fn run_file(path: &Path, vm: &mut Vm) -> io::Result<InterpretResult> {
    let source = fs::read_to_string(path)?;
    Ok(vm.interpret(&source))
}

/// Print a compile or runtime error to stderr. Successful runs print
/// nothing here; whatever the program printed already went to the `Vm`'s
/// own output.
fn report(result: InterpretResult) {
    match result {
        InterpretResult::Ok => {}
        InterpretResult::CompileError(errors) => {
            for error in errors {
                eprintln!("{error}");
            }
        }
        InterpretResult::RuntimeError(message) => eprint!("{message}"),
    }
}
