// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! CLI entry point: `lumen [script]`.
//!
//! With no arguments, starts a REPL reading line-by-line until EOF. With
//! one argument, compiles and runs that file. Exit codes follow clox's
//! own convention: 64 usage error, 65 compile error, 70 runtime error,
//! 74 I/O error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lumen::{InterpretResult, Vm};

/// `sysexits.h` exit codes clox itself uses.
mod exit_code {
    pub const USAGE: u8 = 64;
    pub const COMPILE_ERROR: u8 = 65;
    pub const RUNTIME_ERROR: u8 = 70;
    pub const IO_ERROR: u8 = 74;
}

#[derive(Parser)]
#[command(name = "lumen")]
#[command(version = lumen::VERSION)]
#[command(about = "A bytecode compiler and VM for a small scripting language")]
struct Args {
    /// Script to run. Omit to start a REPL.
    script: Option<PathBuf>,

    /// Print each instruction before it executes.
    #[arg(long)]
    trace_exec: bool,

    /// Collect garbage before every allocation, to shake out GC bugs.
    #[arg(long)]
    stress_gc: bool,

    /// Increase logging verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // clap prints `--help`/`--version` output through `Ok`-ish
            // display errors too; let it print itself, but report any
            // genuine usage mistake (e.g. two script paths) as 64 to
            // match clox's own `Usage: clox [path]\n` contract.
            let usage_mistake = !matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            );
            e.print().ok();
            return if usage_mistake {
                ExitCode::from(exit_code::USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing(args.verbose);

    let mut vm = Vm::new();
    vm.trace_exec = args.trace_exec;
    vm.set_stress_gc(args.stress_gc);

    match args.script {
        None => match lumen::repl::run(&mut vm) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("lumen: {e}");
                ExitCode::from(exit_code::IO_ERROR)
            }
        },
        Some(path) => match lumen::repl::run_file(&path, &mut vm) {
            Ok(InterpretResult::Ok) => ExitCode::SUCCESS,
            Ok(InterpretResult::CompileError(errors)) => {
                for error in errors {
                    eprintln!("{error}");
                }
                ExitCode::from(exit_code::COMPILE_ERROR)
            }
            Ok(InterpretResult::RuntimeError(message)) => {
                eprint!("{message}");
                ExitCode::from(exit_code::RUNTIME_ERROR)
            }
            Err(e) => {
                eprintln!("lumen: {e}");
                ExitCode::from(exit_code::IO_ERROR)
            }
        },
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
