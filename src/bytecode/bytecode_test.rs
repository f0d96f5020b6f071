// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the `Chunk` container.

use super::*;
use crate::value::Value;

#[test]
fn write_keeps_code_and_lines_in_sync() {
    let mut chunk = Chunk::new();
    chunk.write(op::NIL, 1);
    chunk.write(op::RETURN, 1);
    chunk.write(op::POP, 2);
    assert_eq!(chunk.code.len(), chunk.lines.len());
    assert_eq!(chunk.lines, vec![1, 1, 2]);
}

#[test]
fn add_constant_returns_index() {
    let mut chunk = Chunk::new();
    let idx = chunk.add_constant(Value::number(1.0)).unwrap();
    assert_eq!(idx, 0);
    let idx = chunk.add_constant(Value::number(2.0)).unwrap();
    assert_eq!(idx, 1);
}

#[test]
fn add_constant_errors_past_256() {
    let mut chunk = Chunk::new();
    for i in 0..MAX_CONSTANTS {
        chunk.add_constant(Value::number(i as f64)).unwrap();
    }
    let err = chunk.add_constant(Value::number(999.0)).unwrap_err();
    assert_eq!(err, "Too many constants in one chunk.");
}

#[test]
fn jump_patches_forward_offset() {
    let mut chunk = Chunk::new();
    let jump = chunk.emit_jump(op::JUMP_IF_FALSE, 1);
    chunk.write(op::POP, 1);
    chunk.write(op::POP, 1);
    chunk.patch_jump(jump).unwrap();
    let hi = chunk.code[jump] as u16;
    let lo = chunk.code[jump + 1] as u16;
    let offset = (hi << 8) | lo;
    assert_eq!(offset as usize, 2);
}

#[test]
fn loop_emits_backward_offset() {
    let mut chunk = Chunk::new();
    let loop_start = chunk.len();
    chunk.write(op::NIL, 1);
    chunk.emit_loop(loop_start, 1).unwrap();
    let op_index = loop_start + 1;
    assert_eq!(chunk.code[op_index], op::LOOP);
}
