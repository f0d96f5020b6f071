// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the heap allocator, string interning and the collector's
//! mark/sweep phases.

use proptest::prelude::*;

use super::Heap;
use crate::value::Value;

fn noop_native(_args: &[Value]) -> Result<Value, String> {
    Ok(Value::Nil)
}

#[test]
fn interning_dedupes_equal_content() {
    let mut heap = Heap::new();
    let a = heap.intern("hello");
    let b = heap.intern("hello");
    assert_eq!(a, b);
}

#[test]
fn interning_distinguishes_different_content() {
    let mut heap = Heap::new();
    let a = heap.intern("hello");
    let b = heap.intern("goodbye");
    assert_ne!(a, b);
}

#[test]
fn alloc_tracks_bytes_allocated() {
    let mut heap = Heap::new();
    assert_eq!(heap.bytes_allocated(), 0);
    heap.alloc_native(noop_native, 0, "noop");
    assert!(heap.bytes_allocated() > 0);
}

#[test]
fn should_collect_is_false_for_a_fresh_heap() {
    let heap = Heap::new();
    assert!(!heap.should_collect());
}

#[test]
fn should_collect_respects_stress_gc() {
    let mut heap = Heap::new();
    heap.stress_gc = true;
    assert!(heap.should_collect());
}

#[test]
fn mark_value_ignores_non_object_values() {
    let mut gray_stack = Vec::new();
    Heap::mark_value(Value::Nil, &mut gray_stack);
    Heap::mark_value(Value::number(3.0), &mut gray_stack);
    Heap::mark_value(Value::bool(true), &mut gray_stack);
    assert!(gray_stack.is_empty());
}

#[test]
fn mark_value_marks_and_queues_objects_once() {
    let mut heap = Heap::new();
    let s = heap.intern("tracked");
    let mut gray_stack = Vec::new();
    Heap::mark_value(Value::obj(s), &mut gray_stack);
    assert!(s.is_marked());
    assert_eq!(gray_stack.len(), 1);

    Heap::mark_value(Value::obj(s), &mut gray_stack);
    assert_eq!(gray_stack.len(), 1, "already-marked objects aren't requeued");
}

#[test]
fn sweep_frees_unmarked_objects_and_keeps_marked_ones() {
    let mut heap = Heap::new();
    let marked = heap.intern("marked");
    heap.intern("unmarked");
    marked.mark();

    let bytes_before = heap.bytes_allocated();
    heap.remove_unmarked_strings();
    heap.sweep();

    assert!(heap.bytes_allocated() < bytes_before);
    assert!(heap.bytes_allocated() > 0);

    // The survivor was unmarked by sweep, ready for the next cycle, and is
    // still reachable through the interner.
    assert!(!marked.is_marked());
    assert_eq!(heap.intern("marked"), marked);
}

#[test]
fn sweep_with_nothing_marked_frees_everything() {
    let mut heap = Heap::new();
    heap.intern("a");
    heap.intern("b");
    heap.remove_unmarked_strings();
    heap.sweep();
    assert_eq!(heap.bytes_allocated(), 0);
}

proptest! {
    /// For any two strings with identical bytes, interning them produces
    /// the same object, regardless of how many other interned strings
    /// are interleaved between the two calls.
    #[test]
    fn interning_is_pointer_identical_for_equal_content(
        content in "[a-z]{0,12}",
        others in prop::collection::vec("[a-z]{0,12}", 0..20),
    ) {
        let mut heap = Heap::new();
        let first = heap.intern(&content);
        for other in &others {
            heap.intern(other);
        }
        let second = heap.intern(&content);
        prop_assert_eq!(first, second);
    }
}
