// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Heap: allocation, string interning, and the mark-and-sweep collector.
//!
//! Every heap object is allocated through [`Heap::alloc`], the single
//! choke point that updates `bytes_allocated` *before* the caller decides
//! whether to collect (matching the reference implementation's
//! `reallocate`). Collection itself runs in four phases driven by the
//! [`Heap::collect`] caller, who supplies the program's roots (VM stack,
//! call frames, open upvalues, globals table, the active-compiler chain):
//! mark roots, trace (blacken) references, strip dead strings out of the
//! interner, sweep the intrusive all-objects list.

mod table;

#[cfg(test)]
mod heap_test;

pub use table::Table;

use std::ptr::NonNull;

use crate::value::{
    GcRef, NativeFn, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction, ObjHeader, ObjInstance,
    ObjKind, ObjNative, ObjString, ObjUpvalue, UpvalueState, Value,
};

/// `next_gc` grows by this factor after every sweep.
const GC_HEAP_GROW_FACTOR: usize = 2;
/// First collection doesn't happen until this many bytes are live, so a
/// short-running script never collects at all.
const INITIAL_GC_THRESHOLD: usize = 1024 * 1024;

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

pub struct Heap {
    objects: Option<NonNull<ObjHeader>>,
    strings: Table,
    bytes_allocated: usize,
    next_gc: usize,
    /// Collect on every allocation, for shaking out GC bugs (CLI
    /// `--stress-gc`).
    pub stress_gc: bool,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: None,
            strings: Table::new(),
            bytes_allocated: 0,
            next_gc: INITIAL_GC_THRESHOLD,
            stress_gc: false,
        }
    }

    #[must_use]
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    #[must_use]
    pub fn should_collect(&self) -> bool {
        self.stress_gc || self.bytes_allocated > self.next_gc
    }

    #[must_use]
    pub fn next_gc(&self) -> usize {
        self.next_gc
    }

    fn push_object(&mut self, header: NonNull<ObjHeader>, size: usize) -> GcRef {
        unsafe {
            header.as_ref().next.set(self.objects);
        }
        self.objects = Some(header);
        self.bytes_allocated += size;
        GcRef(header)
    }

    fn alloc<T>(&mut self, value: T, kind: ObjKind, extra_bytes: usize) -> GcRef
    where
        T: HasHeader,
    {
        debug_assert_eq!(value.header().kind, kind);
        let boxed = Box::into_raw(Box::new(value));
        let header = unsafe { NonNull::new_unchecked(boxed.cast::<ObjHeader>()) };
        self.push_object(header, std::mem::size_of::<T>() + extra_bytes)
    }

    /// Intern `s`, returning the canonical `ObjString` for its content.
    /// Strings that already exist in the intern table are never
    /// duplicated on the heap; this is the invariant that lets the
    /// language implement string equality as pointer equality.
    pub fn intern(&mut self, s: &str) -> GcRef {
        let hash = fnv1a_hash(s.as_bytes());
        if let Some(existing) = self.strings.find_string(s, hash) {
            return existing;
        }
        let obj_string = ObjString {
            header: ObjHeader::new(ObjKind::String),
            hash,
            chars: s.into(),
        };
        let extra = s.len();
        let gc = self.alloc(obj_string, ObjKind::String, extra);
        self.strings.set(gc, Value::Nil);
        gc
    }

    pub fn alloc_function(&mut self, function: ObjFunction) -> GcRef {
        self.alloc(function, ObjKind::Function, 0)
    }

    pub fn alloc_native(&mut self, function: NativeFn, arity: u8, name: &'static str) -> GcRef {
        self.alloc(
            ObjNative {
                header: ObjHeader::new(ObjKind::Native),
                function,
                arity,
                name,
            },
            ObjKind::Native,
            0,
        )
    }

    pub fn alloc_closure(&mut self, function: GcRef, upvalues: Vec<GcRef>) -> GcRef {
        let extra = upvalues.len() * std::mem::size_of::<GcRef>();
        self.alloc(
            ObjClosure {
                header: ObjHeader::new(ObjKind::Closure),
                function,
                upvalues,
            },
            ObjKind::Closure,
            extra,
        )
    }

    pub fn alloc_upvalue(&mut self, stack_slot: usize) -> GcRef {
        self.alloc(
            ObjUpvalue {
                header: ObjHeader::new(ObjKind::Upvalue),
                state: std::cell::Cell::new(UpvalueState::Open(stack_slot)),
            },
            ObjKind::Upvalue,
            0,
        )
    }

    pub fn alloc_class(&mut self, name: GcRef) -> GcRef {
        self.alloc(
            ObjClass {
                header: ObjHeader::new(ObjKind::Class),
                name,
                methods: std::cell::RefCell::new(Table::new()),
            },
            ObjKind::Class,
            0,
        )
    }

    pub fn alloc_instance(&mut self, class: GcRef) -> GcRef {
        self.alloc(
            ObjInstance {
                header: ObjHeader::new(ObjKind::Instance),
                class,
                fields: std::cell::RefCell::new(Table::new()),
            },
            ObjKind::Instance,
            0,
        )
    }

    pub fn alloc_bound_method(&mut self, receiver: Value, method: GcRef) -> GcRef {
        self.alloc(
            ObjBoundMethod {
                header: ObjHeader::new(ObjKind::BoundMethod),
                receiver,
                method,
            },
            ObjKind::BoundMethod,
            0,
        )
    }

    fn mark_object(obj: GcRef, gray_stack: &mut Vec<GcRef>) {
        if !obj.is_marked() {
            obj.mark();
            gray_stack.push(obj);
        }
    }

    /// Mark `value` if it is a heap reference; numbers/bools/nil need no
    /// tracing.
    pub fn mark_value(value: Value, gray_stack: &mut Vec<GcRef>) {
        if let Value::Obj(obj) = value {
            Self::mark_object(obj, gray_stack);
        }
    }

    pub fn mark_ref(obj: GcRef, gray_stack: &mut Vec<GcRef>) {
        Self::mark_object(obj, gray_stack);
    }

    /// Trace one gray object's children, pushing anything newly marked
    /// back onto `gray_stack`. The caller drains `gray_stack` until empty.
    fn blacken_object(obj: GcRef, gray_stack: &mut Vec<GcRef>) {
        match obj.kind() {
            ObjKind::String | ObjKind::Native => {}
            ObjKind::Upvalue => {
                if let UpvalueState::Closed(v) = obj.as_upvalue().state.get() {
                    Self::mark_value(v, gray_stack);
                }
            }
            ObjKind::Function => {
                let function = obj.as_function();
                if let Some(name) = function.name {
                    Self::mark_object(name, gray_stack);
                }
                for constant in &function.chunk.constants {
                    Self::mark_value(*constant, gray_stack);
                }
            }
            ObjKind::Closure => {
                let closure = obj.as_closure();
                Self::mark_object(closure.function, gray_stack);
                for upvalue in &closure.upvalues {
                    Self::mark_object(*upvalue, gray_stack);
                }
            }
            ObjKind::Class => {
                let class = obj.as_class();
                Self::mark_object(class.name, gray_stack);
                class.methods.borrow().mark(gray_stack);
            }
            ObjKind::Instance => {
                let instance = obj.as_instance();
                Self::mark_object(instance.class, gray_stack);
                instance.fields.borrow().mark(gray_stack);
            }
            ObjKind::BoundMethod => {
                let bound = obj.as_bound_method();
                Self::mark_value(bound.receiver, gray_stack);
                Self::mark_object(bound.method, gray_stack);
            }
        }
    }

    /// Drain `gray_stack`, blackening each object (phase 2).
    pub fn trace_references(gray_stack: &mut Vec<GcRef>) {
        while let Some(obj) = gray_stack.pop() {
            Self::blacken_object(obj, gray_stack);
        }
    }

    /// Phase 3: drop intern-table entries for strings that didn't get
    /// marked by anything else. The interner holds weak references to its
    /// strings; it must not be the thing keeping them alive, or nothing
    /// would ever collect.
    pub fn remove_unmarked_strings(&mut self) {
        self.strings.remove_unmarked_keys();
    }

    /// Phase 4: free every unmarked object, unmarking survivors so the next
    /// cycle starts from a clean slate.
    pub fn sweep(&mut self) {
        let mut previous: Option<NonNull<ObjHeader>> = None;
        let mut current = self.objects;
        while let Some(node) = current {
            let header = unsafe { node.as_ref() };
            let next = header.next.get();
            if header.marked.get() {
                header.marked.set(false);
                previous = Some(node);
                current = next;
            } else {
                if let Some(prev) = previous {
                    unsafe { prev.as_ref().next.set(next) };
                } else {
                    self.objects = next;
                }
                current = next;
                let freed = self.free_object(node);
                self.bytes_allocated = self.bytes_allocated.saturating_sub(freed);
            }
        }
        self.next_gc = self.bytes_allocated * GC_HEAP_GROW_FACTOR;
    }

    /// Drop the concrete boxed value behind `node`, dispatching on its
    /// kind tag the way clox's `freeObject` switches on `obj->type`.
    /// Returns the size that was freed, to keep `bytes_allocated` honest.
    fn free_object(&mut self, node: NonNull<ObjHeader>) -> usize {
        let kind = unsafe { node.as_ref().kind };
        unsafe {
            match kind {
                ObjKind::String => {
                    let ptr = node.cast::<ObjString>();
                    let extra = ptr.as_ref().chars.len();
                    let size = std::mem::size_of::<ObjString>() + extra;
                    drop(Box::from_raw(ptr.as_ptr()));
                    size
                }
                ObjKind::Function => {
                    drop(Box::from_raw(node.cast::<ObjFunction>().as_ptr()));
                    std::mem::size_of::<ObjFunction>()
                }
                ObjKind::Upvalue => {
                    drop(Box::from_raw(node.cast::<ObjUpvalue>().as_ptr()));
                    std::mem::size_of::<ObjUpvalue>()
                }
                ObjKind::Closure => {
                    let ptr = node.cast::<ObjClosure>();
                    let extra = ptr.as_ref().upvalues.len() * std::mem::size_of::<GcRef>();
                    let size = std::mem::size_of::<ObjClosure>() + extra;
                    drop(Box::from_raw(ptr.as_ptr()));
                    size
                }
                ObjKind::Native => {
                    drop(Box::from_raw(node.cast::<ObjNative>().as_ptr()));
                    std::mem::size_of::<ObjNative>()
                }
                ObjKind::Class => {
                    drop(Box::from_raw(node.cast::<ObjClass>().as_ptr()));
                    std::mem::size_of::<ObjClass>()
                }
                ObjKind::Instance => {
                    drop(Box::from_raw(node.cast::<ObjInstance>().as_ptr()));
                    std::mem::size_of::<ObjInstance>()
                }
                ObjKind::BoundMethod => {
                    drop(Box::from_raw(node.cast::<ObjBoundMethod>().as_ptr()));
                    std::mem::size_of::<ObjBoundMethod>()
                }
            }
        }
    }
}

impl Drop for Heap {
    /// `free_vm()`'s final sweep: every allocation is dropped, regardless
    /// of mark state.
    fn drop(&mut self) {
        let mut current = self.objects;
        while let Some(node) = current {
            let next = unsafe { node.as_ref().next.get() };
            self.free_object(node);
            current = next;
        }
        self.objects = None;
    }
}

/// Marker trait letting [`Heap::alloc`] assert the stored kind tag matches
/// the object header at the front of every concrete payload struct.
trait HasHeader {
    fn header(&self) -> &ObjHeader;
}

macro_rules! impl_has_header {
    ($($t:ty),* $(,)?) => {
        $(impl HasHeader for $t {
            fn header(&self) -> &ObjHeader {
                &self.header
            }
        })*
    };
}

impl_has_header!(
    ObjString,
    ObjFunction,
    ObjUpvalue,
    ObjClosure,
    ObjNative,
    ObjClass,
    ObjInstance,
    ObjBoundMethod
);
