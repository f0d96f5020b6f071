// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Stack-based virtual machine: fetch-decode-dispatch loop over a
//! [`Chunk`](crate::bytecode::Chunk), call frames, upvalue closing, and
//! the single-inheritance method-call machinery.

mod native;

#[cfg(test)]
mod vm_test;

use std::fmt;
use std::fmt::Write as _;
use std::io;
use std::io::Write as _;

use crate::InterpretResult;
use crate::bytecode::{disassemble, op};
use crate::compiler;
use crate::heap::{Heap, Table};
use crate::value::{GcRef, ObjKind, UpvalueState, Value, print_value};

/// Call frames deeper than this overflow the interpreter, matching the
/// reference implementation's fixed `FRAMES_MAX`.
const FRAMES_MAX: usize = 64;

/// One active function invocation: which closure is running, where its
/// instruction pointer is, and where its locals start on the value stack.
struct CallFrame {
    closure: GcRef,
    ip: usize,
    base: usize,
}

/// A runtime fault raised by the dispatch loop. Carries only the bare
/// message text; [`Vm::format_runtime_error`] adds the call-stack trace
/// that accompanies it when reported to the embedder.
///
/// Unlike the register machine's `RuntimeError` this implements
/// `Display`: this crate is a plain `std` binary/library with a
/// conventional CLI error path, not a `no_std` target printing through a
/// UART, so there's no separate `print_runtime_error` match needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    OperandMustBeNumber,
    OperandsMustBeNumbers,
    OperandsMustBeNumbersOrStrings,
    UndefinedVariable(String),
    OnlyInstancesHaveProperties,
    OnlyInstancesHaveFields,
    OnlyInstancesHaveMethods,
    UndefinedProperty(String),
    SuperclassMustBeAClass,
    NotCallable,
    ArityMismatch { expected: usize, got: usize },
    StackOverflow,
    /// A native function rejected its arguments; message is whatever the
    /// native returned.
    Native(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperandMustBeNumber => write!(f, "Operand must be a number."),
            Self::OperandsMustBeNumbers => write!(f, "Operands must be numbers."),
            Self::OperandsMustBeNumbersOrStrings => {
                write!(f, "Operands must be two numbers or two strings.")
            }
            Self::UndefinedVariable(name) => write!(f, "Undefined variable '{name}'."),
            Self::OnlyInstancesHaveProperties => write!(f, "Only instances have properties."),
            Self::OnlyInstancesHaveFields => write!(f, "Only instances have fields."),
            Self::OnlyInstancesHaveMethods => write!(f, "Only instances have methods."),
            Self::UndefinedProperty(name) => write!(f, "Undefined property '{name}'."),
            Self::SuperclassMustBeAClass => write!(f, "Superclass must be a class."),
            Self::NotCallable => write!(f, "Can only call functions and classes."),
            Self::ArityMismatch { expected, got } => {
                write!(f, "Expected {expected} arguments but got {got}.")
            }
            Self::StackOverflow => write!(f, "Stack overflow."),
            Self::Native(message) => write!(f, "{message}"),
        }
    }
}

/// The interpreter. Owns the heap, so every allocation the compiler or
/// the dispatch loop makes goes through the same collector.
pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    /// Upvalues still pointing at a live stack slot, sorted by descending
    /// slot index so closing works front-to-back like the reference
    /// implementation's address-sorted linked list.
    open_upvalues: Vec<GcRef>,
    init_string: GcRef,
    /// Where the `print` statement writes. Defaults to stdout; tests swap
    /// in an in-memory buffer so they can assert on program output without
    /// touching the process's real stdout.
    output: Box<dyn io::Write>,
    pub trace_exec: bool,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    #[must_use]
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    fn with_output(output: Box<dyn io::Write>) -> Self {
        let mut heap = Heap::new();
        let init_string = heap.intern("init");
        let mut vm = Self {
            heap,
            stack: Vec::new(),
            frames: Vec::new(),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            init_string,
            output,
            trace_exec: false,
        };
        vm.define_native("clock", native::clock, 0);
        vm
    }

    pub fn set_stress_gc(&mut self, flag: bool) {
        self.heap.stress_gc = flag;
    }

    fn define_native(&mut self, name: &'static str, function: crate::value::NativeFn, arity: u8) {
        let native = self.heap.alloc_native(function, arity, name);
        let name_ref = self.heap.intern(name);
        self.globals.set(name_ref, Value::obj(native));
        self.maybe_collect();
    }

    /// Compile and run `source` from a clean slate: fresh stack and call
    /// frames, but the same heap (and therefore the same globals and
    /// interned strings) as any prior call.
    #[must_use]
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let function = match compiler::compile(source, &mut self.heap) {
            Ok(function) => function,
            Err(errors) => {
                return InterpretResult::CompileError(
                    errors.iter().map(ToString::to_string).collect(),
                );
            }
        };

        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();

        let closure = self.heap.alloc_closure(function, Vec::new());
        self.push(Value::obj(closure));
        self.maybe_collect();
        self.frames.push(CallFrame {
            closure,
            ip: 0,
            base: 0,
        });

        match self.run() {
            Ok(()) => InterpretResult::Ok,
            Err(err) => {
                let message = self.format_runtime_error(&err);
                self.stack.clear();
                self.frames.clear();
                self.open_upvalues.clear();
                InterpretResult::RuntimeError(message)
            }
        }
    }

    fn format_runtime_error(&self, err: &RuntimeError) -> String {
        let mut out = format!("{err}\n");
        for frame in self.frames.iter().rev() {
            let function = frame.closure.as_closure().function.as_function();
            let line = function
                .chunk
                .lines
                .get(frame.ip.saturating_sub(1))
                .copied()
                .unwrap_or(0);
            match function.name {
                Some(name) => {
                    let _ = writeln!(out, "[line {line}] in {}()", name.as_string().chars);
                }
                None => {
                    let _ = writeln!(out, "[line {line}] in script");
                }
            }
        }
        out
    }

    // ---- stack helpers --------------------------------------------------

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    // ---- instruction stream helpers -------------------------------------

    fn read_byte(&mut self) -> u8 {
        let frame = self.frames.last_mut().expect("active call frame");
        let chunk = &frame.closure.as_closure().function.as_function().chunk;
        let byte = chunk.code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        let hi = u16::from(self.read_byte());
        let lo = u16::from(self.read_byte());
        (hi << 8) | lo
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        let frame = self.frames.last().expect("active call frame");
        frame.closure.as_closure().function.as_function().chunk.constants[index]
    }

    fn read_string(&mut self) -> GcRef {
        self.read_constant().as_obj().expect("string constant")
    }

    // ---- garbage collection ---------------------------------------------

    fn maybe_collect(&mut self) {
        if self.heap.should_collect() {
            self.collect_garbage();
        }
    }

    fn collect_garbage(&mut self) {
        let before = self.heap.bytes_allocated();
        let _span = tracing::trace_span!("gc.collect", before).entered();

        let mut gray_stack = Vec::new();
        for &value in &self.stack {
            Heap::mark_value(value, &mut gray_stack);
        }
        for frame in &self.frames {
            Heap::mark_ref(frame.closure, &mut gray_stack);
        }
        for &upvalue in &self.open_upvalues {
            Heap::mark_ref(upvalue, &mut gray_stack);
        }
        self.globals.mark(&mut gray_stack);
        Heap::mark_ref(self.init_string, &mut gray_stack);

        Heap::trace_references(&mut gray_stack);
        self.heap.remove_unmarked_strings();
        self.heap.sweep();

        let after = self.heap.bytes_allocated();
        tracing::trace!(after, next_gc = self.heap.next_gc(), "collected");
    }

    // ---- upvalues ---------------------------------------------------------

    fn capture_upvalue(&mut self, slot: usize) -> GcRef {
        if let Some(existing) = self.open_upvalues.iter().find(|u| {
            matches!(u.as_upvalue().state.get(), UpvalueState::Open(s) if s == slot)
        }) {
            return *existing;
        }
        let upvalue = self.heap.alloc_upvalue(slot);
        let position = self
            .open_upvalues
            .iter()
            .position(|u| matches!(u.as_upvalue().state.get(), UpvalueState::Open(s) if s < slot))
            .unwrap_or(self.open_upvalues.len());
        self.open_upvalues.insert(position, upvalue);
        self.maybe_collect();
        upvalue
    }

    /// Close every open upvalue pointing at `from` or a deeper slot,
    /// copying the stack's current value into the upvalue itself.
    fn close_upvalues(&mut self, from: usize) {
        while let Some(&candidate) = self.open_upvalues.first() {
            let UpvalueState::Open(slot) = candidate.as_upvalue().state.get() else {
                break;
            };
            if slot < from {
                break;
            }
            let value = self.stack[slot];
            candidate
                .as_upvalue()
                .state
                .set(UpvalueState::Closed(value));
            self.open_upvalues.remove(0);
        }
    }

    // ---- calls --------------------------------------------------------

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), RuntimeError> {
        let Some(obj) = callee.as_obj() else {
            return Err(RuntimeError::NotCallable);
        };
        match obj.kind() {
            ObjKind::Closure => self.call_closure(obj, arg_count),
            ObjKind::Native => self.call_native(obj, arg_count),
            ObjKind::Class => self.call_class(obj, arg_count),
            ObjKind::BoundMethod => self.call_bound_method(obj, arg_count),
            _ => Err(RuntimeError::NotCallable),
        }
    }

    fn call_closure(&mut self, closure: GcRef, arg_count: u8) -> Result<(), RuntimeError> {
        let function = closure.as_closure().function.as_function();
        if usize::from(arg_count) != usize::from(function.arity) {
            return Err(RuntimeError::ArityMismatch {
                expected: usize::from(function.arity),
                got: usize::from(arg_count),
            });
        }
        if self.frames.len() >= FRAMES_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        let base = self.stack.len() - usize::from(arg_count) - 1;
        self.frames.push(CallFrame {
            closure,
            ip: 0,
            base,
        });
        Ok(())
    }

    fn call_native(&mut self, native: GcRef, arg_count: u8) -> Result<(), RuntimeError> {
        let obj = native.as_native();
        if usize::from(arg_count) != usize::from(obj.arity) {
            return Err(RuntimeError::ArityMismatch {
                expected: usize::from(obj.arity),
                got: usize::from(arg_count),
            });
        }
        let start = self.stack.len() - usize::from(arg_count);
        let result = (obj.function)(&self.stack[start..]).map_err(RuntimeError::Native)?;
        self.stack.truncate(start - 1);
        self.push(result);
        Ok(())
    }

    fn call_class(&mut self, class: GcRef, arg_count: u8) -> Result<(), RuntimeError> {
        let instance = self.heap.alloc_instance(class);
        let base = self.stack.len() - usize::from(arg_count) - 1;
        self.stack[base] = Value::obj(instance);
        self.maybe_collect();

        let initializer = class.as_class().methods.borrow().get(self.init_string);
        match initializer {
            Some(value) => {
                let closure = value.as_obj().expect("initializer is a closure");
                self.call_closure(closure, arg_count)
            }
            None if arg_count != 0 => Err(RuntimeError::ArityMismatch {
                expected: 0,
                got: usize::from(arg_count),
            }),
            None => Ok(()),
        }
    }

    fn call_bound_method(&mut self, bound: GcRef, arg_count: u8) -> Result<(), RuntimeError> {
        let bound = bound.as_bound_method();
        let base = self.stack.len() - usize::from(arg_count) - 1;
        self.stack[base] = bound.receiver;
        self.call_closure(bound.method, arg_count)
    }

    fn bind_method(&mut self, class: GcRef, name: GcRef) -> Result<(), RuntimeError> {
        let method = class.as_class().methods.borrow().get(name);
        let Some(method) = method else {
            return Err(RuntimeError::UndefinedProperty(
                name.as_string().chars.to_string(),
            ));
        };
        let closure = method.as_obj().expect("method is a closure");
        let receiver = self.pop();
        let bound = self.heap.alloc_bound_method(receiver, closure);
        self.push(Value::obj(bound));
        self.maybe_collect();
        Ok(())
    }

    fn invoke_from_class(
        &mut self,
        class: GcRef,
        name: GcRef,
        arg_count: u8,
    ) -> Result<(), RuntimeError> {
        let method = class.as_class().methods.borrow().get(name);
        let Some(method) = method else {
            return Err(RuntimeError::UndefinedProperty(
                name.as_string().chars.to_string(),
            ));
        };
        let closure = method.as_obj().expect("method is a closure");
        self.call_closure(closure, arg_count)
    }

    fn invoke(&mut self, name: GcRef, arg_count: u8) -> Result<(), RuntimeError> {
        let receiver = self.peek(usize::from(arg_count));
        let Some(obj) = receiver.as_obj() else {
            return Err(RuntimeError::OnlyInstancesHaveMethods);
        };
        if obj.kind() != ObjKind::Instance {
            return Err(RuntimeError::OnlyInstancesHaveMethods);
        }
        let instance = obj.as_instance();
        if let Some(field) = instance.fields.borrow().get(name) {
            let slot = self.stack.len() - usize::from(arg_count) - 1;
            self.stack[slot] = field;
            return self.call_value(field, arg_count);
        }
        self.invoke_from_class(instance.class, name, arg_count)
    }

    // ---- arithmetic helpers ----------------------------------------------

    fn binary_number_op(
        &mut self,
        combine: impl Fn(f64, f64) -> Value,
    ) -> Result<(), RuntimeError> {
        let b = self.peek(0);
        let a = self.peek(1);
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                self.pop();
                self.pop();
                self.push(combine(x, y));
                Ok(())
            }
            _ => Err(RuntimeError::OperandsMustBeNumbers),
        }
    }

    fn concatenate(&mut self) {
        let b = self.peek(0).as_obj().expect("string operand").as_string();
        let a = self.peek(1).as_obj().expect("string operand").as_string();
        let mut joined = String::with_capacity(a.chars.len() + b.chars.len());
        joined.push_str(&a.chars);
        joined.push_str(&b.chars);
        self.pop();
        self.pop();
        let interned = self.heap.intern(&joined);
        self.push(Value::obj(interned));
        self.maybe_collect();
    }

    // ---- dispatch loop ----------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if self.trace_exec {
                let frame = self.frames.last().expect("active call frame");
                let chunk = &frame.closure.as_closure().function.as_function().chunk;
                let mut out = String::new();
                disassemble::disassemble_instruction(&mut out, chunk, frame.ip);
                eprint!("{out}");
            }

            match self.read_byte() {
                op::CONSTANT => {
                    let value = self.read_constant();
                    self.push(value);
                }
                op::NIL => self.push(Value::nil()),
                op::TRUE => self.push(Value::bool(true)),
                op::FALSE => self.push(Value::bool(false)),
                op::POP => {
                    self.pop();
                }
                op::DEFINE_GLOBAL => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    self.globals.set(name, value);
                    self.pop();
                }
                op::GET_GLOBAL => {
                    let name = self.read_string();
                    match self.globals.get(name) {
                        Some(value) => self.push(value),
                        None => {
                            return Err(RuntimeError::UndefinedVariable(
                                name.as_string().chars.to_string(),
                            ));
                        }
                    }
                }
                op::SET_GLOBAL => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    if self.globals.set(name, value) {
                        self.globals.delete(name);
                        return Err(RuntimeError::UndefinedVariable(
                            name.as_string().chars.to_string(),
                        ));
                    }
                }
                op::GET_LOCAL => {
                    let slot = usize::from(self.read_byte());
                    let base = self.frames.last().expect("active call frame").base;
                    self.push(self.stack[base + slot]);
                }
                op::SET_LOCAL => {
                    let slot = usize::from(self.read_byte());
                    let base = self.frames.last().expect("active call frame").base;
                    self.stack[base + slot] = self.peek(0);
                }
                op::GET_UPVALUE => {
                    let slot = usize::from(self.read_byte());
                    let closure = self.frames.last().expect("active call frame").closure;
                    let upvalue = closure.as_closure().upvalues[slot];
                    let value = match upvalue.as_upvalue().state.get() {
                        UpvalueState::Open(s) => self.stack[s],
                        UpvalueState::Closed(v) => v,
                    };
                    self.push(value);
                }
                op::SET_UPVALUE => {
                    let slot = usize::from(self.read_byte());
                    let value = self.peek(0);
                    let closure = self.frames.last().expect("active call frame").closure;
                    let upvalue = closure.as_closure().upvalues[slot];
                    match upvalue.as_upvalue().state.get() {
                        UpvalueState::Open(s) => self.stack[s] = value,
                        UpvalueState::Closed(_) => {
                            upvalue.as_upvalue().state.set(UpvalueState::Closed(value));
                        }
                    }
                }
                op::GET_PROPERTY => {
                    let name = self.read_string();
                    let receiver = self.peek(0);
                    let Some(obj) = receiver.as_obj() else {
                        return Err(RuntimeError::OnlyInstancesHaveProperties);
                    };
                    if obj.kind() != ObjKind::Instance {
                        return Err(RuntimeError::OnlyInstancesHaveProperties);
                    }
                    let field = obj.as_instance().fields.borrow().get(name);
                    match field {
                        Some(value) => {
                            self.pop();
                            self.push(value);
                        }
                        None => self.bind_method(obj.as_instance().class, name)?,
                    }
                }
                op::SET_PROPERTY => {
                    let name = self.read_string();
                    let receiver = self.peek(1);
                    let Some(obj) = receiver.as_obj() else {
                        return Err(RuntimeError::OnlyInstancesHaveFields);
                    };
                    if obj.kind() != ObjKind::Instance {
                        return Err(RuntimeError::OnlyInstancesHaveFields);
                    }
                    let value = self.pop();
                    obj.as_instance().fields.borrow_mut().set(name, value);
                    self.pop();
                    self.push(value);
                }
                op::GET_SUPER => {
                    let name = self.read_string();
                    let superclass = self.pop().as_obj().expect("superclass operand");
                    self.bind_method(superclass, name)?;
                }
                op::EQUAL => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::bool(a == b));
                }
                op::LESS => self.binary_number_op(|a, b| Value::bool(a < b))?,
                op::GREATER => self.binary_number_op(|a, b| Value::bool(a > b))?,
                op::ADD => {
                    let (a, b) = (self.peek(1), self.peek(0));
                    if a.is_number() && b.is_number() {
                        self.binary_number_op(|a, b| Value::number(a + b))?;
                    } else if a.is_string() && b.is_string() {
                        self.concatenate();
                    } else {
                        return Err(RuntimeError::OperandsMustBeNumbersOrStrings);
                    }
                }
                op::SUBTRACT => self.binary_number_op(|a, b| Value::number(a - b))?,
                op::MULTIPLY => self.binary_number_op(|a, b| Value::number(a * b))?,
                op::DIVIDE => self.binary_number_op(|a, b| Value::number(a / b))?,
                op::NEGATE => {
                    let Some(n) = self.peek(0).as_number() else {
                        return Err(RuntimeError::OperandMustBeNumber);
                    };
                    self.pop();
                    self.push(Value::number(-n));
                }
                op::NOT => {
                    let value = self.pop();
                    self.push(Value::bool(!value.is_truthy()));
                }
                op::PRINT => {
                    let value = self.pop();
                    let _ = writeln!(self.output, "{}", print_value(value));
                }
                op::JUMP => {
                    let offset = self.read_short();
                    self.frames.last_mut().expect("active call frame").ip += usize::from(offset);
                }
                op::JUMP_IF_FALSE => {
                    let offset = self.read_short();
                    if !self.peek(0).is_truthy() {
                        self.frames.last_mut().expect("active call frame").ip +=
                            usize::from(offset);
                    }
                }
                op::LOOP => {
                    let offset = self.read_short();
                    self.frames.last_mut().expect("active call frame").ip -= usize::from(offset);
                }
                op::CALL => {
                    let arg_count = self.read_byte();
                    let callee = self.peek(usize::from(arg_count));
                    self.call_value(callee, arg_count)?;
                }
                op::INVOKE => {
                    let method = self.read_string();
                    let arg_count = self.read_byte();
                    self.invoke(method, arg_count)?;
                }
                op::SUPER_INVOKE => {
                    let method = self.read_string();
                    let arg_count = self.read_byte();
                    let superclass = self.pop().as_obj().expect("superclass operand");
                    self.invoke_from_class(superclass, method, arg_count)?;
                }
                op::CLOSURE => {
                    let function = self.read_constant().as_obj().expect("function constant");
                    let upvalue_count = function.as_function().upvalue_count;
                    let mut upvalues = Vec::with_capacity(upvalue_count);
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte();
                        let index = usize::from(self.read_byte());
                        if is_local == 1 {
                            let base = self.frames.last().expect("active call frame").base;
                            upvalues.push(self.capture_upvalue(base + index));
                        } else {
                            let enclosing = self.frames.last().expect("active call frame").closure;
                            upvalues.push(enclosing.as_closure().upvalues[index]);
                        }
                    }
                    let closure = self.heap.alloc_closure(function, upvalues);
                    self.push(Value::obj(closure));
                    self.maybe_collect();
                }
                op::CLOSE_UPVALUE => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }
                op::RETURN => {
                    let result = self.pop();
                    let frame = self.frames.pop().expect("active call frame");
                    self.close_upvalues(frame.base);
                    self.stack.truncate(frame.base);
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.push(result);
                }
                op::CLASS => {
                    let name = self.read_string();
                    let class = self.heap.alloc_class(name);
                    self.push(Value::obj(class));
                    self.maybe_collect();
                }
                op::INHERIT => {
                    let superclass = self.peek(1);
                    let Some(super_obj) = superclass.as_obj() else {
                        return Err(RuntimeError::SuperclassMustBeAClass);
                    };
                    if super_obj.kind() != ObjKind::Class {
                        return Err(RuntimeError::SuperclassMustBeAClass);
                    }
                    let subclass = self.peek(0).as_obj().expect("subclass operand").as_class();
                    super_obj
                        .as_class()
                        .methods
                        .borrow()
                        .copy_into(&mut subclass.methods.borrow_mut());
                    self.pop();
                }
                op::METHOD => {
                    let name = self.read_string();
                    let method = self.pop();
                    let class = self.peek(0).as_obj().expect("class operand").as_class();
                    class.methods.borrow_mut().set(name, method);
                }
                other => unreachable!("invalid opcode {other} reached the dispatch loop"),
            }
        }
    }
}
