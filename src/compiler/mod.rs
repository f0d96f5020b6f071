// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Single-pass Pratt-parsing compiler: turns source text directly into a
//! tree of [`ObjFunction`](crate::value::ObjFunction)s, with no separate
//! AST stage.
//!
//! Parsing and code generation happen in the same walk: each grammar rule
//! both consumes tokens and emits bytecode for what it just parsed. A
//! prefix/infix dispatch table would normally hold function pointers per
//! [`TokenKind`], but a borrow-checker-friendly Rust translation of that
//! (methods taking `&mut self`) doesn't fit neatly in a `'static` array, so
//! [`Compiler::parse_precedence`] dispatches prefix and infix rules with a
//! `match` on the token kind instead; [`infix_precedence`] plays the role
//! of the table's precedence column.

mod scope;


use std::fmt;

use crate::bytecode::{Chunk, op};
use crate::heap::Heap;
use crate::reader::{Scanner, Token, TokenKind};
use crate::value::{GcRef, ObjFunction, Value};

use scope::{ClassScope, FunctionKind, FunctionScope, Local, MAX_LOCALS, Precedence, UpvalueDesc};

/// One compile-time diagnostic, formatted the way the reference
/// implementation's `errorAt` does: `[line N] Error at 'x': message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: u32,
    /// `" at 'lexeme'"`, `" at end"`, or empty (for a token the scanner
    /// already flagged as an error, where the lexeme IS the message).
    location: String,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.line, self.location, self.message)
    }
}

pub struct Compiler<'src, 'h> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    panic_mode: bool,
    errors: Vec<CompileError>,
    heap: &'h mut Heap,
    scopes: Vec<FunctionScope<'src>>,
    classes: Vec<ClassScope>,
}

/// Compile `source` into its top-level script function, or every
/// diagnostic collected along the way.
///
/// # Errors
///
/// Returns the accumulated `CompileError`s if the source has any syntax
/// error; parsing still continues past each one (panic-mode recovery) so
/// a single run reports more than the first mistake.
pub fn compile(source: &str, heap: &mut Heap) -> Result<GcRef, Vec<CompileError>> {
    let _span = tracing::trace_span!("compiler.compile", function = "<script>").entered();
    Compiler::new(source, heap).run()
}

impl<'src, 'h> Compiler<'src, 'h> {
    fn new(source: &'src str, heap: &'h mut Heap) -> Self {
        let mut scanner = Scanner::new(source);
        let mut errors = Vec::new();
        let mut current = scanner.scan_token();
        while current.kind == TokenKind::Error {
            errors.push(CompileError {
                line: current.line,
                location: String::new(),
                message: current.lexeme.to_string(),
            });
            current = scanner.scan_token();
        }
        Self {
            scanner,
            previous: current,
            current,
            panic_mode: false,
            errors,
            heap,
            scopes: vec![FunctionScope::new(FunctionKind::Script, None)],
            classes: Vec::new(),
        }
    }

    fn run(mut self) -> Result<GcRef, Vec<CompileError>> {
        while !self.matches(TokenKind::Eof) {
            self.declaration();
        }
        let (function, _upvalues) = self.end_function();
        if self.errors.is_empty() {
            Ok(function)
        } else {
            Err(self.errors)
        }
    }

    // ---- token stream -----------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme.to_string();
            self.error_at(self.current, &message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let location = if token.kind == TokenKind::Eof {
            " at end".to_string()
        } else if token.kind == TokenKind::Error {
            String::new()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        self.errors.push(CompileError {
            line: token.line,
            location,
            message: message.to_string(),
        });
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }

    // ---- emission -----------------------------------------------------

    fn scope(&mut self) -> &mut FunctionScope<'src> {
        self.scopes.last_mut().expect("compiler always has a scope")
    }

    fn chunk(&mut self) -> &mut Chunk {
        &mut self.scope().chunk
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk().write(byte, line);
    }

    fn emit_bytes(&mut self, a: u8, b: u8) {
        self.emit_byte(a);
        self.emit_byte(b);
    }

    fn emit_jump(&mut self, opcode: u8) -> usize {
        let line = self.previous.line;
        self.chunk().emit_jump(opcode, line)
    }

    fn patch_jump(&mut self, offset: usize) {
        if let Err(message) = self.chunk().patch_jump(offset) {
            self.error(message);
        }
    }

    fn emit_loop(&mut self, loop_start: usize) {
        let line = self.previous.line;
        if let Err(message) = self.chunk().emit_loop(loop_start, line) {
            self.error(message);
        }
    }

    fn emit_constant(&mut self, value: Value) {
        match self.chunk().add_constant(value) {
            Ok(index) => self.emit_bytes(op::CONSTANT, index),
            Err(message) => self.error(message),
        }
    }

    fn emit_return(&mut self) {
        if self.scope().kind == FunctionKind::Initializer {
            self.emit_bytes(op::GET_LOCAL, 0);
        } else {
            self.emit_byte(op::NIL);
        }
        self.emit_byte(op::RETURN);
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let interned = self.heap.intern(name);
        match self.chunk().add_constant(Value::obj(interned)) {
            Ok(index) => index,
            Err(message) => {
                self.error(message);
                0
            }
        }
    }

    // ---- scopes, locals, upvalues --------------------------------------

    fn begin_scope(&mut self) {
        self.scope().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.scope().scope_depth -= 1;
        let depth = self.scope().scope_depth;
        loop {
            let departing = match self.scope().locals.last() {
                Some(local) if local.depth > depth => Some(local.is_captured),
                _ => None,
            };
            let Some(is_captured) = departing else {
                break;
            };
            if is_captured {
                self.emit_byte(op::CLOSE_UPVALUE);
            } else {
                self.emit_byte(op::POP);
            }
            self.scope().locals.pop();
        }
    }

    fn declare_variable(&mut self) {
        if self.scope().scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let depth = self.scope().scope_depth;
        for local in self.scope().locals.iter().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if local.name == name {
                self.error("Already a variable with this name in this scope.");
                return;
            }
        }
        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        if self.scope().locals.len() >= MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.scope().locals.push(Local {
            name,
            depth: -1,
            is_captured: false,
        });
    }

    fn mark_initialized(&mut self) {
        if self.scope().scope_depth == 0 {
            return;
        }
        let depth = self.scope().scope_depth;
        self.scope().locals.last_mut().unwrap().depth = depth;
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.scope().scope_depth > 0 {
            return 0;
        }
        let name = self.previous.lexeme;
        self.identifier_constant(name)
    }

    fn define_variable(&mut self, global: u8) {
        if self.scope().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_bytes(op::DEFINE_GLOBAL, global);
    }

    fn resolve_local(&mut self, scope_index: usize, name: &str) -> Option<u8> {
        let locals = &self.scopes[scope_index].locals;
        for (i, local) in locals.iter().enumerate().rev() {
            if local.name == name {
                if local.depth == -1 {
                    self.error("Can't read local variable in its own initializer.");
                }
                return Some(i as u8);
            }
        }
        None
    }

    fn resolve_upvalue(&mut self, scope_index: usize, name: &str) -> Option<u8> {
        if scope_index == 0 {
            return None;
        }
        let enclosing = scope_index - 1;
        if let Some(local_index) = self.resolve_local(enclosing, name) {
            self.scopes[enclosing].locals[local_index as usize].is_captured = true;
            return Some(self.add_upvalue(scope_index, local_index, true));
        }
        if let Some(upvalue_index) = self.resolve_upvalue(enclosing, name) {
            return Some(self.add_upvalue(scope_index, upvalue_index, false));
        }
        None
    }

    fn add_upvalue(&mut self, scope_index: usize, index: u8, is_local: bool) -> u8 {
        let upvalues = &self.scopes[scope_index].upvalues;
        for (i, upvalue) in upvalues.iter().enumerate() {
            if upvalue.index == index && upvalue.is_local == is_local {
                return i as u8;
            }
        }
        if upvalues.len() >= MAX_LOCALS {
            self.error("Too many closure variables in function.");
            return 0;
        }
        self.scopes[scope_index]
            .upvalues
            .push(UpvalueDesc { index, is_local });
        (self.scopes[scope_index].upvalues.len() - 1) as u8
    }

    fn named_variable(&mut self, name: &str, can_assign: bool) {
        let scope_index = self.scopes.len() - 1;
        let (get_op, set_op, arg) = if let Some(local) = self.resolve_local(scope_index, name) {
            (op::GET_LOCAL, op::SET_LOCAL, local)
        } else if let Some(upvalue) = self.resolve_upvalue(scope_index, name) {
            (op::GET_UPVALUE, op::SET_UPVALUE, upvalue)
        } else {
            let global = self.identifier_constant(name);
            (op::GET_GLOBAL, op::SET_GLOBAL, global)
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_bytes(set_op, arg);
        } else {
            self.emit_bytes(get_op, arg);
        }
    }

    // ---- declarations and statements -----------------------------------

    fn declaration(&mut self) {
        if self.matches(TokenKind::Class) {
            self.class_declaration();
        } else if self.matches(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn class_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect class name.");
        let class_name = self.previous;
        let name_constant = self.identifier_constant(class_name.lexeme);
        self.declare_variable();

        self.emit_bytes(op::CLASS, name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassScope {
            has_superclass: false,
        });

        let had_superclass = if self.matches(TokenKind::Less) {
            self.consume(TokenKind::Identifier, "Expect superclass name.");
            self.variable(false);
            if self.previous.lexeme == class_name.lexeme {
                self.error("A class can't inherit from itself.");
            }
            self.begin_scope();
            self.add_local("super");
            self.mark_initialized();
            self.named_variable(class_name.lexeme, false);
            self.emit_byte(op::INHERIT);
            self.classes.last_mut().unwrap().has_superclass = true;
            true
        } else {
            false
        };

        self.named_variable(class_name.lexeme, false);
        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.method();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.");
        self.emit_byte(op::POP);

        if had_superclass {
            self.end_scope();
        }
        self.classes.pop();
    }

    fn method(&mut self) {
        self.consume(TokenKind::Identifier, "Expect method name.");
        let name = self.previous.lexeme;
        let constant = self.identifier_constant(name);
        let kind = if name == "init" {
            FunctionKind::Initializer
        } else {
            FunctionKind::Method
        };
        self.function(kind);
        self.emit_bytes(op::METHOD, constant);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionKind::Function);
        self.define_variable(global);
    }

    fn function(&mut self, kind: FunctionKind) {
        let name = self.heap.intern(self.previous.lexeme);
        self.scopes.push(FunctionScope::new(kind, Some(name)));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.scope().arity == 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                } else {
                    self.scope().arity += 1;
                }
                let param = self.parse_variable("Expect parameter name.");
                self.define_variable(param);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let (function, upvalues) = self.end_function();
        let constant = self.chunk().add_constant(Value::obj(function)).unwrap_or(0);
        self.emit_bytes(op::CLOSURE, constant);
        // The upvalue descriptor pairs `OP_CLOSURE` reads follow its own
        // operand, every function gets one (even with zero upvalues) so
        // every callable value at runtime really is a closure.
        for upvalue in &upvalues {
            self.emit_byte(u8::from(upvalue.is_local));
            self.emit_byte(upvalue.index);
        }
    }

    /// Pop the current function scope and allocate its `ObjFunction`,
    /// returning it along with the upvalue descriptors the caller still
    /// needs to emit (which must follow `OP_CLOSURE`'s own operand, not
    /// precede it).
    fn end_function(&mut self) -> (GcRef, Vec<UpvalueDesc>) {
        self.emit_return();
        let scope = self.scopes.pop().expect("function scope to close");
        let upvalue_count = scope.upvalues.len();
        let function = ObjFunction {
            header: crate::value::ObjHeader::new(crate::value::ObjKind::Function),
            arity: scope.arity,
            upvalue_count,
            chunk: scope.chunk,
            name: scope.name,
        };
        let gc = self.heap.alloc_function(function);
        (gc, scope.upvalues)
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_byte(op::NIL);
        }
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );
        self.define_variable(global);
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_byte(op::PRINT);
    }

    fn return_statement(&mut self) {
        if self.scope().kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }
        if self.matches(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            if self.scope().kind == FunctionKind::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_byte(op::RETURN);
        }
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(op::JUMP_IF_FALSE);
        self.emit_byte(op::POP);
        self.statement();

        let else_jump = self.emit_jump(op::JUMP);
        self.patch_jump(then_jump);
        self.emit_byte(op::POP);

        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk().len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(op::JUMP_IF_FALSE);
        self.emit_byte(op::POP);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_byte(op::POP);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.matches(TokenKind::Semicolon) {
            // no initializer
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk().len();
        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(op::JUMP_IF_FALSE));
            self.emit_byte(op::POP);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(op::JUMP);
            let increment_start = self.chunk().len();
            self.expression();
            self.emit_byte(op::POP);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_byte(op::POP);
        }
        self.end_scope();
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_byte(op::POP);
    }

    // ---- expressions ----------------------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;

        if !self.prefix_rule(self.previous.kind, can_assign) {
            self.error("Expect expression.");
            return;
        }

        while precedence <= infix_precedence(self.current.kind) {
            self.advance();
            self.infix_rule(self.previous.kind, can_assign);
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn prefix_rule(&mut self, kind: TokenKind, can_assign: bool) -> bool {
        match kind {
            TokenKind::LeftParen => self.grouping(),
            TokenKind::Minus | TokenKind::Bang => self.unary(),
            TokenKind::Number => self.number(),
            TokenKind::String => self.string(),
            TokenKind::True | TokenKind::False | TokenKind::Nil => self.literal(),
            TokenKind::Identifier => self.variable(can_assign),
            TokenKind::This => self.this_expr(),
            TokenKind::Super => self.super_expr(),
            _ => return false,
        }
        true
    }

    fn infix_rule(&mut self, kind: TokenKind, can_assign: bool) {
        match kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::EqualEqual
            | TokenKind::BangEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => self.binary(kind),
            TokenKind::And => self.and(),
            TokenKind::Or => self.or(),
            TokenKind::LeftParen => self.call(),
            TokenKind::Dot => self.dot(can_assign),
            _ => unreachable!("infix_precedence and infix_rule must agree"),
        }
    }

    fn number(&mut self) {
        let value: f64 = self.previous.lexeme.parse().unwrap_or(f64::NAN);
        self.emit_constant(Value::number(value));
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let contents = &lexeme[1..lexeme.len() - 1];
        let interned = self.heap.intern(contents);
        self.emit_constant(Value::obj(interned));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_byte(op::FALSE),
            TokenKind::Nil => self.emit_byte(op::NIL),
            TokenKind::True => self.emit_byte(op::TRUE),
            _ => unreachable!(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_byte(op::NEGATE),
            TokenKind::Bang => self.emit_byte(op::NOT),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self, operator: TokenKind) {
        self.parse_precedence(infix_precedence(operator).one_higher());
        match operator {
            TokenKind::Plus => self.emit_byte(op::ADD),
            TokenKind::Minus => self.emit_byte(op::SUBTRACT),
            TokenKind::Star => self.emit_byte(op::MULTIPLY),
            TokenKind::Slash => self.emit_byte(op::DIVIDE),
            TokenKind::EqualEqual => self.emit_byte(op::EQUAL),
            TokenKind::BangEqual => self.emit_bytes(op::EQUAL, op::NOT),
            TokenKind::Greater => self.emit_byte(op::GREATER),
            TokenKind::GreaterEqual => self.emit_bytes(op::LESS, op::NOT),
            TokenKind::Less => self.emit_byte(op::LESS),
            TokenKind::LessEqual => self.emit_bytes(op::GREATER, op::NOT),
            _ => unreachable!(),
        }
    }

    fn and(&mut self) {
        let end_jump = self.emit_jump(op::JUMP_IF_FALSE);
        self.emit_byte(op::POP);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self) {
        let else_jump = self.emit_jump(op::JUMP_IF_FALSE);
        let end_jump = self.emit_jump(op::JUMP);
        self.patch_jump(else_jump);
        self.emit_byte(op::POP);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self) {
        let arg_count = self.argument_list();
        self.emit_bytes(op::CALL, arg_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u8 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == 255 {
                    self.error("Can't have more than 255 arguments.");
                } else {
                    count += 1;
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.identifier_constant(self.previous.lexeme);

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_bytes(op::SET_PROPERTY, name);
        } else if self.matches(TokenKind::LeftParen) {
            let arg_count = self.argument_list();
            self.emit_bytes(op::INVOKE, name);
            self.emit_byte(arg_count);
        } else {
            self.emit_bytes(op::GET_PROPERTY, name);
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        self.named_variable(name, can_assign);
    }

    fn this_expr(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        self.named_variable("this", false);
    }

    fn super_expr(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.classes.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }

        self.consume(TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(TokenKind::Identifier, "Expect superclass method name.");
        let name = self.identifier_constant(self.previous.lexeme);

        self.named_variable("this", false);
        if self.matches(TokenKind::LeftParen) {
            let arg_count = self.argument_list();
            self.named_variable("super", false);
            self.emit_bytes(op::SUPER_INVOKE, name);
            self.emit_byte(arg_count);
        } else {
            self.named_variable("super", false);
            self.emit_bytes(op::GET_SUPER, name);
        }
    }
}

fn infix_precedence(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Minus | TokenKind::Plus => Precedence::Term,
        TokenKind::Slash | TokenKind::Star => Precedence::Factor,
        TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equality,
        TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual => {
            Precedence::Comparison
        }
        TokenKind::And => Precedence::And,
        TokenKind::Or => Precedence::Or,
        TokenKind::LeftParen | TokenKind::Dot => Precedence::Call,
        _ => Precedence::None,
    }
}
