// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Converts values to their printed string representation, used by the
//! `print` statement and by error messages that embed a value.

use std::fmt::Write as _;

use super::{ObjKind, Value};

/// Render `value` the way the `print` statement does: no quotes around
/// strings, numbers without a trailing `.0` for whole values.
#[must_use]
pub fn print_value(value: Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: Value) {
    match value {
        Value::Nil => out.push_str("nil"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::Obj(o) => match o.kind() {
            ObjKind::String => out.push_str(&o.as_string().chars),
            ObjKind::Function => write_function(out, o),
            ObjKind::Native => {
                let _ = write!(out, "<native fn {}>", o.as_native().name);
            }
            ObjKind::Closure => write_function(out, o.as_closure().function),
            ObjKind::Upvalue => out.push_str("upvalue"),
            ObjKind::Class => out.push_str(&o.as_class().name.as_string().chars),
            ObjKind::Instance => {
                let _ = write!(
                    out,
                    "{} instance",
                    o.as_instance().class.as_class().name.as_string().chars
                );
            }
            ObjKind::BoundMethod => {
                write_function(out, o.as_bound_method().method.as_closure().function);
            }
        },
    }
}

fn write_number(out: &mut String, n: f64) {
    if n.is_nan() {
        out.push_str("nan");
    } else if n.is_infinite() {
        out.push_str(if n < 0.0 { "-inf" } else { "inf" });
    } else {
        let _ = write!(out, "{n}");
    }
}

fn write_function(out: &mut String, function: super::GcRef) {
    let func = function.as_function();
    match func.name {
        None => out.push_str("<script>"),
        Some(name) => {
            let _ = write!(out, "<fn {}>", name.as_string().chars);
        }
    }
}
