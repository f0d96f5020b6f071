// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! End-to-end scenarios exercising the compiler and VM together.

use super::{run_err_message, run_ok};

#[test]
fn arithmetic_with_precedence() {
    assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn string_concatenation_with_a_variable() {
    assert_eq!(run_ok(r#"var a = "hi"; print a + " there";"#), "hi there\n");
}

#[test]
fn a_for_loop_accumulates_into_a_variable() {
    assert_eq!(
        run_ok(
            r"
            var x = 0;
            for (var i = 0; i < 5; i = i + 1) { x = x + i; }
            print x;
            "
        ),
        "10\n"
    );
}

#[test]
fn a_closure_returned_from_a_function_keeps_its_captured_argument() {
    assert_eq!(
        run_ok(
            r"
            fun adder(n) {
                fun inner(m) { return n + m; }
                return inner;
            }
            var add2 = adder(2);
            print add2(40);
            "
        ),
        "42\n"
    );
}

#[test]
fn a_method_call_on_a_fresh_instance() {
    assert_eq!(
        run_ok(
            r#"
            class Greeter {
                greet(name) { print "hi, " + name; }
            }
            Greeter().greet("world");
            "#
        ),
        "hi, world\n"
    );
}

#[test]
fn single_inheritance_with_super_init_chaining() {
    assert_eq!(
        run_ok(
            r"
            class A { init(x) { this.x = x; } }
            class B < A {
                init(x, y) {
                    super.init(x);
                    this.y = y;
                }
            }
            var b = B(1, 2);
            print b.x;
            print b.y;
            "
        ),
        "1\n2\n"
    );
}

#[test]
fn adding_a_number_and_a_string_is_a_runtime_error() {
    assert_eq!(
        run_err_message(r#"print 1 + "x";"#),
        "Operands must be two numbers or two strings."
    );
}

#[test]
fn referencing_an_undefined_global_is_a_runtime_error() {
    assert_eq!(
        run_err_message("undefined_name;"),
        "Undefined variable 'undefined_name'."
    );
}

#[test]
fn calling_a_number_is_a_runtime_error() {
    assert_eq!(
        run_err_message("var f = 3; f();"),
        "Can only call functions and classes."
    );
}

#[test]
fn running_the_same_program_twice_prints_the_same_thing_both_times() {
    let source = "print 1 + 2 * 3;";
    assert_eq!(run_ok(source), run_ok(source));
}
