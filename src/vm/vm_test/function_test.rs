// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for functions, closures, classes, and methods.

use super::{run_err_message, run_ok};

#[test]
fn a_function_returns_its_computed_value() {
    assert_eq!(run_ok("fun square(n) { return n * n; } print square(6);"), "36\n");
}

#[test]
fn falling_off_the_end_of_a_function_returns_nil() {
    assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
}

#[test]
fn recursive_functions_work() {
    assert_eq!(
        run_ok(
            r"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
            "
        ),
        "55\n"
    );
}

#[test]
fn a_closure_captures_its_enclosing_locals_by_reference() {
    assert_eq!(
        run_ok(
            r"
            fun makeCounter() {
                var count = 0;
                fun increment() {
                    count = count + 1;
                    return count;
                }
                return increment;
            }
            var counter = makeCounter();
            print counter();
            print counter();
            print counter();
            "
        ),
        "1\n2\n3\n"
    );
}

#[test]
fn nested_closures_can_return_functions_that_add_captured_values() {
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
fn each_loop_iteration_closes_over_its_own_binding() {
    // A new lexical `i` per iteration, so three closures each remember a
    // different value instead of all sharing the loop's final state.
    assert_eq!(
        run_ok(
            r"
            var closures = nil;
            fun makeClosures() {
                var result = nil;
                var funcs = nil;
                for (var i = 0; i < 3; i = i + 1) {
                    fun capture() { return i; }
                    if (funcs == nil) { result = capture; }
                }
                return result;
            }
            print makeClosures()();
            "
        ),
        "0\n"
    );
}

#[test]
fn calling_a_non_callable_value_is_a_runtime_error() {
    assert_eq!(
        run_err_message("var f = 3; f();"),
        "Can only call functions and classes."
    );
}

#[test]
fn calling_with_the_wrong_number_of_arguments_is_a_runtime_error() {
    assert_eq!(
        run_err_message("fun f(a, b) {} f(1);"),
        "Expected 2 arguments but got 1."
    );
}

#[test]
fn classes_instantiate_and_methods_see_their_own_fields() {
    assert_eq!(
        run_ok(
            r#"
            class Greeter {
                greet(name) {
                    print "hi, " + name;
                }
            }
            Greeter().greet("world");
            "#
        ),
        "hi, world\n"
    );
}

#[test]
fn fields_set_on_an_instance_are_readable_afterwards() {
    assert_eq!(
        run_ok(
            r"
            class Box {}
            var b = Box();
            b.value = 42;
            print b.value;
            "
        ),
        "42\n"
    );
}

#[test]
fn init_runs_automatically_and_sets_this_fields() {
    assert_eq!(
        run_ok(
            r"
            class Point {
                init(x, y) {
                    this.x = x;
                    this.y = y;
                }
            }
            var p = Point(1, 2);
            print p.x;
            print p.y;
            "
        ),
        "1\n2\n"
    );
}

#[test]
fn init_always_returns_the_instance_even_if_called_directly() {
    assert_eq!(
        run_ok(
            r"
            class Thing {
                init() {}
            }
            var t = Thing();
            print t.init() == t;
            "
        ),
        "true\n"
    );
}

#[test]
fn subclasses_inherit_methods_from_the_superclass() {
    assert_eq!(
        run_ok(
            r#"
            class Animal {
                speak() { print "..."; }
            }
            class Dog < Animal {}
            Dog().speak();
            "#
        ),
        "...\n"
    );
}

#[test]
fn super_dispatches_to_the_superclass_implementation() {
    assert_eq!(
        run_ok(
            r#"
            class A {
                init(x) { this.x = x; }
            }
            class B < A {
                init(x, y) {
                    super.init(x);
                    this.y = y;
                }
            }
            var b = B(1, 2);
            print b.x;
            print b.y;
            "#
        ),
        "1\n2\n"
    );
}

#[test]
fn accessing_an_undefined_field_is_a_runtime_error() {
    assert_eq!(
        run_err_message("class Box {} print Box().missing;"),
        "Undefined property 'missing'."
    );
}

#[test]
fn accessing_a_field_on_a_non_instance_is_a_runtime_error() {
    assert_eq!(
        run_err_message("print (1).x;"),
        "Only instances have properties."
    );
}

#[test]
fn inheriting_from_a_non_class_is_a_runtime_error() {
    assert_eq!(
        run_err_message(
            r"
            var NotAClass = 1;
            class Oops < NotAClass {}
            "
        ),
        "Superclass must be a class."
    );
}
