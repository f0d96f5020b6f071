// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Native functions bound into the global table at VM startup.

use std::time::Instant;

use crate::value::Value;

/// Wall-clock seconds since the VM started, as an `f64`. The reference
/// implementation returns `clock() / CLOCKS_PER_SEC`; this uses a
/// monotonic `Instant` instead since there's no libc clock to call.
pub fn clock(_args: &[Value]) -> Result<Value, String> {
    thread_local! {
        static START: Instant = Instant::now();
    }
    let elapsed = START.with(Instant::elapsed);
    Ok(Value::number(elapsed.as_secs_f64()))
}
