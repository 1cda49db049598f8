// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared across the integration-test files in this directory: the
//! `nan-boxing`/`tagged-pointer` double helpers every scenario needs
//! (mirroring `jsrt_cli`'s own `make_double`/`double_value`), since a
//! double is an immediate under one encoding and a boxed heap value
//! under the other.

#![allow(dead_code)]

use jsrt_vm::{ArgList, Engine, Heap, Value};

#[cfg(feature = "nan-boxing")]
pub fn make_double(_engine: &Engine, value: f64) -> Value {
    Value::from_double(value)
}
#[cfg(feature = "tagged-pointer")]
pub fn make_double(engine: &Engine, value: f64) -> Value {
    Value::from_double(engine, value)
}

#[cfg(feature = "nan-boxing")]
pub fn double_value(_heap: &Heap, value: Value) -> f64 {
    value.as_double()
}
#[cfg(feature = "tagged-pointer")]
pub fn double_value(heap: &Heap, value: Value) -> f64 {
    value.as_double(heap)
}

#[cfg(feature = "nan-boxing")]
pub fn is_double(_heap: &Heap, value: Value) -> bool {
    value.is_double()
}
#[cfg(feature = "tagged-pointer")]
pub fn is_double(heap: &Heap, value: Value) -> bool {
    value.is_double(heap)
}

/// A native entry point that ignores every argument and returns
/// `undefined`; useful padding for calls whose side effect, not return
/// value, is under test.
pub fn noop(_engine: &Engine, _callee: Value, _this: Value, _args: &ArgList<'_>) -> Value {
    Value::UNDEFINED
}
