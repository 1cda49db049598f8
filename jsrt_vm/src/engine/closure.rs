// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Closures and activation (spec's §4.5): captured-variable access
//! through [`Cell`](crate::heap::CellData)s, and the invocation sequence
//! that wires a call site to a [`Frame`](crate::heap::FrameData).

use super::shadow_stack::{ArgList, Local, ReturnScope};
use super::Engine;
use crate::heap::{FrameData, HeapData, HeapPtr};
use crate::value::Value;
use std::cell::RefCell;

/// Look up the `index`-th `Cell` a `Function` captured from an
/// enclosing activation. Looked up positionally, the same way a
/// compiler would address a captured-variable slot; there is no name
/// at this layer.
pub(crate) fn captured_cell(engine: &Engine, function: HeapPtr, index: usize) -> HeapPtr {
    match &engine.heap().get(function).data {
        HeapData::Function(f) => {
            *f.captured.get(index).unwrap_or_else(|| panic!("captured-variable index {index} out of range"))
        }
        _ => panic!("captured_cell() called on a non-Function heap value"),
    }
}

pub(crate) fn cell_get(engine: &Engine, cell: HeapPtr) -> Value {
    match &engine.heap().get(cell).data {
        HeapData::Cell(c) => c.value.get(),
        _ => panic!("cell_get() called on a non-Cell heap value"),
    }
}

/// Mutating a captured Cell's binding is immediately visible through
/// every other Function that captured the same Cell: there's only one
/// `Cell` heap allocation, and every capturer stores the same pointer
/// to it.
pub(crate) fn cell_set(engine: &Engine, cell: HeapPtr, value: Value) {
    match &engine.heap().get(cell).data {
        HeapData::Cell(c) => c.value.set(value),
        _ => panic!("cell_set() called on a non-Cell heap value"),
    }
}

/// Steps 1-5 of spec's §4.5 Invocation, in order:
///
/// 1. Reserve the return slot in the *caller's* region before anything
///    callee-side is pushed (the `ReturnScope` below).
/// 2. Push the actual arguments as a contiguous run; the callee's
///    `ArgList` owns that run.
/// 3. Construct the `Frame` (parent chain, callee, `this`, arguments
///    padded to the declared arity) and make it current.
/// 4. Invoke the native entry point.
/// 5. Restore the parent frame, pop the argument run, and hand the
///    result back rooted in the caller's reserved slot.
pub(super) fn call<'e>(engine: &'e Engine, function: HeapPtr, this: Value, args: &[Value]) -> Local<'e> {
    let (arity, entry) = match &engine.heap().get(function).data {
        HeapData::Function(f) => (f.arity as usize, f.entry),
        _ => panic!("Engine::call() target is not a Function"),
    };

    let return_scope = ReturnScope::new(engine);

    let arg_base = engine.shadow_stack().top();
    for &v in args {
        engine.shadow_stack().push(v);
    }
    let arglist = ArgList { engine, base: arg_base, actual_len: args.len(), arity };

    let padded: Vec<Value> =
        (0..arity).map(|i| if i < args.len() { args[i] } else { Value::UNDEFINED }).collect();
    let frame_ptr = engine.alloc(HeapData::Frame(FrameData {
        parent: engine.current_frame(),
        function: Some(function),
        this,
        locals: RefCell::new(padded),
    }));

    let previous_frame = engine.set_current_frame(Some(frame_ptr));
    let result = entry(engine, Value::from_heap_ptr(function), this, &arglist);
    engine.set_current_frame(previous_frame);

    drop(arglist);
    return_scope.escape(result)
}
