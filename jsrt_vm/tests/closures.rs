// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scenario 3 (spec §8, *Closure mutation*) plus the quantified
//! invariant that two Functions sharing a captured Cell observe each
//! other's writes to it.

mod support;

use jsrt_vm::{ArgList, Engine, Scope, Value};

fn overwrite_captured(engine: &Engine, callee: Value, _this: Value, _args: &ArgList<'_>) -> Value {
    let cell = engine.captured_cell(callee, 0);
    let scope = Scope::new(engine);
    let replacement = scope.push_local(engine.new_string("b plus one"));
    engine.cell_set(cell, replacement.get());
    Value::UNDEFINED
}

#[test]
fn inner_function_mutation_is_visible_to_outer() {
    let engine = Engine::new();
    let scope = Scope::new(&engine);
    let initial = scope.push_local(engine.new_string("b"));
    let cell = scope.push_local(engine.new_cell(initial.get()));
    let inner =
        scope.push_local(engine.new_function(Some("inner"), 0, vec![cell.get()], overwrite_captured));

    assert_eq!(engine.cell_get(cell.get()).to_js_string(engine.heap()), "b");
    engine.call(inner.get(), Value::UNDEFINED, &[]);
    assert_eq!(engine.cell_get(cell.get()).to_js_string(engine.heap()), "b plus one");
}

fn read_captured_into_string_result(
    engine: &Engine,
    callee: Value,
    _this: Value,
    _args: &ArgList<'_>,
) -> Value {
    let cell = engine.captured_cell(callee, 0);
    engine.cell_get(cell)
}

#[test]
fn two_functions_sharing_a_cell_observe_each_others_writes() {
    let engine = Engine::new();
    let scope = Scope::new(&engine);
    let initial = scope.push_local(engine.new_string("start"));
    let cell = scope.push_local(engine.new_cell(initial.get()));

    let writer =
        scope.push_local(engine.new_function(Some("writer"), 0, vec![cell.get()], overwrite_captured));
    let reader = scope.push_local(engine.new_function(
        Some("reader"),
        0,
        vec![cell.get()],
        read_captured_into_string_result,
    ));

    let before = engine.call(reader.get(), Value::UNDEFINED, &[]);
    assert_eq!(before.get().to_js_string(engine.heap()), "start");

    engine.call(writer.get(), Value::UNDEFINED, &[]);

    let after = engine.call(reader.get(), Value::UNDEFINED, &[]);
    assert_eq!(after.get().to_js_string(engine.heap()), "b plus one");
}

#[test]
fn cell_survives_gc_while_captured_even_after_its_creating_frame_is_gone() {
    let engine = Engine::new();
    let scope = Scope::new(&engine);
    let root = engine.root();
    let key_fn = scope.push_local(engine.new_string("keep"));

    {
        // A nested scope models the captured variable's declaring
        // activation going away: once this block ends, nothing but the
        // Function's own capture list keeps the Cell alive.
        let inner_scope = Scope::new(&engine);
        let initial = inner_scope.push_local(engine.new_string("captured-value"));
        let cell = inner_scope.push_local(engine.new_cell(initial.get()));
        let function = inner_scope.push_local(engine.new_function(
            Some("reader"),
            0,
            vec![cell.get()],
            read_captured_into_string_result,
        ));
        engine.set_property(root, key_fn.get(), function.get());
    }

    engine.gc();
    let function = engine.get_property(root, key_fn.get());
    let result = engine.call(function, Value::UNDEFINED, &[]);
    assert_eq!(result.get().to_js_string(engine.heap()), "captured-value");
}
