// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scenario 2 (spec §8, *Simple GC*) plus the quantified GC invariants:
//! mark bit clears on every survivor, `gc(); gc()` is idempotent, and a
//! sweep never reaches outside what the roots can prove reachable.

mod support;

use jsrt_vm::{Engine, Scope, Value};

#[test]
fn unreachable_object_is_collected_reachable_one_survives() {
    let engine = Engine::new();
    let scope = Scope::new(&engine);
    let root = engine.root();
    let key_x = scope.push_local(engine.new_string("x"));
    let a = scope.push_local(engine.new_object(None));
    engine.set_property(root, key_x.get(), a.get());

    // `b` is never rooted: not attached to `root`, not kept on the
    // shadow stack past this block.
    {
        let _b = engine.new_object(None);
    }

    let stats = engine.gc();
    assert!(stats.freed >= 1, "the unrooted object should have been swept");
    assert!(
        engine.get_property(root, key_x.get()) != Value::UNDEFINED,
        "`a` must survive because it's reachable from the root"
    );
}

#[test]
fn repeated_gc_is_idempotent() {
    let engine = Engine::new();
    let scope = Scope::new(&engine);
    let root = engine.root();
    let key = scope.push_local(engine.new_string("kept"));
    let value = scope.push_local(engine.new_object(None));
    engine.set_property(root, key.get(), value.get());

    let first = engine.gc();
    let live_after_first = engine.heap().live_count();
    let second = engine.gc();
    assert_eq!(second.freed, 0, "nothing new became unreachable between the two calls");
    assert_eq!(engine.heap().live_count(), live_after_first);
    assert_eq!(first.live_after, second.live_after);
}

#[test]
fn survivors_have_their_mark_bit_cleared_after_gc() {
    let engine = Engine::new();
    let scope = Scope::new(&engine);
    let root = engine.root();
    let key = scope.push_local(engine.new_string("still-there"));
    let value = scope.push_local(engine.new_object(None));
    engine.set_property(root, key.get(), value.get());

    engine.gc();
    // There's no direct accessor for a live object's own mark bit from
    // outside `jsrt_vm::heap`, so this is observed indirectly: a second
    // `gc()` must still be able to mark-then-clear every survivor
    // (if a stale `true` mark bit leaked out of sweep, the *next*
    // collection would under-count `freed` for anything newly dead
    // sharing that bit's path). Cross-checked against
    // `repeated_gc_is_idempotent`'s stronger, `freed == 0` assertion.
    let stats = engine.gc();
    assert_eq!(stats.freed, 0);
}

#[test]
fn cyclic_object_graph_is_collected_when_unreachable() {
    let engine = Engine::new();
    let before;
    {
        let scope = Scope::new(&engine);
        let key_next = scope.push_local(engine.new_string("next"));
        let a = scope.push_local(engine.new_object(None));
        let b = scope.push_local(engine.new_object(None));
        engine.set_property(a.get(), key_next.get(), b.get());
        engine.set_property(b.get(), key_next.get(), a.get());
        before = engine.heap().live_count();
        // `a`/`b` reference each other but neither is rooted once this
        // scope pops: a reference-counting collector would leak this
        // cycle forever, which is exactly why spec's design notes (§9)
        // mandate tracing instead.
    }
    let stats = engine.gc();
    assert!(stats.freed >= 2, "cycle must not keep itself alive past the scope that rooted it");
    assert!(engine.heap().live_count() < before);
}

#[test]
fn force_gc_runs_a_collection_on_every_allocation() {
    use jsrt_vm::Options;
    let engine = Engine::with_options(Options { force_gc: true, ..Options::default() });
    let scope = Scope::new(&engine);
    let root = engine.root();
    let key = scope.push_local(engine.new_string("k"));
    let value = scope.push_local(engine.new_object(None));
    engine.set_property(root, key.get(), value.get());
    // Under `force_gc`, `value` surviving several more allocations
    // after it was rooted is itself the regression test: if any
    // allocation along the way triggered a GC that didn't see `value`
    // as reachable, this property lookup would come back `undefined`.
    for i in 0..8 {
        let _scratch = engine.new_string(format!("scratch-{i}"));
    }
    assert_eq!(engine.get_property(root, key.get()), value.get());
}
