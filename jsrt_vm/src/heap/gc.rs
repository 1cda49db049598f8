// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The mark-and-sweep driver itself (spec's §4.3). Synchronous,
//! stop-the-world, non-moving: every call to [`mark_and_sweep`] walks
//! the whole live set to completion before returning.
//!
//! Marking uses an explicit worklist rather than native recursion.
//! spec.md §4.3 allows either, and an explicit `Vec`-as-stack means a
//! deeply nested object graph can't blow the collector's own call
//! stack the way depth-first recursion would.

use super::{GcBox, HeapPtr};
use ahash::AHashSet;

/// A summary of one collection cycle, returned to callers that want to
/// log or assert on it (the `print_internals` diagnostic line, and the
/// test suite's "did GC free what I expected" checks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub live_before: usize,
    pub live_after: usize,
    pub freed: usize,
}

/// Mark every object reachable from `roots`, then sweep everything in
/// `live` that didn't get marked. `live` is mutated during sweep: the
/// dead are collected into a temporary list first (spec.md §4.3's
/// "sweep must tolerate the live set being mutated during iteration in
/// deterministic ways"), then removed and freed, so the `AHashSet`
/// itself is never mutated while being iterated.
pub(crate) fn mark_and_sweep(live: &mut AHashSet<HeapPtr>, roots: &[HeapPtr]) -> GcStats {
    let live_before = live.len();

    let mut worklist: Vec<HeapPtr> = roots.to_vec();
    while let Some(ptr) = worklist.pop() {
        // SAFETY: every pointer reachable from a root, directly or
        // transitively, belongs to `live` by the crate's own invariant;
        // violating that is the "sweep root outside the live set" bug
        // spec.md §4.3 says to abort on, caught below instead of here
        // so every root gets the same bounds check.
        let gc_box = unsafe { ptr.as_ref() };
        if gc_box.marked.get() {
            continue;
        }
        gc_box.marked.set(true);
        gc_box.data.trace_outgoing(&mut worklist);
    }

    let mut dead = Vec::new();
    for &ptr in live.iter() {
        let gc_box: &GcBox = unsafe { ptr.as_ref() };
        if !gc_box.marked.get() {
            dead.push(ptr);
        }
    }

    for ptr in &dead {
        let removed = live.remove(ptr);
        assert!(removed, "GC tried to sweep a pointer outside the live set");
        // SAFETY: `ptr` was allocated by `Heap::alloc` via `Box::into_raw`
        // and, being unmarked, is unreachable from every root; nothing
        // else in this crate holds a copy of a `HeapPtr` once it's gone.
        unsafe {
            drop(Box::from_raw(ptr.as_ptr()));
        }
    }

    for &ptr in live.iter() {
        let gc_box: &GcBox = unsafe { ptr.as_ref() };
        gc_box.marked.set(false);
    }

    GcStats { live_before, live_after: live.len(), freed: dead.len() }
}
