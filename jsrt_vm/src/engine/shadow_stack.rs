// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The shadow stack: an `Engine`-owned, contiguous run of [`Value`]
//! slots that stands in for the native call stack the GC cannot scan
//! (spec's §4.4, "especially under a Wasm target"). Everything in this
//! module is bookkeeping around one invariant: a scope pops exactly the
//! slots it and its descendants pushed, strict LIFO, no exceptions.

use super::Engine;
use crate::heap::HeapPtr;
use crate::value::Value;
use std::cell::RefCell;
use std::marker::PhantomData;

/// The raw slot array plus a "top" index. `Engine` owns exactly one of
/// these; every [`Scope`]/[`ReturnScope`]/[`ArgList`] borrows it through
/// `&Engine`, never holds it directly.
pub struct ShadowStack {
    slots: RefCell<Vec<Value>>,
    capacity: usize,
}

impl ShadowStack {
    pub(crate) fn new(capacity: usize) -> ShadowStack {
        ShadowStack { slots: RefCell::new(Vec::with_capacity(capacity.min(1024))), capacity }
    }

    /// Append `v`, returning the index of its slot. Stable until popped
    /// by a `pop_to` at or below this index.
    pub(crate) fn push(&self, v: Value) -> usize {
        let mut slots = self.slots.borrow_mut();
        assert!(slots.len() < self.capacity, "shadow stack overflow: increase shadow_stack_capacity");
        slots.push(v);
        slots.len() - 1
    }

    /// Reset the top to `base`. `base` must not exceed the current top:
    /// popping to a point above where you are is a misuse bug, not a
    /// silently-ignored no-op (spec's §7 "misuse" policy: abort).
    pub(crate) fn pop_to(&self, base: usize) {
        let mut slots = self.slots.borrow_mut();
        assert!(base <= slots.len(), "popTo(base) above current shadow-stack top");
        slots.truncate(base);
    }

    pub(crate) fn top(&self) -> usize {
        self.slots.borrow().len()
    }

    pub(crate) fn get(&self, index: usize) -> Value {
        self.slots.borrow()[index]
    }

    pub(crate) fn set(&self, index: usize, value: Value) {
        self.slots.borrow_mut()[index] = value;
    }

    /// Every heap pointer currently rooted by the stack, for the
    /// collector to walk as one of its root sets (spec's §4.3, root 4).
    pub(crate) fn trace_roots(&self, worklist: &mut Vec<HeapPtr>) {
        for value in self.slots.borrow().iter() {
            if let Some(ptr) = value.as_heap_ptr_checked() {
                worklist.push(ptr);
            }
        }
    }
}

/// An owning reference to one shadow-stack slot. Reads and writes go
/// through the slot itself, so a GC that runs between two reads of the
/// same `Local` always sees the latest value; there is nothing cached
/// on this handle to go stale.
///
/// `Local<'a>` is produced by `&'a` methods on [`Scope`]/[`ReturnScope`]/
/// [`ArgList`], which ties its lifetime to the owning token: the
/// borrow-checker requires the token to still be alive (not dropped)
/// for as long as any `Local` it produced is used, which is exactly
/// spec's "Locals must never outlive the Scope that contained their
/// `pushLocal`".
#[derive(Clone, Copy)]
pub struct Local<'a> {
    pub(super) engine: &'a Engine,
    pub(super) index: usize,
}

impl<'a> Local<'a> {
    pub fn get(&self) -> Value {
        self.engine.shadow_stack().get(self.index)
    }

    pub fn set(&self, value: Value) {
        self.engine.shadow_stack().set(self.index, value);
    }

    pub fn dump(&self) -> String {
        self.get().dump(self.engine.heap())
    }
}

/// Marker for the handful of heap kinds a [`Retained`] may be
/// constrained to. `downcast` panics (a misuse bug, spec's §7) rather
/// than returning `Option`: callers only ever retain a pointer they
/// just allocated as that exact kind.
pub trait HeapClass {
    fn downcast(data: &crate::heap::HeapData) -> &Self;
}

impl HeapClass for crate::heap::StringData {
    fn downcast(data: &crate::heap::HeapData) -> &Self {
        match data {
            crate::heap::HeapData::String(s) => s,
            _ => panic!("Retained<StringData> pointed at a non-String heap value"),
        }
    }
}

impl HeapClass for crate::heap::SymbolData {
    fn downcast(data: &crate::heap::HeapData) -> &Self {
        match data {
            crate::heap::HeapData::Symbol(s) => s,
            _ => panic!("Retained<SymbolData> pointed at a non-Symbol heap value"),
        }
    }
}

impl HeapClass for crate::object::ObjectData {
    fn downcast(data: &crate::heap::HeapData) -> &Self {
        match data {
            crate::heap::HeapData::Object(o) => o,
            _ => panic!("Retained<ObjectData> pointed at a non-Object heap value"),
        }
    }
}

impl HeapClass for crate::heap::FunctionData {
    fn downcast(data: &crate::heap::HeapData) -> &Self {
        match data {
            crate::heap::HeapData::Function(f) => f,
            _ => panic!("Retained<FunctionData> pointed at a non-Function heap value"),
        }
    }
}

impl HeapClass for crate::heap::CellData {
    fn downcast(data: &crate::heap::HeapData) -> &Self {
        match data {
            crate::heap::HeapData::Cell(c) => c,
            _ => panic!("Retained<CellData> pointed at a non-Cell heap value"),
        }
    }
}

/// A [`Local`] statically known to hold a heap pointer of class `T`.
/// Dereferences straight to `&T` instead of forcing callers back
/// through a `match` on [`crate::heap::HeapData`] every time.
pub struct Retained<'a, T: HeapClass> {
    local: Local<'a>,
    _class: PhantomData<T>,
}

impl<'a, T: HeapClass> Retained<'a, T> {
    pub(super) fn new(local: Local<'a>) -> Retained<'a, T> {
        Retained { local, _class: PhantomData }
    }

    pub fn as_value(&self) -> Value {
        self.local.get()
    }

    pub fn ptr(&self) -> HeapPtr {
        self.local.get().as_heap_ptr_checked().expect("Retained value is not a heap pointer")
    }
}

impl<'a, T: HeapClass> std::ops::Deref for Retained<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        T::downcast(&self.local.engine.heap().get(self.ptr()).data)
    }
}

/// Scoped guard: records the shadow-stack top at construction, pops
/// back to it on [`Drop`]. Every local pushed while a `Scope` is alive
/// (directly, or by a nested `Scope`/`ArgList`/`ReturnScope`) is
/// reclaimed the instant this value goes out of scope.
pub struct Scope<'e> {
    engine: &'e Engine,
    base: usize,
}

impl<'e> Scope<'e> {
    pub fn new(engine: &'e Engine) -> Scope<'e> {
        Scope { engine, base: engine.shadow_stack().top() }
    }

    pub fn push_local(&self, value: Value) -> Local<'_> {
        let index = self.engine.shadow_stack().push(value);
        Local { engine: self.engine, index }
    }

    pub fn retain<T: HeapClass>(&self, value: Value) -> Retained<'_, T> {
        let local = self.push_local(value);
        Retained::new(local)
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }
}

impl<'e> Drop for Scope<'e> {
    fn drop(&mut self) {
        self.engine.shadow_stack().pop_to(self.base);
    }
}

/// A [`Scope`] that pre-reserves one slot in the *parent* region before
/// opening its own inner region, so a value constructed inside it can
/// [`escape`](ReturnScope::escape) into the caller's frame instead of
/// being reclaimed when the inner region pops.
///
/// Construction order matters and is the whole trick: reserve first,
/// then open the inner region, so the reserved slot's index is always
/// below everything the inner scope's own locals occupy.
pub struct ReturnScope<'p> {
    engine: &'p Engine,
    parent_index: usize,
    inner_base: usize,
}

impl<'p> ReturnScope<'p> {
    pub fn new(engine: &'p Engine) -> ReturnScope<'p> {
        let parent_index = engine.shadow_stack().push(Value::UNDEFINED);
        let inner_base = engine.shadow_stack().top();
        ReturnScope { engine, parent_index, inner_base }
    }

    pub fn push_local(&self, value: Value) -> Local<'_> {
        let index = self.engine.shadow_stack().push(value);
        Local { engine: self.engine, index }
    }

    /// Copy `value` into the reserved parent slot and hand back a
    /// [`Local`] addressing it. The inner region still pops on `Drop`
    /// immediately after this returns; the reserved slot does not,
    /// because `parent_index < inner_base`.
    pub fn escape(self, value: Value) -> Local<'p> {
        self.engine.shadow_stack().set(self.parent_index, value);
        Local { engine: self.engine, index: self.parent_index }
    }
}

impl<'p> Drop for ReturnScope<'p> {
    fn drop(&mut self) {
        self.engine.shadow_stack().pop_to(self.inner_base);
    }
}

/// Identical to [`ReturnScope`], but the eventual [`escape`](Self::escape)
/// hands back a [`Retained<T>`] instead of a bare [`Local`], for call
/// sites that statically know what kind of heap value they're
/// returning.
pub struct TypedReturnScope<'p, T: HeapClass> {
    inner: ReturnScope<'p>,
    _class: PhantomData<T>,
}

impl<'p, T: HeapClass> TypedReturnScope<'p, T> {
    pub fn new(engine: &'p Engine) -> TypedReturnScope<'p, T> {
        TypedReturnScope { inner: ReturnScope::new(engine), _class: PhantomData }
    }

    pub fn push_local(&self, value: Value) -> Local<'_> {
        self.inner.push_local(value)
    }

    pub fn escape(self, value: Value) -> Retained<'p, T> {
        Retained::new(self.inner.escape(value))
    }
}

/// The contiguous run of actual-argument `Value`s a call site pushes
/// before invoking a function. Owns that run: dropping an `ArgList`
/// pops exactly the slots it pushed, never more.
///
/// `len()` reports the number of arguments the *caller* actually
/// supplied; `get(i)` is defined for every `i` up to the callee's
/// declared arity, returning `undefined` for indices between the
/// actual count and the arity (spec's §4.5 padding rule, surfaced here
/// rather than only on the `Frame`, since generated code reads
/// arguments through the `ArgList`, not the `Frame`).
pub struct ArgList<'e> {
    pub(super) engine: &'e Engine,
    pub(super) base: usize,
    pub(super) actual_len: usize,
    pub(super) arity: usize,
}

impl<'e> ArgList<'e> {
    pub fn len(&self) -> usize {
        self.actual_len
    }

    pub fn is_empty(&self) -> bool {
        self.actual_len == 0
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn get(&self, index: usize) -> Value {
        if index < self.actual_len {
            self.engine.shadow_stack().get(self.base + index)
        } else {
            assert!(index < self.arity, "ArgList index {index} out of bounds (arity {})", self.arity);
            Value::UNDEFINED
        }
    }
}

impl<'e> Drop for ArgList<'e> {
    fn drop(&mut self) {
        self.engine.shadow_stack().pop_to(self.base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::StringData;

    /// `Scope::retain` gives back a `Retained<StringData>` that derefs
    /// straight to the string's contents, and stays valid across a
    /// collection because it's rooted on the shadow stack like any
    /// other `Local`.
    #[test]
    fn retain_derefs_to_the_underlying_heap_data_and_survives_a_collection() {
        let engine = Engine::new();
        let scope = Scope::new(&engine);
        let value = engine.new_string("hello");
        let retained: Retained<StringData> = scope.retain(value);
        assert_eq!(&*retained.contents, "hello");
        engine.gc();
        assert_eq!(&*retained.contents, "hello");
        assert_eq!(retained.as_value(), value);
    }

    /// `TypedReturnScope::escape` hands the caller a `Retained<T>` in
    /// the parent region, exactly like `ReturnScope::escape` hands back
    /// a bare `Local`, but with `Deref` already wired to `T`.
    #[test]
    fn typed_return_scope_escapes_a_retained_value_into_the_parent_scope() {
        let engine = Engine::new();
        let top_before = engine.shadow_stack().top();
        let retained: Retained<StringData> = {
            let rs: TypedReturnScope<StringData> = TypedReturnScope::new(&engine);
            let value = engine.new_string("escaped");
            rs.escape(value)
        };
        assert_eq!(&*retained.contents, "escaped");
        assert_eq!(engine.shadow_stack().top(), top_before + 1);
    }

    /// Spec §8's quantified property 6: for any matched `Scope` pair,
    /// the shadow-stack top on exit equals the top on entry, no matter
    /// how many locals were pushed (directly or by a nested scope)
    /// while it was alive.
    #[test]
    fn scope_pops_back_to_its_entry_top() {
        let engine = Engine::new();
        let top_before = engine.shadow_stack().top();
        {
            let scope = Scope::new(&engine);
            scope.push_local(Value::from_int32(1));
            scope.push_local(Value::from_int32(2));
            {
                let nested = Scope::new(&engine);
                nested.push_local(Value::from_int32(3));
            }
        }
        assert_eq!(engine.shadow_stack().top(), top_before);
    }

    /// Spec §8's quantified property 7: a `ReturnScope`'s parent top on
    /// exit is exactly entry + 1, regardless of how many locals were
    /// pushed in its own inner region.
    #[test]
    fn return_scope_reserves_exactly_one_parent_slot() {
        let engine = Engine::new();
        let top_before = engine.shadow_stack().top();
        {
            let rs = ReturnScope::new(&engine);
            rs.push_local(Value::from_int32(10));
            rs.push_local(Value::from_int32(20));
            rs.push_local(Value::from_int32(30));
            let escaped = rs.escape(Value::from_int32(99));
            assert_eq!(escaped.get(), Value::from_int32(99));
        }
        assert_eq!(engine.shadow_stack().top(), top_before + 1);
    }

    #[test]
    fn arg_list_pops_exactly_the_slots_it_pushed() {
        let engine = Engine::new();
        let top_before = engine.shadow_stack().top();
        {
            let base = engine.shadow_stack().top();
            engine.shadow_stack().push(Value::from_int32(1));
            engine.shadow_stack().push(Value::from_int32(2));
            let args = ArgList { engine: &engine, base, actual_len: 2, arity: 2 };
            assert_eq!(args.get(0), Value::from_int32(1));
            assert_eq!(args.get(1), Value::from_int32(2));
        }
        assert_eq!(engine.shadow_stack().top(), top_before);
    }

    #[test]
    fn local_reads_see_writes_through_the_same_slot() {
        let engine = Engine::new();
        let scope = Scope::new(&engine);
        let local = scope.push_local(Value::from_int32(1));
        assert_eq!(local.get(), Value::from_int32(1));
        local.set(Value::from_int32(2));
        assert_eq!(local.get(), Value::from_int32(2));
    }

    #[test]
    #[should_panic(expected = "popTo(base) above current shadow-stack top")]
    fn pop_to_above_current_top_is_a_misuse_abort() {
        let engine = Engine::new();
        let top = engine.shadow_stack().top();
        engine.shadow_stack().pop_to(top + 1);
    }
}
