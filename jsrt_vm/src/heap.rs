// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The traced heap: one tagged [`HeapData`] enum, one allocation type
//! ([`GcBox`]), no trait objects, no vtables. Every heap kind knows how to
//! report the [`Value`]s and heap pointers it keeps alive
//! ([`HeapData::trace_outgoing`]); the collector in [`gc`] never needs to
//! know more about an object than that.

pub(crate) mod gc;

use crate::engine::Engine;
use crate::object::ObjectData;
use crate::value::Value;
use ahash::AHashSet;
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

pub use gc::GcStats;

/// A pointer to a live heap allocation. Always non-null: the allocator
/// never hands out a null address, which is what lets the `nan-boxing`
/// encoding treat the all-zero word as unambiguously "the double
/// `-Infinity`" rather than "a null pointer" (see `value::nan_box`).
pub type HeapPtr = NonNull<GcBox>;

/// One heap allocation: a mark bit plus its payload. The mark bit lives
/// next to the data rather than in a side table, so a `HeapPtr` is
/// simultaneously "the object" and "the node the collector walks":
/// there's no parallel structure to keep in sync.
pub struct GcBox {
    pub(crate) marked: Cell<bool>,
    pub data: HeapData,
}

/// The tagged union of every thing this core can allocate. spec's own
/// Design Notes call for exactly this shape over a deep virtual
/// hierarchy: "a tagged variant for the object kind plus a small
/// interface; subclass-specific data lives in the variants."
pub enum HeapData {
    /// A boxed `f64`. Only ever allocated under the `tagged-pointer`
    /// feature, where a double doesn't fit inline next to a tag bit.
    Box(f64),
    String(StringData),
    Symbol(SymbolData),
    /// The sole capture mechanism for closures: a one-slot mutable box a
    /// `Function`'s captured variables point at, outliving the frame
    /// that declared them.
    Cell(CellData),
    /// A binding environment record, analogous to spec's Scope object.
    /// Implemented in full (it is part of the data model and must be
    /// traced correctly) but never constructed by [`Engine::call`] or
    /// the closure path, which capture through [`HeapData::Cell`]
    /// directly; an embedder can still allocate one explicitly through
    /// [`Engine::new_binding_scope`](crate::Engine::new_binding_scope).
    Scope(ScopeData),
    Object(ObjectData),
    Function(FunctionData),
    /// An activation record. Forms a parent chain back through the
    /// caller's frames; that chain is itself a GC root path, not just
    /// heap-internal bookkeeping (see `engine::closure::call`).
    Frame(FrameData),
}

pub struct StringData {
    pub contents: Box<str>,
}

pub struct SymbolData {
    pub description: Option<Box<str>>,
}

pub struct CellData {
    pub value: Cell<Value>,
}

pub struct ScopeData {
    pub parent: Option<HeapPtr>,
    pub bindings: RefCell<Vec<Value>>,
}

/// A native entry point: the thing a `HeapData::Function` invokes.
/// There is no bytecode to interpret; "compiled" code is just a Rust
/// `fn` making the same `Engine` calls a real code generator would
/// emit. Arguments are `(engine, callee, this, args)`, matching spec's
/// §4.5 "the body pointer is invoked with (Function, this, ArgList)".
/// `callee` and `this` are plain `Value`s (not raw `HeapPtr`s) so a
/// body written outside this crate never needs the unchecked handle,
/// only the same `Value` surface every other embedding operation uses.
pub type NativeFn = for<'e> fn(&'e Engine, Value, Value, &crate::engine::ArgList<'e>) -> Value;

pub struct FunctionData {
    pub name: Option<Box<str>>,
    pub arity: u32,
    /// Cells captured from an enclosing activation, in declaration
    /// order. Looked up by generated code via a captured-variable index,
    /// not by name.
    pub captured: Vec<HeapPtr>,
    pub entry: NativeFn,
    /// Function is-a Object (spec's data-model table): a Function can
    /// carry its own properties (e.g. a `.length`/`.name` an embedder
    /// chooses to materialize) in addition to its capture list.
    pub object: ObjectData,
}

pub struct FrameData {
    pub parent: Option<HeapPtr>,
    pub function: Option<HeapPtr>,
    pub this: Value,
    /// The callee's arguments, padded to its declared arity by
    /// [`engine::closure::call`](crate::engine::closure::call). spec's
    /// data-model table also names plain, never-captured declared
    /// locals as living in this "ordered argument+local Value slots"
    /// array; in this implementation those locals live on the shadow
    /// stack as [`Local`](crate::engine::Local)s instead, so `locals`
    /// here only ever holds the argument run.
    pub locals: RefCell<Vec<Value>>,
}

impl HeapData {
    /// Push every `Value`/`HeapPtr` this object keeps alive onto
    /// `worklist`. Plain field-by-field marking, matching the
    /// destructure-then-mark shape the rest of this crate's grounding
    /// corpus uses for `mark_values`/`sweep_values`.
    pub(crate) fn trace_outgoing(&self, worklist: &mut Vec<HeapPtr>) {
        match self {
            HeapData::Box(_) | HeapData::String(_) | HeapData::Symbol(_) => {}
            HeapData::Cell(CellData { value }) => {
                if let Some(ptr) = value.get().as_heap_ptr_checked() {
                    worklist.push(ptr);
                }
            }
            HeapData::Scope(ScopeData { parent, bindings }) => {
                worklist.extend(parent.iter().copied());
                for value in bindings.borrow().iter() {
                    if let Some(ptr) = value.as_heap_ptr_checked() {
                        worklist.push(ptr);
                    }
                }
            }
            HeapData::Object(data) => data.trace_outgoing(worklist),
            HeapData::Function(FunctionData { captured, object, .. }) => {
                worklist.extend(captured.iter().copied());
                object.trace_outgoing(worklist);
            }
            HeapData::Frame(FrameData { parent, function, this, locals }) => {
                worklist.extend(parent.iter().copied());
                worklist.extend(function.iter().copied());
                if let Some(ptr) = this.as_heap_ptr_checked() {
                    worklist.push(ptr);
                }
                for value in locals.borrow().iter() {
                    if let Some(ptr) = value.as_heap_ptr_checked() {
                        worklist.push(ptr);
                    }
                }
            }
        }
    }

    pub(crate) fn dump(&self, heap: &Heap) -> String {
        match self {
            HeapData::Box(value) => value.to_string(),
            HeapData::String(data) => format!("{:?}", data.contents),
            HeapData::Symbol(data) => match &data.description {
                Some(desc) => format!("Symbol({desc})"),
                None => "Symbol()".to_string(),
            },
            HeapData::Cell(data) => format!("Cell({})", data.value.get().dump(heap)),
            HeapData::Scope(data) => {
                let bindings: Vec<String> = data.bindings.borrow().iter().map(|v| v.dump(heap)).collect();
                format!("Scope({})", bindings.join(", "))
            }
            HeapData::Object(data) => data.dump(heap),
            HeapData::Function(data) => match &data.name {
                Some(name) => format!("function {name}() {}", data.object.dump(heap)),
                None => format!("function <anonymous>() {}", data.object.dump(heap)),
            },
            HeapData::Frame(_) => "<frame>".to_string(),
        }
    }
}

/// The live-object set and allocator. Owned by [`Engine`]; never
/// constructed standalone, since every allocation needs to be reachable
/// from a root the `Engine` knows how to enumerate.
pub struct Heap {
    live: RefCell<AHashSet<HeapPtr>>,
}

impl Heap {
    pub(crate) fn new() -> Heap {
        Heap { live: RefCell::new(AHashSet::new()) }
    }

    pub(crate) fn alloc(&self, data: HeapData) -> HeapPtr {
        let boxed = Box::new(GcBox { marked: Cell::new(false), data });
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(boxed)) };
        self.live.borrow_mut().insert(ptr);
        ptr
    }

    pub fn get(&self, ptr: HeapPtr) -> &GcBox {
        // SAFETY: every `HeapPtr` handed out by `alloc` stays valid until
        // the collector frees it in `gc::mark_and_sweep`, and a `HeapPtr`
        // only outlives a collection if it was reachable from a root the
        // collector traced.
        unsafe { ptr.as_ref() }
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub(crate) fn collect(&self, roots: &[HeapPtr]) -> GcStats {
        gc::mark_and_sweep(&mut self.live.borrow_mut(), roots)
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        for ptr in self.live.borrow_mut().drain() {
            // SAFETY: these pointers were allocated by `Box::into_raw` in
            // `alloc` and nothing outside this module can free them early.
            unsafe {
                drop(Box::from_raw(ptr.as_ptr()));
            }
        }
    }
}

impl Value {
    pub(crate) fn as_heap_ptr_checked(&self) -> Option<HeapPtr> {
        if self.is_heap() {
            Some(self.as_heap_ptr())
        } else {
            None
        }
    }
}
