// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Value representation, heap, garbage collector, and closure/activation
//! core for a small ahead-of-time JavaScript-like runtime.
//!
//! This crate has no parser and no bytecode interpreter: "generated code"
//! is just Rust calling [`Engine`] directly, the same way a compiler's
//! output would. What it does own is everything below that boundary: the
//! tagged [`Value`] word, the traced heap, the mark-and-sweep collector,
//! and the shadow-stack rooting discipline that lets native code keep GC
//! references alive across allocations it doesn't control.

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(all(feature = "nan-boxing", feature = "tagged-pointer"))]
compile_error!("features `nan-boxing` and `tagged-pointer` are mutually exclusive");
#[cfg(not(any(feature = "nan-boxing", feature = "tagged-pointer")))]
compile_error!("exactly one of `nan-boxing` or `tagged-pointer` must be enabled");

pub mod engine;
pub mod heap;
pub mod object;
pub mod value;

pub use engine::{
    ArgList, Engine, HeapClass, Local, Options, Retained, ReturnScope, Scope, TypedReturnScope,
};
pub use heap::{
    CellData, FrameData, FunctionData, GcBox, GcStats, Heap, HeapData, HeapPtr, NativeFn, ScopeData,
    StringData, SymbolData,
};
pub use object::{ObjectData, PropertyKey};
pub use value::{TypeOf, Value};
