// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The word-sized tagged [`Value`], the unit every other module in this
//! crate passes around: an immediate (double, int32, bool, undefined,
//! null, the internal "deleted" hole) or a tag-and-pointer to something
//! living on the traced heap.
//!
//! The actual bit layout is feature-selected (exactly one of `nan-boxing`
//! or `tagged-pointer` must be enabled; see each submodule for its
//! layout) but the public surface of `Value` is identical either way.

#[cfg(feature = "nan-boxing")]
mod nan_box;
#[cfg(feature = "tagged-pointer")]
mod tagged_ptr;

#[cfg(feature = "nan-boxing")]
use nan_box as repr;
#[cfg(feature = "tagged-pointer")]
use tagged_ptr as repr;

use crate::heap::{Heap, HeapData, HeapPtr};
use std::hash::{Hash, Hasher};

/// A word-sized JS-ish value: either an immediate or a pointer into the
/// traced heap. Copy, because every immediate and every heap reference
/// fits in one machine word; there is nothing to clone.
#[derive(Clone, Copy)]
pub struct Value(u64);

/// The result of [`Value::type_of`], mirroring the handful of `typeof`
/// results this core's data model distinguishes (no `bigint`, no
/// `undefined`-vs-missing distinction beyond this single tag; see
/// spec's Non-goals on a standard library and exceptions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOf {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Symbol,
    Object,
    Function,
}

impl Value {
    pub const UNDEFINED: Value = Value(repr::UNDEFINED);
    pub const NULL: Value = Value(repr::NULL);
    /// Internal hole value for an uninitialized [`crate::heap::HeapData::Cell`]
    /// binding or a freshly-grown-but-unwritten property slot. Never
    /// observable through [`Engine`](crate::Engine)'s public API; reading
    /// one back out is a bug in this crate, not in a caller.
    pub const DELETED: Value = Value(repr::DELETED);

    #[inline]
    pub const fn from_bool(value: bool) -> Value {
        Value(repr::encode_bool(value))
    }

    #[inline]
    pub const fn from_int32(value: i32) -> Value {
        Value(repr::encode_int32(value))
    }

    #[inline]
    pub(crate) fn from_heap_ptr(ptr: HeapPtr) -> Value {
        Value(repr::encode_heap_ptr(ptr))
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.0 == repr::UNDEFINED
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == repr::NULL
    }

    #[inline]
    pub fn is_nullish(&self) -> bool {
        self.is_undefined() || self.is_null()
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        repr::is_bool(self.0)
    }

    #[inline]
    pub fn as_bool(&self) -> bool {
        assert!(self.is_bool(), "Value::as_bool on a non-boolean value");
        repr::decode_bool(self.0)
    }

    #[inline]
    pub fn is_int32(&self) -> bool {
        repr::is_int32(self.0)
    }

    #[inline]
    pub fn as_int32(&self) -> i32 {
        assert!(self.is_int32(), "Value::as_int32 on a non-int32 value");
        repr::decode_int32(self.0)
    }

    /// O(1) predicate: does this `Value` hold a pointer into the traced
    /// heap, as opposed to an immediate. Part of the public predicate
    /// set alongside `is_double`/`is_int32`/`is_bool`/`is_null`/
    /// `is_undefined`/`is_string`/`is_symbol`/`is_object`/`is_function`.
    #[inline]
    pub fn is_heap(&self) -> bool {
        repr::is_heap_ptr(self.0)
    }

    #[inline]
    pub(crate) fn as_heap_ptr(&self) -> HeapPtr {
        repr::decode_heap_ptr(self.0)
    }

    #[cfg(feature = "nan-boxing")]
    #[inline]
    pub fn is_double(&self) -> bool {
        repr::is_f64(self.0)
    }

    #[cfg(feature = "nan-boxing")]
    #[inline]
    pub fn from_double(value: f64) -> Value {
        Value(repr::encode_f64(value))
    }

    #[cfg(feature = "nan-boxing")]
    #[inline]
    pub fn as_double(&self) -> f64 {
        assert!(self.is_double(), "Value::as_double on a non-double value");
        repr::decode_f64(self.0)
    }

    /// Under `tagged-pointer`, doubles are boxed, so recognizing one and
    /// reading it back both need the heap. Under `nan-boxing` `heap` is
    /// unused; the signature is kept uniform across both encodings so
    /// callers don't need feature-gated code of their own.
    #[cfg(feature = "tagged-pointer")]
    #[inline]
    pub fn is_double(&self, heap: &Heap) -> bool {
        self.is_heap() && matches!(heap.get(self.as_heap_ptr()).data, HeapData::Box(_))
    }

    #[cfg(feature = "tagged-pointer")]
    pub fn from_double(engine: &crate::Engine, value: f64) -> Value {
        Value::from_heap_ptr(engine.alloc(HeapData::Box(value)))
    }

    #[cfg(feature = "tagged-pointer")]
    pub fn as_double(&self, heap: &Heap) -> f64 {
        match heap.get(self.as_heap_ptr()).data {
            HeapData::Box(value) => value,
            _ => panic!("Value::as_double on a non-double value"),
        }
    }

    pub fn is_string(&self, heap: &Heap) -> bool {
        self.is_heap() && matches!(heap.get(self.as_heap_ptr()).data, HeapData::String(_))
    }

    pub fn is_symbol(&self, heap: &Heap) -> bool {
        self.is_heap() && matches!(heap.get(self.as_heap_ptr()).data, HeapData::Symbol(_))
    }

    pub fn is_object(&self, heap: &Heap) -> bool {
        self.is_heap() && matches!(heap.get(self.as_heap_ptr()).data, HeapData::Object(_))
    }

    pub fn is_function(&self, heap: &Heap) -> bool {
        self.is_heap() && matches!(heap.get(self.as_heap_ptr()).data, HeapData::Function(_))
    }

    pub fn type_of(&self, heap: &Heap) -> TypeOf {
        if self.is_undefined() {
            return TypeOf::Undefined;
        }
        if self.is_null() {
            return TypeOf::Null;
        }
        if self.is_bool() {
            return TypeOf::Boolean;
        }
        if self.is_int32() {
            return TypeOf::Number;
        }
        #[cfg(feature = "nan-boxing")]
        if self.is_double() {
            return TypeOf::Number;
        }
        if self.is_heap() {
            return match heap.get(self.as_heap_ptr()).data {
                #[cfg(feature = "tagged-pointer")]
                HeapData::Box(_) => TypeOf::Number,
                HeapData::String(_) => TypeOf::String,
                HeapData::Symbol(_) => TypeOf::Symbol,
                HeapData::Function(_) => TypeOf::Function,
                HeapData::Object(_) | HeapData::Cell(_) | HeapData::Scope(_) | HeapData::Frame(_) => {
                    TypeOf::Object
                }
                #[cfg(not(feature = "tagged-pointer"))]
                HeapData::Box(_) => unreachable!("Box variant only allocated under tagged-pointer"),
            };
        }
        unreachable!("every Value falls into one of the tags above");
    }

    /// `ToNumber` for the subset of types this core handles directly:
    /// numbers pass through, booleans become 1.0/0.0, `null` becomes
    /// 0.0, everything else (undefined, objects, strings, symbols)
    /// becomes NaN. A full `ToNumber` (string parsing, `valueOf`) is
    /// stdlib surface this core doesn't own.
    pub fn to_number(&self, heap: &Heap) -> f64 {
        if self.is_int32() {
            return self.as_int32() as f64;
        }
        #[cfg(feature = "nan-boxing")]
        if self.is_double() {
            return self.as_double();
        }
        #[cfg(feature = "tagged-pointer")]
        if self.is_double(heap) {
            return self.as_double(heap);
        }
        if self.is_bool() {
            return if self.as_bool() { 1.0 } else { 0.0 };
        }
        if self.is_null() {
            return 0.0;
        }
        f64::NAN
    }

    /// `ToInt32`, per the usual two's-complement modulo-2^32 truncation.
    pub fn to_int32(&self, heap: &Heap) -> i32 {
        if self.is_int32() {
            return self.as_int32();
        }
        let n = self.to_number(heap);
        if !n.is_finite() {
            return 0;
        }
        n as i64 as i32
    }

    /// `ToString` for the subset of types this core handles directly
    /// (spec.md §4.1): numbers/booleans/strings format as their usual
    /// textual form, `null`/`undefined` as their literal names, objects
    /// as the fixed `"[object Object]"`, functions as
    /// `"[Function: <name>]"`. A full `ToString` (`valueOf`/`toString`
    /// overrides) is stdlib surface this core doesn't own.
    pub fn to_js_string(&self, heap: &Heap) -> String {
        if self.is_undefined() {
            return "undefined".to_string();
        }
        if self.is_null() {
            return "null".to_string();
        }
        if self.is_bool() {
            return self.as_bool().to_string();
        }
        if self.is_int32() {
            return self.as_int32().to_string();
        }
        #[cfg(feature = "nan-boxing")]
        if self.is_double() {
            return self.as_double().to_string();
        }
        #[cfg(feature = "tagged-pointer")]
        if self.is_double(heap) {
            return self.as_double(heap).to_string();
        }
        if self.is_string(heap) {
            if let HeapData::String(data) = &heap.get(self.as_heap_ptr()).data {
                return data.contents.to_string();
            }
        }
        if self.is_function(heap) {
            if let HeapData::Function(data) = &heap.get(self.as_heap_ptr()).data {
                return match &data.name {
                    Some(name) => format!("[Function: {name}]"),
                    None => "[Function: <anonymous>]".to_string(),
                };
            }
        }
        if self.is_object(heap) {
            return "[object Object]".to_string();
        }
        if self.is_symbol(heap) {
            if let HeapData::Symbol(data) = &heap.get(self.as_heap_ptr()).data {
                return match &data.description {
                    Some(desc) => format!("Symbol({desc})"),
                    None => "Symbol()".to_string(),
                };
            }
        }
        unreachable!("every Value falls into one of the tags handled above")
    }

    /// Raw-bits equality augmented with string content equality: two
    /// distinct heap strings with identical bytes compare equal, every
    /// other heap value compares by identity (pointer equality, since
    /// raw-bits equality on a heap tag already is pointer equality).
    pub fn same_value(&self, other: &Value, heap: &Heap) -> bool {
        if self.0 == other.0 {
            return true;
        }
        if self.is_string(heap) && other.is_string(heap) {
            let a = heap.get(self.as_heap_ptr());
            let b = heap.get(other.as_heap_ptr());
            if let (HeapData::String(a), HeapData::String(b)) = (&a.data, &b.data) {
                return a.contents == b.contents;
            }
        }
        false
    }

    /// A hash consistent with [`same_value`](Value::same_value): equal
    /// strings hash equal even when they're different heap allocations.
    pub fn hash_value<H: Hasher>(&self, heap: &Heap, state: &mut H) {
        if self.is_string(heap) {
            if let HeapData::String(data) = &heap.get(self.as_heap_ptr()).data {
                data.contents.hash(state);
                return;
            }
        }
        self.0.hash(state);
    }

    pub fn dump(&self, heap: &Heap) -> String {
        if self.is_undefined() {
            return "undefined".to_string();
        }
        if self.is_null() {
            return "null".to_string();
        }
        if *self == Value::DELETED {
            return "<deleted>".to_string();
        }
        if self.is_bool() {
            return self.as_bool().to_string();
        }
        if self.is_int32() {
            return self.as_int32().to_string();
        }
        #[cfg(feature = "nan-boxing")]
        if self.is_double() {
            return self.as_double().to_string();
        }
        if self.is_heap() {
            return heap.get(self.as_heap_ptr()).data.dump(heap);
        }
        "<value>".to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Value {}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value(0x{:016x})", self.0)
    }
}
