// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Objects: an optional prototype plus a `PropertyKey -> Value` map.
//! Property lookup walks the prototype chain; assignment only ever
//! touches the receiver (see spec's §4.6).

use crate::heap::{Heap, HeapData, HeapPtr};
use crate::value::Value;
use ahash::AHashMap;
use std::cell::{Cell, RefCell};

/// The restricted sum of `Value`s that may be used as an object key:
/// a String or a Symbol, never anything else. spec's Open Question (a)
/// is resolved here exactly as spec.md directs: normalizing any other
/// Value is a misuse abort, not a silent coerce-to-string.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PropertyKey(Value);

impl PropertyKey {
    /// Validate `value` as a property key. Returns `None` for anything
    /// that isn't a String or Symbol; callers that already know their
    /// key is well-formed (the only path generated code takes) use
    /// `.expect(...)` on the result, turning a malformed key into the
    /// misuse-abort spec.md §7 calls for.
    pub fn try_from_value(value: Value, heap: &Heap) -> Option<PropertyKey> {
        if value.is_string(heap) || value.is_symbol(heap) {
            Some(PropertyKey(value))
        } else {
            None
        }
    }

    pub fn as_value(&self) -> Value {
        self.0
    }
}

/// The map's actual key type: an owned, self-contained form of
/// [`PropertyKey`] that a `HashMap` can hash and compare without a
/// `Heap` in scope. Strings are compared and hashed by content (their
/// bytes are cloned in), matching `Value::same_value`'s string rule;
/// Symbols are compared by heap identity, matching spec's "identity by
/// address". Using this as the actual map key (rather than indexing by
/// a bare `u64` hash, as a first draft of this module did) means a hash
/// collision between two unrelated keys can never alias one key's
/// entry onto another's.
#[derive(Clone, PartialEq, Eq, Hash)]
enum PropertyKeyOwned {
    String(Box<str>),
    Symbol(HeapPtr),
}

impl PropertyKeyOwned {
    fn from_key(key: PropertyKey, heap: &Heap) -> PropertyKeyOwned {
        let ptr = key.as_value().as_heap_ptr_checked().expect("PropertyKey is always a heap pointer");
        match &heap.get(ptr).data {
            HeapData::String(data) => PropertyKeyOwned::String(data.contents.clone()),
            HeapData::Symbol(_) => PropertyKeyOwned::Symbol(ptr),
            _ => unreachable!("PropertyKey::try_from_value only ever admits String or Symbol"),
        }
    }

    fn dump(&self, heap: &Heap) -> String {
        match self {
            PropertyKeyOwned::String(s) => format!("{s:?}"),
            PropertyKeyOwned::Symbol(ptr) => match &heap.get(*ptr).data {
                HeapData::Symbol(data) => match &data.description {
                    Some(desc) => format!("Symbol({desc})"),
                    None => "Symbol()".to_string(),
                },
                _ => unreachable!("PropertyKeyOwned::Symbol always points at a Symbol"),
            },
        }
    }
}

struct PropertyKeyMap(AHashMap<PropertyKeyOwned, Value>);

pub struct ObjectData {
    /// Mutable so a chain can be reshaped after construction (spec.md
    /// §8 scenario 5, "remove `a` from the chain") without needing a
    /// wholly new `Object` allocation in its place.
    prototype: Cell<Option<HeapPtr>>,
    properties: RefCell<PropertyKeyMap>,
}

impl ObjectData {
    pub(crate) fn new(prototype: Option<HeapPtr>) -> ObjectData {
        ObjectData {
            prototype: Cell::new(prototype),
            properties: RefCell::new(PropertyKeyMap(AHashMap::new())),
        }
    }

    pub(crate) fn prototype(&self) -> Option<HeapPtr> {
        self.prototype.get()
    }

    pub(crate) fn set_prototype(&self, prototype: Option<HeapPtr>) {
        self.prototype.set(prototype);
    }

    pub(crate) fn get_own(&self, key: PropertyKey, heap: &Heap) -> Option<Value> {
        let owned = PropertyKeyOwned::from_key(key, heap);
        self.properties.borrow().0.get(&owned).copied()
    }

    pub(crate) fn set_own(&self, key: PropertyKey, value: Value, heap: &Heap) {
        let owned = PropertyKeyOwned::from_key(key, heap);
        self.properties.borrow_mut().0.insert(owned, value);
    }

    pub(crate) fn trace_outgoing(&self, worklist: &mut Vec<HeapPtr>) {
        if let Some(prototype) = self.prototype.get() {
            worklist.push(prototype);
        }
        for (key, value) in self.properties.borrow().0.iter() {
            if let PropertyKeyOwned::Symbol(ptr) = key {
                worklist.push(*ptr);
            }
            if let Some(ptr) = value.as_heap_ptr_checked() {
                worklist.push(ptr);
            }
        }
    }

    pub(crate) fn dump(&self, heap: &Heap) -> String {
        let entries: Vec<String> = self
            .properties
            .borrow()
            .0
            .iter()
            .map(|(key, value)| format!("{}: {}", key.dump(heap), value.dump(heap)))
            .collect();
        format!("{{ {} }}", entries.join(", "))
    }
}

pub(crate) fn get_property(heap: &Heap, object: HeapPtr, key: PropertyKey) -> Value {
    let mut current = Some(object);
    while let Some(ptr) = current {
        let data = match &heap.get(ptr).data {
            HeapData::Object(data) => data,
            HeapData::Function(function) => &function.object,
            _ => panic!("get_property called on a non-object heap value"),
        };
        if let Some(value) = data.get_own(key, heap) {
            return value;
        }
        current = data.prototype();
    }
    Value::UNDEFINED
}

pub(crate) fn set_property(heap: &Heap, object: HeapPtr, key: PropertyKey, value: Value) {
    let data = match &heap.get(object).data {
        HeapData::Object(data) => data,
        HeapData::Function(function) => &function.object,
        _ => panic!("set_property called on a non-object heap value"),
    };
    data.set_own(key, value, heap);
}

pub(crate) fn set_prototype(heap: &Heap, object: HeapPtr, prototype: Option<HeapPtr>) {
    let data = match &heap.get(object).data {
        HeapData::Object(data) => data,
        HeapData::Function(function) => &function.object,
        _ => panic!("set_prototype called on a non-object heap value"),
    };
    data.set_prototype(prototype);
}
