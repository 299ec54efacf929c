// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [10.1 Ordinary Object Internal Methods and Internal Slots](https://tc39.es/ecma262/#sec-ordinary-object-internal-methods-and-internal-slots)
//!
//! Objects in the module graph are plain data bags with a null prototype:
//! `import.meta` objects and the result lists of `Promise.all`. Properties
//! are kept in insertion order, which is the [[OwnPropertyKeys]] order for
//! non-index string keys.

use std::ops::{Index, IndexMut};

use crate::{
    ecmascript::{
        execution::Agent,
        types::{JsString, Value},
    },
    heap::{CreateHeapData, Heap},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct OrdinaryObject(u32);

#[derive(Debug, Clone, Default)]
pub struct OrdinaryObjectHeapData {
    pub(crate) properties: Vec<(JsString, Value)>,
}

impl OrdinaryObject {
    pub(crate) const fn get_index(self) -> usize {
        self.0 as usize
    }

    /// ### [10.1.12 OrdinaryObjectCreate ( proto \[ , additionalInternalSlotsList \] )](https://tc39.es/ecma262/#sec-ordinaryobjectcreate)
    ///
    /// Always creates an object with a null prototype.
    pub fn create(agent: &mut Agent) -> Self {
        agent.heap.create(OrdinaryObjectHeapData::default())
    }

    /// ### [7.3.2 Get ( O, P )](https://tc39.es/ecma262/#sec-get-o-p)
    pub fn get(self, agent: &Agent, key: &str) -> Value {
        agent[self]
            .properties
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    /// ### [7.3.5 CreateDataProperty ( O, P, V )](https://tc39.es/ecma262/#sec-createdataproperty)
    pub fn create_data_property(self, agent: &mut Agent, key: JsString, value: Value) -> bool {
        let properties = &mut agent[self].properties;
        if let Some(entry) = properties.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            properties.push((key, value));
        }
        true
    }

    /// ### [7.3.12 HasProperty ( O, P )](https://tc39.es/ecma262/#sec-hasproperty)
    pub fn has_property(self, agent: &Agent, key: &str) -> bool {
        agent[self].properties.iter().any(|(k, _)| k.as_str() == key)
    }

    /// ### [10.1.11.1 OrdinaryOwnPropertyKeys ( O )](https://tc39.es/ecma262/#sec-ordinaryownpropertykeys)
    pub fn own_property_keys(self, agent: &Agent) -> Vec<JsString> {
        agent[self].properties.iter().map(|(k, _)| k.clone()).collect()
    }
}

/// ### [7.3.16 CreateArrayFromList ( elements )](https://tc39.es/ecma262/#sec-createarrayfromlist)
///
/// Produces an array-like object: the elements under the keys `"0"` to
/// `"n-1"` followed by a `"length"` property.
pub(crate) fn create_array_from_list(agent: &mut Agent, elements: Vec<Value>) -> OrdinaryObject {
    let length = elements.len() as u32;
    let mut properties: Vec<(JsString, Value)> = elements
        .into_iter()
        .enumerate()
        .map(|(index, value)| (JsString::from(index.to_string()), value))
        .collect();
    properties.push(("length".into(), length.into()));
    agent.heap.create(OrdinaryObjectHeapData { properties })
}

impl Index<OrdinaryObject> for Agent {
    type Output = OrdinaryObjectHeapData;

    fn index(&self, index: OrdinaryObject) -> &Self::Output {
        self.heap
            .objects
            .get(index.get_index())
            .expect("OrdinaryObject out of bounds")
    }
}

impl IndexMut<OrdinaryObject> for Agent {
    fn index_mut(&mut self, index: OrdinaryObject) -> &mut Self::Output {
        self.heap
            .objects
            .get_mut(index.get_index())
            .expect("OrdinaryObject out of bounds")
    }
}

impl CreateHeapData<OrdinaryObjectHeapData, OrdinaryObject> for Heap {
    fn create(&mut self, data: OrdinaryObjectHeapData) -> OrdinaryObject {
        self.objects.push(data);
        OrdinaryObject(self.objects.len() as u32 - 1)
    }
}
