// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::ecmascript::{
    builtins::{
        control_abstraction_objects::promise_objects::promise_abstract_operations::{
            promise_all_record::PromiseAllRecordHeapData,
            promise_reaction_records::PromiseReactionRecord,
        },
        error::ErrorHeapData,
        ordinary::OrdinaryObjectHeapData,
        promise::PromiseHeapData,
    },
    scripts_and_modules::{
        module::{DynamicImportRecord, module_semantics::ModuleHeapData},
        script::ScriptRecord,
    },
};

/// Arena storage of every heap-allocated record of an agent. Handles are
/// indexes into these vectors and are never invalidated: the graph does not
/// collect garbage.
#[derive(Debug, Default)]
pub(crate) struct Heap {
    pub(crate) errors: Vec<ErrorHeapData>,
    pub(crate) modules: Vec<ModuleHeapData>,
    pub(crate) objects: Vec<OrdinaryObjectHeapData>,
    pub(crate) promises: Vec<PromiseHeapData>,
    pub(crate) promise_reaction_records: Vec<Option<PromiseReactionRecord>>,
    pub(crate) promise_all_records: Vec<PromiseAllRecordHeapData>,
    /// Pending dynamic imports, emptied as they complete.
    pub(crate) dynamic_imports: Vec<Option<DynamicImportRecord>>,
    pub(crate) scripts: Vec<ScriptRecord>,
}

impl Heap {
    pub(crate) fn new() -> Self {
        Self {
            errors: Vec::with_capacity(64),
            modules: Vec::with_capacity(32),
            objects: Vec::with_capacity(32),
            promises: Vec::with_capacity(64),
            promise_reaction_records: Vec::with_capacity(64),
            promise_all_records: Vec::new(),
            dynamic_imports: Vec::new(),
            scripts: Vec::new(),
        }
    }
}

pub trait CreateHeapData<T, F> {
    /// Allocates the data in the heap and returns a handle to it.
    fn create(&mut self, data: T) -> F;
}
