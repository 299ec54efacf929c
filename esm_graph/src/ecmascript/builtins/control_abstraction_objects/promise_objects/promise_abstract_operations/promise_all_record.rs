// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{
    ecmascript::{builtins::ordinary::create_array_from_list, execution::Agent, types::Value},
    heap::{CreateHeapData, Heap},
};

use super::promise_capability_records::PromiseCapability;

#[derive(Debug, Clone)]
pub(crate) struct PromiseAllRecordHeapData {
    pub(crate) remaining_elements_count: u32,
    pub(crate) values: Vec<Option<Value>>,
    pub(crate) capability: PromiseCapability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub(crate) struct PromiseAllRecord(u32);

impl PromiseAllRecord {
    pub(crate) const fn get_index(self) -> usize {
        self.0 as usize
    }

    fn data_mut(self, agent: &mut Agent) -> &mut PromiseAllRecordHeapData {
        agent
            .heap
            .promise_all_records
            .get_mut(self.get_index())
            .expect("PromiseAllRecord out of bounds")
    }

    /// ### [27.2.4.1.3 Promise.all Resolve Element Functions](https://tc39.es/ecma262/#sec-promise.all-resolve-element-functions)
    pub(crate) fn on_promise_fulfilled(self, agent: &mut Agent, index: u32, value: Value) {
        let record = self.data_mut(agent);
        // 8. Set values[index] to x.
        record.values[index as usize] = Some(value);
        // 9. Set remainingElementsCount.[[Value]] to remainingElementsCount.[[Value]] - 1.
        record.remaining_elements_count -= 1;
        // 10. If remainingElementsCount.[[Value]] = 0, then
        if record.remaining_elements_count == 0 {
            let capability = record.capability;
            let values = std::mem::take(&mut record.values)
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect();
            // a. Let valuesArray be CreateArrayFromList(values).
            let values_array = create_array_from_list(agent, values);
            // b. Return ? Call(promiseCapability.[[Resolve]], undefined, « valuesArray »).
            capability.resolve(agent, values_array.into());
        }
    }

    /// The reject element of Promise.all is the result capability's reject
    /// function itself; later rejections are ignored because the promise is
    /// already resolved.
    pub(crate) fn on_promise_rejected(self, agent: &mut Agent, reason: Value) {
        let capability = self.data_mut(agent).capability;
        capability.reject(agent, reason);
    }
}

impl CreateHeapData<PromiseAllRecordHeapData, PromiseAllRecord> for Heap {
    fn create(&mut self, data: PromiseAllRecordHeapData) -> PromiseAllRecord {
        self.promise_all_records.push(data);
        PromiseAllRecord(self.promise_all_records.len() as u32 - 1)
    }
}
