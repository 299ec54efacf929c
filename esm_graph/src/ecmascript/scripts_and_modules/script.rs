// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{any::Any, ops::Index, rc::Rc};

use crate::{
    ecmascript::execution::Agent,
    heap::{CreateHeapData, Heap},
};

/// Opaque host data attached to a script or module record.
pub type HostDefined = Rc<dyn Any>;

/// ### [16.1.4 Script Records](https://tc39.es/ecma262/#sec-script-records)
///
/// Scripts are not parsed nor run by the module graph. A Script exists only
/// so that classic code can be the referrer of a dynamic `import()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Script(u32);

pub struct ScriptRecord {
    /// ### \[\[HostDefined\]\]
    pub(crate) host_defined: Option<HostDefined>,
}

impl std::fmt::Debug for ScriptRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRecord")
            .field("host_defined", &self.host_defined.is_some())
            .finish()
    }
}

impl Script {
    pub(crate) const fn get_index(self) -> usize {
        self.0 as usize
    }

    pub fn new(agent: &mut Agent, host_defined: Option<HostDefined>) -> Self {
        agent.heap.create(ScriptRecord { host_defined })
    }

    pub fn host_defined(self, agent: &Agent) -> Option<HostDefined> {
        agent[self].host_defined.clone()
    }
}

impl Index<Script> for Agent {
    type Output = ScriptRecord;

    fn index(&self, index: Script) -> &Self::Output {
        self.heap
            .scripts
            .get(index.get_index())
            .expect("Script out of bounds")
    }
}

impl CreateHeapData<ScriptRecord, Script> for Heap {
    fn create(&mut self, data: ScriptRecord) -> Script {
        self.scripts.push(data);
        Script(self.scripts.len() as u32 - 1)
    }
}
