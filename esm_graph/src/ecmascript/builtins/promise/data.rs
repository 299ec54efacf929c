// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::ecmascript::{
    builtins::control_abstraction_objects::promise_objects::promise_abstract_operations::promise_reaction_records::PromiseReaction,
    types::Value,
};

#[derive(Debug, Clone, Default)]
pub struct PromiseHeapData {
    pub(crate) promise_state: PromiseState,
}

#[derive(Debug, Clone)]
pub(crate) enum PromiseState {
    Pending {
        /// \[\[PromiseFulfillReactions\]\] and \[\[PromiseRejectReactions\]\]
        ///
        /// Each reaction record is triggered exactly once with the type of
        /// the eventual settlement.
        reactions: Vec<PromiseReaction>,
        /// True if the resolution state of this promise depends on another
        /// promise or thenable that hasn't fulfilled or rejected yet.
        is_resolved: bool,
    },
    Fulfilled {
        promise_result: Value,
    },
    Rejected {
        promise_result: Value,
        is_handled: bool,
    },
}

impl Default for PromiseState {
    fn default() -> Self {
        Self::Pending {
            reactions: Vec::new(),
            is_resolved: false,
        }
    }
}
