// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub(crate) mod control_abstraction_objects;
pub mod error;
pub mod module;
pub mod ordinary;
pub mod promise;

pub use control_abstraction_objects::promise_objects::promise_abstract_operations::promise_capability_records::PromiseCapability;
