// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::ecmascript::{execution::agent::ExceptionType, types::JsString};

#[derive(Debug, Clone)]
pub struct ErrorHeapData {
    pub(crate) kind: ExceptionType,
    pub(crate) message: Option<JsString>,
}

impl ErrorHeapData {
    pub(crate) fn new(kind: ExceptionType, message: Option<JsString>) -> Self {
        Self { kind, message }
    }
}
