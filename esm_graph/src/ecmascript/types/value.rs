// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::JsString;
use crate::ecmascript::{
    builtins::{error::Error, module::ModuleNamespace, ordinary::OrdinaryObject, promise::Promise},
    execution::Agent,
};

/// ### [6.1 ECMAScript Language Types](https://tc39.es/ecma262/#sec-ecmascript-language-types)
///
/// The module graph only ever observes a handful of value kinds: primitives
/// that bodies export, plain objects such as `import.meta`, thrown error
/// objects, promises and module namespace objects. Heap-allocated kinds are
/// handles into the [`Agent`]'s heap.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// ### [6.1.1 The Undefined Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-undefined-type)
    #[default]
    Undefined,
    /// ### [6.1.2 The Null Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-null-type)
    Null,
    /// ### [6.1.3 The Boolean Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-boolean-type)
    Boolean(bool),
    /// ### [6.1.6.1 The Number Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-number-type)
    Number(f64),
    /// ### [6.1.4 The String Type](https://tc39.es/ecma262/#sec-ecmascript-language-types-string-type)
    String(JsString),
    Object(OrdinaryObject),
    Error(Error),
    Promise(Promise),
    /// A module namespace exotic object.
    Module(ModuleNamespace),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Value::Object(_) | Value::Error(_) | Value::Promise(_) | Value::Module(_)
        )
    }

    /// Human readable rendering of the value, used for diagnostics.
    ///
    /// Unlike `ToString` this never throws: errors render as
    /// `Name: message` and other objects as `[object Tag]`.
    pub fn string_repr(&self, agent: &Agent) -> JsString {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.into(),
            Value::Number(n) => ryu_js::Buffer::new().format(*n).into(),
            Value::String(s) => s.clone(),
            Value::Object(_) => "[object Object]".into(),
            Value::Error(error) => {
                let data = &agent[*error];
                match &data.message {
                    Some(message) if !message.is_empty() => {
                        format!("{}: {}", data.kind, message).into()
                    }
                    _ => data.kind.to_string().into(),
                }
            }
            Value::Promise(_) => "[object Promise]".into(),
            Value::Module(_) => "[object Module]".into(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value.into())
    }
}

impl From<JsString> for Value {
    fn from(value: JsString) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<OrdinaryObject> for Value {
    fn from(value: OrdinaryObject) -> Self {
        Value::Object(value)
    }
}

impl From<Promise> for Value {
    fn from(value: Promise) -> Self {
        Value::Promise(value)
    }
}

impl From<ModuleNamespace> for Value {
    fn from(value: ModuleNamespace) -> Self {
        Value::Module(value)
    }
}
