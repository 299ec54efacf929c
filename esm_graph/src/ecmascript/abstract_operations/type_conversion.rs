// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [7.1 Type Conversion](https://tc39.es/ecma262/#sec-type-conversion)

use crate::ecmascript::{
    execution::{Agent, JsResult, agent::ExceptionType},
    types::{JsString, Value},
};

/// ### [7.1.17 ToString ( argument )](https://tc39.es/ecma262/#sec-tostring)
///
/// Objects in the module graph have no `toString` nor `valueOf` methods to
/// call, so ToPrimitive on them always throws a TypeError.
pub(crate) fn to_string(agent: &mut Agent, argument: &Value) -> JsResult<JsString> {
    match argument {
        // 1. If argument is a String, return argument.
        Value::String(string) => Ok(string.clone()),
        // 3. If argument is undefined, return "undefined".
        Value::Undefined => Ok("undefined".into()),
        // 4. If argument is null, return "null".
        Value::Null => Ok("null".into()),
        // 5. If argument is true, return "true".
        // 6. If argument is false, return "false".
        Value::Boolean(value) => Ok(if *value { "true" } else { "false" }.into()),
        // 7. If argument is a Number, return Number::toString(argument, 10).
        Value::Number(value) => Ok(ryu_js::Buffer::new().format(*value).into()),
        // 9. Assert: argument is an Object.
        // 10. Let primValue be ? ToPrimitive(argument, string).
        Value::Object(_) | Value::Error(_) | Value::Promise(_) | Value::Module(_) => Err(agent
            .throw_exception_with_static_message(
                ExceptionType::TypeError,
                "Cannot convert object to primitive value",
            )),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        ecmascript::{
            builtins::ordinary::OrdinaryObject,
            execution::{DefaultHostHooks, Options},
        },
        engine::NoopInterpreter,
    };

    #[test]
    fn primitives_convert() {
        let mut agent = Agent::new(
            Options::default(),
            Rc::new(DefaultHostHooks::default()),
            Rc::new(NoopInterpreter),
        );
        assert_eq!(to_string(&mut agent, &Value::Number(1.5)).unwrap(), "1.5");
        assert_eq!(to_string(&mut agent, &Value::Number(-0.0)).unwrap(), "0");
        assert_eq!(to_string(&mut agent, &Value::Number(1e21)).unwrap(), "1e+21");
        assert_eq!(to_string(&mut agent, &Value::Null).unwrap(), "null");
        assert_eq!(to_string(&mut agent, &Value::Boolean(true)).unwrap(), "true");
        assert_eq!(to_string(&mut agent, &"./a.mjs".into()).unwrap(), "./a.mjs");
    }

    #[test]
    fn objects_throw_type_error() {
        let mut agent = Agent::new(
            Options::default(),
            Rc::new(DefaultHostHooks::default()),
            Rc::new(NoopInterpreter),
        );
        let object = OrdinaryObject::create(&mut agent);
        let error = to_string(&mut agent, &object.into()).unwrap_err();
        let Value::Error(error) = error.value() else {
            panic!("expected an error object");
        };
        assert_eq!(error.kind(&agent), ExceptionType::TypeError);
    }
}
