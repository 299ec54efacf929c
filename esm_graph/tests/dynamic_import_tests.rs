// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use std::{sync::mpsc, thread};

use common::{Harness, Step};
use esm_graph::ecmascript::{
    builtins::{PromiseCapability, promise::Promise},
    execution::agent::ExceptionType,
    scripts_and_modules::{
        ScriptOrModule,
        module::{
            DynamicImportTicket, evaluate_import_call, finish_dynamic_import,
            module_semantics::ModuleStatus,
        },
        script::Script,
    },
    types::{JsString, Value},
};

fn script_referrer(h: &mut Harness) -> ScriptOrModule {
    ScriptOrModule::Script(Script::new(&mut h.agent, None))
}

#[test]
fn import_fulfils_with_the_namespace() {
    let mut h = Harness::new();
    let lib = h.add("lib", "export const x = 1;");
    h.script("lib", vec![Step::Init("x", 1.into())]);
    let referrer = script_referrer(&mut h);

    let promise = evaluate_import_call(&mut h.agent, referrer, "lib".into());
    // The default host loads the module from a job.
    assert!(promise.is_pending(&h.agent));
    assert!(h.log().is_empty());

    h.run_jobs();
    let namespace = lib.namespace(&mut h.agent).unwrap();
    assert_eq!(h.fulfilled(promise), Value::Module(namespace));
    assert_eq!(namespace.get(&mut h.agent, "x").unwrap(), Value::Number(1.0));
    assert_eq!(lib.status(&h.agent), ModuleStatus::Evaluated);

    // A second import reuses the evaluated module.
    let again = evaluate_import_call(&mut h.agent, referrer, "lib".into());
    h.run_jobs();
    assert_eq!(h.fulfilled(again), Value::Module(namespace));
    assert_eq!(h.run_order(), ["lib"]);
}

#[test]
fn import_of_unknown_module_rejects() {
    let mut h = Harness::new();
    let referrer = script_referrer(&mut h);
    let promise = evaluate_import_call(&mut h.agent, referrer, "nope".into());
    h.run_jobs();
    assert_eq!(
        h.repr(&h.rejected(promise)),
        "TypeError: Cannot find module 'nope'"
    );
}

#[test]
fn import_specifier_must_convert_to_a_string() {
    let mut h = Harness::new();
    let referrer = script_referrer(&mut h);
    let object = Value::Promise(Promise::new_resolved(&mut h.agent, Value::Undefined));
    let promise = evaluate_import_call(&mut h.agent, referrer, object);
    // Rejected right away: the host is never asked.
    let reason = h.rejected(promise);
    assert!(h.repr(&reason).starts_with("TypeError"));
    assert!(h.hooks.resolutions().is_empty());
}

#[test]
fn imports_combine_with_promise_all() {
    let mut h = Harness::new();
    let a = h.add("a", "export const name = 'a';");
    let b = h.add("b", "export const name = 'b';");
    let referrer = script_referrer(&mut h);

    let imports = [
        evaluate_import_call(&mut h.agent, referrer, "a".into()),
        evaluate_import_call(&mut h.agent, referrer, "b".into()),
    ];
    let all = Promise::all(&mut h.agent, &imports);
    h.run_jobs();
    let Value::Object(values) = h.fulfilled(all) else {
        panic!("Promise.all should fulfil with an array");
    };
    let a_namespace = a.namespace(&mut h.agent).unwrap();
    let b_namespace = b.namespace(&mut h.agent).unwrap();
    assert_eq!(values.get(&h.agent, "0"), Value::Module(a_namespace));
    assert_eq!(values.get(&h.agent, "1"), Value::Module(b_namespace));
    assert_eq!(values.get(&h.agent, "length"), Value::Number(2.0));

    let imports = [
        evaluate_import_call(&mut h.agent, referrer, "a".into()),
        evaluate_import_call(&mut h.agent, referrer, "missing".into()),
    ];
    let all = Promise::all(&mut h.agent, &imports);
    h.run_jobs();
    assert_eq!(
        h.repr(&h.rejected(all)),
        "TypeError: Cannot find module 'missing'"
    );
}

#[test]
fn import_of_unlinkable_module_rejects() {
    let mut h = Harness::new();
    let broken = h.add("broken", "import { nope } from 'lib';");
    h.add("lib", "");
    let referrer = script_referrer(&mut h);

    let promise = evaluate_import_call(&mut h.agent, referrer, "broken".into());
    h.run_jobs();
    assert_eq!(
        h.repr(&h.rejected(promise)),
        "SyntaxError: The requested module 'lib' does not provide an export named 'nope' \
         (import path: lib)"
    );
    assert_eq!(broken.status(&h.agent), ModuleStatus::Unlinked);
    assert!(h.log().is_empty());
}

#[test]
fn import_of_throwing_module_rejects_with_its_error() {
    let mut h = Harness::new();
    let thrower = h.add("thrower", "throw 1;");
    let error = h.error("thrown");
    h.script("thrower", vec![Step::ThrowValue(error.clone())]);
    let referrer = script_referrer(&mut h);

    let promise = evaluate_import_call(&mut h.agent, referrer, "thrower".into());
    h.run_jobs();
    assert_eq!(h.rejected(promise), error);
    assert_eq!(thrower.evaluation_error(&h.agent), Some(error));
}

#[test]
fn module_body_awaits_dynamic_import() {
    let mut h = Harness::new();
    h.add("lib", "");
    let main = h.add("main", "const lib = await import('lib');");
    h.script("main", vec![Step::Import("lib")]);

    // Dynamic imports are not static dependencies.
    assert!(main.requested_modules(&h.agent).is_empty());
    assert!(main.has_top_level_await(&h.agent));

    let promise = h.link_and_evaluate(main);
    assert!(promise.is_pending(&h.agent));
    h.run_jobs();
    h.fulfilled(promise);
    assert_eq!(
        h.log(),
        [
            "run main",
            "await main",
            "run lib",
            "done lib",
            "resume main <- [object Module]",
            "done main",
        ]
    );
}

#[test]
fn failed_import_rejects_the_importing_module() {
    let mut h = Harness::new();
    let main = h.add("main", "await import('gone');");
    h.script("main", vec![Step::Import("gone")]);

    let promise = h.link_and_evaluate(main);
    h.run_jobs();
    assert_eq!(
        h.repr(&h.rejected(promise)),
        "TypeError: Cannot find module 'gone'"
    );
    assert_eq!(
        h.log(),
        [
            "run main",
            "await main",
            "resume main <- threw TypeError: Cannot find module 'gone'",
        ]
    );
}

#[test]
fn import_waits_for_asynchronous_evaluation() {
    let mut h = Harness::new();
    let gate = PromiseCapability::new(&mut h.agent);
    let slow = h.add("slow", "await gate;");
    h.script("slow", vec![Step::Await(gate.promise())]);

    let evaluation = h.link_and_evaluate(slow);
    let referrer = script_referrer(&mut h);
    let import = evaluate_import_call(&mut h.agent, referrer, "slow".into());
    h.run_jobs();
    assert!(evaluation.is_pending(&h.agent));
    assert!(import.is_pending(&h.agent));

    gate.resolve(&mut h.agent, Value::Undefined);
    h.run_jobs();
    h.fulfilled(evaluation);
    let namespace = slow.namespace(&mut h.agent).unwrap();
    assert_eq!(h.fulfilled(import), Value::Module(namespace));
    assert_eq!(h.run_order(), ["slow"]);
}

#[test]
fn ticket_is_redeemed_once() {
    let mut h = Harness::new();
    let lib = h.add("lib", "");
    let (sender, receiver) = mpsc::channel();
    h.hooks.send_dynamic_imports_to(sender);
    let referrer = script_referrer(&mut h);

    let promise = evaluate_import_call(&mut h.agent, referrer, "lib".into());
    let (specifier, ticket) = receiver.try_recv().unwrap();
    assert_eq!(specifier, "lib");
    assert_eq!(ticket.specifier(&h.agent).map(JsString::as_str), Some("lib"));
    assert_eq!(ticket.referrer(&h.agent), Some(referrer));
    assert_eq!(ticket.promise(&h.agent), Some(promise));

    finish_dynamic_import(&mut h.agent, ticket, Ok(lib));
    let late_error = h.agent.throw_exception(ExceptionType::Error, "too late".to_string());
    finish_dynamic_import(&mut h.agent, ticket, Err(late_error));
    assert_eq!(ticket.specifier(&h.agent), None);

    h.run_jobs();
    h.fulfilled(promise);
}

#[test]
fn imports_complete_from_a_loader_thread() {
    let mut h = Harness::new();
    let lib = h.add("lib.mjs", "export const ready = true;");
    h.script("lib.mjs", vec![Step::Init("ready", true.into())]);

    let (request_sender, request_receiver) = mpsc::channel::<(String, DynamicImportTicket)>();
    let (done_sender, done_receiver) =
        mpsc::channel::<(DynamicImportTicket, Result<String, String>)>();
    h.hooks.send_dynamic_imports_to(request_sender);
    let loader = thread::spawn(move || {
        for (specifier, ticket) in request_receiver {
            let outcome = if specifier.ends_with(".mjs") {
                Ok(specifier)
            } else {
                Err(format!("Refusing to load '{specifier}'"))
            };
            if done_sender.send((ticket, outcome)).is_err() {
                break;
            }
        }
    });

    let referrer = script_referrer(&mut h);
    let loaded = evaluate_import_call(&mut h.agent, referrer, "lib.mjs".into());
    let refused = evaluate_import_call(&mut h.agent, referrer, "notes.txt".into());
    // Closing the request channel lets the loader finish.
    h.hooks.stop_sending_dynamic_imports();

    for (ticket, outcome) in done_receiver {
        let completion = match outcome {
            Ok(specifier) => {
                assert_eq!(specifier, "lib.mjs");
                Ok(lib)
            }
            Err(message) => Err(h.agent.throw_exception(ExceptionType::TypeError, message)),
        };
        finish_dynamic_import(&mut h.agent, ticket, completion);
    }
    loader.join().unwrap();

    h.run_jobs();
    let namespace = lib.namespace(&mut h.agent).unwrap();
    assert_eq!(h.fulfilled(loaded), Value::Module(namespace));
    assert_eq!(namespace.get(&mut h.agent, "ready").unwrap(), Value::Boolean(true));
    assert_eq!(
        h.repr(&h.rejected(refused)),
        "TypeError: Refusing to load 'notes.txt'"
    );
}
