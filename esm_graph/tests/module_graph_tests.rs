// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use common::{Harness, Step};
use esm_graph::ecmascript::{
    builtins::error::Error,
    execution::{Agent, JsResult, agent::ExceptionType},
    scripts_and_modules::module::module_semantics::{
        Module, ModuleStatus,
        abstract_module_records::{
            BindingName, ModuleAbstractMethods, ModuleError, ResolveSet, ResolvedBinding,
        },
        cyclic_module_records::{CyclicModuleAbstractMethods, CyclicModuleInstance},
    },
    scripts_and_modules::script::Script,
    types::{JsString, Value},
};

fn names(list: &[JsString]) -> Vec<&str> {
    list.iter().map(JsString::as_str).collect()
}

fn error_kind(agent: &Agent, value: &Value) -> ExceptionType {
    let error = Error::try_from(value.clone()).expect("not an error object");
    error.kind(agent)
}

#[test]
fn link_resolves_imports_and_live_bindings() {
    let mut h = Harness::new();
    let lib = h.add("lib", "export let counter = 0; export function bump() {}");
    let main = h.add(
        "main",
        "import { counter, bump } from 'lib'; import * as ns from 'lib';",
    );
    h.script("lib", vec![Step::Init("counter", 1.into())]);
    h.script("main", vec![Step::Read("counter"), Step::Read("bump")]);

    let promise = h.link_and_evaluate(main);
    assert_eq!(h.fulfilled(promise), Value::Undefined);
    assert_eq!(
        h.log(),
        [
            "run lib",
            "done lib",
            "run main",
            "main read counter = 1",
            "main read bump = function bump",
            "done main",
        ]
    );

    // Import bindings read the exporter's binding at the time of the read.
    lib.set_mutable_binding(&mut h.agent, "counter", 7.into())
        .unwrap();
    assert_eq!(
        main.get_binding_value(&mut h.agent, "counter").unwrap(),
        Value::Number(7.0)
    );

    let namespace = lib.namespace(&mut h.agent).unwrap();
    assert_eq!(
        main.get_binding_value(&mut h.agent, "ns").unwrap(),
        Value::Module(namespace)
    );

    let err = main
        .set_mutable_binding(&mut h.agent, "counter", 0.into())
        .unwrap_err();
    assert_eq!(error_kind(&h.agent, err.value()), ExceptionType::TypeError);
}

#[test]
fn requested_modules_are_resolved_in_order() {
    let mut h = Harness::new();
    h.add("c", "");
    h.add("a", "import 'c';");
    h.add("b", "import 'c';");
    let root = h.add("root", "import 'a'; export * from 'b';");
    root.link(&mut h.agent).unwrap();
    assert_eq!(h.hooks.resolutions(), ["a", "c", "b", "c"]);
    assert_eq!(root.status(&h.agent), ModuleStatus::Linked);
}

#[test]
fn cycles_link_as_one_component() {
    let mut h = Harness::new();
    let a = h.add("a", "import { g } from 'b'; export function f() {}");
    let b = h.add("b", "import { f } from 'a'; export function g() {}");
    h.script("b", vec![Step::Read("f")]);
    h.script("a", vec![Step::Read("g")]);

    a.link(&mut h.agent).unwrap();
    assert_eq!(a.status(&h.agent), ModuleStatus::Linked);
    assert_eq!(b.status(&h.agent), ModuleStatus::Linked);

    let promise = a.evaluate(&mut h.agent);
    assert_eq!(h.fulfilled(promise), Value::Undefined);
    // Function bindings are initialized at link time, so a cycle member can
    // call into a module whose body has not run yet.
    assert_eq!(
        h.log(),
        [
            "run b",
            "b read f = function f",
            "done b",
            "run a",
            "a read g = function g",
            "done a",
        ]
    );
    assert_eq!(a.cycle_root(&h.agent), Some(a));
    assert_eq!(b.cycle_root(&h.agent), Some(a));
}

#[test]
fn link_failure_resets_the_graph() {
    let mut h = Harness::new();
    let a = h.add("a", "import 'missing';");
    let root = h.add("root", "import 'a';");

    let err = root.link(&mut h.agent).unwrap_err();
    let ModuleError::Resolution {
        specifier, error, ..
    } = &err
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(specifier.as_str(), "missing");
    assert_eq!(names(err.import_path()), ["a", "missing"]);
    assert_eq!(
        h.repr(error.value()),
        "TypeError: Cannot find module 'missing'"
    );
    assert_eq!(
        err.to_string(),
        "Cannot resolve module 'missing' (import path: a -> missing)"
    );
    assert_eq!(root.status(&h.agent), ModuleStatus::Unlinked);
    assert_eq!(a.status(&h.agent), ModuleStatus::Unlinked);
    assert!(!a.has_binding(&h.agent, "anything"));

    let promise = root.evaluate(&mut h.agent);
    let reason = h.rejected(promise);
    assert_eq!(error_kind(&h.agent, &reason), ExceptionType::TypeError);

    // Once the host can provide the module, linking succeeds.
    h.add("missing", "");
    root.link(&mut h.agent).unwrap();
    assert_eq!(root.status(&h.agent), ModuleStatus::Linked);
    assert_eq!(a.status(&h.agent), ModuleStatus::Linked);
    let promise = root.evaluate(&mut h.agent);
    h.fulfilled(promise);
    assert_eq!(h.run_order(), ["missing", "a", "root"]);
}

#[test]
fn unresolvable_import_is_a_syntax_error() {
    let mut h = Harness::new();
    h.add("lib", "export const x = 1;");
    let middle = h.add("middle", "export { nope as y } from 'lib';");
    let root = h.add("root", "import { y } from 'middle';");

    let err = root.link(&mut h.agent).unwrap_err();
    let ModuleError::Unresolvable {
        specifier, name, ..
    } = &err
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(specifier.as_str(), "lib");
    assert_eq!(name.as_str(), "nope");
    assert_eq!(names(err.import_path()), ["middle", "lib"]);
    assert_eq!(middle.status(&h.agent), ModuleStatus::Unlinked);

    let error = err.into_js_error(&mut h.agent);
    assert_eq!(
        h.repr(error.value()),
        "SyntaxError: The requested module 'lib' does not provide an export named 'nope' \
         (import path: middle -> lib)"
    );
}

#[test]
fn conflicting_star_exports_are_ambiguous() {
    let mut h = Harness::new();
    h.add("one", "export const dup = 1; export const a = 1;");
    h.add("two", "export const dup = 2; export const b = 2;");
    let stars = h.add(
        "stars",
        "export * from 'one'; export * from 'two'; export const own = 0;",
    );
    let root = h.add("root", "import { dup } from 'stars';");

    let err = root.link(&mut h.agent).unwrap_err();
    let ModuleError::Ambiguous { name, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(name.as_str(), "dup");
    assert_eq!(names(err.import_path()), ["stars"]);

    // The namespace leaves the ambiguous name out.
    stars.link(&mut h.agent).unwrap();
    let namespace = stars.namespace(&mut h.agent).unwrap();
    assert_eq!(names(&namespace.own_property_keys(&h.agent)), ["a", "b", "own"]);
    assert!(!namespace.has_property(&h.agent, "dup"));

    let resolution = stars
        .resolve_export(&mut h.agent, &"dup".into(), &mut ResolveSet::new())
        .unwrap();
    assert_eq!(resolution, Some(ResolvedBinding::Ambiguous));
}

#[test]
fn same_binding_through_two_stars_is_not_ambiguous() {
    let mut h = Harness::new();
    let one = h.add("one", "export const dup = 1;");
    h.add("again", "export * from 'one';");
    let stars = h.add("stars", "export * from 'one'; export * from 'again';");
    let root = h.add("root", "import { dup } from 'stars';");
    root.link(&mut h.agent).unwrap();

    let resolution = stars
        .resolve_export(&mut h.agent, &"dup".into(), &mut ResolveSet::new())
        .unwrap();
    assert_eq!(
        resolution,
        Some(ResolvedBinding::Resolved {
            module: one,
            binding_name: BindingName::Name("dup".into()),
        })
    );
}

#[test]
fn star_export_cycles_terminate() {
    let mut h = Harness::new();
    let solo = h.add("solo", "export * from 'solo'; export const x = 1;");
    let a = h.add("a", "export * from 'b'; export const x = 1;");
    h.add("b", "export * from 'a'; export const y = 2; export default 3;");

    solo.link(&mut h.agent).unwrap();
    let exported = solo
        .get_exported_names(&mut h.agent, &mut Vec::new())
        .unwrap()
        .unwrap();
    assert_eq!(names(&exported), ["x"]);
    let resolution = solo
        .resolve_export(&mut h.agent, &"missing".into(), &mut ResolveSet::new())
        .unwrap();
    assert_eq!(resolution, None);

    a.link(&mut h.agent).unwrap();
    let namespace = a.namespace(&mut h.agent).unwrap();
    // `default` is never re-exported by `export *`.
    assert_eq!(names(&namespace.own_property_keys(&h.agent)), ["x", "y"]);
}

#[test]
fn namespace_is_sorted_and_live() {
    let mut h = Harness::new();
    let lib = h.add(
        "lib",
        "export let counter = 0; export const b = 1; export function a() {} \
         export let Z; export default 'd';",
    );
    h.script(
        "lib",
        vec![
            Step::Init("counter", 0.into()),
            Step::Init("b", 1.into()),
            Step::Init("*default*", "d".into()),
        ],
    );
    let promise = h.link_and_evaluate(lib);
    h.fulfilled(promise);

    let namespace = lib.namespace(&mut h.agent).unwrap();
    assert_eq!(lib.namespace(&mut h.agent).unwrap(), namespace);
    assert_eq!(
        names(&namespace.own_property_keys(&h.agent)),
        ["Z", "a", "b", "counter", "default"]
    );
    assert_eq!(namespace.get(&mut h.agent, "counter").unwrap(), Value::Number(0.0));
    assert_eq!(namespace.get(&mut h.agent, "default").unwrap(), Value::from("d"));
    assert_eq!(
        namespace.get(&mut h.agent, "a").unwrap(),
        Value::String("function a".into())
    );

    lib.set_mutable_binding(&mut h.agent, "counter", 5.into())
        .unwrap();
    assert_eq!(namespace.get(&mut h.agent, "counter").unwrap(), Value::Number(5.0));

    // Never initialized: reading it is a temporal dead zone error.
    let err = namespace.get(&mut h.agent, "Z").unwrap_err();
    assert_eq!(error_kind(&h.agent, err.value()), ExceptionType::ReferenceError);

    assert_eq!(namespace.get(&mut h.agent, "nope").unwrap(), Value::Undefined);
    assert!(!namespace.set(&mut h.agent, "counter", 1.into()));
    assert!(!namespace.delete(&h.agent, "counter"));
    assert!(namespace.delete(&h.agent, "nope"));
    assert!(namespace.has_property(&h.agent, "b"));
    assert!(!namespace.has_property(&h.agent, "nope"));
}

#[test]
fn star_as_namespace_reexport() {
    let mut h = Harness::new();
    let lib = h.add("lib", "export const x = 1;");
    let reexport = h.add("reexport", "export * as sub from 'lib'; export { x as y } from 'lib';");
    let root = h.add("root", "import { sub, y } from 'reexport';");
    h.script("lib", vec![Step::Init("x", 1.into())]);
    h.script("root", vec![Step::Read("sub"), Step::Read("y")]);

    let promise = h.link_and_evaluate(root);
    h.fulfilled(promise);
    assert!(h.log().contains(&"root read sub = [object Module]".to_string()));
    assert!(h.log().contains(&"root read y = 1".to_string()));

    let lib_namespace = lib.namespace(&mut h.agent).unwrap();
    let namespace = reexport.namespace(&mut h.agent).unwrap();
    assert_eq!(names(&namespace.own_property_keys(&h.agent)), ["sub", "y"]);
    assert_eq!(
        namespace.get(&mut h.agent, "sub").unwrap(),
        Value::Module(lib_namespace)
    );
}

#[test]
fn import_meta_is_created_once_per_module() {
    let mut h = Harness::new();
    let lib = h.add("lib", "export const url = import.meta.url;");
    let other = h.add("other", "");

    let meta = lib.import_meta(&mut h.agent);
    assert_eq!(meta.get(&h.agent, "url"), Value::String("file:///lib".into()));
    assert_eq!(meta.get(&h.agent, "finalized"), Value::Boolean(true));
    assert_eq!(lib.import_meta(&mut h.agent), meta);

    let other_meta = other.import_meta(&mut h.agent);
    assert_ne!(other_meta, meta);
    assert_eq!(
        other_meta.get(&h.agent, "url"),
        Value::String("file:///other".into())
    );
}

#[derive(Debug)]
struct JsonModule {
    value: f64,
    fail: bool,
}

impl ModuleAbstractMethods for JsonModule {
    fn evaluate(&self, agent: &mut Agent, _module: Module) -> JsResult<()> {
        if self.fail {
            return Err(agent.throw_exception(ExceptionType::SyntaxError, "bad JSON".to_string()));
        }
        Ok(())
    }

    fn get_exported_names(&self, _agent: &mut Agent, _module: Module) -> Vec<JsString> {
        vec!["default".into()]
    }

    fn get_binding_value(&self, _agent: &mut Agent, _module: Module, _name: &str) -> JsResult<Value> {
        Ok(self.value.into())
    }
}

#[test]
fn leaf_modules_link_and_evaluate_synchronously() {
    let mut h = Harness::new();
    let json = Module::new_host(
        &mut h.agent,
        Rc::new(JsonModule {
            value: 42.0,
            fail: false,
        }),
        None,
    );
    h.hooks.register("data.json", json);
    let root = h.add("root", "import data from 'data.json';");
    h.script("root", vec![Step::Read("data")]);

    assert_eq!(json.status(&h.agent), ModuleStatus::Unlinked);
    let promise = h.link_and_evaluate(root);
    h.fulfilled(promise);
    assert_eq!(json.status(&h.agent), ModuleStatus::Evaluated);
    assert_eq!(h.log(), ["run root", "root read data = 42", "done root"]);
    assert!(!json.is_cyclic(&h.agent));
    assert!(json.requested_modules(&h.agent).is_empty());
}

#[test]
fn failing_leaf_module_rejects_its_importer() {
    let mut h = Harness::new();
    let json = Module::new_host(
        &mut h.agent,
        Rc::new(JsonModule {
            value: 0.0,
            fail: true,
        }),
        None,
    );
    h.hooks.register("data.json", json);
    let root = h.add("root", "import data from 'data.json';");

    let promise = h.link_and_evaluate(root);
    let reason = h.rejected(promise);
    assert_eq!(h.repr(&reason), "SyntaxError: bad JSON");
    assert_eq!(root.evaluation_error(&h.agent), Some(reason.clone()));
    assert_eq!(json.evaluation_error(&h.agent), Some(reason));
    assert!(h.log().is_empty());
    // Only the entry promise is left unhandled; the leaf's own promise was
    // handled by its importer.
    assert_eq!(h.hooks.unhandled_rejections(), [promise]);
}

#[derive(Debug)]
struct HostCyclic {
    ran: Rc<Cell<bool>>,
}

#[derive(Debug)]
struct HostCyclicInstance {
    ran: Rc<Cell<bool>>,
}

impl CyclicModuleAbstractMethods for HostCyclic {
    fn requested_modules(&self) -> Vec<JsString> {
        vec!["lib".into()]
    }

    fn instantiate(
        &self,
        _agent: &mut Agent,
        _module: Module,
    ) -> JsResult<Rc<dyn CyclicModuleInstance>> {
        Ok(Rc::new(HostCyclicInstance {
            ran: self.ran.clone(),
        }))
    }

    fn resolve_export(
        &self,
        _agent: &mut Agent,
        module: Module,
        export_name: &JsString,
        _resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolvedBinding>> {
        Ok((export_name.as_str() == "answer").then(|| ResolvedBinding::Resolved {
            module,
            binding_name: BindingName::Name(export_name.clone()),
        }))
    }

    fn get_exported_names(&self, _agent: &mut Agent, _module: Module) -> Vec<JsString> {
        vec!["answer".into()]
    }
}

impl CyclicModuleInstance for HostCyclicInstance {
    fn execute_module(
        &self,
        _agent: &mut Agent,
        _module: Module,
    ) -> JsResult<esm_graph::engine::ModuleExecution> {
        self.ran.set(true);
        Ok(esm_graph::engine::ModuleExecution::Completed)
    }

    fn get_binding_value(&self, _agent: &mut Agent, _module: Module, name: &str) -> JsResult<Value> {
        assert_eq!(name, "answer");
        Ok(42.into())
    }
}

#[test]
fn host_cyclic_modules_take_part_in_the_graph() {
    let mut h = Harness::new();
    let ran = Rc::new(Cell::new(false));
    let host = Module::new_host_cyclic(&mut h.agent, Rc::new(HostCyclic { ran: ran.clone() }), None);
    h.hooks.register("host", host);
    h.add("lib", "");
    let root = h.add("root", "import { answer } from 'host';");
    h.script("root", vec![Step::Read("answer")]);

    assert_eq!(names(host.requested_modules(&h.agent)), ["lib"]);
    let promise = h.link_and_evaluate(root);
    h.fulfilled(promise);
    assert!(ran.get());
    assert_eq!(h.log(), ["run lib", "done lib", "run root", "root read answer = 42", "done root"]);
    assert_eq!(host.status(&h.agent), ModuleStatus::Evaluated);
}

/// Exports `coolStuff`, and nothing else.
#[derive(Debug)]
struct CoolStuff;

impl ModuleAbstractMethods for CoolStuff {
    fn evaluate(&self, _agent: &mut Agent, _module: Module) -> JsResult<()> {
        Ok(())
    }

    fn get_exported_names(&self, _agent: &mut Agent, _module: Module) -> Vec<JsString> {
        vec!["coolStuff".into()]
    }

    fn get_binding_value(&self, _agent: &mut Agent, _module: Module, name: &str) -> JsResult<Value> {
        assert_eq!(name, "coolStuff");
        Ok(5.into())
    }
}

type Registry = Rc<RefCell<HashMap<&'static str, Module>>>;

/// A host cyclic module made only of re-exports: `(export name, specifier,
/// import name)`.
#[derive(Debug)]
struct Reexports {
    requests: Vec<&'static str>,
    exports: Vec<(&'static str, &'static str, &'static str)>,
    registry: Registry,
}

#[derive(Debug)]
struct ReexportsInstance;

impl CyclicModuleAbstractMethods for Reexports {
    fn requested_modules(&self) -> Vec<JsString> {
        self.requests.iter().map(|request| JsString::from(*request)).collect()
    }

    fn instantiate(
        &self,
        _agent: &mut Agent,
        _module: Module,
    ) -> JsResult<Rc<dyn CyclicModuleInstance>> {
        Ok(Rc::new(ReexportsInstance))
    }

    fn resolve_export(
        &self,
        agent: &mut Agent,
        module: Module,
        export_name: &JsString,
        resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolvedBinding>> {
        if resolve_set.contains(module, export_name) {
            // Circular import request.
            return Ok(None);
        }
        resolve_set.insert(module, export_name.clone());
        let Some((_, specifier, import_name)) = self
            .exports
            .iter()
            .find(|(name, _, _)| *name == export_name.as_str())
        else {
            return Ok(None);
        };
        let target = self.registry.borrow()[specifier];
        target.resolve_export(agent, &JsString::from(*import_name), resolve_set)
    }

    fn get_exported_names(&self, _agent: &mut Agent, _module: Module) -> Vec<JsString> {
        self.exports.iter().map(|(name, _, _)| JsString::from(*name)).collect()
    }
}

impl CyclicModuleInstance for ReexportsInstance {
    fn execute_module(
        &self,
        _agent: &mut Agent,
        _module: Module,
    ) -> JsResult<esm_graph::engine::ModuleExecution> {
        Ok(esm_graph::engine::ModuleExecution::Completed)
    }

    fn get_binding_value(&self, _agent: &mut Agent, _module: Module, name: &str) -> JsResult<Value> {
        panic!("re-exporting module has no local binding {name}");
    }
}

#[test]
fn reexports_round_trip_through_host_cycles() {
    let mut h = Harness::new();
    let registry = Registry::default();
    let cool_stuff = Module::new_host(&mut h.agent, Rc::new(CoolStuff), None);
    // coolstuff2 re-exports coolStuff, and asks coolstuff3 for
    // otherCoolStuff, which coolstuff3 in turn asks back from coolstuff2.
    let cool_stuff2 = Module::new_host_cyclic(
        &mut h.agent,
        Rc::new(Reexports {
            requests: vec!["custom:coolstuff3", "custom:coolstuff"],
            exports: vec![
                ("coolStuff", "custom:coolstuff", "coolStuff"),
                ("otherCoolStuff", "custom:coolstuff3", "coolStuff"),
            ],
            registry: registry.clone(),
        }),
        None,
    );
    let cool_stuff3 = Module::new_host_cyclic(
        &mut h.agent,
        Rc::new(Reexports {
            requests: vec!["custom:coolstuff2"],
            exports: vec![("coolStuff", "custom:coolstuff2", "coolStuff")],
            registry: registry.clone(),
        }),
        None,
    );
    for (specifier, module) in [
        ("custom:coolstuff", cool_stuff),
        ("custom:coolstuff2", cool_stuff2),
        ("custom:coolstuff3", cool_stuff3),
    ] {
        registry.borrow_mut().insert(specifier, module);
        h.hooks.register(specifier, module);
    }
    let main = h.add(
        "main",
        "import { coolStuff } from 'custom:coolstuff';\n\
         import { coolStuff as coolStuff3, otherCoolStuff } from 'custom:coolstuff2';",
    );
    h.script(
        "main",
        vec![
            Step::Read("coolStuff"),
            Step::Read("coolStuff3"),
            Step::Read("otherCoolStuff"),
        ],
    );

    main.link(&mut h.agent).unwrap();
    for module in [main, cool_stuff2, cool_stuff3] {
        assert_eq!(module.status(&h.agent), ModuleStatus::Linked);
    }
    let promise = main.evaluate(&mut h.agent);
    h.fulfilled(promise);
    assert_eq!(
        h.log(),
        [
            "run main",
            "main read coolStuff = 5",
            "main read coolStuff3 = 5",
            "main read otherCoolStuff = 5",
            "done main",
        ]
    );
    for module in [cool_stuff, cool_stuff2, cool_stuff3] {
        assert_eq!(module.status(&h.agent), ModuleStatus::Evaluated);
    }

    let namespace = cool_stuff2.namespace(&mut h.agent).unwrap();
    assert_eq!(
        names(&namespace.own_property_keys(&h.agent)),
        ["coolStuff", "otherCoolStuff"]
    );
    assert_eq!(
        namespace.get(&mut h.agent, "otherCoolStuff").unwrap(),
        Value::Number(5.0)
    );
}

#[test]
fn records_are_reachable_from_the_agent() {
    let mut h = Harness::new();
    let lib = h.add("lib", "");
    let script = Script::new(&mut h.agent, None);
    assert!(format!("{:?}", &h.agent[lib]).starts_with("ModuleHeapData"));
    assert!(format!("{:?}", &h.agent[script]).starts_with("ScriptRecord"));
}
