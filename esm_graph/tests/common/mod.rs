// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
    sync::mpsc::Sender,
};

use esm_graph::{
    ecmascript::{
        builtins::{ordinary::OrdinaryObject, promise::Promise},
        execution::{
            Agent, DefaultHostHooks, HostHooks, Job, JsError, JsResult, Options,
            agent::{ExceptionType, PromiseRejectionTrackerOperation},
        },
        scripts_and_modules::{
            ScriptOrModule,
            module::{
                DynamicImportTicket, evaluate_import_call,
                module_semantics::{
                    Module, source_text_module_records::{LexicalDeclarationKind, parse_module},
                },
            },
        },
        types::{JsString, Value},
    },
    engine::{Interpreter, ModuleContinuation, ModuleExecution},
};

/// The name a test module was registered under.
pub fn module_name(agent: &Agent, module: Module) -> String {
    module
        .host_defined(agent)
        .and_then(|host_defined| host_defined.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| format!("{module:?}"))
}

/// In-memory host that remembers what it was asked to resolve and gives
/// every module an `import.meta.url`.
#[derive(Debug, Default)]
pub struct TestHooks {
    inner: DefaultHostHooks,
    resolutions: RefCell<Vec<String>>,
    dynamic_import_sender: RefCell<Option<Sender<(String, DynamicImportTicket)>>>,
}

impl TestHooks {
    pub fn register(&self, specifier: &str, module: Module) {
        self.inner.register_module(specifier, module);
    }

    pub fn resolutions(&self) -> Vec<String> {
        self.resolutions.borrow().clone()
    }

    pub fn unhandled_rejections(&self) -> Vec<Promise> {
        self.inner.unhandled_rejections()
    }

    /// Hand dynamic imports to another thread instead of queueing them.
    pub fn send_dynamic_imports_to(&self, sender: Sender<(String, DynamicImportTicket)>) {
        *self.dynamic_import_sender.borrow_mut() = Some(sender);
    }

    pub fn stop_sending_dynamic_imports(&self) {
        self.dynamic_import_sender.borrow_mut().take();
    }
}

impl HostHooks for TestHooks {
    fn host_resolve_imported_module(
        &self,
        agent: &mut Agent,
        referrer: ScriptOrModule,
        specifier: &JsString,
    ) -> JsResult<Module> {
        self.resolutions
            .borrow_mut()
            .push(specifier.as_str().to_string());
        self.inner
            .host_resolve_imported_module(agent, referrer, specifier)
    }

    fn enqueue_promise_job(&self, job: Job) {
        self.inner.enqueue_promise_job(job);
    }

    fn host_import_module_dynamically(
        &self,
        agent: &mut Agent,
        referrer: ScriptOrModule,
        specifier: JsString,
        ticket: DynamicImportTicket,
    ) {
        if let Some(sender) = self.dynamic_import_sender.borrow().as_ref() {
            sender
                .send((specifier.as_str().to_string(), ticket))
                .expect("loader thread hung up");
            return;
        }
        self.inner
            .host_import_module_dynamically(agent, referrer, specifier, ticket);
    }

    fn host_get_import_meta_properties(
        &self,
        agent: &mut Agent,
        module: Module,
    ) -> Vec<(JsString, Value)> {
        let url = format!("file:///{}", module_name(agent, module));
        vec![("url".into(), Value::String(url.into()))]
    }

    fn host_finalize_import_meta(
        &self,
        agent: &mut Agent,
        import_meta: OrdinaryObject,
        _module: Module,
    ) {
        import_meta.create_data_property(agent, "finalized".into(), true.into());
    }

    fn host_promise_rejection_tracker(
        &self,
        promise: Promise,
        operation: PromiseRejectionTrackerOperation,
    ) {
        self.inner.host_promise_rejection_tracker(promise, operation);
    }
}

/// One action of a scripted module body.
#[derive(Debug)]
pub enum Step {
    /// Initialize a lexical binding of the module.
    Init(&'static str, Value),
    /// Assign to a binding of the module.
    Set(&'static str, Value),
    /// Read a binding of the module and log its value.
    Read(&'static str),
    /// Throw a new Error with the given message.
    Throw(&'static str),
    /// Throw the given value.
    ThrowValue(Value),
    /// Suspend until the promise settles.
    Await(Promise),
    /// `await import(specifier)`
    Import(&'static str),
}

type Log = Rc<RefCell<Vec<String>>>;

/// Runs module bodies from scripts registered by the test. A module
/// without a script has an empty body.
#[derive(Debug, Default)]
pub struct ScriptedInterpreter {
    scripts: RefCell<HashMap<String, Vec<Step>>>,
    log: Log,
}

impl ScriptedInterpreter {
    pub fn script(&self, name: &str, steps: Vec<Step>) {
        self.scripts.borrow_mut().insert(name.to_string(), steps);
    }
}

impl Interpreter for ScriptedInterpreter {
    fn initialize_environment(&self, agent: &mut Agent, module: Module) -> JsResult<()> {
        let functions: Vec<JsString> = module
            .as_source_text(agent)
            .map(|record| {
                record
                    .lexical_declarations()
                    .iter()
                    .filter(|(_, kind)| *kind == LexicalDeclarationKind::Function)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();
        for name in functions {
            let value = Value::String(format!("function {name}").into());
            module.initialize_binding(agent, name.as_str(), value)?;
        }
        Ok(())
    }

    fn execute_module(&self, agent: &mut Agent, module: Module) -> JsResult<ModuleExecution> {
        let name = module_name(agent, module);
        self.log.borrow_mut().push(format!("run {name}"));
        let steps = self.scripts.borrow_mut().remove(&name).unwrap_or_default();
        run_steps(agent, module, name, steps.into(), self.log.clone())
    }
}

fn run_steps(
    agent: &mut Agent,
    module: Module,
    name: String,
    mut steps: VecDeque<Step>,
    log: Log,
) -> JsResult<ModuleExecution> {
    while let Some(step) = steps.pop_front() {
        match step {
            Step::Init(binding, value) => module.initialize_binding(agent, binding, value)?,
            Step::Set(binding, value) => module.set_mutable_binding(agent, binding, value)?,
            Step::Read(binding) => {
                let value = module.get_binding_value(agent, binding)?;
                let value = value.string_repr(agent);
                log.borrow_mut().push(format!("{name} read {binding} = {value}"));
            }
            Step::Throw(message) => {
                return Err(agent.throw_exception(ExceptionType::Error, message.to_string()));
            }
            Step::ThrowValue(value) => return Err(JsError::new(value)),
            Step::Await(promise) => {
                log.borrow_mut().push(format!("await {name}"));
                return Ok(ModuleExecution::Await {
                    promise,
                    continuation: Box::new(Resume {
                        module,
                        name,
                        steps,
                        log,
                    }),
                });
            }
            Step::Import(specifier) => {
                let promise = evaluate_import_call(agent, module.into(), specifier.into());
                log.borrow_mut().push(format!("await {name}"));
                return Ok(ModuleExecution::Await {
                    promise,
                    continuation: Box::new(Resume {
                        module,
                        name,
                        steps,
                        log,
                    }),
                });
            }
        }
    }
    log.borrow_mut().push(format!("done {name}"));
    Ok(ModuleExecution::Completed)
}

#[derive(Debug)]
struct Resume {
    module: Module,
    name: String,
    steps: VecDeque<Step>,
    log: Log,
}

impl ModuleContinuation for Resume {
    fn resume(self: Box<Self>, agent: &mut Agent, result: JsResult<Value>) -> JsResult<ModuleExecution> {
        let Resume {
            module,
            name,
            steps,
            log,
        } = *self;
        match result {
            Ok(value) => {
                let value = value.string_repr(agent);
                log.borrow_mut().push(format!("resume {name} <- {value}"));
                run_steps(agent, module, name, steps, log)
            }
            Err(error) => {
                let error_repr = error.to_string(agent);
                log.borrow_mut().push(format!("resume {name} <- threw {error_repr}"));
                Err(error)
            }
        }
    }
}

/// An agent wired to [`TestHooks`] and a [`ScriptedInterpreter`].
pub struct Harness {
    pub agent: Agent,
    pub hooks: Rc<TestHooks>,
    pub interpreter: Rc<ScriptedInterpreter>,
}

impl Harness {
    pub fn new() -> Self {
        let hooks = Rc::new(TestHooks::default());
        let interpreter = Rc::new(ScriptedInterpreter::default());
        let agent = Agent::new(Options::default(), hooks.clone(), interpreter.clone());
        Self {
            agent,
            hooks,
            interpreter,
        }
    }

    /// Parse `source_text` and register it under `name`.
    pub fn add(&mut self, name: &str, source_text: &str) -> Module {
        let module = parse_module(
            &mut self.agent,
            source_text,
            Some(Rc::new(name.to_string())),
        )
        .unwrap_or_else(|errors| panic!("{name} failed to parse: {errors:?}"));
        self.hooks.register(name, module);
        module
    }

    pub fn script(&self, name: &str, steps: Vec<Step>) {
        self.interpreter.script(name, steps);
    }

    pub fn run_jobs(&mut self) {
        let hooks = self.hooks.clone();
        hooks
            .inner
            .run_jobs(&mut self.agent)
            .unwrap_or_else(|err| panic!("job threw: {}", err.to_string(&self.agent)));
    }

    pub fn log(&self) -> Vec<String> {
        self.interpreter.log.borrow().clone()
    }

    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.interpreter.log.borrow_mut())
    }

    /// Names of the module bodies that ran, in order.
    pub fn run_order(&self) -> Vec<String> {
        self.log()
            .iter()
            .filter_map(|entry| entry.strip_prefix("run ").map(str::to_string))
            .collect()
    }

    pub fn error(&mut self, message: &str) -> Value {
        self.agent
            .create_exception(ExceptionType::Error, message.to_string())
    }

    pub fn repr(&self, value: &Value) -> String {
        value.string_repr(&self.agent).as_str().to_string()
    }

    #[track_caller]
    pub fn fulfilled(&self, promise: Promise) -> Value {
        match promise.try_get_result(&self.agent) {
            Some(Ok(value)) => value,
            Some(Err(error)) => panic!("promise rejected with {}", error.to_string(&self.agent)),
            None => panic!("promise is still pending"),
        }
    }

    #[track_caller]
    pub fn rejected(&self, promise: Promise) -> Value {
        match promise.try_get_result(&self.agent) {
            Some(Err(error)) => error.into_value(),
            Some(Ok(value)) => panic!("promise fulfilled with {}", self.repr(&value)),
            None => panic!("promise is still pending"),
        }
    }

    /// Link and evaluate `module`, the way a host runs an entry point.
    #[track_caller]
    pub fn link_and_evaluate(&mut self, module: Module) -> Promise {
        if let Err(err) = module.link(&mut self.agent) {
            panic!("link failed: {err}");
        }
        module.evaluate(&mut self.agent)
    }
}
