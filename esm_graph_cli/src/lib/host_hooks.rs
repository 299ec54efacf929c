// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A host that loads modules from the file system.

use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::Debug,
    path::{Path, PathBuf},
    rc::Rc,
};

use ahash::AHashMap;
use esm_graph::ecmascript::{
    builtins::promise::Promise,
    execution::{
        Agent, HostHooks, Job, JsResult,
        agent::{ExceptionType, PromiseRejectionTrackerOperation},
    },
    scripts_and_modules::{
        ScriptOrModule,
        module::module_semantics::{Module, source_text_module_records::parse_module},
    },
    types::{JsString, Value},
};
use oxc_diagnostics::OxcDiagnostic;
use tracing::debug;

/// A module file that failed to parse. Kept around so that the diagnostics
/// can be rendered against the source text.
pub struct ParseFailure {
    pub path: PathBuf,
    pub source: String,
    pub errors: Vec<OxcDiagnostic>,
}

#[derive(Default)]
pub struct FsHostHooks {
    module_map: RefCell<AHashMap<PathBuf, Module>>,
    load_order: RefCell<Vec<(PathBuf, Module)>>,
    parse_failures: RefCell<Vec<ParseFailure>>,
    promise_job_queue: RefCell<VecDeque<Job>>,
    unhandled_rejections: RefCell<Vec<Promise>>,
}

// RefCell doesn't implement Debug
impl Debug for FsHostHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsHostHooks")
            .field("modules", &self.load_order.borrow().len())
            .field("parse_failures", &self.parse_failures.borrow().len())
            .field("promise_jobs", &self.promise_job_queue.borrow().len())
            .finish()
    }
}

impl FsHostHooks {
    /// Load the entry module of a run. Its path is resolved against the
    /// current directory.
    pub fn load_entry(&self, agent: &mut Agent, path: &Path) -> JsResult<Module> {
        let path = std::path::absolute(path)
            .and_then(|path| path.canonicalize())
            .map_err(|err| {
                agent.throw_exception(
                    ExceptionType::TypeError,
                    format!("Cannot find module '{}': {err}", path.display()),
                )
            })?;
        self.load_path(agent, path)
    }

    fn load_path(&self, agent: &mut Agent, path: PathBuf) -> JsResult<Module> {
        if let Some(module) = self.module_map.borrow().get(&path) {
            return Ok(*module);
        }
        let source = std::fs::read_to_string(&path).map_err(|err| {
            agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot read module '{}': {err}", display_path(&path)),
            )
        })?;
        match parse_module(agent, &source, Some(Rc::new(path.clone()))) {
            Ok(module) => {
                debug!(path = %path.display(), "loaded module");
                self.module_map.borrow_mut().insert(path.clone(), module);
                self.load_order.borrow_mut().push((path, module));
                Ok(module)
            }
            Err(errors) => {
                let message = format!("Failed to parse module '{}'", display_path(&path));
                self.parse_failures.borrow_mut().push(ParseFailure {
                    path,
                    source,
                    errors,
                });
                Err(agent.throw_exception(ExceptionType::SyntaxError, message))
            }
        }
    }

    /// The file a module was loaded from.
    pub fn module_path(agent: &Agent, module: Module) -> Option<PathBuf> {
        module
            .host_defined(agent)
            .and_then(|host_defined| host_defined.downcast_ref::<PathBuf>().cloned())
    }

    /// Every module loaded so far, in load order.
    pub fn modules(&self) -> Vec<(PathBuf, Module)> {
        self.load_order.borrow().clone()
    }

    pub fn take_parse_failures(&self) -> Vec<ParseFailure> {
        std::mem::take(&mut *self.parse_failures.borrow_mut())
    }

    pub fn pop_promise_job(&self) -> Option<Job> {
        self.promise_job_queue.borrow_mut().pop_front()
    }

    /// Run queued jobs until the queue is empty.
    pub fn run_jobs(&self, agent: &mut Agent) -> JsResult<()> {
        while let Some(job) = self.pop_promise_job() {
            job.run(agent)?;
        }
        Ok(())
    }

    pub fn unhandled_rejections(&self) -> Vec<Promise> {
        self.unhandled_rejections.borrow().clone()
    }
}

impl HostHooks for FsHostHooks {
    fn host_resolve_imported_module(
        &self,
        agent: &mut Agent,
        referrer: ScriptOrModule,
        specifier: &JsString,
    ) -> JsResult<Module> {
        let referrer_path = match referrer {
            ScriptOrModule::Module(module) => Self::module_path(agent, module),
            ScriptOrModule::Script(script) => script
                .host_defined(agent)
                .and_then(|host_defined| host_defined.downcast_ref::<PathBuf>().cloned()),
        };
        let Some(path) = resolve_specifier(referrer_path.as_deref(), specifier.as_str()) else {
            return Err(agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot resolve bare specifier '{specifier}'"),
            ));
        };
        let path = path.canonicalize().map_err(|_| {
            agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot find module '{specifier}'"),
            )
        })?;
        self.load_path(agent, path)
    }

    fn enqueue_promise_job(&self, job: Job) {
        self.promise_job_queue.borrow_mut().push_back(job);
    }

    fn host_get_import_meta_properties(
        &self,
        agent: &mut Agent,
        module: Module,
    ) -> Vec<(JsString, Value)> {
        let Some(path) = Self::module_path(agent, module) else {
            return vec![];
        };
        let url = format!("file://{}", path.display());
        vec![("url".into(), Value::String(url.into()))]
    }

    fn host_promise_rejection_tracker(
        &self,
        promise: Promise,
        operation: PromiseRejectionTrackerOperation,
    ) {
        let mut unhandled = self.unhandled_rejections.borrow_mut();
        match operation {
            PromiseRejectionTrackerOperation::Reject => unhandled.push(promise),
            PromiseRejectionTrackerOperation::Handle => unhandled.retain(|p| *p != promise),
        }
    }
}

/// Resolve a relative or absolute specifier against the importing file.
/// Bare specifiers have no file system meaning and resolve to `None`.
pub fn resolve_specifier(referrer: Option<&Path>, specifier: &str) -> Option<PathBuf> {
    if specifier.starts_with('/') {
        return Some(PathBuf::from(specifier));
    }
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return None;
    }
    let base = match referrer.and_then(Path::parent) {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    Some(base.join(specifier))
}

/// A path as shown to the user: relative to the current directory when it
/// lies beneath it.
pub fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
