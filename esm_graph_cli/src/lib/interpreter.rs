// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An interpreter that does not run module code. It reports the order in
//! which module bodies would run and gives every declaration an
//! `undefined` value so that the graph can be inspected afterwards.

use std::cell::Cell;

use console::style;
use esm_graph::{
    ecmascript::{
        builtins::promise::Promise,
        execution::{Agent, JsResult},
        scripts_and_modules::module::module_semantics::{
            Module, source_text_module_records::LexicalDeclarationKind,
        },
        types::{JsString, Value},
    },
    engine::{Interpreter, ModuleContinuation, ModuleExecution},
};

use crate::host_hooks::{FsHostHooks, display_path};

#[derive(Debug, Default)]
pub struct DryRunInterpreter {
    started: Cell<u32>,
}

impl DryRunInterpreter {
    /// Number of module bodies started so far.
    pub fn started(&self) -> u32 {
        self.started.get()
    }
}

impl Interpreter for DryRunInterpreter {
    fn initialize_environment(&self, agent: &mut Agent, module: Module) -> JsResult<()> {
        // Function declarations are hoisted: they hold a value before any
        // body runs.
        for name in lexical_names(agent, module, |kind| kind == LexicalDeclarationKind::Function) {
            module.initialize_binding(agent, name.as_str(), Value::Undefined)?;
        }
        Ok(())
    }

    fn execute_module(&self, agent: &mut Agent, module: Module) -> JsResult<ModuleExecution> {
        let step = self.started.get() + 1;
        self.started.set(step);
        let name = module_name(agent, module);
        if module.has_top_level_await(agent) {
            println!(
                "{:>3}. {} {name} {}",
                step,
                style("evaluate").cyan(),
                style("(awaiting)").dim()
            );
            let promise = Promise::new_resolved(agent, Value::Undefined);
            return Ok(ModuleExecution::Await {
                promise,
                continuation: Box::new(AfterAwait { module }),
            });
        }
        println!("{:>3}. {} {name}", step, style("evaluate").cyan());
        finish_body(agent, module)
    }
}

#[derive(Debug)]
struct AfterAwait {
    module: Module,
}

impl ModuleContinuation for AfterAwait {
    fn resume(self: Box<Self>, agent: &mut Agent, result: JsResult<Value>) -> JsResult<ModuleExecution> {
        result?;
        println!(
            "     {} {}",
            style("resume").cyan(),
            module_name(agent, self.module)
        );
        finish_body(agent, self.module)
    }
}

/// Give the declarations a body would have initialized an `undefined`
/// value.
fn finish_body(agent: &mut Agent, module: Module) -> JsResult<ModuleExecution> {
    for name in lexical_names(agent, module, |kind| kind != LexicalDeclarationKind::Function) {
        if module.get_binding_value(agent, name.as_str()).is_err() {
            module.initialize_binding(agent, name.as_str(), Value::Undefined)?;
        }
    }
    Ok(ModuleExecution::Completed)
}

fn lexical_names(
    agent: &Agent,
    module: Module,
    filter: impl Fn(LexicalDeclarationKind) -> bool,
) -> Vec<JsString> {
    module
        .as_source_text(agent)
        .map(|record| {
            record
                .lexical_declarations()
                .iter()
                .filter(|(_, kind)| filter(*kind))
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default()
}

pub fn module_name(agent: &Agent, module: Module) -> String {
    FsHostHooks::module_path(agent, module)
        .map(|path| display_path(&path))
        .unwrap_or_else(|| format!("{module:?}"))
}
