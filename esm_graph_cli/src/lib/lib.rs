// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Utilities for the esm-graph command line program.
//!
//! > [!IMPORTANT]
//! > This library is currently mainly aimed at internal use and might not
//! > adhere to semver versioning.

mod fmt;
mod host_hooks;
mod interpreter;

pub use fmt::{
    describe_promise, exit_with_parse_errors, print_module_error, print_parse_errors,
    print_parse_failures, print_uncaught,
};
pub use host_hooks::{FsHostHooks, ParseFailure, display_path, resolve_specifier};
pub use interpreter::{DryRunInterpreter, module_name};

use std::{path::Path, rc::Rc};

use esm_graph::ecmascript::{
    execution::{Agent, JsError, Options},
    scripts_and_modules::module::module_semantics::{Module, abstract_module_records::ModuleError},
};

/// Why an entry module could not be brought to the linked state.
#[derive(Debug)]
pub enum LoadError {
    /// The entry file itself could not be loaded.
    Entry(JsError),
    Link(ModuleError),
}

#[derive(Default)]
pub struct SessionConfig {
    /// Whether to print internal details of the run. Default `false`.
    pub verbose: bool,
}

/// An agent wired to the file system host and the dry-run interpreter.
pub struct Session {
    pub agent: Agent,
    pub host_hooks: Rc<FsHostHooks>,
    pub interpreter: Rc<DryRunInterpreter>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let host_hooks = Rc::new(FsHostHooks::default());
        let interpreter = Rc::new(DryRunInterpreter::default());
        let agent = Agent::new(
            Options {
                print_internals: config.verbose,
            },
            host_hooks.clone(),
            interpreter.clone(),
        );
        Self {
            agent,
            host_hooks,
            interpreter,
        }
    }

    /// Load the module at `path` and link the graph beneath it.
    pub fn load_and_link(&mut self, path: &Path) -> Result<Module, LoadError> {
        let module = self
            .host_hooks
            .load_entry(&mut self.agent, path)
            .map_err(LoadError::Entry)?;
        module.link(&mut self.agent).map_err(LoadError::Link)?;
        Ok(module)
    }

    /// Print what went wrong while loading, parse diagnostics first.
    pub fn report_load_error(&self, error: &LoadError) {
        print_parse_failures(self.host_hooks.take_parse_failures());
        match error {
            LoadError::Entry(error) => print_uncaught(&self.agent, error),
            LoadError::Link(error) => print_module_error(&self.agent, error),
        }
    }
}
