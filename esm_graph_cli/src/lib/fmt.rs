// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Formatting values and errors.

use std::path::Path;

use console::style;
use esm_graph::ecmascript::{
    builtins::promise::Promise,
    execution::{Agent, JsError},
    scripts_and_modules::module::module_semantics::abstract_module_records::ModuleError,
};
use oxc_diagnostics::OxcDiagnostic;

use crate::host_hooks::{ParseFailure, display_path};

/// Print parse errors against their source text.
pub fn print_parse_errors(errors: Vec<OxcDiagnostic>, source_path: &Path, source: &str) {
    // This seems to be needed for color and Unicode output. A second call
    // finds the hook already installed.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(oxc_diagnostics::GraphicalReportHandler::new())
    }));

    let named_source = miette::NamedSource::new(display_path(source_path), source.to_string());

    eprintln!("{}:", style("SyntaxError").red().bold());

    for error in errors {
        let report = error.with_source_code(named_source.clone());
        eprintln!("{report:?}");
    }
}

/// Exit the program with parse errors.
pub fn exit_with_parse_errors(errors: Vec<OxcDiagnostic>, source_path: &Path, source: &str) -> ! {
    assert!(!errors.is_empty());
    print_parse_errors(errors, source_path, source);
    std::process::exit(1);
}

pub fn print_parse_failures(failures: Vec<ParseFailure>) {
    for ParseFailure {
        path,
        source,
        errors,
    } in failures
    {
        print_parse_errors(errors, &path, &source);
    }
}

/// Print a failed Link() with the chain of imports that led to it.
pub fn print_module_error(agent: &Agent, error: &ModuleError) {
    eprintln!("{} {error}", style("LinkError:").red().bold());
    let import_path = error.import_path();
    for (depth, specifier) in import_path.iter().enumerate() {
        eprintln!("  {:width$}{} {specifier}", "", style("->").dim(), width = depth * 2);
    }
    match error {
        ModuleError::Resolution { error, .. } | ModuleError::Link { error, .. } => {
            eprintln!("  {} {}", style("caused by").dim(), error.to_string(agent));
        }
        ModuleError::Unresolvable { .. } | ModuleError::Ambiguous { .. } => {}
    }
}

pub fn print_uncaught(agent: &Agent, error: &JsError) {
    eprintln!(
        "{} {}",
        style("Uncaught exception:").red().bold(),
        error.to_string(agent)
    );
}

/// One word for the state of a promise, followed by its value or reason.
pub fn describe_promise(agent: &Agent, promise: Promise) -> String {
    match promise.try_get_result(agent) {
        None => style("pending").yellow().to_string(),
        Some(Ok(value)) => format!("{} {}", style("fulfilled").green(), value.string_repr(agent)),
        Some(Err(error)) => format!("{} {}", style("rejected").red(), error.to_string(agent)),
    }
}
