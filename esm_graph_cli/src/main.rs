// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    rc::Rc,
};

use clap::{Parser as ClapParser, Subcommand};
use console::style;
use esm_graph::ecmascript::scripts_and_modules::module::module_semantics::{
    Module,
    abstract_module_records::{BindingName, ResolveSet, ResolvedBinding},
    source_text_module_records::parse_module,
};
use esm_graph_cli::{
    Session, SessionConfig, describe_promise, exit_with_parse_errors, module_name,
    print_uncaught,
};

/// Load, link and evaluate ECMAScript module graphs
#[derive(Debug, ClapParser)] // requires `derive` feature
#[command(name = "esm-graph")]
#[command(about = "Load, link and evaluate ECMAScript module graphs", long_about = None)]
struct Cli {
    /// Log what the engine does and print module states
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parses a module and prints its imports and exports
    Parse {
        /// The path of the module to parse
        path: PathBuf,
    },

    /// Loads and links the graph of a module
    Link {
        /// The path of the entry module
        path: PathBuf,
    },

    /// Links a module and prints where each of its exports comes from
    Exports {
        /// The path of the entry module
        path: PathBuf,
    },

    /// Links and evaluates a module graph without running module code
    Eval {
        /// The path of the entry module
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let filter = if args.verbose {
        "esm_graph=debug,esm_graph_cli=debug"
    } else {
        "esm_graph=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut session = Session::new(SessionConfig {
        verbose: args.verbose,
    });

    match args.command {
        Command::Parse { path } => parse(&mut session, path),
        Command::Link { path } => {
            let Some(entry) = load_and_link(&mut session, &path) else {
                return ExitCode::FAILURE;
            };
            for (_, module) in session.host_hooks.modules() {
                print_module(&session, module, module == entry);
            }
            ExitCode::SUCCESS
        }
        Command::Exports { path } => {
            let Some(entry) = load_and_link(&mut session, &path) else {
                return ExitCode::FAILURE;
            };
            exports(&mut session, entry)
        }
        Command::Eval { path } => {
            let Some(entry) = load_and_link(&mut session, &path) else {
                return ExitCode::FAILURE;
            };
            eval(&mut session, entry)
        }
    }
}

fn load_and_link(session: &mut Session, path: &Path) -> Option<Module> {
    match session.load_and_link(path) {
        Ok(module) => Some(module),
        Err(error) => {
            session.report_load_error(&error);
            None
        }
    }
}

fn parse(session: &mut Session, path: PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{} {}: {err}", style("error:").red().bold(), path.display());
            return ExitCode::FAILURE;
        }
    };
    let module = match parse_module(&mut session.agent, &source, Some(Rc::new(path.clone()))) {
        Ok(module) => module,
        Err(errors) => exit_with_parse_errors(errors, &path, &source),
    };
    let agent = &session.agent;
    let Some(record) = module.as_source_text(agent) else {
        unreachable!("parse_module creates source text modules");
    };

    println!("{}", style("requested modules").bold());
    for request in module.requested_modules(agent) {
        println!("  '{request}'");
    }
    println!("{}", style("imports").bold());
    for entry in record.import_entries() {
        match &entry.import_name {
            Some(import_name) => println!(
                "  {} as {} from '{}'",
                import_name, entry.local_name, entry.module_request
            ),
            None => println!("  * as {} from '{}'", entry.local_name, entry.module_request),
        }
    }
    println!("{}", style("exports").bold());
    for entry in record.local_export_entries() {
        println!("  {} as {}", entry.local_name, entry.export_name);
    }
    for entry in record.indirect_export_entries() {
        match &entry.import_name {
            Some(import_name) => println!(
                "  {} as {} from '{}'",
                import_name, entry.export_name, entry.module_request
            ),
            None => println!(
                "  * as {} from '{}'",
                entry.export_name, entry.module_request
            ),
        }
    }
    for module_request in record.star_export_entries() {
        println!("  * from '{module_request}'");
    }
    if module.has_top_level_await(agent) {
        println!("{}", style("uses top-level await").yellow());
    }
    ExitCode::SUCCESS
}

fn print_module(session: &Session, module: Module, is_entry: bool) {
    let agent = &session.agent;
    let marker = if is_entry { "*" } else { " " };
    println!(
        "{marker} {} {}",
        module_name(agent, module),
        style(format!("[{:?}]", module.status(agent))).dim()
    );
    for request in module.requested_modules(agent) {
        println!("    {} '{request}'", style("->").dim());
    }
}

fn exports(session: &mut Session, entry: Module) -> ExitCode {
    let namespace = match entry.namespace(&mut session.agent) {
        Ok(namespace) => namespace,
        Err(error) => {
            print_uncaught(&session.agent, &error);
            return ExitCode::FAILURE;
        }
    };
    let names = namespace.own_property_keys(&session.agent);
    for name in names {
        let resolution = entry.resolve_export(&mut session.agent, &name, &mut ResolveSet::new());
        let agent = &session.agent;
        let origin = match resolution {
            Ok(Some(ResolvedBinding::Resolved {
                module,
                binding_name: BindingName::Name(binding),
            })) => format!("{} {}", module_name(agent, module), style(binding).cyan()),
            Ok(Some(ResolvedBinding::Resolved {
                module,
                binding_name: BindingName::Namespace,
            })) => format!("{} {}", module_name(agent, module), style("namespace").cyan()),
            Ok(Some(ResolvedBinding::Ambiguous)) => style("ambiguous").red().to_string(),
            Ok(None) => style("unresolvable").red().to_string(),
            Err(error) => {
                print_uncaught(agent, &error);
                return ExitCode::FAILURE;
            }
        };
        println!("  {name} {} {origin}", style("<-").dim());
    }
    ExitCode::SUCCESS
}

fn eval(session: &mut Session, entry: Module) -> ExitCode {
    let promise = entry.evaluate(&mut session.agent);
    let host_hooks = session.host_hooks.clone();
    if let Err(error) = host_hooks.run_jobs(&mut session.agent) {
        print_uncaught(&session.agent, &error);
        return ExitCode::FAILURE;
    }

    let agent = &session.agent;
    println!(
        "{} modules evaluated, entry {}",
        session.interpreter.started(),
        describe_promise(agent, promise)
    );
    match promise.try_get_result(agent) {
        Some(Ok(_)) => ExitCode::SUCCESS,
        Some(Err(error)) => {
            print_uncaught(agent, &error);
            ExitCode::FAILURE
        }
        None => {
            eprintln!(
                "{} the entry module never finished evaluating",
                style("error:").red().bold()
            );
            ExitCode::FAILURE
        }
    }
}
