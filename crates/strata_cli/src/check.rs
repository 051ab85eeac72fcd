//! `strata check`: load units and report what they depend on.

use strata_cache::{FileLoader, PersistError, PersistentEnv};
use strata_common::ModuleName;
use strata_config::CompilerOptions;
use strata_diagnostics::{Diagnostic, DiagnosticSink};

use crate::session::{load_project, render_diagnostics, search_path};
use crate::{CheckArgs, GlobalArgs};

/// Runs the `strata check` command.
///
/// Each named unit is loaded with full consistency checking. Dependencies
/// that were not loaded themselves are probed, and the agreed dependency
/// list is printed to stdout. Returns exit code 1 if any unit failed.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project(global)?;
    let search = search_path(&config, &root, &args.include);
    let names = args
        .names
        .iter()
        .map(|n| ModuleName::new(n))
        .collect::<Result<Vec<_>, _>>()?;

    let mut env: PersistentEnv<()> = PersistentEnv::new(&config, FileLoader::new(search));
    let sink = DiagnosticSink::new();
    check_units(&mut env, &names, &sink, global.verbose);

    if !global.quiet {
        for import in env.imports() {
            match import.digest {
                Some(digest) => println!("{}\t{digest}", import.name),
                None => println!("{}\t-", import.name),
            }
        }
    }
    render_diagnostics(&sink, global);

    if sink.has_errors() {
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Loads each of `names`, then probes the dependencies they mention that
/// were not loaded, emitting every problem into `sink`.
pub fn check_units(env: &mut PersistentEnv<()>, names: &[ModuleName], sink: &DiagnosticSink, verbose: bool) {
    if verbose {
        eprintln!("  Checking {} unit(s) with {}", names.len(), describe_options(env.options()));
    }
    let mut dependencies = Vec::new();
    for name in names {
        match env.find(name, |_| ()) {
            Ok((ps, ())) => {
                if verbose {
                    eprintln!("    Loaded {} from {}", ps.name, ps.filename.display());
                }
                dependencies.extend(ps.imports.iter().skip(1).map(|i| i.name.clone()));
            }
            Err(err) => sink.emit(unit_error(name, &err)),
        }
    }

    for dep in &dependencies {
        if !env.looked_up(dep) {
            env.check(dep);
        }
    }
    env.run_delayed_checks(|_| (), sink);
}

/// Summarizes the options loaded units are checked against.
pub fn describe_options(options: &CompilerOptions) -> String {
    let mut parts = Vec::new();
    if options.check_consistency {
        parts.push("consistency checks");
    } else {
        parts.push("no consistency checks");
    }
    if options.recursive_types {
        parts.push("recursive types");
    }
    if options.force_safe_string {
        parts.push("safe strings only");
    }
    parts.join(", ")
}

fn unit_error(name: &ModuleName, err: &PersistError) -> Diagnostic {
    let diag = err.to_diagnostic();
    if err.is_not_found() {
        diag.with_help(format!("compile {name} or add its directory with -I"))
    } else {
        diag
    }
}
