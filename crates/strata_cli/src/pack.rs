//! `strata pack`: merge compiled units into a package.

use std::path::Path;

use strata_cache::{FileLoader, PersistentEnv};
use strata_common::{ModuleName, PackPath, UnitName};
use strata_diagnostics::DiagnosticSink;
use strata_pack::{is_member_file, package_files, Coercion, ObjectArchiver, PackOutput, PackRequest};

use crate::session::{load_project, render_diagnostics, search_path};
use crate::{GlobalArgs, PackArgs};

/// Runs the `strata pack` command.
///
/// The package is named after the output file; `--for-pack` places it
/// inside an enclosing package. Returns exit code 0 on success, 1 on error.
pub fn run(args: &PackArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_project(global)?;
    let search = search_path(&config, &root, &args.include);
    let target = target_name(&args.output, args.for_pack.as_deref())?;

    if let Some(file) = args.files.iter().find(|f| !is_member_file(f)) {
        return Err(format!("{}: expected a .sti or .stx member file", file.display()).into());
    }

    if global.verbose {
        eprintln!("   Packing {target} from {} member(s)", args.files.len());
        for dir in search.dirs() {
            eprintln!("    Search {}", dir.display());
        }
    }

    let mut env: PersistentEnv<()> = PersistentEnv::new(&config, FileLoader::new(search.clone()));
    let request = PackRequest {
        target,
        files: args.files.clone(),
        output: args.output.clone(),
        coercion: Coercion::Identity,
    };

    let sink = DiagnosticSink::new();
    match package_files(&mut env, &search, &mut ObjectArchiver, &request, |_| ()) {
        Ok(output) => report(&output, global),
        Err(err) => sink.emit(err.to_diagnostic()),
    }
    render_diagnostics(&sink, global);

    if sink.has_errors() {
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Derives the package identity from the output file name and the
/// enclosing package path.
pub fn target_name(output: &Path, for_pack: Option<&str>) -> Result<UnitName, Box<dyn std::error::Error>> {
    let module = ModuleName::from_file(output)?;
    let prefix: PackPath = for_pack.unwrap_or("").parse()?;
    Ok(UnitName::new(prefix, module))
}

fn report(output: &PackOutput, global: &GlobalArgs) {
    if global.quiet {
        return;
    }
    if global.verbose {
        for member in &output.members {
            eprintln!("    Member {} ({})", member.name, member.file.display());
        }
        for import in &output.info.imports_intf {
            eprintln!("    Import {}", import.name);
        }
    }
    eprintln!(
        "   Packed {} ({} member(s), digest {})",
        output.info.name,
        output.members.len(),
        output.digest
    );
    eprintln!("    Wrote {}", output.info_file.display());
    eprintln!("    Wrote {}", output.object_file.display());
}
