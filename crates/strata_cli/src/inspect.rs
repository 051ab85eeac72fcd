//! `strata inspect`: print the content of a descriptor file.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use strata_cache::{ArtifactKind, CodecError, Import, PersistentSignature, UnitFlag};
use strata_common::{Digest, ModuleName, UnitName};
use strata_diagnostics::DiagnosticSink;
use strata_pack::{Coercion, ImplementationInfo, ObjectArchive};

use crate::session::render_diagnostics;
use crate::{GlobalArgs, InspectArgs};

/// A decoded descriptor file.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    /// A unit interface.
    Interface {
        /// File digest.
        digest: String,
        /// The unit.
        name: UnitName,
        /// Dependencies with their digests.
        imports: Vec<ImportLine>,
        /// Compilation flags.
        flags: Vec<UnitFlag>,
        /// Size of the opaque signature payload.
        signature_bytes: usize,
    },
    /// Implementation info.
    Implementation {
        /// File digest.
        digest: String,
        /// The decoded info.
        info: ImplementationInfo,
    },
    /// A package object archive.
    Object {
        /// File digest.
        digest: String,
        /// The package.
        target: UnitName,
        /// The signature coercion.
        coercion: Coercion,
        /// Members in link order with their code sizes.
        members: Vec<(ModuleName, Option<usize>)>,
    },
}

/// A dependency as printed.
#[derive(Debug, Serialize)]
pub struct ImportLine {
    /// The dependency.
    pub name: ModuleName,
    /// Its digest in hex, if recorded.
    pub digest: Option<String>,
}

impl From<&Import> for ImportLine {
    fn from(import: &Import) -> Self {
        Self {
            name: import.name.clone(),
            digest: import.digest.map(|d| d.to_string()),
        }
    }
}

/// Runs the `strata inspect` command.
pub fn run(args: &InspectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let sink = DiagnosticSink::new();
    let report = match read_report(&args.file) {
        Ok(report) => report,
        Err(err) => {
            sink.emit(err.to_diagnostic());
            render_diagnostics(&sink, global);
            return Ok(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(0)
}

/// Decodes `file` according to its extension.
pub fn read_report(file: &Path) -> Result<Report, CodecError> {
    let kind = ArtifactKind::from_path(file).ok_or_else(|| CodecError::InvalidHeader {
        path: file.to_path_buf(),
        reason: "unrecognized file extension (expected .sti, .stx or .sto)".to_string(),
    })?;
    let report = match kind {
        ArtifactKind::Interface => {
            let sig = PersistentSignature::read(file)?;
            Report::Interface {
                digest: sig.digest.to_string(),
                imports: sig.interface.imports.iter().map(ImportLine::from).collect(),
                flags: sig.interface.flags,
                signature_bytes: sig.interface.signature.len(),
                name: sig.interface.name,
            }
        }
        ArtifactKind::Implementation => {
            let (info, digest) = ImplementationInfo::read(file)?;
            Report::Implementation {
                digest: digest.to_string(),
                info,
            }
        }
        ArtifactKind::Object => {
            let (archive, digest): (ObjectArchive, Digest) = ObjectArchive::read(file)?;
            Report::Object {
                digest: digest.to_string(),
                target: archive.target,
                coercion: archive.coercion,
                members: archive
                    .members
                    .into_iter()
                    .map(|m| (m.name, m.code.map(|c| c.len())))
                    .collect(),
            }
        }
    };
    Ok(report)
}

/// Formats a report for the terminal.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    match report {
        Report::Interface {
            digest,
            name,
            imports,
            flags,
            signature_bytes,
        } => {
            let _ = writeln!(out, "interface {name}");
            let _ = writeln!(out, "  digest     {digest}");
            let _ = writeln!(out, "  signature  {signature_bytes} bytes");
            for flag in flags {
                let _ = writeln!(out, "  flag       {}", flag_label(flag));
            }
            for import in imports {
                let _ = writeln!(
                    out,
                    "  import     {} {}",
                    import.name,
                    import.digest.as_deref().unwrap_or("-")
                );
            }
        }
        Report::Implementation { digest, info } => {
            let _ = writeln!(out, "implementation {}", info.name);
            let _ = writeln!(out, "  digest     {digest}");
            let _ = writeln!(out, "  defines    {}", info.defines.join(" "));
            for import in &info.imports_intf {
                let _ = writeln!(out, "  interface  {} {}", import.name, digest_text(import.digest));
            }
            for import in &info.imports_impl {
                let _ = writeln!(out, "  uses       {} {}", import.name, digest_text(import.digest));
            }
            if info.force_link {
                let _ = writeln!(out, "  force-link");
            }
        }
        Report::Object {
            digest,
            target,
            coercion,
            members,
        } => {
            let _ = writeln!(out, "object {target}");
            let _ = writeln!(out, "  digest     {digest}");
            let _ = writeln!(out, "  coercion   {coercion:?}");
            for (name, size) in members {
                match size {
                    Some(bytes) => {
                        let _ = writeln!(out, "  member     {name} ({bytes} bytes)");
                    }
                    None => {
                        let _ = writeln!(out, "  member     {name} (interface only)");
                    }
                }
            }
        }
    }
    out
}

fn digest_text(digest: Option<Digest>) -> String {
    digest.map_or_else(|| "-".to_string(), |d| d.to_string())
}

fn flag_label(flag: &UnitFlag) -> String {
    match flag {
        UnitFlag::RecursiveTypes => "recursive-types".to_string(),
        UnitFlag::UnsafeString => "unsafe-string".to_string(),
        UnitFlag::Opaque => "opaque".to_string(),
        UnitFlag::Alerts(alerts) if alerts.is_empty() => "alerts (none)".to_string(),
        UnitFlag::Alerts(alerts) => {
            let keys: Vec<&str> = alerts.keys().map(String::as_str).collect();
            format!("alerts {}", keys.join(","))
        }
    }
}
