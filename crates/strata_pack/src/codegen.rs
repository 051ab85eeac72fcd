//! The code-generation seam of the package builder.
//!
//! The builder never produces object code itself. It describes the package
//! as a [`PackageProgram`] (members in link order plus the signature
//! coercion) and asks a [`CodeGenerator`] to emit the combined object.
//! [`ObjectArchiver`] is the generator used by the command line: it bundles
//! the members' object files into one self-verifying archive.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_cache::{codec, ArtifactKind, CodecError};
use strata_common::{Digest, ModuleName, UnitName};

use crate::member::PackMember;

/// How the package's structure is cut down to its declared signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coercion {
    /// Every member is exported as is.
    Identity,
    /// Only the listed components are exported, in this order.
    Select(Vec<usize>),
}

/// One member of the synthesized package program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// The member's module name.
    pub name: ModuleName,
    /// The member's object file. Interface-only members have none.
    pub object: Option<PathBuf>,
}

/// The top-level program a package is compiled from: its members bound
/// in order, then coerced to the package signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageProgram {
    /// The package being built.
    pub target: UnitName,
    /// Members in link order.
    pub components: Vec<Component>,
    /// Coercion to the package's signature.
    pub coercion: Coercion,
}

impl PackageProgram {
    /// Sequences `members` in their given order.
    pub fn new(target: UnitName, members: &[PackMember], coercion: Coercion) -> Self {
        let components = members
            .iter()
            .map(|member| Component {
                name: member.name.clone(),
                object: member.object_file(),
            })
            .collect();
        Self {
            target,
            components,
            coercion,
        }
    }
}

/// Errors reported by a code generator.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// A member's object file could not be read.
    #[error("cannot read object file {} of unit {unit}: {source}", .path.display())]
    MissingObject {
        /// The member.
        unit: ModuleName,
        /// The expected object file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The coercion refers to a component the program does not have.
    #[error("coercion selects component {index} of a package with {len} components")]
    CoercionOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of components.
        len: usize,
    },

    /// The combined object could not be written.
    #[error(transparent)]
    Archive(#[from] CodecError),

    /// Any other failure reported by an external generator.
    #[error("{0}")]
    Failed(String),
}

/// Emits the combined object of a package.
pub trait CodeGenerator {
    /// Compiles `program` into `target_object`.
    ///
    /// A generator that fails may leave a partial `target_object` behind;
    /// the caller removes it.
    fn emit_package(&mut self, program: &PackageProgram, target_object: &Path) -> Result<(), CodegenError>;
}

/// A member's code as stored in a package archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedMember {
    /// The member's module name.
    pub name: ModuleName,
    /// The member's object code, absent for interface-only members.
    pub code: Option<Vec<u8>>,
}

/// The content of a `.sto` file written by [`ObjectArchiver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectArchive {
    /// The package.
    pub target: UnitName,
    /// Coercion applied on top of the members.
    pub coercion: Coercion,
    /// Members in link order.
    pub members: Vec<ArchivedMember>,
}

impl ObjectArchive {
    /// Reads an archive, returning it with the file's digest.
    pub fn read(path: &Path) -> Result<(Self, Digest), CodecError> {
        codec::decode_file(path, ArtifactKind::Object)
    }
}

/// Bundles member object files into a single archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectArchiver;

impl CodeGenerator for ObjectArchiver {
    fn emit_package(&mut self, program: &PackageProgram, target_object: &Path) -> Result<(), CodegenError> {
        if let Coercion::Select(indices) = &program.coercion {
            let len = program.components.len();
            if let Some(&index) = indices.iter().find(|&&i| i >= len) {
                return Err(CodegenError::CoercionOutOfRange { index, len });
            }
        }

        let members = program
            .components
            .iter()
            .map(|component| {
                let code = match &component.object {
                    Some(path) => Some(std::fs::read(path).map_err(|source| CodegenError::MissingObject {
                        unit: component.name.clone(),
                        path: path.clone(),
                        source,
                    })?),
                    None => None,
                };
                Ok(ArchivedMember {
                    name: component.name.clone(),
                    code,
                })
            })
            .collect::<Result<Vec<_>, CodegenError>>()?;

        let archive = ObjectArchive {
            target: program.target.clone(),
            coercion: program.coercion.clone(),
            members,
        };
        codec::encode_file(target_object, ArtifactKind::Object, &archive)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, object: Option<PathBuf>) -> Component {
        Component {
            name: ModuleName::new(name).unwrap(),
            object,
        }
    }

    #[test]
    fn archiver_bundles_objects_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.sto");
        std::fs::write(&a, b"code of a").unwrap();
        let program = PackageProgram {
            target: "Lib".parse().unwrap(),
            components: vec![component("A", Some(a)), component("S", None)],
            coercion: Coercion::Identity,
        };
        let out = dir.path().join("lib.sto");
        ObjectArchiver.emit_package(&program, &out).unwrap();

        let (archive, _) = ObjectArchive::read(&out).unwrap();
        assert_eq!(archive.target, program.target);
        assert_eq!(archive.members.len(), 2);
        assert_eq!(archive.members[0].code.as_deref(), Some(&b"code of a"[..]));
        assert_eq!(archive.members[1].code, None);
    }

    #[test]
    fn archiver_reports_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let program = PackageProgram {
            target: "Lib".parse().unwrap(),
            components: vec![component("A", Some(dir.path().join("a.sto")))],
            coercion: Coercion::Identity,
        };
        let out = dir.path().join("lib.sto");
        let err = ObjectArchiver.emit_package(&program, &out).unwrap_err();
        assert!(matches!(err, CodegenError::MissingObject { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn archiver_rejects_bad_coercion() {
        let dir = tempfile::tempdir().unwrap();
        let program = PackageProgram {
            target: "Lib".parse().unwrap(),
            components: vec![component("S", None)],
            coercion: Coercion::Select(vec![0, 3]),
        };
        let err = ObjectArchiver
            .emit_package(&program, &dir.path().join("lib.sto"))
            .unwrap_err();
        assert!(matches!(err, CodegenError::CoercionOutOfRange { index: 3, len: 1 }));
    }
}
