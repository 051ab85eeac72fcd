//! Implementation info: what a compiled unit tells the linker about itself.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_cache::{codec, ArtifactKind, CodecError, Import};
use strata_common::{Digest, UnitName};

/// The `.stx` companion of a unit's object code.
///
/// Packages produce one of these too, indistinguishable in shape from a
/// single unit's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationInfo {
    /// Identity of the unit.
    pub name: UnitName,
    /// Linker symbols of every unit whose code this object contains.
    pub defines: Vec<String>,
    /// Interfaces the code was compiled against, with their digests.
    pub imports_intf: Vec<Import>,
    /// Implementations the code depends on, with their digests.
    pub imports_impl: Vec<Import>,
    /// Arities of currying helpers the code needs from the runtime.
    pub curry_fns: Vec<u32>,
    /// Arities of application helpers.
    pub apply_fns: Vec<u32>,
    /// Arities of method-dispatch helpers.
    pub send_fns: Vec<u32>,
    /// Link the object even if nothing references it.
    pub force_link: bool,
}

impl ImplementationInfo {
    /// Creates the info of a unit with no dependencies that defines only
    /// itself.
    pub fn new(name: UnitName) -> Self {
        let defines = vec![name.symbol()];
        Self {
            name,
            defines,
            imports_intf: Vec::new(),
            imports_impl: Vec::new(),
            curry_fns: Vec::new(),
            apply_fns: Vec::new(),
            send_fns: Vec::new(),
            force_link: false,
        }
    }

    /// Reads an info file, returning it with the file's own digest.
    pub fn read(path: &Path) -> Result<(Self, Digest), CodecError> {
        codec::decode_file(path, ArtifactKind::Implementation)
    }

    /// Writes the info to `path` and returns its digest.
    pub fn write(&self, path: &Path) -> Result<Digest, CodecError> {
        codec::encode_file(path, ArtifactKind::Implementation, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::ModuleName;

    #[test]
    fn new_defines_own_symbol() {
        let info = ImplementationInfo::new("Lib.Foo".parse().unwrap());
        assert_eq!(info.defines, vec!["Lib__Foo".to_string()]);
        assert!(!info.force_link);
    }

    #[test]
    fn write_then_read_keeps_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.stx");
        let mut info = ImplementationInfo::new("Foo".parse().unwrap());
        info.imports_impl
            .push(Import::new(ModuleName::new("Bar").unwrap(), Digest::from_bytes(b"bar")));
        info.curry_fns = vec![2, 3];

        let written = info.write(&path).unwrap();
        let (back, digest) = ImplementationInfo::read(&path).unwrap();
        assert_eq!(back, info);
        assert_eq!(digest, written);
    }

    #[test]
    fn interface_file_is_not_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.sti");
        codec::encode_file(&path, ArtifactKind::Interface, &ImplementationInfo::new("Foo".parse().unwrap()))
            .unwrap();
        assert!(matches!(
            ImplementationInfo::read(&path),
            Err(CodecError::WrongKind { .. })
        ));
    }

    #[test]
    fn serializes_to_json() {
        let info = ImplementationInfo::new("Foo".parse().unwrap());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["defines"][0], "Foo");
        assert_eq!(json["force_link"], false);
    }
}
