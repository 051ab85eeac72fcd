//! Unit descriptors: what an interface file records about a compiled unit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_common::{Digest, ModuleName, UnitName};

use crate::codec::{self, ArtifactKind};
use crate::error::CodecError;

/// A dependency a unit was compiled against.
///
/// The digest is absent only for legacy dependencies whose content does not
/// take part in consistency checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// The dependency's module name.
    pub name: ModuleName,
    /// The digest of the dependency's interface, if it matters.
    pub digest: Option<Digest>,
}

impl Import {
    /// Creates an import with a known digest.
    pub fn new(name: ModuleName, digest: Digest) -> Self {
        Self {
            name,
            digest: Some(digest),
        }
    }

    /// Creates an import that does not take part in consistency checks.
    pub fn unchecked(name: ModuleName) -> Self {
        Self { name, digest: None }
    }
}

/// A compilation flag recorded in a unit's interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitFlag {
    /// The unit was compiled with recursive types enabled.
    RecursiveTypes,
    /// The unit was compiled in unsafe-string mode.
    UnsafeString,
    /// The unit's implementation is hidden from cross-unit optimization.
    Opaque,
    /// Alerts attached to the unit, keyed by alert name.
    Alerts(BTreeMap<String, String>),
}

/// The serialized content of an interface (`.sti`) file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceFile {
    /// The unit's full name.
    pub name: UnitName,
    /// The elaborated signature, opaque to the cache.
    pub signature: Vec<u8>,
    /// Dependencies and the digests they were compiled against.
    pub imports: Vec<Import>,
    /// Compilation flags.
    pub flags: Vec<UnitFlag>,
}

/// An interface file as handed to the environment by a loader.
#[derive(Debug, Clone)]
pub struct PersistentSignature {
    /// Where the interface came from.
    pub filename: PathBuf,
    /// The decoded file content.
    pub interface: InterfaceFile,
    /// The trailing digest of the encoded file.
    pub digest: Digest,
}

impl PersistentSignature {
    /// Reads and verifies an interface file.
    pub fn read(path: &Path) -> Result<Self, CodecError> {
        let (interface, digest) = codec::decode_file(path, ArtifactKind::Interface)?;
        Ok(Self {
            filename: path.to_path_buf(),
            interface,
            digest,
        })
    }

    /// Wraps an in-memory interface, computing the digest its encoded form
    /// would carry on disk.
    pub fn new(filename: impl Into<PathBuf>, interface: InterfaceFile) -> Result<Self, CodecError> {
        let digest = codec::digest_of(ArtifactKind::Interface, &interface)?;
        Ok(Self {
            filename: filename.into(),
            interface,
            digest,
        })
    }
}

/// The cached record of a loaded or saved unit.
///
/// The import list always begins with the unit's own name and digest,
/// followed by every dependency recorded in its interface. Descriptors are
/// never mutated after construction; the cache replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDescriptor {
    /// The unit's full name, including its pack prefix.
    pub name: UnitName,
    /// The unit itself followed by its dependencies.
    pub imports: Vec<Import>,
    /// The file the descriptor was read from or saved to.
    pub filename: PathBuf,
    /// Compilation flags.
    pub flags: Vec<UnitFlag>,
}

impl UnitDescriptor {
    /// Builds the descriptor for an interface whose own digest is known.
    pub fn from_interface(filename: &Path, interface: &InterfaceFile, digest: Digest) -> Self {
        let mut imports = Vec::with_capacity(interface.imports.len() + 1);
        imports.push(Import::new(interface.name.module.clone(), digest));
        imports.extend(interface.imports.iter().cloned());
        Self {
            name: interface.name.clone(),
            imports,
            filename: filename.to_path_buf(),
            flags: interface.flags.clone(),
        }
    }

    /// Builds the descriptor of a loaded signature.
    pub fn from_signature(sig: &PersistentSignature) -> Self {
        Self::from_interface(&sig.filename, &sig.interface, sig.digest)
    }

    /// Returns the unit's own digest.
    pub fn own_digest(&self) -> Option<Digest> {
        self.imports
            .iter()
            .find(|import| import.name == self.name.module)
            .and_then(|import| import.digest)
    }

    /// Returns `true` if the unit carries the given flag.
    pub fn has_flag(&self, flag: &UnitFlag) -> bool {
        self.flags.contains(flag)
    }

    /// Returns the alerts recorded for this unit, if any.
    pub fn alerts(&self) -> Option<&BTreeMap<String, String>> {
        self.flags.iter().find_map(|flag| match flag {
            UnitFlag::Alerts(alerts) => Some(alerts),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str) -> ModuleName {
        ModuleName::new(name).unwrap()
    }

    fn interface(name: &str, deps: &[(&str, &[u8])]) -> InterfaceFile {
        InterfaceFile {
            name: name.parse().unwrap(),
            signature: b"sig".to_vec(),
            imports: deps
                .iter()
                .map(|(n, content)| Import::new(module(n), Digest::from_bytes(content)))
                .collect(),
            flags: vec![UnitFlag::Opaque],
        }
    }

    #[test]
    fn descriptor_starts_with_own_digest() {
        let sig = PersistentSignature::new("m.sti", interface("M", &[("N", b"n1")])).unwrap();
        let ps = UnitDescriptor::from_signature(&sig);
        assert_eq!(ps.imports.len(), 2);
        assert_eq!(ps.imports[0].name, module("M"));
        assert_eq!(ps.own_digest(), Some(sig.digest));
        assert_eq!(ps.imports[1].digest, Some(Digest::from_bytes(b"n1")));
    }

    #[test]
    fn digest_depends_on_imports() {
        let a = PersistentSignature::new("m.sti", interface("M", &[("N", b"n1")])).unwrap();
        let b = PersistentSignature::new("m.sti", interface("M", &[("N", b"n2")])).unwrap();
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn read_matches_in_memory_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.sti");
        let iface = interface("M", &[]);
        let written = codec::encode_file(&path, ArtifactKind::Interface, &iface).unwrap();
        let sig = PersistentSignature::read(&path).unwrap();
        assert_eq!(sig.digest, written);
        assert_eq!(PersistentSignature::new(&path, iface).unwrap().digest, written);
    }

    #[test]
    fn alerts_lookup() {
        let mut alerts = BTreeMap::new();
        alerts.insert("deprecated".to_string(), "use Bar".to_string());
        let mut iface = interface("M", &[]);
        iface.flags.push(UnitFlag::Alerts(alerts));
        let sig = PersistentSignature::new("m.sti", iface).unwrap();
        let ps = UnitDescriptor::from_signature(&sig);
        assert_eq!(ps.alerts().unwrap()["deprecated"], "use Bar");
        assert!(ps.has_flag(&UnitFlag::Opaque));
    }

    #[test]
    fn interface_serializes_to_json() {
        let iface = interface("Lib.M", &[]);
        let json = serde_json::to_value(&iface).unwrap();
        assert_eq!(json["name"]["module"], "M");
        assert_eq!(json["name"]["prefix"][0], "Lib");
        assert_eq!(json["flags"][0], "Opaque");
        let back: InterfaceFile = serde_json::from_value(json).unwrap();
        assert_eq!(back, iface);
    }
}
