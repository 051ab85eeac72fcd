//! Package members: reading them and checking their order.

use std::path::{Path, PathBuf};

use strata_cache::{ArtifactKind, DigestLedger, Inconsistency, PersistError, PersistentEnv};
use strata_common::{Digest, ModuleName, PackPath};

use crate::error::PackError;
use crate::info::ImplementationInfo;

/// What a member file contributes to the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// An interface with no code (`.sti`).
    Interface,
    /// Compiled code with its implementation info (`.stx`).
    Implementation(Box<ImplementationInfo>),
}

/// One file of a package, in the order it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackMember {
    /// The resolved member file.
    pub file: PathBuf,
    /// The unit name derived from the file name.
    pub name: ModuleName,
    /// Interface-only or implementation.
    pub kind: MemberKind,
}

impl PackMember {
    /// The implementation info, for implementation members.
    pub fn info(&self) -> Option<&ImplementationInfo> {
        match &self.kind {
            MemberKind::Implementation(info) => Some(info),
            MemberKind::Interface => None,
        }
    }

    /// The object file holding the member's code, next to its info file.
    pub fn object_file(&self) -> Option<PathBuf> {
        self.info()
            .map(|_| self.file.with_extension(ArtifactKind::Object.extension()))
    }
}

/// Reads one member file destined for the package at `pack_path`.
///
/// Implementation members are checked like any loaded unit: their recorded
/// name must match the file name, they must have been compiled for
/// `pack_path`, and their interface digests are folded into `env`'s ledger.
/// Their own digest and implementation digests go to `implementations`.
pub fn read_member_info<V: Clone>(
    file: &Path,
    pack_path: &PackPath,
    env: &mut PersistentEnv<V>,
    implementations: &mut DigestLedger,
) -> Result<PackMember, PackError> {
    let name = ModuleName::from_file(file).map_err(|source| PackError::InvalidMemberName {
        file: file.to_path_buf(),
        source,
    })?;

    let kind = match ArtifactKind::from_path(file) {
        Some(ArtifactKind::Interface) => MemberKind::Interface,
        Some(ArtifactKind::Implementation) => {
            let (info, digest) = ImplementationInfo::read(file)?;
            if info.name.module != name {
                return Err(PackError::IllegalRenaming {
                    expected: name,
                    found: info.name,
                    file: file.to_path_buf(),
                });
            }
            if info.name.prefix != *pack_path {
                return Err(PackError::WrongForPack {
                    file: file.to_path_buf(),
                    pack_path: pack_path.clone(),
                });
            }
            env.check_consistency(file, &info.imports_intf)?;
            check_implementations(implementations, file, &name, digest, &info)?;
            MemberKind::Implementation(Box::new(info))
        }
        Some(ArtifactKind::Object) | None => return Err(PackError::NotAMember(file.to_path_buf())),
    };

    Ok(PackMember {
        file: file.to_path_buf(),
        name,
        kind,
    })
}

fn check_implementations(
    ledger: &mut DigestLedger,
    file: &Path,
    name: &ModuleName,
    digest: Digest,
    info: &ImplementationInfo,
) -> Result<(), PersistError> {
    let own = std::iter::once((name, Some(digest)));
    let imported = info.imports_impl.iter().map(|import| (&import.name, import.digest));
    for (unit, digest) in own.chain(imported) {
        if let Some(digest) = digest {
            ledger.check(unit, digest, file).map_err(inconsistent)?;
        }
    }
    Ok(())
}

fn inconsistent(inconsistency: Inconsistency) -> PersistError {
    PersistError::InconsistentImport {
        unit: inconsistency.unit,
        first_source: inconsistency.original_source,
        second_source: inconsistency.inconsistent_source,
    }
}

/// Checks that every member only depends on members listed before it.
///
/// A member's own name counts as not yet seen, so a self-reference is a
/// forward reference. A name listed twice is rejected.
pub fn check_units(members: &[PackMember]) -> Result<(), PackError> {
    let mut forbidden: Vec<&ModuleName> = members.iter().map(|m| &m.name).collect();
    for member in members {
        if let Some(info) = member.info() {
            if let Some(import) = info.imports_impl.iter().find(|i| forbidden.contains(&&i.name)) {
                return Err(PackError::ForwardReference {
                    file: member.file.clone(),
                    unit: import.name.clone(),
                });
            }
        }
        match forbidden.iter().position(|name| **name == member.name) {
            Some(index) => {
                forbidden.remove(index);
            }
            None => {
                return Err(PackError::DuplicateMember {
                    unit: member.name.clone(),
                    file: member.file.clone(),
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_cache::{Import, PersistentSignature};
    use strata_config::ProjectConfig;

    fn module(name: &str) -> ModuleName {
        ModuleName::new(name).unwrap()
    }

    fn member(name: &str, imports: &[&str]) -> PackMember {
        let mut info = ImplementationInfo::new(format!("Lib.{name}").parse().unwrap());
        info.imports_impl = imports
            .iter()
            .map(|dep| Import::new(module(dep), Digest::from_bytes(dep.as_bytes())))
            .collect();
        PackMember {
            file: PathBuf::from(format!("{}.stx", name.to_lowercase())),
            name: module(name),
            kind: MemberKind::Implementation(Box::new(info)),
        }
    }

    fn interface_member(name: &str) -> PackMember {
        PackMember {
            file: PathBuf::from(format!("{}.sti", name.to_lowercase())),
            name: module(name),
            kind: MemberKind::Interface,
        }
    }

    fn empty_env() -> PersistentEnv<()> {
        let loader = |_: &ModuleName| -> Result<Option<PersistentSignature>, strata_cache::CodecError> { Ok(None) };
        PersistentEnv::new(&ProjectConfig::default(), loader)
    }

    #[test]
    fn backward_reference_is_allowed() {
        let members = [member("A", &[]), member("B", &["Ext"]), member("C", &["A"])];
        assert!(check_units(&members).is_ok());
    }

    #[test]
    fn forward_reference_is_rejected() {
        let members = [member("A", &["C"]), member("B", &[]), member("C", &[])];
        match check_units(&members).unwrap_err() {
            PackError::ForwardReference { file, unit } => {
                assert_eq!(file, PathBuf::from("a.stx"));
                assert_eq!(unit, module("C"));
            }
            other => panic!("expected ForwardReference, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_rejected() {
        let members = [member("A", &[]), member("B", &["B"])];
        assert!(matches!(
            check_units(&members),
            Err(PackError::ForwardReference { unit, .. }) if unit == module("B")
        ));
    }

    #[test]
    fn interface_members_impose_no_order() {
        let members = [member("A", &[]), interface_member("S"), member("B", &["A"])];
        assert!(check_units(&members).is_ok());
    }

    #[test]
    fn duplicate_member_is_rejected() {
        let members = [member("A", &[]), member("A", &[])];
        assert!(matches!(check_units(&members), Err(PackError::DuplicateMember { .. })));
    }

    #[test]
    fn reads_interface_member_without_decoding() {
        let mut env = empty_env();
        let mut ledger = DigestLedger::new();
        let pack: PackPath = "Lib".parse().unwrap();
        let m = read_member_info(Path::new("dir/sig.sti"), &pack, &mut env, &mut ledger).unwrap();
        assert_eq!(m.name, module("Sig"));
        assert_eq!(m.kind, MemberKind::Interface);
        assert_eq!(m.object_file(), None);
    }

    #[test]
    fn object_and_unknown_files_are_not_members() {
        let mut env = empty_env();
        let mut ledger = DigestLedger::new();
        for file in ["a.sto", "a", "a.txt"] {
            match read_member_info(Path::new(file), &PackPath::root(), &mut env, &mut ledger) {
                Err(PackError::NotAMember(path)) => assert_eq!(path, PathBuf::from(file)),
                other => panic!("expected NotAMember for {file}, got {other:?}"),
            }
        }
        assert!(env.imports().is_empty());
    }

    #[test]
    fn reads_implementation_member() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.stx");
        let mut info = ImplementationInfo::new("Lib.A".parse().unwrap());
        info.imports_intf = vec![Import::new(module("Ext"), Digest::from_bytes(b"ext"))];
        info.write(&file).unwrap();

        let mut env = empty_env();
        let mut ledger = DigestLedger::new();
        let pack: PackPath = "Lib".parse().unwrap();
        let m = read_member_info(&file, &pack, &mut env, &mut ledger).unwrap();
        assert_eq!(m.info().unwrap().name, info.name);
        assert_eq!(m.object_file(), Some(dir.path().join("a.sto")));
        assert_eq!(env.ledger().digest(&module("Ext")), Some(Digest::from_bytes(b"ext")));
        assert!(ledger.contains(&module("A")));
    }

    #[test]
    fn member_for_other_package_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.stx");
        ImplementationInfo::new("Other.A".parse().unwrap()).write(&file).unwrap();

        let mut env = empty_env();
        let mut ledger = DigestLedger::new();
        let pack: PackPath = "Lib".parse().unwrap();
        assert!(matches!(
            read_member_info(&file, &pack, &mut env, &mut ledger),
            Err(PackError::WrongForPack { .. })
        ));
    }

    #[test]
    fn renamed_member_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.stx");
        ImplementationInfo::new("Lib.B".parse().unwrap()).write(&file).unwrap();

        let mut env = empty_env();
        let mut ledger = DigestLedger::new();
        let pack: PackPath = "Lib".parse().unwrap();
        assert!(matches!(
            read_member_info(&file, &pack, &mut env, &mut ledger),
            Err(PackError::IllegalRenaming { .. })
        ));
    }

    #[test]
    fn disagreeing_implementation_digests_are_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.stx");
        let b = dir.path().join("b.stx");
        let mut info_a = ImplementationInfo::new("Lib.A".parse().unwrap());
        info_a.imports_impl = vec![Import::new(module("Ext"), Digest::from_bytes(b"v1"))];
        info_a.write(&a).unwrap();
        let mut info_b = ImplementationInfo::new("Lib.B".parse().unwrap());
        info_b.imports_impl = vec![Import::new(module("Ext"), Digest::from_bytes(b"v2"))];
        info_b.write(&b).unwrap();

        let mut env = empty_env();
        let mut ledger = DigestLedger::new();
        let pack: PackPath = "Lib".parse().unwrap();
        read_member_info(&a, &pack, &mut env, &mut ledger).unwrap();
        match read_member_info(&b, &pack, &mut env, &mut ledger).unwrap_err() {
            PackError::Persist(PersistError::InconsistentImport {
                unit,
                first_source,
                second_source,
            }) => {
                assert_eq!(unit, module("Ext"));
                assert_eq!(first_source, a);
                assert_eq!(second_source, b);
            }
            other => panic!("expected InconsistentImport, got {other:?}"),
        }
    }
}
