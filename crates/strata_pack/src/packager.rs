//! Building a package from member files.

use std::path::{Path, PathBuf};

use strata_cache::{codec, ArtifactKind, DigestLedger, PersistentEnv, PersistentSignature, SearchPath};
use strata_common::{Digest, UnitName};

use crate::codegen::{CodeGenerator, Coercion, PackageProgram};
use crate::error::PackError;
use crate::info::ImplementationInfo;
use crate::member::{check_units, read_member_info, PackMember};
use crate::merge::build_package_info;

/// What to build.
#[derive(Debug, Clone)]
pub struct PackRequest {
    /// The package's identity. Members must carry its pack path.
    pub target: UnitName,
    /// Member files in link order, resolved through the search path.
    pub files: Vec<PathBuf>,
    /// Output prefix. The info file and combined object are written next
    /// to it with their own extensions.
    pub output: PathBuf,
    /// Coercion from the members' structure to the package signature.
    pub coercion: Coercion,
}

impl PackRequest {
    /// The implementation info file to write.
    pub fn info_file(&self) -> PathBuf {
        self.output.with_extension(ArtifactKind::Implementation.extension())
    }

    /// The combined object file to write.
    pub fn object_file(&self) -> PathBuf {
        self.output.with_extension(ArtifactKind::Object.extension())
    }
}

/// The outcome of a successful build.
#[derive(Debug, Clone)]
pub struct PackOutput {
    /// The merged implementation info.
    pub info: ImplementationInfo,
    /// Digest of the written info file.
    pub digest: Digest,
    /// Where the info was written.
    pub info_file: PathBuf,
    /// Where the combined object was written.
    pub object_file: PathBuf,
    /// The members, in link order.
    pub members: Vec<PackMember>,
}

/// Builds the package described by `request`.
///
/// Members are read and checked through `env`, which stays the session's
/// environment: their interface digests remain in its ledger afterwards.
/// If the package's own interface can be found its digest is recorded in
/// the merged info. Any failure removes both output files.
pub fn package_files<V: Clone>(
    env: &mut PersistentEnv<V>,
    search: &SearchPath,
    codegen: &mut dyn CodeGenerator,
    request: &PackRequest,
    make_value: impl FnOnce(&PersistentSignature) -> V,
) -> Result<PackOutput, PackError> {
    let files = request
        .files
        .iter()
        .map(|file| search.find(file).ok_or_else(|| PackError::FileNotFound(file.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let previous_unit = env.current_unit().cloned();
    env.set_current_unit(Some(request.target.clone()));
    let result = package_object_files(env, codegen, request, &files, make_value);
    env.set_current_unit(previous_unit);

    if result.is_err() {
        remove_outputs(request);
    }
    result
}

fn package_object_files<V: Clone>(
    env: &mut PersistentEnv<V>,
    codegen: &mut dyn CodeGenerator,
    request: &PackRequest,
    files: &[PathBuf],
    make_value: impl FnOnce(&PersistentSignature) -> V,
) -> Result<PackOutput, PackError> {
    let pack_path = request.target.as_pack_path();
    let mut implementations = DigestLedger::new();
    let members = files
        .iter()
        .map(|file| read_member_info(file, &pack_path, env, &mut implementations))
        .collect::<Result<Vec<_>, _>>()?;
    check_units(&members)?;

    let own_interface = match env.crc_of_unit(&request.target.module, make_value) {
        Ok(digest) => Some(digest),
        Err(err) if err.is_not_found() => None,
        Err(err) => return Err(err.into()),
    };
    let info = build_package_info(&request.target, &members, own_interface);

    let program = PackageProgram::new(request.target.clone(), &members, request.coercion.clone());
    let object_file = request.object_file();
    codegen.emit_package(&program, &object_file)?;

    let info_file = request.info_file();
    let digest = info.write(&info_file)?;

    Ok(PackOutput {
        info,
        digest,
        info_file,
        object_file,
        members,
    })
}

fn remove_outputs(request: &PackRequest) {
    for path in [request.info_file(), request.object_file()] {
        codec::remove_file(&path);
    }
}

/// Returns `true` if `path` names a file the package builder accepts as a
/// member.
pub fn is_member_file(path: &Path) -> bool {
    matches!(
        ArtifactKind::from_path(path),
        Some(ArtifactKind::Interface | ArtifactKind::Implementation)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_share_prefix() {
        let request = PackRequest {
            target: "Lib".parse().unwrap(),
            files: Vec::new(),
            output: PathBuf::from("out/lib.stx"),
            coercion: Coercion::Identity,
        };
        assert_eq!(request.info_file(), PathBuf::from("out/lib.stx"));
        assert_eq!(request.object_file(), PathBuf::from("out/lib.sto"));
    }

    #[test]
    fn member_files_by_extension() {
        assert!(is_member_file(Path::new("a.stx")));
        assert!(is_member_file(Path::new("s.sti")));
        assert!(!is_member_file(Path::new("a.sto")));
        assert!(!is_member_file(Path::new("a.o")));
    }
}
