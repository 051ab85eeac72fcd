//! Error types for package building.

use std::path::PathBuf;

use strata_cache::{CodecError, PersistError};
use strata_common::{ModuleName, NameError, PackPath, UnitName};

use crate::codegen::CodegenError;

/// Errors that abort a package build.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// A member file could not be located.
    #[error("file {} not found", .0.display())]
    FileNotFound(PathBuf),

    /// A member file name does not yield a valid unit name.
    #[error("cannot derive a unit name from {}: {source}", .file.display())]
    InvalidMemberName {
        /// The member file.
        file: PathBuf,
        /// Why the name was rejected.
        source: NameError,
    },

    /// A member file is neither an interface nor implementation info.
    #[error("{} is not a package member: expected a .sti or .stx file", .0.display())]
    NotAMember(PathBuf),

    /// A member file holds the code of a different unit than its name says.
    #[error("wrong file naming: {} contains the code for {found} when {expected} was expected", .file.display())]
    IllegalRenaming {
        /// The name derived from the file.
        expected: ModuleName,
        /// The name recorded in the file.
        found: UnitName,
        /// The member file.
        file: PathBuf,
    },

    /// A member was not compiled for the package being built.
    #[error("file {} was not compiled for package {pack_path}", .file.display())]
    WrongForPack {
        /// The member file.
        file: PathBuf,
        /// The pack path members must carry.
        pack_path: PackPath,
    },

    /// A member depends on a member listed at or after its own position.
    #[error("forward reference to {unit} in file {}", .file.display())]
    ForwardReference {
        /// The referencing member file.
        file: PathBuf,
        /// The member referenced too early.
        unit: ModuleName,
    },

    /// The same unit appears twice in the member list.
    #[error("unit {unit} is listed twice, the second time as {}", .file.display())]
    DuplicateMember {
        /// The repeated unit.
        unit: ModuleName,
        /// The second file.
        file: PathBuf,
    },

    /// The code generator failed to produce the combined object.
    #[error("error during partial linking: {0}")]
    LinkingOrCodegenFailure(#[from] CodegenError),

    /// A member failed consistency checking.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// A member or output file could not be read or written.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
