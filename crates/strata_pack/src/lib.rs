//! Package builder: merges independently compiled units into one.
//!
//! [`package_files`] reads an ordered list of member files compiled for a
//! common package, checks them against the shared [`PersistentEnv`]
//! (naming, pack prefix, dependency digests), rejects forward references
//! between members, merges their implementation info into a single
//! [`ImplementationInfo`], and hands a synthesized [`PackageProgram`] to a
//! [`CodeGenerator`] to emit the combined object. The result is shaped like
//! the outputs of a single unit.
//!
//! [`PersistentEnv`]: strata_cache::PersistentEnv

#![warn(missing_docs)]

pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod info;
pub mod member;
pub mod merge;
pub mod packager;

pub use codegen::{
    ArchivedMember, CodeGenerator, CodegenError, Coercion, Component, ObjectArchive, ObjectArchiver,
    PackageProgram,
};
pub use error::PackError;
pub use info::ImplementationInfo;
pub use member::{check_units, read_member_info, MemberKind, PackMember};
pub use merge::build_package_info;
pub use packager::{is_member_file, package_files, PackOutput, PackRequest};
