//! Error types for descriptor decoding and environment operations.

use std::fmt;
use std::path::PathBuf;

use strata_common::{ModuleName, UnitName};

use crate::codec::ArtifactKind;

/// Errors from reading or writing descriptor files.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading or writing a descriptor.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file does not start with a valid descriptor header.
    #[error("invalid descriptor header in {path}: {reason}")]
    InvalidHeader {
        /// The descriptor file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The trailing digest does not match the file content.
    #[error("digest mismatch in {path}: expected {expected}, got {actual}")]
    DigestMismatch {
        /// The descriptor file path.
        path: PathBuf,
        /// The digest stored in the file.
        expected: String,
        /// The digest computed from the file content.
        actual: String,
    },

    /// The descriptor was written by an incompatible format version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The descriptor file path.
        path: PathBuf,
        /// The format version this build understands.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// The file holds a different kind of descriptor than requested.
    #[error("{path} holds {actual:?} data where {expected:?} data was expected")]
    WrongKind {
        /// The descriptor file path.
        path: PathBuf,
        /// The requested kind.
        expected: ArtifactKind,
        /// The kind recorded in the file.
        actual: ArtifactKind,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

/// A compiler capability a unit may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Recursive types (`recursive_types = true`).
    RecursiveTypes,
    /// Unsafe strings, unavailable under `force_safe_string`.
    UnsafeString,
}

impl Feature {
    /// Explains which configuration the feature needs.
    pub fn requirement(self) -> &'static str {
        match self {
            Feature::RecursiveTypes => "the compilation option recursive_types is required",
            Feature::UnsafeString => {
                "this compiler is configured in strict safe-string mode (force_safe_string)"
            }
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::RecursiveTypes => write!(f, "uses recursive types"),
            Feature::UnsafeString => write!(f, "was compiled with unsafe strings"),
        }
    }
}

/// Errors raised by the persistent environment.
///
/// Everything except [`PersistError::NotFound`] is fatal to the current
/// unit. `NotFound` is left for the caller to escalate or ignore.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// No interface could be found for the unit.
    #[error("no interface found for unit {0}")]
    NotFound(ModuleName),

    /// A file contains the interface of a different unit than the one
    /// searched for.
    #[error("wrong file naming: {} contains the compiled interface for {found} when {expected} was expected", .file.display())]
    IllegalRenaming {
        /// The name that was searched for.
        expected: ModuleName,
        /// The name the file reports.
        found: UnitName,
        /// The offending file.
        file: PathBuf,
    },

    /// Two loaded artifacts were compiled against different versions of
    /// the same dependency.
    #[error(
        "the files {} and {} make inconsistent assumptions over interface {unit}",
        .first_source.display(),
        .second_source.display()
    )]
    InconsistentImport {
        /// The dependency the two files disagree about.
        unit: ModuleName,
        /// The file that established the recorded digest.
        first_source: PathBuf,
        /// The file whose digest disagreed.
        second_source: PathBuf,
    },

    /// A unit needs a compiler configuration that is not in effect.
    #[error("invalid import of {unit}, which {feature}")]
    MissingRequiredFeature {
        /// The unit being imported.
        unit: UnitName,
        /// The missing capability.
        feature: Feature,
    },

    /// A unit compiled for a package was referenced from outside it.
    #[error("{current} refers directly to {unit}, which is internal to package {}", .unit.prefix)]
    DirectReferenceFromWrongPackage {
        /// The referenced unit.
        unit: UnitName,
        /// The unit being compiled.
        current: UnitName,
    },

    /// The descriptor file could not be read or written.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl PersistError {
    /// Returns `true` for the recoverable not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str) -> ModuleName {
        ModuleName::new(name).unwrap()
    }

    #[test]
    fn inconsistent_import_names_both_files() {
        let err = PersistError::InconsistentImport {
            unit: module("N"),
            first_source: PathBuf::from("m.sti"),
            second_source: PathBuf::from("p.sti"),
        };
        assert_eq!(
            err.to_string(),
            "the files m.sti and p.sti make inconsistent assumptions over interface N"
        );
    }

    #[test]
    fn illegal_renaming_display() {
        let err = PersistError::IllegalRenaming {
            expected: module("Foo"),
            found: "Bar".parse().unwrap(),
            file: PathBuf::from("lib/foo.sti"),
        };
        let msg = err.to_string();
        assert!(msg.contains("lib/foo.sti"));
        assert!(msg.contains("interface for Bar when Foo was expected"));
    }

    #[test]
    fn missing_feature_display() {
        let err = PersistError::MissingRequiredFeature {
            unit: "Lib.Foo".parse().unwrap(),
            feature: Feature::RecursiveTypes,
        };
        assert_eq!(err.to_string(), "invalid import of Lib.Foo, which uses recursive types");
    }

    #[test]
    fn wrong_package_display() {
        let err = PersistError::DirectReferenceFromWrongPackage {
            unit: "Lib.Foo".parse().unwrap(),
            current: "Main".parse().unwrap(),
        };
        assert!(err.to_string().contains("internal to package Lib"));
    }

    #[test]
    fn codec_error_is_transparent() {
        let err: PersistError = CodecError::Serialization {
            reason: "bad".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "serialization error: bad");
        assert!(!err.is_not_found());
    }

    #[test]
    fn digest_mismatch_display() {
        let err = CodecError::DigestMismatch {
            path: PathBuf::from("a.sti"),
            expected: "aabb".to_string(),
            actual: "ccdd".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aabb"));
        assert!(msg.contains("ccdd"));
    }
}
