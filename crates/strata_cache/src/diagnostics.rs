//! Diagnostic codes and helper functions for descriptor cache errors and
//! warnings.
//!
//! Error codes `E301`--`E306` cover loading and consistency failures
//! (renamed files, disagreeing digests, unusable descriptors). Warning code
//! `W301` reports a referenced unit with no usable interface file.

use strata_common::ModuleName;
use strata_diagnostics::{Category, Diagnostic, DiagnosticCode};

use crate::error::{CodecError, PersistError};

/// A file holds the interface of a different unit than requested.
pub const E301: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 301,
};

/// Two artifacts disagree about the digest of a shared dependency.
pub const E302: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 302,
};

/// A unit needs a compiler option that is not enabled.
pub const E303: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 303,
};

/// A package-internal unit referenced from outside its package.
pub const E304: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 304,
};

/// A descriptor file could not be read, decoded or written.
pub const E305: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 305,
};

/// No interface found for a unit that is required.
pub const E306: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 306,
};

/// A referenced unit has no usable interface file.
pub const W301: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 301,
};

/// Creates the warning for a unit that was referenced but could not be
/// loaded. `explanation` says why, when the cause was more than absence.
pub fn warning_no_interface_file(name: &ModuleName, explanation: Option<String>) -> Diagnostic {
    let diag = Diagnostic::warning(W301, format!("no valid interface file found for unit {name}"));
    match explanation {
        Some(note) => diag.with_note(note),
        None => diag,
    }
}

/// A one-line account of `err`, with the configuration it needs if any.
pub fn explain(err: &PersistError) -> String {
    match err {
        PersistError::MissingRequiredFeature { feature, .. } => {
            format!("{err}; {}", feature.requirement())
        }
        _ => err.to_string(),
    }
}

impl PersistError {
    /// The diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            PersistError::NotFound(_) => E306,
            PersistError::IllegalRenaming { .. } => E301,
            PersistError::InconsistentImport { .. } => E302,
            PersistError::MissingRequiredFeature { .. } => E303,
            PersistError::DirectReferenceFromWrongPackage { .. } => E304,
            PersistError::Codec(_) => E305,
        }
    }

    /// Converts the error into a diagnostic with notes and a suggestion.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            PersistError::IllegalRenaming { file, expected, .. } => diag
                .with_file(file.clone())
                .with_help(format!("rename the file or recompile it as unit {expected}")),
            PersistError::InconsistentImport { unit, .. } => diag
                .with_note(format!("each file was compiled against a different version of {unit}"))
                .with_help("recompile the out-of-date file"),
            PersistError::MissingRequiredFeature { feature, .. } => {
                diag.with_note(feature.requirement())
            }
            PersistError::DirectReferenceFromWrongPackage { unit, .. } => {
                diag.with_help(format!("refer to it through package {}", unit.prefix))
            }
            PersistError::Codec(codec) => codec.to_diagnostic(),
            PersistError::NotFound(_) => diag,
        }
    }
}

impl CodecError {
    /// Converts the error into an `E305` diagnostic naming the file.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(E305, self.to_string());
        match self {
            CodecError::Io { path, .. }
            | CodecError::InvalidHeader { path, .. }
            | CodecError::DigestMismatch { path, .. }
            | CodecError::VersionMismatch { path, .. }
            | CodecError::WrongKind { path, .. } => diag.with_file(path.clone()),
            CodecError::Serialization { .. } => diag,
        }
        .with_help("recompile the unit that produced this file")
    }
}
