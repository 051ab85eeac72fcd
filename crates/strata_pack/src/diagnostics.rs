//! Diagnostic codes for package building.
//!
//! Error codes `E401`--`E408` cover member and code-generation failures.
//! Consistency and descriptor errors keep their `E3xx` codes.

use strata_diagnostics::{Category, Diagnostic, DiagnosticCode};

use crate::error::PackError;

/// Member file not found.
pub const E401: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 401,
};

/// Member file name is not a valid unit name.
pub const E402: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 402,
};

/// Member file holds a different unit.
pub const E403: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 403,
};

/// Member compiled for another package.
pub const E404: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 404,
};

/// Forward reference between members.
pub const E405: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 405,
};

/// Member listed twice.
pub const E406: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 406,
};

/// Code generation or partial linking failed.
pub const E407: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 407,
};

/// Member file of the wrong kind.
pub const E408: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 408,
};

impl PackError {
    /// Converts the error into a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PackError::Persist(err) => return err.to_diagnostic(),
            PackError::Codec(err) => return err.to_diagnostic(),
            _ => {}
        }
        let code = match self {
            PackError::FileNotFound(_) => E401,
            PackError::InvalidMemberName { .. } => E402,
            PackError::IllegalRenaming { .. } => E403,
            PackError::WrongForPack { .. } => E404,
            PackError::ForwardReference { .. } => E405,
            PackError::DuplicateMember { .. } => E406,
            PackError::NotAMember(_) => E408,
            PackError::LinkingOrCodegenFailure(_) | PackError::Persist(_) | PackError::Codec(_) => E407,
        };
        let diag = Diagnostic::error(code, self.to_string());
        match self {
            PackError::FileNotFound(_) => diag.with_help("check the member path and the -I directories"),
            PackError::WrongForPack { pack_path, file } => diag
                .with_file(file.clone())
                .with_help(format!("recompile the member with --for-pack {pack_path}")),
            PackError::ForwardReference { file, .. } => diag
                .with_file(file.clone())
                .with_note("members may only depend on members listed before them")
                .with_help("reorder the member files"),
            PackError::IllegalRenaming { file, .. } | PackError::InvalidMemberName { file, .. } => {
                diag.with_file(file.clone())
            }
            PackError::DuplicateMember { file, .. } => diag.with_file(file.clone()),
            PackError::NotAMember(file) => diag.with_file(file.clone()),
            _ => diag,
        }
    }
}
