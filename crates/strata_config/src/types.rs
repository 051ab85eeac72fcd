//! Configuration types deserialized from `strata.toml`.

use serde::Deserialize;

/// The top-level configuration parsed from `strata.toml`.
///
/// Every section is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Options the current compilation runs under.
    #[serde(default)]
    pub compiler: CompilerOptions,
    /// Which warning classes are active.
    #[serde(default)]
    pub warnings: WarningConfig,
    /// Package building policy.
    #[serde(default)]
    pub pack: PackConfig,
    /// Descriptor search directories.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Compiler options that loaded descriptors are checked against.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerOptions {
    /// Recursive types are enabled (`-rectypes`). Units built with recursive
    /// types may only be imported when this is set.
    #[serde(default)]
    pub recursive_types: bool,
    /// Strict safe-string mode. Units compiled unsafe are rejected.
    #[serde(default = "default_true")]
    pub force_safe_string: bool,
    /// The current unit is compiled in unsafe-string mode.
    #[serde(default)]
    pub unsafe_string: bool,
    /// The current unit is compiled opaque: its implementation is hidden
    /// from cross-unit optimization.
    #[serde(default)]
    pub opaque: bool,
    /// Fold every loaded unit's dependency digests into the ledger.
    #[serde(default = "default_true")]
    pub check_consistency: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            recursive_types: false,
            force_safe_string: true,
            unsafe_string: false,
            opaque: false,
            check_consistency: true,
        }
    }
}

/// Warning classes that can be switched on or off.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarningConfig {
    /// Report referenced units whose interface file cannot be found or read.
    /// When off, existence probes are recorded but never validated.
    #[serde(default = "default_true")]
    pub no_interface_file: bool,
}

impl Default for WarningConfig {
    fn default() -> Self {
        Self {
            no_interface_file: true,
        }
    }
}

/// Package building policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackConfig {
    /// Reject direct references to a unit compiled for a package the
    /// referencing unit is not itself part of.
    #[serde(default)]
    pub enforce_visibility: bool,
}

/// Directories searched for descriptor files, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Include directories, searched first to last.
    #[serde(default)]
    pub include: Vec<String>,
}

fn default_true() -> bool {
    true
}
