//! Hierarchical unit names with an optional for-pack prefix.
//!
//! A [`ModuleName`] is the bare capitalized name a unit is searched by. A
//! [`PackPath`] is the chain of packages a unit was compiled to live inside
//! (`-for-pack A.B`). A [`UnitName`] pairs the two and is what descriptors
//! carry as their identity. All three compare structurally.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The reserved pseudo-unit holding predefined exceptions.
const PREDEF: &str = "*predef*";

/// Errors from constructing or parsing names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The name was empty.
    #[error("empty unit name")]
    Empty,

    /// The name contained a character that cannot appear in a module name.
    #[error("invalid character {ch:?} in unit name `{name}`")]
    InvalidChar {
        /// The offending name.
        name: String,
        /// The first invalid character.
        ch: char,
    },

    /// A file path had no usable stem to derive a name from.
    #[error("cannot derive a unit name from `{0}`")]
    NoStem(String),
}

/// The bare, capitalized name of a compilation unit (e.g. `Foo`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct ModuleName(String);

impl ModuleName {
    /// Creates a module name, capitalizing its first letter.
    ///
    /// Letters, digits, `_` and `'` are accepted.
    pub fn new(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '\''))
        {
            return Err(NameError::InvalidChar {
                name: name.to_string(),
                ch,
            });
        }
        Ok(Self(capitalize(name)))
    }

    /// The reserved name of the predefined-exceptions pseudo-unit.
    ///
    /// It never resolves to a file and is rejected by every lookup.
    pub fn predef() -> Self {
        Self(PREDEF.to_string())
    }

    /// Returns `true` for the predefined-exceptions pseudo-unit.
    pub fn is_predef(&self) -> bool {
        self.0 == PREDEF
    }

    /// Derives a module name from a file path.
    ///
    /// Everything after the first `.` of the file name is dropped and the
    /// result capitalized, so `lib/foo.bar.stx` names `Foo`.
    pub fn from_file(path: &Path) -> Result<Self, NameError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| NameError::NoStem(path.display().to_string()))?;
        let stem = file_name.split('.').next().unwrap_or_default();
        if stem.is_empty() {
            return Err(NameError::NoStem(path.display().to_string()));
        }
        Self::new(stem)
    }

    /// Returns the name as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name with its first letter lower-cased, the form used for
    /// on-disk file names.
    pub fn uncapitalized(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// The chain of enclosing packages a unit was compiled for.
///
/// The empty path denotes a top-level unit.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
pub struct PackPath(Vec<ModuleName>);

impl PackPath {
    /// The empty path of a top-level unit.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` for the empty path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the path extended with one more package.
    pub fn child(&self, module: &ModuleName) -> Self {
        let mut parts = self.0.clone();
        parts.push(module.clone());
        Self(parts)
    }

    /// Returns `true` if `self` is a (not necessarily strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &PackPath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Returns the components of this path, outermost first.
    pub fn components(&self) -> &[ModuleName] {
        &self.0
    }
}

impl fmt::Display for PackPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl FromStr for PackPath {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        s.split('.')
            .map(ModuleName::new)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// The full identity of a compiled unit: its pack prefix and module name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct UnitName {
    /// Packages this unit was compiled to be placed inside.
    pub prefix: PackPath,
    /// The bare module name.
    pub module: ModuleName,
}

impl UnitName {
    /// Creates a unit name from a prefix and module name.
    pub fn new(prefix: PackPath, module: ModuleName) -> Self {
        Self { prefix, module }
    }

    /// Creates a unit name with no pack prefix.
    pub fn toplevel(module: ModuleName) -> Self {
        Self::new(PackPath::root(), module)
    }

    /// Returns the pack path that members of this unit must carry when it is
    /// built as a package.
    pub fn as_pack_path(&self) -> PackPath {
        self.prefix.child(&self.module)
    }

    /// Returns the linker-level symbol of this unit (`A__B__Foo`).
    pub fn symbol(&self) -> String {
        let mut parts: Vec<&str> = self.prefix.components().iter().map(|m| m.as_str()).collect();
        parts.push(self.module.as_str());
        parts.join("__")
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_root() {
            write!(f, "{}.", self.prefix)?;
        }
        write!(f, "{}", self.module)
    }
}

impl FromStr for UnitName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((prefix, module)) => Ok(Self::new(prefix.parse()?, ModuleName::new(module)?)),
            None => Ok(Self::toplevel(ModuleName::new(s)?)),
        }
    }
}
