//! Locating descriptor files and the loader seam used by the environment.

use std::path::{Path, PathBuf};

use strata_common::ModuleName;
use strata_config::PathsConfig;

use crate::codec::ArtifactKind;
use crate::descriptor::PersistentSignature;
use crate::error::CodecError;

/// Loads the interface of a unit by name.
///
/// `Ok(None)` means no interface exists for the name; the environment
/// memoizes that answer. Errors reading a file that does exist are
/// reported, not memoized.
pub trait Loader {
    /// Looks up and decodes the interface of `name`.
    fn load(&mut self, name: &ModuleName) -> Result<Option<PersistentSignature>, CodecError>;
}

impl<F> Loader for F
where
    F: FnMut(&ModuleName) -> Result<Option<PersistentSignature>, CodecError>,
{
    fn load(&mut self, name: &ModuleName) -> Result<Option<PersistentSignature>, CodecError> {
        self(name)
    }
}

/// An ordered list of directories searched for descriptor files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Creates a search path from directories, searched first to last.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Builds the search path from configuration, resolving relative
    /// entries against `base`.
    pub fn from_config(paths: &PathsConfig, base: &Path) -> Self {
        Self::new(paths.include.iter().map(|dir| base.join(dir)).collect())
    }

    /// Adds a directory searched before the existing ones.
    pub fn prepend(&mut self, dir: PathBuf) {
        self.dirs.insert(0, dir);
    }

    /// Returns the directories in search order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Resolves a file name.
    ///
    /// A name with a directory component is taken as given if it exists;
    /// a bare name is looked up in each directory in order.
    pub fn find(&self, file: &Path) -> Option<PathBuf> {
        let has_dir = file.parent().is_some_and(|p| !p.as_os_str().is_empty());
        if has_dir || file.is_absolute() {
            return file.is_file().then(|| file.to_path_buf());
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(file))
            .find(|candidate| candidate.is_file())
    }

    /// Resolves the descriptor file of a unit, trying the name as written
    /// and then with its first letter lower-cased in each directory.
    pub fn find_unit(&self, name: &ModuleName, kind: ArtifactKind) -> Option<PathBuf> {
        let exact = format!("{name}.{}", kind.extension());
        let uncap = format!("{}.{}", name.uncapitalized(), kind.extension());
        self.dirs.iter().find_map(|dir| {
            [dir.join(&exact), dir.join(&uncap)]
                .into_iter()
                .find(|candidate| candidate.is_file())
        })
    }
}

/// A [`Loader`] reading `.sti` files from a [`SearchPath`].
#[derive(Debug, Clone)]
pub struct FileLoader {
    search: SearchPath,
}

impl FileLoader {
    /// Creates a loader over the given search path.
    pub fn new(search: SearchPath) -> Self {
        Self { search }
    }
}

impl Loader for FileLoader {
    fn load(&mut self, name: &ModuleName) -> Result<Option<PersistentSignature>, CodecError> {
        match self.search.find_unit(name, ArtifactKind::Interface) {
            Some(path) => PersistentSignature::read(&path).map(Some),
            None => Ok(None),
        }
    }
}
