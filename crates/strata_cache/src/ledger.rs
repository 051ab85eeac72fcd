//! The digest ledger: one agreed-upon digest per dependency name.
//!
//! The first source to report a digest for a name establishes it. Every
//! later report for that name must agree, whichever file it comes from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use strata_common::{Digest, ModuleName};

use crate::descriptor::Import;

/// The recorded digest of one name and the file that established it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// The agreed-upon digest.
    pub digest: Digest,
    /// The file that first reported it.
    pub source: PathBuf,
}

/// A disagreement between a new report and the recorded digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inconsistency {
    /// The name the two sources disagree about.
    pub unit: ModuleName,
    /// The file that established the recorded digest.
    pub original_source: PathBuf,
    /// The file whose report disagreed.
    pub inconsistent_source: PathBuf,
}

/// Maps each dependency name to the single digest this process accepts.
#[derive(Debug, Clone, Default)]
pub struct DigestLedger {
    entries: HashMap<ModuleName, LedgerEntry>,
}

impl DigestLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `digest` for `name` as reported by `source`.
    ///
    /// The first report establishes the digest. A later report with a
    /// different digest is an [`Inconsistency`]; a matching one is a no-op
    /// and leaves the original source in place.
    pub fn check(&mut self, name: &ModuleName, digest: Digest, source: &Path) -> Result<(), Inconsistency> {
        match self.entries.get(name) {
            Some(entry) if entry.digest == digest => Ok(()),
            Some(entry) => Err(Inconsistency {
                unit: name.clone(),
                original_source: entry.source.clone(),
                inconsistent_source: source.to_path_buf(),
            }),
            None => {
                self.entries.insert(
                    name.clone(),
                    LedgerEntry {
                        digest,
                        source: source.to_path_buf(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Unconditionally records `digest` for `name`, returning the entry it
    /// replaced.
    ///
    /// Used when the current unit saves its own freshly computed digest.
    pub fn set(&mut self, name: &ModuleName, digest: Digest, source: &Path) -> Option<LedgerEntry> {
        self.entries.insert(
            name.clone(),
            LedgerEntry {
                digest,
                source: source.to_path_buf(),
            },
        )
    }

    /// Returns `true` if a digest has been recorded for `name`.
    pub fn contains(&self, name: &ModuleName) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the recorded entry for `name`.
    pub fn get(&self, name: &ModuleName) -> Option<&LedgerEntry> {
        self.entries.get(name)
    }

    /// Returns the recorded digest for `name`.
    pub fn digest(&self, name: &ModuleName) -> Option<Digest> {
        self.entries.get(name).map(|entry| entry.digest)
    }

    /// Returns the file that established the digest for `name`.
    pub fn source(&self, name: &ModuleName) -> Option<&Path> {
        self.entries.get(name).map(|entry| entry.source.as_path())
    }

    /// Pairs each name with its recorded digest, or none if unrecorded.
    pub fn extract<'a>(&self, names: impl IntoIterator<Item = &'a ModuleName>) -> Vec<Import> {
        names
            .into_iter()
            .map(|name| Import {
                name: name.clone(),
                digest: self.digest(name),
            })
            .collect()
    }

    /// Puts back (or removes) the entry for `name` exactly as it was.
    pub fn restore(&mut self, name: &ModuleName, previous: Option<LedgerEntry>) {
        match previous {
            Some(entry) => {
                self.entries.insert(name.clone(), entry);
            }
            None => {
                self.entries.remove(name);
            }
        }
    }

    /// Number of recorded names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every recorded digest.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str) -> ModuleName {
        ModuleName::new(name).unwrap()
    }

    #[test]
    fn first_report_establishes_digest() {
        let mut ledger = DigestLedger::new();
        let d = Digest::from_bytes(b"n1");
        ledger.check(&module("N"), d, Path::new("m.sti")).unwrap();
        assert_eq!(ledger.digest(&module("N")), Some(d));
        assert_eq!(ledger.source(&module("N")), Some(Path::new("m.sti")));
    }

    #[test]
    fn agreeing_report_keeps_original_source() {
        let mut ledger = DigestLedger::new();
        let d = Digest::from_bytes(b"n1");
        ledger.check(&module("N"), d, Path::new("m.sti")).unwrap();
        ledger.check(&module("N"), d, Path::new("p.sti")).unwrap();
        assert_eq!(ledger.source(&module("N")), Some(Path::new("m.sti")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn disagreement_names_both_sources() {
        let mut ledger = DigestLedger::new();
        ledger
            .check(&module("N"), Digest::from_bytes(b"n1"), Path::new("m.sti"))
            .unwrap();
        let err = ledger
            .check(&module("N"), Digest::from_bytes(b"n2"), Path::new("p.sti"))
            .unwrap_err();
        assert_eq!(
            err,
            Inconsistency {
                unit: module("N"),
                original_source: PathBuf::from("m.sti"),
                inconsistent_source: PathBuf::from("p.sti"),
            }
        );
        // The recorded digest is unchanged.
        assert_eq!(ledger.digest(&module("N")), Some(Digest::from_bytes(b"n1")));
    }

    #[test]
    fn verdict_is_order_independent() {
        let a = Digest::from_bytes(b"a");
        let b = Digest::from_bytes(b"b");
        let mut forward = DigestLedger::new();
        forward.check(&module("N"), a, Path::new("x")).unwrap();
        assert!(forward.check(&module("N"), b, Path::new("y")).is_err());

        let mut backward = DigestLedger::new();
        backward.check(&module("N"), b, Path::new("y")).unwrap();
        assert!(backward.check(&module("N"), a, Path::new("x")).is_err());
    }

    #[test]
    fn set_overrides_and_returns_previous() {
        let mut ledger = DigestLedger::new();
        let old = Digest::from_bytes(b"old");
        let new = Digest::from_bytes(b"new");
        assert!(ledger.set(&module("U"), old, Path::new("u.sti")).is_none());
        let prev = ledger.set(&module("U"), new, Path::new("u2.sti")).unwrap();
        assert_eq!(prev.digest, old);
        assert_eq!(ledger.digest(&module("U")), Some(new));
    }

    #[test]
    fn extract_marks_unknown_names_absent() {
        let mut ledger = DigestLedger::new();
        let d = Digest::from_bytes(b"a");
        ledger.check(&module("A"), d, Path::new("a.sti")).unwrap();
        let names = [module("A"), module("B")];
        let imports = ledger.extract(&names);
        assert_eq!(imports[0], Import::new(module("A"), d));
        assert_eq!(imports[1], Import::unchecked(module("B")));
    }

    #[test]
    fn restore_reverts_entry() {
        let mut ledger = DigestLedger::new();
        let d = Digest::from_bytes(b"a");
        ledger.check(&module("A"), d, Path::new("a.sti")).unwrap();
        let prev = ledger.set(&module("A"), Digest::from_bytes(b"b"), Path::new("b.sti"));
        ledger.restore(&module("A"), prev);
        assert_eq!(ledger.digest(&module("A")), Some(d));
        ledger.restore(&module("A"), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn clear_empties() {
        let mut ledger = DigestLedger::new();
        ledger
            .check(&module("A"), Digest::from_bytes(b"a"), Path::new("a.sti"))
            .unwrap();
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(!ledger.contains(&module("A")));
    }
}
