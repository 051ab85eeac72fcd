//! The persistent environment: a session-wide cache of unit descriptors.
//!
//! [`PersistentEnv`] answers "what is the interface of unit `N`?" for the
//! whole compilation session. The first request for a name goes to the
//! [`Loader`]; the answer (found or missing) is cached for every later
//! request. Each loaded descriptor is acknowledged before it is cached:
//! its self-reported name, its flags, and every dependency digest it
//! carries are checked against the configuration and the [`DigestLedger`].
//!
//! The environment also keeps the import sets that become the current
//! unit's own dependency list when it is saved, and supports a scoped
//! region in which loading is forbidden and every cache mutation is undone
//! on exit.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use strata_common::{Digest, ModuleName, UnitName};
use strata_config::{CompilerOptions, ProjectConfig};
use strata_diagnostics::{Diagnostic, DiagnosticSink};

use crate::codec::{self, ArtifactKind};
use crate::descriptor::{Import, InterfaceFile, PersistentSignature, UnitDescriptor, UnitFlag};
use crate::diagnostics;
use crate::error::{Feature, PersistError};
use crate::ledger::{DigestLedger, LedgerEntry};
use crate::search::Loader;

/// What the cache knows about a name.
#[derive(Debug, Clone)]
pub enum CacheEntry<V> {
    /// A previous lookup found nothing. Cleared only by
    /// [`PersistentEnv::clear_missing`].
    Missing,
    /// The acknowledged descriptor and the value derived from it.
    Found(Arc<UnitDescriptor>, V),
}

impl<V> CacheEntry<V> {
    /// Returns `true` for a memoized failed lookup.
    pub fn is_missing(&self) -> bool {
        matches!(self, CacheEntry::Missing)
    }
}

/// The inverse of one recorded mutation.
#[derive(Debug)]
enum Undo<V> {
    Entry {
        name: ModuleName,
        previous: Option<CacheEntry<V>>,
    },
    Import(ModuleName),
    OpaqueImport(ModuleName),
    Ledger {
        name: ModuleName,
        previous: Option<LedgerEntry>,
    },
    DelayedCheck,
    DelayedChecks(Vec<ModuleName>),
    Reinstate(Box<Snapshot<V>>),
}

/// The session state taken out by [`PersistentEnv::clear`] inside a
/// no-loading region, kept so the region can put it back.
#[derive(Debug)]
struct Snapshot<V> {
    structures: HashMap<ModuleName, CacheEntry<V>>,
    imported_units: BTreeSet<ModuleName>,
    imported_opaque_units: BTreeSet<ModuleName>,
    crc_units: DigestLedger,
    delayed_checks: Vec<ModuleName>,
}

/// Whether the loader may be consulted.
#[derive(Debug)]
enum Loading<V> {
    Permitted,
    /// Loading is forbidden; every mutation is logged for rollback.
    Forbidden(Vec<Undo<V>>),
}

/// A session-wide cache of unit descriptors with consistency checking.
///
/// `V` is the value the caller derives from each loaded interface (for a
/// type checker, the elaborated signature). The environment never looks
/// inside it.
pub struct PersistentEnv<V> {
    options: CompilerOptions,
    warn_no_interface: bool,
    enforce_visibility: bool,
    loader: Box<dyn Loader>,
    structures: HashMap<ModuleName, CacheEntry<V>>,
    imported_units: BTreeSet<ModuleName>,
    imported_opaque_units: BTreeSet<ModuleName>,
    crc_units: DigestLedger,
    loading: Loading<V>,
    delayed_checks: Vec<ModuleName>,
    current_unit: Option<UnitName>,
}

impl<V: Clone> PersistentEnv<V> {
    /// Creates an empty environment that loads interfaces through `loader`.
    pub fn new(config: &ProjectConfig, loader: impl Loader + 'static) -> Self {
        Self {
            options: config.compiler.clone(),
            warn_no_interface: config.warnings.no_interface_file,
            enforce_visibility: config.pack.enforce_visibility,
            loader: Box::new(loader),
            structures: HashMap::new(),
            imported_units: BTreeSet::new(),
            imported_opaque_units: BTreeSet::new(),
            crc_units: DigestLedger::new(),
            loading: Loading::Permitted,
            delayed_checks: Vec::new(),
            current_unit: None,
        }
    }

    /// The compiler options loaded units are checked against.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Sets the unit being compiled, used by package visibility checks.
    pub fn set_current_unit(&mut self, unit: Option<UnitName>) {
        self.current_unit = unit;
    }

    /// The unit being compiled, if one has been set.
    pub fn current_unit(&self) -> Option<&UnitName> {
        self.current_unit.as_ref()
    }

    /// Returns `true` unless inside a no-loading region.
    pub fn can_load(&self) -> bool {
        matches!(self.loading, Loading::Permitted)
    }

    /// Returns the interface of `name`, loading it on first use.
    ///
    /// The reserved predefined-exceptions name always fails with
    /// [`PersistError::NotFound`] without touching the cache or loader. A
    /// name the loader cannot provide is memoized as missing.
    pub fn find(
        &mut self,
        name: &ModuleName,
        make_value: impl FnOnce(&PersistentSignature) -> V,
    ) -> Result<(Arc<UnitDescriptor>, V), PersistError> {
        self.find_pers_struct(name, true, make_value)
    }

    /// Loads the interface of `name` from a known file, bypassing the
    /// loader and the cache lookup.
    pub fn read(
        &mut self,
        name: &ModuleName,
        file: &Path,
        make_value: impl FnOnce(&PersistentSignature) -> V,
    ) -> Result<(Arc<UnitDescriptor>, V), PersistError> {
        self.add_import(name);
        let sig = PersistentSignature::read(file)?;
        let value = make_value(&sig);
        let ps = self.acknowledge(name, true, &sig, value.clone())?;
        Ok((ps, value))
    }

    /// Records that `name` is referenced without loading it.
    ///
    /// The import is recorded immediately so the unit's dependency list
    /// does not depend on which probes happened to run. When the
    /// no-interface-file warning is active, a validity probe is queued for
    /// [`run_delayed_checks`](Self::run_delayed_checks).
    pub fn check(&mut self, name: &ModuleName) {
        if self.structures.contains_key(name) {
            return;
        }
        self.add_import(name);
        if self.warn_no_interface {
            self.delayed_checks.push(name.clone());
            self.record(Undo::DelayedCheck);
        }
    }

    /// Tries to load `name` without consistency checking and turns any
    /// failure into a warning instead of an error.
    pub fn probe(
        &mut self,
        name: &ModuleName,
        make_value: impl FnOnce(&PersistentSignature) -> V,
    ) -> Option<Diagnostic> {
        match self.find_pers_struct(name, false, make_value) {
            Ok(_) => None,
            Err(PersistError::NotFound(_)) => Some(diagnostics::warning_no_interface_file(name, None)),
            Err(err) => Some(diagnostics::warning_no_interface_file(
                name,
                Some(diagnostics::explain(&err)),
            )),
        }
    }

    /// Runs every queued probe, emitting a warning per failure.
    pub fn run_delayed_checks<F>(&mut self, make_value: F, sink: &DiagnosticSink)
    where
        F: Fn(&PersistentSignature) -> V,
    {
        let pending = std::mem::take(&mut self.delayed_checks);
        self.record(Undo::DelayedChecks(pending.clone()));
        for name in &pending {
            if let Some(warning) = self.probe(name, &make_value) {
                sink.emit(warning);
            }
        }
    }

    /// Returns the number of probes waiting to run.
    pub fn pending_checks(&self) -> usize {
        self.delayed_checks.len()
    }

    /// Returns the digest of `name`'s interface, loading it if needed.
    pub fn crc_of_unit(
        &mut self,
        name: &ModuleName,
        make_value: impl FnOnce(&PersistentSignature) -> V,
    ) -> Result<Digest, PersistError> {
        let (ps, _) = self.find_pers_struct(name, true, make_value)?;
        ps.own_digest()
            .ok_or_else(|| PersistError::NotFound(name.clone()))
    }

    /// Returns the digest of `name` if its interface is already cached.
    pub fn digest_of(&self, name: &ModuleName) -> Option<Digest> {
        match self.structures.get(name) {
            Some(CacheEntry::Found(ps, _)) => ps.own_digest(),
            _ => None,
        }
    }

    /// Builds the interface of the unit being compiled: its flags come from
    /// the configuration and its dependencies from [`imports`](Self::imports).
    pub fn make_descriptor(
        &self,
        name: UnitName,
        signature: Vec<u8>,
        alerts: BTreeMap<String, String>,
    ) -> InterfaceFile {
        let mut flags = Vec::new();
        if self.options.recursive_types {
            flags.push(UnitFlag::RecursiveTypes);
        }
        if self.options.opaque {
            flags.push(UnitFlag::Opaque);
        }
        if self.options.unsafe_string {
            flags.push(UnitFlag::UnsafeString);
        }
        flags.push(UnitFlag::Alerts(alerts));
        InterfaceFile {
            name,
            signature,
            imports: self.imports(),
            flags,
        }
    }

    /// Writes the current unit's interface to `filename` and registers it.
    ///
    /// The unit's own digest is the trailing digest of the written file. It
    /// is recorded in the ledger unconditionally and the unit is added to
    /// the import set, so a later [`imports`](Self::imports) reports it. If
    /// writing fails no file is left behind.
    pub fn save(
        &mut self,
        filename: &Path,
        interface: &InterfaceFile,
        value: V,
    ) -> Result<Arc<UnitDescriptor>, PersistError> {
        let digest = codec::encode_file(filename, ArtifactKind::Interface, interface)?;
        let ps = Arc::new(UnitDescriptor::from_interface(filename, interface, digest));
        let name = ps.name.module.clone();

        self.insert_entry(name.clone(), CacheEntry::Found(Arc::clone(&ps), value));
        if ps.has_flag(&UnitFlag::Opaque) {
            self.register_import_as_opaque(&name);
        }
        let previous = self.crc_units.set(&name, digest, filename);
        self.record(Undo::Ledger {
            name: name.clone(),
            previous,
        });
        self.add_import(&name);
        Ok(ps)
    }

    /// Every imported name paired with the digest the ledger agreed on.
    ///
    /// Names only ever probed, never loaded, carry no digest.
    pub fn imports(&self) -> Vec<Import> {
        self.crc_units.extract(&self.imported_units)
    }

    /// Returns `true` if `name` has a cache entry, found or missing.
    pub fn looked_up(&self, name: &ModuleName) -> bool {
        self.structures.contains_key(name)
    }

    /// Returns `true` if `name` is in the import set.
    pub fn is_imported(&self, name: &ModuleName) -> bool {
        self.imported_units.contains(name)
    }

    /// Returns `true` if `name` was imported and is opaque.
    pub fn is_imported_opaque(&self, name: &ModuleName) -> bool {
        self.imported_opaque_units.contains(name)
    }

    /// The cache entry for `name`, if any.
    pub fn entry(&self, name: &ModuleName) -> Option<&CacheEntry<V>> {
        self.structures.get(name)
    }

    /// Iterates over every successfully loaded or saved unit.
    pub fn loaded(&self) -> impl Iterator<Item = (&ModuleName, &Arc<UnitDescriptor>, &V)> {
        self.structures.iter().filter_map(|(name, entry)| match entry {
            CacheEntry::Found(ps, value) => Some((name, ps, value)),
            CacheEntry::Missing => None,
        })
    }

    /// Read-only view of the digest ledger.
    pub fn ledger(&self) -> &DigestLedger {
        &self.crc_units
    }

    /// Folds a list of dependency digests reported by `source` into the
    /// ledger, adding each checked name to the import set.
    ///
    /// Does nothing when consistency checking is disabled. Digests folded
    /// before a disagreement stay recorded.
    pub fn check_consistency(&mut self, source: &Path, imports: &[Import]) -> Result<(), PersistError> {
        if !self.options.check_consistency {
            return Ok(());
        }
        for import in imports {
            let Some(digest) = import.digest else {
                continue;
            };
            self.add_import(&import.name);
            let fresh = !self.crc_units.contains(&import.name);
            self.crc_units
                .check(&import.name, digest, source)
                .map_err(|inconsistency| PersistError::InconsistentImport {
                    unit: inconsistency.unit,
                    first_source: inconsistency.original_source,
                    second_source: inconsistency.inconsistent_source,
                })?;
            if fresh {
                self.record(Undo::Ledger {
                    name: import.name.clone(),
                    previous: None,
                });
            }
        }
        Ok(())
    }

    /// Resets the cache, import sets, ledger and pending probes, and
    /// permits loading again.
    ///
    /// Inside a no-loading region loading stays forbidden, and the region's
    /// exit puts the cleared state back.
    pub fn clear(&mut self) {
        let snapshot = Snapshot {
            structures: std::mem::take(&mut self.structures),
            imported_units: std::mem::take(&mut self.imported_units),
            imported_opaque_units: std::mem::take(&mut self.imported_opaque_units),
            crc_units: std::mem::take(&mut self.crc_units),
            delayed_checks: std::mem::take(&mut self.delayed_checks),
        };
        self.record(Undo::Reinstate(Box::new(snapshot)));
    }

    /// Forgets memoized failed lookups so the loader is asked again.
    pub fn clear_missing(&mut self) {
        let missing: Vec<ModuleName> = self
            .structures
            .iter()
            .filter(|(_, entry)| entry.is_missing())
            .map(|(name, _)| name.clone())
            .collect();
        for name in missing {
            let previous = self.structures.remove(&name);
            self.record(Undo::Entry { name, previous });
        }
    }

    /// Runs `f` with loading forbidden, then undoes every cache, import,
    /// ledger and probe mutation it made, whether it succeeded or failed.
    ///
    /// Regions nest; each undoes only its own mutations. A panic inside
    /// `f` is propagated after the rollback.
    pub fn without_loading<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.loading, Loading::Forbidden(Vec::new()));
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&mut *self)));
        if let Loading::Forbidden(log) = std::mem::replace(&mut self.loading, saved) {
            self.backtrack(log);
        }
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn find_pers_struct(
        &mut self,
        name: &ModuleName,
        check: bool,
        make_value: impl FnOnce(&PersistentSignature) -> V,
    ) -> Result<(Arc<UnitDescriptor>, V), PersistError> {
        if name.is_predef() {
            return Err(PersistError::NotFound(name.clone()));
        }
        match self.structures.get(name) {
            Some(CacheEntry::Found(ps, value)) => return Ok((Arc::clone(ps), value.clone())),
            Some(CacheEntry::Missing) => return Err(PersistError::NotFound(name.clone())),
            None => {}
        }
        if !self.can_load() {
            return Err(PersistError::NotFound(name.clone()));
        }
        let Some(sig) = self.loader.load(name)? else {
            self.insert_entry(name.clone(), CacheEntry::Missing);
            return Err(PersistError::NotFound(name.clone()));
        };
        let value = make_value(&sig);
        let ps = self.acknowledge(name, check, &sig, value.clone())?;
        Ok((ps, value))
    }

    /// Validates a loaded interface and registers it.
    ///
    /// Nothing is cached unless every check passes.
    fn acknowledge(
        &mut self,
        name: &ModuleName,
        check: bool,
        sig: &PersistentSignature,
        value: V,
    ) -> Result<Arc<UnitDescriptor>, PersistError> {
        let ps = UnitDescriptor::from_signature(sig);
        if ps.name.module != *name {
            return Err(PersistError::IllegalRenaming {
                expected: name.clone(),
                found: ps.name.clone(),
                file: ps.filename.clone(),
            });
        }
        for flag in &ps.flags {
            match flag {
                UnitFlag::RecursiveTypes if !self.options.recursive_types => {
                    return Err(PersistError::MissingRequiredFeature {
                        unit: ps.name.clone(),
                        feature: Feature::RecursiveTypes,
                    });
                }
                UnitFlag::UnsafeString if self.options.force_safe_string => {
                    return Err(PersistError::MissingRequiredFeature {
                        unit: ps.name.clone(),
                        feature: Feature::UnsafeString,
                    });
                }
                UnitFlag::Opaque => self.register_import_as_opaque(name),
                _ => {}
            }
        }
        self.check_visibility(&ps.name)?;
        if check {
            self.check_consistency(&ps.filename, &ps.imports)?;
        }

        let ps = Arc::new(ps);
        self.insert_entry(name.clone(), CacheEntry::Found(Arc::clone(&ps), value));
        self.add_import(name);
        Ok(ps)
    }

    /// A unit compiled for package `P` may only be referenced from units
    /// that live inside `P`.
    fn check_visibility(&self, unit: &UnitName) -> Result<(), PersistError> {
        if !self.enforce_visibility || unit.prefix.is_root() {
            return Ok(());
        }
        match &self.current_unit {
            Some(current) if !unit.prefix.is_prefix_of(&current.as_pack_path()) => {
                Err(PersistError::DirectReferenceFromWrongPackage {
                    unit: unit.clone(),
                    current: current.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn insert_entry(&mut self, name: ModuleName, entry: CacheEntry<V>) {
        let previous = self.structures.insert(name.clone(), entry);
        self.record(Undo::Entry { name, previous });
    }

    fn add_import(&mut self, name: &ModuleName) {
        if self.imported_units.insert(name.clone()) {
            self.record(Undo::Import(name.clone()));
        }
    }

    fn register_import_as_opaque(&mut self, name: &ModuleName) {
        if self.imported_opaque_units.insert(name.clone()) {
            self.record(Undo::OpaqueImport(name.clone()));
        }
    }

    fn record(&mut self, undo: Undo<V>) {
        if let Loading::Forbidden(log) = &mut self.loading {
            log.push(undo);
        }
    }

    /// Applies a rollback log newest-first. Nothing here is recorded.
    fn backtrack(&mut self, log: Vec<Undo<V>>) {
        for undo in log.into_iter().rev() {
            match undo {
                Undo::Entry { name, previous } => match previous {
                    Some(entry) => {
                        self.structures.insert(name, entry);
                    }
                    None => {
                        self.structures.remove(&name);
                    }
                },
                Undo::Import(name) => {
                    self.imported_units.remove(&name);
                }
                Undo::OpaqueImport(name) => {
                    self.imported_opaque_units.remove(&name);
                }
                Undo::Ledger { name, previous } => self.crc_units.restore(&name, previous),
                Undo::DelayedCheck => {
                    self.delayed_checks.pop();
                }
                Undo::DelayedChecks(pending) => self.delayed_checks = pending,
                Undo::Reinstate(snapshot) => {
                    let Snapshot {
                        structures,
                        imported_units,
                        imported_opaque_units,
                        crc_units,
                        delayed_checks,
                    } = *snapshot;
                    self.structures = structures;
                    self.imported_units = imported_units;
                    self.imported_opaque_units = imported_opaque_units;
                    self.crc_units = crc_units;
                    self.delayed_checks = delayed_checks;
                }
            }
        }
    }
}
