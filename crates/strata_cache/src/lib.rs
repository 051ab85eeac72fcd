//! Persistent cache of compiled-unit descriptors with digest-based
//! consistency checking.
//!
//! A [`PersistentEnv`] lazily loads interface descriptors through a
//! [`Loader`], validates each one against the compiler configuration, and
//! folds the dependency digests it carries into a [`DigestLedger`] so that
//! no two loaded artifacts can silently disagree about the version of a
//! shared dependency. Descriptors are stored on disk with the
//! self-verifying format in [`codec`].

#![warn(missing_docs)]

pub mod codec;
pub mod descriptor;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod ledger;
pub mod search;

pub use codec::ArtifactKind;
pub use descriptor::{Import, InterfaceFile, PersistentSignature, UnitDescriptor, UnitFlag};
pub use env::{CacheEntry, PersistentEnv};
pub use error::{CodecError, Feature, PersistError};
pub use ledger::{DigestLedger, Inconsistency, LedgerEntry};
pub use search::{FileLoader, Loader, SearchPath};
