//! Shared foundational types used across the Strata toolchain.
//!
//! This crate provides the content digest used for consistency checking and
//! the hierarchical unit names (module names with an optional for-pack
//! prefix) that key every cache and ledger in the workspace.

#![warn(missing_docs)]

pub mod digest;
pub mod name;

pub use digest::Digest;
pub use name::{ModuleName, NameError, PackPath, UnitName};
