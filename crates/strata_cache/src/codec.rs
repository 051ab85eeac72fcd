//! Self-verifying binary encoding of descriptor files.
//!
//! Every file is laid out as
//!
//! ```text
//! [magic "STRA"][format version: u32 LE][kind: u8][bincode payload][digest: 16 bytes]
//! ```
//!
//! The trailing digest is the XXH3-128 of every byte before it. It both
//! detects corruption and serves as the unit's own digest in the ledger.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use strata_common::Digest;

use crate::error::CodecError;

/// Magic bytes identifying a Strata descriptor file.
const MAGIC: [u8; 4] = *b"STRA";

/// Current format version. Increment on breaking changes to the layout or
/// to any serialized type.
pub const FORMAT_VERSION: u32 = 1;

/// Bytes before the payload: magic, version, kind.
const HEADER_LEN: usize = 4 + 4 + 1;

/// The kind of descriptor a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A unit interface (`.sti`).
    Interface,
    /// Implementation info consumed by the package builder (`.stx`).
    Implementation,
    /// A combined object archive produced for a package (`.sto`).
    Object,
}

impl ArtifactKind {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Interface => "sti",
            ArtifactKind::Implementation => "stx",
            ArtifactKind::Object => "sto",
        }
    }

    /// Classifies a path by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("sti") => Some(ArtifactKind::Interface),
            Some("stx") => Some(ArtifactKind::Implementation),
            Some("sto") => Some(ArtifactKind::Object),
            _ => None,
        }
    }

    fn tag(self) -> u8 {
        match self {
            ArtifactKind::Interface => 1,
            ArtifactKind::Implementation => 2,
            ArtifactKind::Object => 3,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ArtifactKind::Interface),
            2 => Some(ArtifactKind::Implementation),
            3 => Some(ArtifactKind::Object),
            _ => None,
        }
    }
}

/// Encodes a value with header and trailing digest.
pub fn encode_to_vec<T: Serialize>(kind: ArtifactKind, value: &T) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
        CodecError::Serialization {
            reason: e.to_string(),
        }
    })?;

    let mut output = Vec::with_capacity(HEADER_LEN + payload.len() + Digest::LEN);
    output.extend_from_slice(&MAGIC);
    output.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    output.push(kind.tag());
    output.extend_from_slice(&payload);
    let digest = Digest::from_bytes(&output);
    output.extend_from_slice(digest.as_bytes());
    Ok(output)
}

/// Returns the digest a value would carry once encoded.
pub fn digest_of<T: Serialize>(kind: ArtifactKind, value: &T) -> Result<Digest, CodecError> {
    let bytes = encode_to_vec(kind, value)?;
    Ok(trailing_digest(&bytes))
}

fn trailing_digest(bytes: &[u8]) -> Digest {
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&bytes[bytes.len() - Digest::LEN..]);
    Digest::from_raw(raw)
}

/// Decodes and verifies bytes read from `path`.
///
/// `path` is only used to attribute errors.
pub fn decode_from_slice<T: DeserializeOwned>(
    path: &Path,
    kind: ArtifactKind,
    raw: &[u8],
) -> Result<(T, Digest), CodecError> {
    let invalid = |reason: &str| CodecError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if raw.len() < HEADER_LEN + Digest::LEN {
        return Err(invalid("file is truncated"));
    }
    if raw[..4] != MAGIC {
        return Err(invalid("missing magic bytes"));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&raw[4..8]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(CodecError::VersionMismatch {
            path: path.to_path_buf(),
            expected: FORMAT_VERSION,
            actual: version,
        });
    }

    let found = ArtifactKind::from_tag(raw[8]).ok_or_else(|| invalid("unknown descriptor kind"))?;
    if found != kind {
        return Err(CodecError::WrongKind {
            path: path.to_path_buf(),
            expected: kind,
            actual: found,
        });
    }

    let body = &raw[..raw.len() - Digest::LEN];
    let stored = trailing_digest(raw);
    let actual = Digest::from_bytes(body);
    if actual != stored {
        return Err(CodecError::DigestMismatch {
            path: path.to_path_buf(),
            expected: stored.to_string(),
            actual: actual.to_string(),
        });
    }

    let (value, _) = bincode::serde::decode_from_slice(&body[HEADER_LEN..], bincode::config::standard())
        .map_err(|e| CodecError::Serialization {
            reason: format!("{}: {e}", path.display()),
        })?;
    Ok((value, stored))
}

/// Reads and verifies a descriptor file.
pub fn decode_file<T: DeserializeOwned>(path: &Path, kind: ArtifactKind) -> Result<(T, Digest), CodecError> {
    let raw = std::fs::read(path).map_err(|e| CodecError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode_from_slice(path, kind, &raw)
}

/// Writes a descriptor file and returns its digest.
///
/// The bytes go to a temporary sibling that is renamed into place, so a
/// reader never observes a half-written descriptor. On failure neither the
/// temporary nor the target is left behind.
pub fn encode_file<T: Serialize>(path: &Path, kind: ArtifactKind, value: &T) -> Result<Digest, CodecError> {
    let result = write_via_temporary(path, kind, value);
    if result.is_err() {
        remove_file(path);
    }
    result
}

fn write_via_temporary<T: Serialize>(path: &Path, kind: ArtifactKind, value: &T) -> Result<Digest, CodecError> {
    let bytes = encode_to_vec(kind, value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CodecError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp = temporary_path(path);
    std::fs::write(&temp, &bytes).map_err(|e| {
        remove_file(&temp);
        CodecError::Io {
            path: temp.clone(),
            source: e,
        }
    })?;
    std::fs::rename(&temp, path).map_err(|e| {
        remove_file(&temp);
        CodecError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    Ok(trailing_digest(&bytes))
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".tmp{}", std::process::id()));
    path.with_file_name(name)
}

/// Removes a file, ignoring a missing file or any other failure.
pub fn remove_file(path: &Path) {
    let _ = std::fs::remove_file(path);
}
