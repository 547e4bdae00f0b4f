//! Manifest data model and canonical serialization
//!
//! The manifest is the unit of distribution: an ordered record of every file
//! in a model artifact directory together with its SHA-256 digest. The
//! `files` sequence is always sorted by path so that two builds over an
//! identical tree produce byte-identical signable payloads regardless of
//! filesystem traversal order.

use crate::error::ManifestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manifest format version understood by this build.
pub const MANIFEST_FORMAT_VERSION: &str = "1.0";

/// Suffix convention for the detached signature side-file.
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// A single tracked file: POSIX-relative path plus content digest.
///
/// Immutable once computed. The path is always relative to the manifest's
/// declared root, uses forward slashes, and never escapes the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub sha256: String,
}

/// Optional descriptive metadata about the artifact the manifest covers.
///
/// Not covered by the signature (see `Manifest::signable_payload`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Upstream identifier the artifact was fetched from (hub ID, tracking
    /// URI), recorded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// The complete manifest document.
///
/// Field names are the public contract; renaming any of them is a breaking
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest format version
    pub version: String,

    /// Creator or system name, recorded as given
    pub created_by: String,

    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,

    /// Descriptive metadata about the covered artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<SubjectMetadata>,

    /// Tracked files, sorted by path (lexicographic, byte-wise)
    pub files: Vec<FileRecord>,

    /// Base64 echo of the detached signature, set by the signer.
    ///
    /// The authoritative signature is the `.sig` side-file; verification
    /// never reads this field.
    pub signature: Option<String>,
}

/// The exact structure whose serialization is signed.
///
/// Deliberate, documented choice: the signature covers the file list ONLY.
/// Creator, timestamps and model metadata are excluded, so re-stamping
/// metadata without re-signing is detectable as unsigned metadata rather
/// than silently authenticated.
#[derive(Serialize)]
struct SignablePayload<'a> {
    files: &'a [FileRecord],
}

impl Manifest {
    /// Construct an unsigned manifest over a sorted file list.
    pub fn new(created_by: impl Into<String>, model: Option<SubjectMetadata>, files: Vec<FileRecord>) -> Self {
        Manifest {
            version: MANIFEST_FORMAT_VERSION.to_string(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            model,
            files,
            signature: None,
        }
    }

    /// Canonical byte serialization of the signable payload.
    ///
    /// Compact JSON of `{"files": [...]}` with `files` in manifest order.
    /// Reproducible bit-for-bit from the same logical content.
    pub fn signable_payload(&self) -> Result<Vec<u8>, ManifestError> {
        serde_json::to_vec(&SignablePayload { files: &self.files })
            .map_err(|e| ManifestError::SerializeFailed { source: e })
    }

    /// Load a manifest from disk.
    ///
    /// Distinct failures: `NotFound` (no file), `Corrupt` (invalid JSON or
    /// schema), `UnsupportedFormat` (version this build does not understand).
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(ManifestError::FileUnreadable {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| ManifestError::Corrupt {
                path: path.to_path_buf(),
                source: e,
            })?;

        if manifest.version != MANIFEST_FORMAT_VERSION {
            return Err(ManifestError::UnsupportedFormat {
                found: manifest.version,
                supported: MANIFEST_FORMAT_VERSION.to_string(),
            });
        }

        Ok(manifest)
    }

    /// Write the manifest to disk as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ManifestError::SerializeFailed { source: e })?;

        std::fs::write(path, json).map_err(|e| ManifestError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Path of the detached signature side-file for a manifest path.
///
/// `manifest.json` -> `manifest.json.sig`.
pub fn signature_path(manifest_path: &Path) -> PathBuf {
    let mut name = manifest_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(SIGNATURE_SUFFIX);
    manifest_path.with_file_name(name)
}
