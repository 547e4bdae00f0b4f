//! Local trust store: named public keys for verification
//!
//! A single JSON document mapping a human-assigned key name to public key
//! material — either inline PEM text or a filesystem path to a PEM file,
//! distinguished by the `-----BEGIN` prefix. Writes always store inline PEM;
//! reads accept both shapes.
//!
//! The store is loaded fresh for every resolution so concurrent additions by
//! other processes become visible, and persisted by write-to-temp-then-rename
//! so readers never observe a half-written file. A file that exists but does
//! not decode is corruption, never an empty store.

use crate::error::TrustStoreError;
use crate::keys;
use rsa::RsaPublicKey;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Well-known trust store file name, relative to the working directory.
pub const TRUST_STORE_FILE: &str = "trusted_keys.json";

/// How a caller names the public key to verify with.
///
/// Exactly one selector per verification; this is an explicit value rather
/// than a pair of optional arguments so "no key" cannot slip through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    /// An explicit public key PEM file
    File(PathBuf),
    /// A named entry in the trust store
    Trusted(String),
}

impl KeySelector {
    /// Build a selector from the two optional caller inputs.
    ///
    /// Neither supplied is `NoKeySpecified`; when both are supplied the
    /// explicit file wins (the CLI additionally forbids that combination).
    pub fn from_options(
        key_file: Option<PathBuf>,
        trusted_name: Option<String>,
    ) -> Result<Self, TrustStoreError> {
        match (key_file, trusted_name) {
            (Some(path), _) => Ok(KeySelector::File(path)),
            (None, Some(name)) => Ok(KeySelector::Trusted(name)),
            (None, None) => Err(TrustStoreError::NoKeySpecified),
        }
    }
}

/// An in-memory trust store tied to its backing file.
#[derive(Debug, Clone)]
pub struct TrustStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl TrustStore {
    /// Load the store from disk.
    ///
    /// A missing file is an empty store ("no trusted keys yet"); an
    /// undecodable file is `Corrupt`.
    pub fn load(path: &Path) -> Result<Self, TrustStoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Trust store {} does not exist yet", path.display());
                return Ok(TrustStore {
                    path: path.to_path_buf(),
                    entries: BTreeMap::new(),
                });
            }
            Err(e) => {
                return Err(TrustStoreError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let entries: BTreeMap<String, String> =
            serde_json::from_str(&content).map_err(|e| TrustStoreError::Corrupt {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(
            "Trust store loaded from {}: {} key(s)",
            path.display(),
            entries.len()
        );

        Ok(TrustStore {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Add or replace a named key. Re-adding an existing name overwrites
    /// that entry only; all other entries are preserved.
    pub fn add(&mut self, name: impl Into<String>, public_key_pem: impl Into<String>) {
        let name = name.into();
        info!("Trusting key '{name}'");
        self.entries.insert(name, public_key_pem.into());
    }

    /// Names currently in the store, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Raw stored value (inline PEM or path) for a name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the store atomically: write to a temp file in the same
    /// directory, then rename over the backing file.
    pub fn save(&self) -> Result<(), TrustStoreError> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            TrustStoreError::Corrupt {
                path: self.path.clone(),
                source: e,
            }
        })?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let write_failed = |source: std::io::Error| TrustStoreError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
        temp.write_all(json.as_bytes()).map_err(write_failed)?;
        temp.persist(&self.path)
            .map_err(|e| write_failed(e.error))?;

        debug!("Trust store persisted to {}", self.path.display());
        Ok(())
    }

    /// Resolve a named entry to a usable public key.
    pub fn resolve(&self, name: &str) -> Result<RsaPublicKey, TrustStoreError> {
        let value = self
            .entries
            .get(name)
            .ok_or_else(|| TrustStoreError::UnknownTrustedKey {
                name: name.to_string(),
            })?;

        if value.starts_with("-----BEGIN") {
            Ok(keys::parse_public_key_pem(value)?)
        } else {
            Ok(keys::load_public_key(Path::new(value))?)
        }
    }
}

/// Resolve a key selector to a public key.
///
/// For trusted names the store is re-read from disk on every call — no
/// long-lived cache — so additions by other processes are visible.
pub fn resolve_public_key(
    selector: &KeySelector,
    store_path: &Path,
) -> Result<RsaPublicKey, TrustStoreError> {
    match selector {
        KeySelector::File(path) => Ok(keys::load_public_key(path)?),
        KeySelector::Trusted(name) => {
            let store = TrustStore::load(store_path)?;
            store.resolve(name)
        }
    }
}
