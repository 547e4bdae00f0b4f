//! Verification engine
//!
//! Strictly sequential phases: load the manifest, check the signature (when
//! a key was supplied), then check every declared file. Structural failures
//! short-circuit as errors; per-file integrity findings are data in the
//! report, and the integrity phase always runs to completion once entered.
//!
//! Path safety: every relative path from the manifest is re-checked against
//! the candidate root before any read. A signed manifest is still
//! attacker-controllable data — signature validity proves authorship, not
//! that the path list is benign — so the escape check is never skipped.

use crate::error::VerifyError;
use crate::hasher;
use crate::manifest::{FileRecord, Manifest};
use crate::signer;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// One verification finding for a declared file.
///
/// Findings are report data, never errors; `expected`/`actual` digests are
/// both retained so the report can show what changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mismatch {
    /// Declared file does not exist in the candidate directory
    Missing { file: String },

    /// File exists but its content digest differs
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// Path exists but is not a regular file
    NotAFile { file: String },

    /// Path is absolute, contains traversal segments, or resolves outside
    /// the candidate directory
    InvalidPath { file: String },

    /// File exists but could not be read
    ReadError { file: String, error: String },
}

impl Mismatch {
    /// The manifest path the finding is about.
    pub fn file(&self) -> &str {
        match self {
            Mismatch::Missing { file }
            | Mismatch::HashMismatch { file, .. }
            | Mismatch::NotAFile { file }
            | Mismatch::InvalidPath { file }
            | Mismatch::ReadError { file, .. } => file,
        }
    }
}

/// Whether the signature phase authenticated the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    /// Cryptographic check against the supplied public key succeeded
    Verified,
    /// No key was supplied; file integrity was checked without authenticity
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Fail,
}

/// Outcome of a full verification run.
///
/// The structured (serialized) form is the reference; the human-readable
/// `Display` form is derived entirely from it.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    result: Verdict,
    signature: SignatureStatus,
    mismatches: Vec<Mismatch>,
}

impl VerificationReport {
    fn new(signature: SignatureStatus, mismatches: Vec<Mismatch>) -> Self {
        let result = if mismatches.is_empty() {
            Verdict::Success
        } else {
            Verdict::Fail
        };
        VerificationReport {
            result,
            signature,
            mismatches,
        }
    }

    /// `Success` iff zero mismatches were produced.
    pub fn is_success(&self) -> bool {
        self.result == Verdict::Success
    }

    pub fn signature(&self) -> SignatureStatus {
        self.signature
    }

    /// Findings in manifest file order (sorted by path).
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signature {
            SignatureStatus::Verified => writeln!(f, "Signature verified successfully.")?,
            SignatureStatus::Unauthenticated => {
                writeln!(f, "Signature not checked (unauthenticated integrity check).")?
            }
        }

        if self.is_success() {
            write!(f, "All files verified successfully.")?;
            return Ok(());
        }

        write!(f, "Verification failed:")?;
        for mismatch in &self.mismatches {
            writeln!(f)?;
            match mismatch {
                Mismatch::Missing { file } => write!(f, "  [MISSING]    {file}")?,
                Mismatch::HashMismatch {
                    file,
                    expected,
                    actual,
                } => write!(
                    f,
                    "  [MISMATCH]   {file}\n    Expected: {expected}\n    Actual:   {actual}"
                )?,
                Mismatch::NotAFile { file } => {
                    write!(f, "  [WRONG TYPE] Path is not a regular file: {file}")?
                }
                Mismatch::InvalidPath { file } => write!(
                    f,
                    "  [INVALID]    Path escapes the verification root: {file}"
                )?,
                Mismatch::ReadError { file, error } => {
                    write!(f, "  [READ ERROR] {file} ({error})")?
                }
            }
        }
        Ok(())
    }
}

/// Verifies a candidate directory against a persisted manifest.
#[derive(Debug)]
pub struct Verifier {
    candidate_dir: PathBuf,
    manifest_path: PathBuf,
}

impl Verifier {
    pub fn new(candidate_dir: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Verifier {
            candidate_dir: candidate_dir.into(),
            manifest_path: manifest_path.into(),
        }
    }

    /// Run the full verification sequence.
    ///
    /// With a key: manifest load, signature check (terminal on failure —
    /// files are never checked against a falsely-signed manifest), then
    /// per-file integrity. Without a key the signature phase is skipped and
    /// the report is marked unauthenticated.
    pub fn verify(
        &self,
        public_key: Option<&RsaPublicKey>,
    ) -> Result<VerificationReport, VerifyError> {
        let manifest = Manifest::load(&self.manifest_path)?;
        debug!(
            "Manifest loaded from {}: {} file(s)",
            self.manifest_path.display(),
            manifest.files.len()
        );

        let signature_status = match public_key {
            Some(key) => {
                let signature = signer::read_signature(&self.manifest_path)?;
                let payload = manifest.signable_payload()?;
                signer::verify_payload(key, &payload, &signature)?;
                info!("Signature verified successfully");
                SignatureStatus::Verified
            }
            None => {
                debug!("No key supplied; skipping signature phase");
                SignatureStatus::Unauthenticated
            }
        };

        let mismatches = self.check_files(&manifest)?;
        if mismatches.is_empty() {
            info!("All {} file(s) verified successfully", manifest.files.len());
        } else {
            warn!("Verification found {} mismatch(es)", mismatches.len());
        }

        Ok(VerificationReport::new(signature_status, mismatches))
    }

    /// Integrity phase: check every declared file, collecting findings in
    /// manifest order. A finding on one file never stops the rest.
    fn check_files(&self, manifest: &Manifest) -> Result<Vec<Mismatch>, VerifyError> {
        let canonical_root = std::fs::canonicalize(&self.candidate_dir).map_err(|_| {
            VerifyError::Manifest(crate::error::ManifestError::DirectoryNotFound {
                path: self.candidate_dir.clone(),
            })
        })?;

        let mut mismatches = Vec::new();
        for record in &manifest.files {
            if let Some(mismatch) = check_file(&self.candidate_dir, &canonical_root, record) {
                warn!("{:?}", mismatch);
                mismatches.push(mismatch);
            }
        }
        Ok(mismatches)
    }
}

/// Check one declared file. `None` means the file is present, regular, and
/// byte-identical.
fn check_file(root: &Path, canonical_root: &Path, record: &FileRecord) -> Option<Mismatch> {
    let file = record.path.clone();

    // Lexical safety before touching the filesystem: empty, absolute, or
    // traversal-bearing paths are rejected outright.
    let relative = Path::new(&record.path);
    let lexically_safe = !record.path.is_empty()
        && !relative.is_absolute()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !lexically_safe {
        return Some(Mismatch::InvalidPath { file });
    }

    let candidate = root.join(relative);
    match std::fs::symlink_metadata(&candidate) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Some(Mismatch::Missing { file })
        }
        Err(e) => {
            return Some(Mismatch::ReadError {
                file,
                error: e.to_string(),
            })
        }
    }

    // Resolve symlinks, then re-check containment: the resolved path must
    // still lie within the candidate root.
    let resolved = match std::fs::canonicalize(&candidate) {
        Ok(resolved) => resolved,
        // The entry exists but its target does not: a dangling symlink.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Some(Mismatch::Missing { file })
        }
        Err(e) => {
            return Some(Mismatch::ReadError {
                file,
                error: e.to_string(),
            })
        }
    };

    if !resolved.starts_with(canonical_root) {
        return Some(Mismatch::InvalidPath { file });
    }

    let metadata = match std::fs::metadata(&resolved) {
        Ok(metadata) => metadata,
        Err(e) => {
            return Some(Mismatch::ReadError {
                file,
                error: e.to_string(),
            })
        }
    };
    if !metadata.is_file() {
        return Some(Mismatch::NotAFile { file });
    }

    let actual = match hasher::digest_file(&resolved) {
        Ok(actual) => actual,
        Err(e) => {
            return Some(Mismatch::ReadError {
                file,
                error: e.to_string(),
            })
        }
    };

    if !actual.eq_ignore_ascii_case(&record.sha256) {
        return Some(Mismatch::HashMismatch {
            file,
            expected: record.sha256.clone(),
            actual,
        });
    }

    debug!("Verified {}", record.path);
    None
}
