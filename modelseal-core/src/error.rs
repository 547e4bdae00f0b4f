//! Error types with clear, actionable messages
//!
//! Input errors (bad paths, malformed documents) and cryptographic errors
//! (invalid signature, wrong passphrase) are distinct variants throughout, so
//! a caller can always tell "this content is tampered" apart from "this file
//! is missing". Per-file integrity findings are never errors; they are data
//! in the verification report (see `verifier::Mismatch`).

use std::path::PathBuf;
use thiserror::Error;

/// Errors from building, loading or saving a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The build root does not exist or is not a directory
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// A file could not be read.
    ///
    /// During a build this aborts the whole build on the first unreadable
    /// file; a partial manifest must never be emitted.
    #[error("Failed to read file: {path}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A symbolic link resolves to a target outside the build root
    #[error("Symbolic link escapes the build root: {path}")]
    SymlinkEscape { path: PathBuf },

    /// A path under the build root is not valid UTF-8 and cannot be recorded
    #[error("File path is not valid UTF-8: {path}")]
    UnencodablePath { path: PathBuf },

    /// The manifest file does not exist
    #[error("Manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// The manifest file exists but is not a valid manifest document
    #[error("Manifest file is corrupt or not valid JSON: {path}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest declares a format version this build does not understand
    #[error("Unsupported manifest format version: {found} (supported: {supported})")]
    UnsupportedFormat { found: String, supported: String },

    /// Failed to serialize a manifest or its signable payload
    #[error("Failed to serialize manifest")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write the manifest or signature file
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from loading, generating or storing key material.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The key file could not be read
    #[error("Failed to read key file: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key file is not a recognized PEM encoding
    #[error("Malformed key file: {detail}")]
    Malformed { detail: String },

    /// The private key is passphrase-protected and no passphrase was supplied
    #[error("Private key is encrypted; a passphrase is required")]
    PassphraseRequired,

    /// The supplied passphrase does not decrypt the private key
    #[error("Wrong passphrase for encrypted private key")]
    BadPassphrase,

    /// Key generation failed
    #[error("Failed to generate key pair: {detail}")]
    GenerateFailed { detail: String },

    /// Failed to encode or write key material
    #[error("Failed to write key file: {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to encode key material as PEM
    #[error("Failed to encode key material: {detail}")]
    EncodeFailed { detail: String },
}

/// Errors from the trust store and trusted-key resolution.
#[derive(Error, Debug)]
pub enum TrustStoreError {
    /// The trust store file exists but could not be read
    #[error("Failed to read trust store: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The trust store file exists but does not decode.
    ///
    /// A half-written or corrupt store is an error, never silently treated
    /// as empty.
    #[error("Trust store is corrupt: {path}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to persist the trust store
    #[error("Failed to write trust store: {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested key name is not present in the trust store
    #[error("No trusted key named '{name}'.\n\nTo add it, run:\n  modelseal trust add {name} --key <public-key.pem>")]
    UnknownTrustedKey { name: String },

    /// Neither an explicit key file nor a trusted key name was supplied
    #[error("No key specified: supply an explicit public key file or a trusted key name")]
    NoKeySpecified,

    /// The stored entry references key material that cannot be used
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Structural verification failures.
///
/// These abort verification before or during the signature phase. Per-file
/// integrity findings never surface here; the verifier always completes and
/// returns a report once the integrity phase begins.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    TrustStore(#[from] TrustStoreError),

    /// Signature checking was requested but no signature side-file exists
    #[error("Signature file not found: {path}")]
    SignatureNotFound { path: PathBuf },

    /// The cryptographic signature check failed.
    ///
    /// Terminal: file-by-file checking never runs against a falsely-signed
    /// manifest.
    #[error("Signature verification failed: the manifest is not signed by the given key")]
    SignatureInvalid,
}
