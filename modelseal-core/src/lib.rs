//! ModelSeal - signed integrity manifests for ML model artifacts
//!
//! Produces and verifies a tamper-evident inventory of a file tree so a
//! consumer can prove the files are byte-identical to what a publisher
//! produced and signed.
//!
//! Pipeline: [`builder::ManifestBuilder`] walks a directory into a
//! [`manifest::Manifest`]; [`signer`] binds it to a publisher's RSA key with
//! a detached PSS signature; [`truststore`] resolves "verify with the key
//! named X"; [`verifier::Verifier`] checks signature then per-file
//! integrity and reports every mismatch.

pub mod builder;
pub mod error;
pub mod hasher;
pub mod keys;
pub mod manifest;
pub mod signer;
pub mod truststore;
pub mod verifier;

pub use builder::ManifestBuilder;
pub use error::{KeyError, ManifestError, TrustStoreError, VerifyError};
pub use manifest::{FileRecord, Manifest, SubjectMetadata};
pub use truststore::{KeySelector, TrustStore};
pub use verifier::{Mismatch, VerificationReport, Verifier};
