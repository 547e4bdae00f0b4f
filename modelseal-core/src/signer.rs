//! Manifest signing and raw signature verification
//!
//! RSA-PSS with MGF1-SHA256 over SHA-256, randomized salt per signature, so
//! re-signing identical content yields different bytes every time; signature
//! equality is never a cache key. The signable payload is the manifest's
//! file list only (see `Manifest::signable_payload`).
//!
//! Storage mode: the detached `<manifest>.sig` side-file holding the raw
//! signature bytes is authoritative. Signing also sets the manifest's
//! `signature` field to a base64 echo; verification never reads the echo.

use crate::error::{ManifestError, VerifyError};
use crate::manifest::{signature_path, Manifest};
use base64::Engine;
use rsa::pss::{BlindedSigningKey, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sign a byte payload, producing raw RSA-PSS signature bytes.
pub fn sign_payload(key: &RsaPrivateKey, payload: &[u8]) -> Vec<u8> {
    let signing_key = BlindedSigningKey::<Sha256>::new(key.clone());
    let mut rng = rand::thread_rng();
    signing_key.sign_with_rng(&mut rng, payload).to_vec()
}

/// Check raw signature bytes against a payload and public key.
///
/// A failed cryptographic check is `SignatureInvalid` — terminal, and
/// distinct from every input error.
pub fn verify_payload(
    key: &RsaPublicKey,
    payload: &[u8],
    signature: &[u8],
) -> Result<(), VerifyError> {
    let verifying_key = VerifyingKey::<Sha256>::new(key.clone());
    let signature =
        rsa::pss::Signature::try_from(signature).map_err(|_| VerifyError::SignatureInvalid)?;
    verifying_key
        .verify(payload, &signature)
        .map_err(|_| VerifyError::SignatureInvalid)
}

/// Sign a manifest's canonical payload.
///
/// Sets the manifest's embedded base64 echo and returns the raw signature
/// bytes for the side-file. The private key reference is not retained
/// beyond this call.
pub fn sign_manifest(
    manifest: &mut Manifest,
    key: &RsaPrivateKey,
) -> Result<Vec<u8>, ManifestError> {
    let payload = manifest.signable_payload()?;
    let signature = sign_payload(key, &payload);
    manifest.signature = Some(base64::engine::general_purpose::STANDARD.encode(&signature));
    debug!("Signed manifest payload ({} bytes)", payload.len());
    Ok(signature)
}

/// Write raw signature bytes to the manifest's `.sig` side-file.
pub fn write_signature(manifest_path: &Path, signature: &[u8]) -> Result<PathBuf, ManifestError> {
    let sig_path = signature_path(manifest_path);
    std::fs::write(&sig_path, signature).map_err(|e| ManifestError::WriteFailed {
        path: sig_path.clone(),
        source: e,
    })?;
    info!("Signature written to {}", sig_path.display());
    Ok(sig_path)
}

/// Read raw signature bytes from the manifest's `.sig` side-file.
///
/// Absence is `SignatureNotFound` — checking was requested, so a missing
/// side-file is fatal, not a skip.
pub fn read_signature(manifest_path: &Path) -> Result<Vec<u8>, VerifyError> {
    let sig_path = signature_path(manifest_path);
    std::fs::read(&sig_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VerifyError::SignatureNotFound { path: sig_path },
        _ => VerifyError::Manifest(ManifestError::FileUnreadable {
            path: sig_path,
            source: e,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::test_keypair;
    use crate::manifest::FileRecord;
    use tempfile::TempDir;

    fn sample_manifest() -> Manifest {
        Manifest::new(
            "alice",
            None,
            vec![FileRecord {
                path: "a.txt".to_string(),
                sha256: "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
                    .to_string(),
            }],
        )
    }

    #[test]
    fn sign_verify_roundtrip() {
        let (private, public) = test_keypair();
        let mut manifest = sample_manifest();

        let signature = sign_manifest(&mut manifest, &private).unwrap();
        let payload = manifest.signable_payload().unwrap();

        assert!(verify_payload(&public, &payload, &signature).is_ok());
        assert!(manifest.signature.is_some());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let (private, _) = test_keypair();
        let (_, other_public) = test_keypair();
        let mut manifest = sample_manifest();

        let signature = sign_manifest(&mut manifest, &private).unwrap();
        let payload = manifest.signable_payload().unwrap();

        let result = verify_payload(&other_public, &payload, &signature);
        assert!(matches!(result, Err(VerifyError::SignatureInvalid)));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let (private, public) = test_keypair();
        let mut manifest = sample_manifest();

        let signature = sign_manifest(&mut manifest, &private).unwrap();

        manifest.files[0].sha256 = "00".repeat(32);
        let payload = manifest.signable_payload().unwrap();

        let result = verify_payload(&public, &payload, &signature);
        assert!(matches!(result, Err(VerifyError::SignatureInvalid)));
    }

    #[test]
    fn signing_is_randomized() {
        let (private, public) = test_keypair();
        let manifest = sample_manifest();
        let payload = manifest.signable_payload().unwrap();

        let first = sign_payload(&private, &payload);
        let second = sign_payload(&private, &payload);

        // PSS salts are random per signature; both still verify.
        assert_ne!(first, second);
        assert!(verify_payload(&public, &payload, &first).is_ok());
        assert!(verify_payload(&public, &payload, &second).is_ok());
    }

    #[test]
    fn signature_side_file_roundtrip() {
        let temp = TempDir::new().unwrap();
        let manifest_path = temp.path().join("manifest.json");

        write_signature(&manifest_path, b"raw signature bytes").unwrap();
        let read_back = read_signature(&manifest_path).unwrap();
        assert_eq!(read_back, b"raw signature bytes");
    }

    #[test]
    fn missing_side_file_is_signature_not_found() {
        let temp = TempDir::new().unwrap();
        let result = read_signature(&temp.path().join("manifest.json"));
        assert!(matches!(result, Err(VerifyError::SignatureNotFound { .. })));
    }
}
