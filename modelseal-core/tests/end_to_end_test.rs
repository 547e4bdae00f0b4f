//! End-to-end publish/verify scenario: build, sign, distribute, verify,
//! tamper, verify again.

use anyhow::Result;
use modelseal_core::builder::ManifestBuilder;
use modelseal_core::error::VerifyError;
use modelseal_core::keys;
use modelseal_core::signer;
use modelseal_core::truststore::{resolve_public_key, KeySelector, TrustStore};
use modelseal_core::verifier::{Mismatch, SignatureStatus, Verifier};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn artifact_dir() -> Result<TempDir> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join("a.txt"), "hello")?;
    fs::create_dir_all(temp.path().join("b"))?;
    fs::write(temp.path().join("b/c.txt"), "world")?;
    Ok(temp)
}

fn publish(dir: &TempDir, key: &rsa::RsaPrivateKey) -> Result<PathBuf> {
    let manifest_path = dir.path().join("manifest.json");
    let mut manifest = ManifestBuilder::new(dir.path(), "alice")
        .output_path(&manifest_path)
        .build()?;
    let signature = signer::sign_manifest(&mut manifest, key)?;
    manifest.save(&manifest_path)?;
    signer::write_signature(&manifest_path, &signature)?;
    Ok(manifest_path)
}

#[test]
fn publish_then_verify_then_tamper() -> Result<()> {
    let dir = artifact_dir()?;
    let (private, public) = keys::generate_keypair()?;
    let manifest_path = publish(&dir, &private)?;

    // Unmodified tree with the right key: success, authenticated.
    let report = Verifier::new(dir.path(), &manifest_path).verify(Some(&public))?;
    assert!(report.is_success());
    assert_eq!(report.signature(), SignatureStatus::Verified);
    assert!(report.mismatches().is_empty());

    // Delete a tracked file: exactly one Missing finding, and the signature
    // phase still reports verified — the signature covers the original file
    // list, not current disk state.
    fs::remove_file(dir.path().join("b/c.txt"))?;
    let report = Verifier::new(dir.path(), &manifest_path).verify(Some(&public))?;
    assert!(!report.is_success());
    assert_eq!(report.signature(), SignatureStatus::Verified);
    assert_eq!(
        report.mismatches(),
        &[Mismatch::Missing {
            file: "b/c.txt".to_string()
        }]
    );

    Ok(())
}

#[test]
fn verify_with_unrelated_key_is_signature_invalid() -> Result<()> {
    let dir = artifact_dir()?;
    let (private, _) = keys::generate_keypair()?;
    let manifest_path = publish(&dir, &private)?;

    let (_, unrelated_public) = keys::generate_keypair()?;
    let result = Verifier::new(dir.path(), &manifest_path).verify(Some(&unrelated_public));

    assert!(matches!(result, Err(VerifyError::SignatureInvalid)));
    Ok(())
}

#[test]
fn missing_signature_file_is_fatal_when_key_supplied() -> Result<()> {
    let dir = artifact_dir()?;
    let (private, public) = keys::generate_keypair()?;
    let manifest_path = publish(&dir, &private)?;
    fs::remove_file(modelseal_core::manifest::signature_path(&manifest_path))?;

    let result = Verifier::new(dir.path(), &manifest_path).verify(Some(&public));
    assert!(matches!(result, Err(VerifyError::SignatureNotFound { .. })));
    Ok(())
}

#[test]
fn verify_through_trust_store_entry() -> Result<()> {
    let dir = artifact_dir()?;
    let (private, public) = keys::generate_keypair()?;
    let manifest_path = publish(&dir, &private)?;

    // Publisher registers the public key under a name; the consumer later
    // verifies by that name alone.
    let store_dir = TempDir::new()?;
    let store_path = store_dir.path().join("trusted_keys.json");
    let mut store = TrustStore::load(&store_path)?;
    store.add("alice-release", keys::public_key_pem(&public)?);
    store.save()?;

    let selector = KeySelector::from_options(None, Some("alice-release".to_string()))?;
    let resolved = resolve_public_key(&selector, &store_path)?;

    let report = Verifier::new(dir.path(), &manifest_path).verify(Some(&resolved))?;
    assert!(report.is_success());
    assert_eq!(report.signature(), SignatureStatus::Verified);
    Ok(())
}
