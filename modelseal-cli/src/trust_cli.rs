//! Trust store CLI commands

use anyhow::{Context, Result};
use clap::Parser;
use modelseal_core::keys;
use modelseal_core::truststore::{TrustStore, TRUST_STORE_FILE};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
pub enum TrustCommand {
    /// Add a public key to the trust store under a name
    Add {
        /// Name to store the key under
        name: String,

        /// Public key PEM file
        #[clap(long)]
        key: PathBuf,

        /// Trust store file
        #[clap(long, default_value = TRUST_STORE_FILE)]
        store: PathBuf,
    },

    /// List the names in the trust store
    List {
        /// Trust store file
        #[clap(long, default_value = TRUST_STORE_FILE)]
        store: PathBuf,
    },
}

impl TrustCommand {
    pub fn execute(&self) -> Result<()> {
        match self {
            TrustCommand::Add { name, key, store } => trust_add(name, key, store),
            TrustCommand::List { store } => trust_list(store),
        }
    }
}

fn trust_add(name: &str, key_path: &Path, store_path: &Path) -> Result<()> {
    // Parse before storing so a bad file is rejected here, not at first use.
    let public = keys::load_public_key(key_path)?;

    let mut store = TrustStore::load(store_path)?;
    store.add(name, keys::public_key_pem(&public)?);
    store.save().context("Failed to update trust store")?;

    println!("Trusted key '{name}' added to {}", store_path.display());
    Ok(())
}

fn trust_list(store_path: &Path) -> Result<()> {
    let store = TrustStore::load(store_path)?;

    if store.is_empty() {
        println!("No trusted keys yet.");
        return Ok(());
    }

    for name in store.names() {
        println!("{name}");
    }
    Ok(())
}
