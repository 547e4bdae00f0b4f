//! Key management CLI commands

use crate::passphrase;
use anyhow::{Context, Result};
use clap::Parser;
use modelseal_core::keys;
use modelseal_core::truststore::{TrustStore, TRUST_STORE_FILE};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
pub enum KeysCommand {
    /// Generate a new RSA key pair
    Generate {
        /// Output private key file
        #[clap(long, default_value = "private_key.pem")]
        private_key: PathBuf,

        /// Output public key file
        #[clap(long, default_value = "public_key.pem")]
        public_key: PathBuf,

        /// Read the private-key passphrase from this file instead of prompting
        #[clap(long, conflicts_with = "unencrypted")]
        passphrase_file: Option<PathBuf>,

        /// Write the private key without passphrase protection
        #[clap(long)]
        unencrypted: bool,

        /// Also register the public key in the trust store under this name
        #[clap(long)]
        trust_as: Option<String>,

        /// Trust store file
        #[clap(long, default_value = TRUST_STORE_FILE)]
        store: PathBuf,
    },
}

impl KeysCommand {
    pub fn execute(&self) -> Result<()> {
        match self {
            KeysCommand::Generate {
                private_key,
                public_key,
                passphrase_file,
                unencrypted,
                trust_as,
                store,
            } => keys_generate(
                private_key,
                public_key,
                passphrase_file.as_deref(),
                *unencrypted,
                trust_as.as_deref(),
                store,
            ),
        }
    }
}

fn keys_generate(
    private_path: &Path,
    public_path: &Path,
    passphrase_file: Option<&Path>,
    unencrypted: bool,
    trust_as: Option<&str>,
    store_path: &Path,
) -> Result<()> {
    let passphrase = if unencrypted {
        None
    } else {
        match passphrase_file {
            Some(file) => Some(passphrase::from_file(file)?),
            None => Some(passphrase::prompt(
                "Enter a new passphrase for the private key",
                true,
            )?),
        }
    };

    println!("Generating {}-bit RSA key pair...", keys::KEY_BITS);
    let (private, public) = keys::generate_keypair()?;

    keys::save_private_key(private_path, &private, passphrase.as_deref().map(|p| p.as_str()))?;
    keys::save_public_key(public_path, &public)?;

    println!("Private key written to: {}", private_path.display());
    println!("Public key written to:  {}", public_path.display());

    if let Some(name) = trust_as {
        let mut store = TrustStore::load(store_path)?;
        store.add(name, keys::public_key_pem(&public)?);
        store.save().context("Failed to update trust store")?;
        println!(
            "Public key added to {} under name: '{name}'",
            store_path.display()
        );
    }

    Ok(())
}
