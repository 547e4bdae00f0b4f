//! ModelSeal - signed integrity manifests for ML model artifacts
//!
//! Command-line entry point: generate (and optionally sign) a manifest over
//! an artifact directory, verify a directory against a manifest, and manage
//! keys and the trust store.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use modelseal_core::builder::ManifestBuilder;
use modelseal_core::manifest::SubjectMetadata;
use modelseal_core::signer;
use modelseal_core::truststore::{resolve_public_key, KeySelector, TRUST_STORE_FILE};
use modelseal_core::verifier::{VerificationReport, Verifier};
use rsa::RsaPublicKey;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod keys_cli;
mod passphrase;
mod trust_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Verification report output formats
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "modelseal",
    about = "Signed integrity manifests for ML model artifacts",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,
}

#[derive(Parser, Debug)]
enum Command {
    /// Generate a manifest for a model artifact directory
    Generate {
        /// Path to the model files
        path: PathBuf,

        /// Creator or system name recorded in the manifest
        #[clap(long)]
        created_by: String,

        /// Output manifest file
        #[clap(long, default_value = "manifest.json")]
        out: PathBuf,

        /// Private key to sign the manifest with
        #[clap(long)]
        sign: Option<PathBuf>,

        /// Read the private-key passphrase from this file instead of prompting
        #[clap(long, requires = "sign")]
        passphrase_file: Option<PathBuf>,

        /// Model name recorded in the manifest metadata
        #[clap(long)]
        model_name: Option<String>,

        /// Model version recorded in the manifest metadata
        #[clap(long)]
        model_version: Option<String>,

        /// Upstream source identifier (hub ID, tracking URI)
        #[clap(long)]
        source_id: Option<String>,

        /// Immediately verify the freshly written manifest
        #[clap(long)]
        auto_verify: bool,
    },

    /// Verify a directory against a manifest
    Verify {
        /// Path to the model files
        path: PathBuf,

        /// Path to the manifest file
        #[clap(long)]
        manifest: PathBuf,

        /// Public key file to check the signature with
        #[clap(long, conflicts_with = "trusted_key")]
        key: Option<PathBuf>,

        /// Name of a trusted key from the trust store
        #[clap(long)]
        trusted_key: Option<String>,

        /// Skip signature checking (unauthenticated integrity check)
        #[clap(long, conflicts_with_all = ["key", "trusted_key"])]
        allow_unsigned: bool,

        /// Output format
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Trust store file
        #[clap(long, default_value = TRUST_STORE_FILE)]
        store: PathBuf,
    },

    /// Manage cryptographic keys
    Keys {
        #[clap(subcommand)]
        command: keys_cli::KeysCommand,
    },

    /// Manage the trust store of verification keys
    Trust {
        #[clap(subcommand)]
        command: trust_cli::TrustCommand,
    },
}

/// Initialize tracing from the --log-level flag; logs go to stderr so
/// stdout stays machine-parseable.
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    match cli.command {
        Command::Generate {
            path,
            created_by,
            out,
            sign,
            passphrase_file,
            model_name,
            model_version,
            source_id,
            auto_verify,
        } => generate_command(
            &path,
            &created_by,
            &out,
            sign.as_deref(),
            passphrase_file.as_deref(),
            subject_metadata(model_name, model_version, source_id),
            auto_verify,
        ),
        Command::Verify {
            path,
            manifest,
            key,
            trusted_key,
            allow_unsigned,
            format,
            store,
        } => verify_command(
            &path,
            &manifest,
            key,
            trusted_key,
            allow_unsigned,
            &format,
            &store,
        ),
        Command::Keys { command } => command.execute(),
        Command::Trust { command } => command.execute(),
    }
}

fn subject_metadata(
    name: Option<String>,
    version: Option<String>,
    source_id: Option<String>,
) -> Option<SubjectMetadata> {
    if name.is_none() && version.is_none() && source_id.is_none() {
        return None;
    }
    Some(SubjectMetadata {
        name,
        version,
        source_id,
    })
}

fn generate_command(
    path: &Path,
    created_by: &str,
    out: &Path,
    sign: Option<&Path>,
    passphrase_file: Option<&Path>,
    model: Option<SubjectMetadata>,
    auto_verify: bool,
) -> Result<()> {
    let mut builder = ManifestBuilder::new(path, created_by).output_path(out);
    if let Some(model) = model {
        builder = builder.model(model);
    }

    let mut manifest = builder.build()?;

    let public_key = match sign {
        Some(key_path) => {
            let passphrase = passphrase::for_private_key(key_path, passphrase_file)?;
            let private = modelseal_core::keys::load_private_key(
                key_path,
                passphrase.as_deref().map(|p| p.as_str()),
            )?;

            let signature = signer::sign_manifest(&mut manifest, &private)?;
            manifest.save(out)?;
            signer::write_signature(out, &signature)?;
            Some(RsaPublicKey::from(&private))
        }
        None => {
            manifest.save(out)?;
            None
        }
    };

    println!(
        "Manifest written to {} ({} file(s))",
        out.display(),
        manifest.files.len()
    );

    if auto_verify {
        let report = Verifier::new(path, out).verify(public_key.as_ref())?;
        print_report(&report, &OutputFormat::Text)?;
        if !report.is_success() {
            std::process::exit(1);
        }
    }

    Ok(())
}

fn verify_command(
    path: &Path,
    manifest: &Path,
    key: Option<PathBuf>,
    trusted_key: Option<String>,
    allow_unsigned: bool,
    format: &OutputFormat,
    store: &Path,
) -> Result<()> {
    let public_key = if allow_unsigned {
        tracing::warn!("Signature checking disabled; result is unauthenticated");
        None
    } else {
        let selector = KeySelector::from_options(key, trusted_key).context(
            "Signature checking requires --key or --trusted-key (or pass --allow-unsigned)",
        )?;
        Some(resolve_public_key(&selector, store)?)
    };

    let report = Verifier::new(path, manifest).verify(public_key.as_ref())?;
    print_report(&report, format)?;

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &VerificationReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{report}"),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to encode report")?
        ),
    }
    Ok(())
}
