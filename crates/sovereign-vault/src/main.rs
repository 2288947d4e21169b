//! Sovereign vault binary.
//!
//! # Usage
//!
//! ```bash
//! # Replay the sample ingestion with an ephemeral key
//! sovereign-vault demo
//!
//! # Durable vault; the key is read as hex from SOVEREIGN_VAULT_KEY
//! export SOVEREIGN_VAULT_KEY=$(openssl rand -hex 32)
//! sovereign-vault --db vault.redb ingest --doc-id 1001 --keyword cyber_defense
//! sovereign-vault --db vault.redb search --keyword cyber_defense
//! ```

use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use sovereign_vault::{
    Environment, MemoryStorage, RedbStorage, SearchResult, SecretKey, Storage, SystemEnv,
    VaultConfig, VaultEngine,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

/// Environment variable holding the hex-encoded vault key.
const KEY_ENV_VAR: &str = "SOVEREIGN_VAULT_KEY";

/// Sovereign vault
#[derive(Parser, Debug)]
#[command(name = "sovereign-vault")]
#[command(about = "Searchable encrypted keyword vault")]
#[command(version)]
struct Args {
    /// Path to a redb database (in-memory vault when omitted)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a document under one or more keywords
    Ingest {
        /// Document identifier
        #[arg(long)]
        doc_id: u64,

        /// Keyword to index (repeatable)
        #[arg(long = "keyword", required = true)]
        keywords: Vec<String>,
    },

    /// List the documents indexed under a keyword
    Search {
        /// Keyword to look up
        #[arg(long)]
        keyword: String,
    },

    /// Index two sample documents under a fresh key and search one keyword
    Demo,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = match &args.config {
        Some(path) => VaultConfig::load(path)?,
        None => VaultConfig::default(),
    };

    match &args.db {
        Some(path) => {
            tracing::info!("Opening durable vault at {}", path.display());
            run(RedbStorage::open(path)?, &config, args.command).await
        },
        None => {
            tracing::info!("Using in-memory vault");
            run(MemoryStorage::new(), &config, args.command).await
        },
    }
}

async fn run<S: Storage>(
    storage: S,
    config: &VaultConfig,
    command: Command,
) -> Result<(), Box<dyn Error>> {
    let env = SystemEnv::new();
    let vault = VaultEngine::open(storage, config, env)?;

    match command {
        Command::Ingest { doc_id, keywords } => {
            let key = key_from_env()?;
            vault.add_document(doc_id, keywords.as_slice(), &key).await?;
            tracing::info!(doc_id, keywords = keywords.len(), "Ingest complete");
        },
        Command::Search { keyword } => {
            let key = key_from_env()?;
            let result = vault.search(&keyword, &key).await?;
            report(&result);
        },
        Command::Demo => {
            let key = env.generate_secret_key(config.key_length);

            vault
                .add_document(1001, &["petroleum_reserves", "cyber_defense", "vision_2030"], &key)
                .await?;
            vault
                .add_document(1002, &["smart_grid", "neom_infrastructure", "data_sovereignty"], &key)
                .await?;

            let result = vault.search("petroleum_reserves", &key).await?;
            report(&result);
        },
    }

    Ok(())
}

fn report(result: &SearchResult) {
    if result.found {
        tracing::info!(
            docs = ?result.doc_ids,
            latency_nanos = result.latency_nanos,
            "Match found"
        );
    } else {
        tracing::info!(latency_nanos = result.latency_nanos, "No match");
    }
}

fn key_from_env() -> Result<SecretKey, Box<dyn Error>> {
    let encoded = Zeroizing::new(
        std::env::var(KEY_ENV_VAR)
            .map_err(|_| format!("{KEY_ENV_VAR} must hold the hex-encoded vault key"))?,
    );
    let bytes = Zeroizing::new(
        hex::decode(encoded.trim()).map_err(|_| format!("{KEY_ENV_VAR} is not valid hex"))?,
    );
    Ok(SecretKey::from_slice(&bytes))
}
