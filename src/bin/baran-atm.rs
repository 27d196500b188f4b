use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use atm_ledger::cli::Session;
use atm_ledger::utils::{MemoryStorage, SqliteStorage};
use atm_ledger::{AccountStore, Ledger, LedgerConfig, PinCheck, SeedConfig};
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Baran Bank ATM
#[derive(Debug, Parser)]
#[command(name = "baran-atm", about = "Interactive ATM over the account ledger")]
struct Args {
    /// SQLite URL of the account database, or `memory` for a throwaway store
    #[arg(long, env = "ATM_DATABASE_URL", default_value = "sqlite://atm.db?mode=rwc")]
    database_url: String,

    /// JSON file of accounts to upsert at startup; defaults to Ali and Ece
    #[arg(long, env = "ATM_SEED_FILE")]
    seed: Option<PathBuf>,

    /// Require the PIN to match at login
    #[arg(long, env = "ATM_VERIFY_PIN")]
    verify_pin: bool,

    /// Upper bound on a single store call, in milliseconds
    #[arg(long, env = "ATM_STORE_TIMEOUT_MS", default_value_t = 5000)]
    store_timeout_ms: u64,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the menu.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn open_store(database_url: &str, lock_wait: Duration) -> Result<Arc<dyn AccountStore>> {
    if database_url == "memory" {
        return Ok(Arc::new(MemoryStorage::new()));
    }
    let storage = SqliteStorage::connect_with_lock_wait(database_url, lock_wait)
        .await
        .with_context(|| format!("failed to open account database `{database_url}`"))?;
    Ok(Arc::new(storage))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let pin_check = if args.verify_pin {
        PinCheck::Verify
    } else {
        PinCheck::Ignore
    };
    let config = LedgerConfig::default()
        .with_pin_check(pin_check)
        .with_store_timeout(Duration::from_millis(args.store_timeout_ms));

    let seed = match &args.seed {
        Some(path) => SeedConfig::from_path(path)
            .with_context(|| format!("failed to load seed file `{}`", path.display()))?,
        None => SeedConfig::reference_default(),
    };

    let store = open_store(&args.database_url, config.store_timeout).await?;
    let ledger = Ledger::with_config(store, config);
    ledger.seed(&seed).await.context("failed to seed accounts")?;

    let session = Session::new(&ledger, BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let outcome = session.run().await;

    ledger.close().await.context("failed to close account store")?;
    outcome.context("ATM session aborted")
}
