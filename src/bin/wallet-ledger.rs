use std::fs::File;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wallet_ledger::{
    bin_utils::{RowError, Service},
    config::{LedgerConfig, StoreBackend},
    processor::{ErrorClass, TransactionProcessor},
    store::{LedgerStore, in_memory::InMemoryLedgerStore, postgres::PostgresLedgerStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let filename = std::env::args()
        .nth(1)
        .context("Expected a file name as the first argument")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;
    let config = LedgerConfig::from_env().context("Failed to load configuration")?;

    match config.store {
        StoreBackend::Memory => {
            run(file, InMemoryLedgerStore::with_precision(config.precision)).await
        }
        StoreBackend::Postgres => {
            let store = PostgresLedgerStore::connect(&config.db, config.precision)
                .await
                .context("Failed to connect to Postgres")?;
            if config.db.migrate {
                store
                    .ensure_schema()
                    .await
                    .context("Failed to prepare wallets table")?;
            }
            run(file, store).await
        }
    }
}

async fn run<S: LedgerStore>(input: File, store: S) -> Result<()> {
    let service = Service {
        input,
        output: &mut std::io::stdout(),
        processor: TransactionProcessor::new(store),
        error_printer: Box::new(print_error),
    };
    service.run().await
}

fn print_error(line: u64, err: RowError) {
    match &err {
        RowError::Ledger(ledger) if ledger.class() == ErrorClass::Internal => {
            tracing::error!(line, error = %err, "operation failed")
        }
        RowError::Ledger(_) => tracing::warn!(line, error = %err, "operation refused"),
        RowError::Malformed(_) => tracing::warn!(line, error = %err, "row skipped"),
    }
}
