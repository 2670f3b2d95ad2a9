//! Replays a CSV file of wallet operations through [`TransactionProcessor`]
//! and prints the resulting balances, used by the binary and by integration tests.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::{
    processor::{LedgerError, TransactionProcessor},
    store::LedgerStore,
};
use csv_parser::{CREATE_OP, CsvOperationParser};
use csv_printer::{WalletRow, print_wallets};
pub mod csv_parser;
pub mod csv_printer;

/// Why a single input row was skipped.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("Malformed row: {0}")]
    Malformed(#[source] csv::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct Service<'w, R, W: 'w, S> {
    pub input: R,
    pub output: &'w mut W,
    pub processor: TransactionProcessor<S>,
    pub error_printer: Box<dyn FnMut(u64, RowError)>,
}

impl<'w, R, W, S> Service<'w, R, W, S>
where
    R: Read,
    W: Write + 'w,
    S: LedgerStore,
{
    /// Malformed rows and failed operations go to `error_printer` and the run
    /// continues; only unreadable input or output aborts it.
    pub async fn run(self) -> Result<()> {
        let Service {
            input,
            output,
            processor,
            mut error_printer,
        } = self;
        let parser = CsvOperationParser::new(input);
        let mut created = Vec::new();

        for (line, row) in parser {
            let row = match row {
                Ok(row) => row,
                Err(err) if err.is_io_error() => {
                    return Err(err).with_context(|| format!("Failed to read line {line}"));
                }
                Err(err) => {
                    error_printer(line, RowError::Malformed(err));
                    continue;
                }
            };
            let result = if row.op.eq_ignore_ascii_case(CREATE_OP) {
                processor
                    .create_wallet(row.wallet, row.amount)
                    .await
                    .map(|wallet| created.push(wallet.id()))
            } else {
                processor
                    .apply(row.wallet, &row.op, row.amount)
                    .await
                    .map(drop)
            };
            if let Err(err) = result {
                error_printer(line, err.into());
            }
        }

        let mut wallets = Vec::with_capacity(created.len());
        for wallet_id in created {
            let wallet = processor.get_wallet(wallet_id).await?;
            wallets.push(WalletRow {
                wallet: wallet.id(),
                balance: wallet.balance(),
            });
        }
        print_wallets(output, wallets)
    }
}
