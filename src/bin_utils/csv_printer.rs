use std::io::Write;

use anyhow::Context;
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::wallet::WalletId;

#[derive(Debug, Serialize)]
pub struct WalletRow {
    pub wallet: WalletId,
    pub balance: Decimal,
}

/// Writes a `wallet,balance` header followed by one row per wallet.
pub fn print_wallets<W>(
    output: &mut W,
    wallets: impl IntoIterator<Item = WalletRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for wallet in wallets {
        let id = wallet.wallet;
        writer
            .serialize(wallet)
            .with_context(|| format!("Failed to write balance of wallet {id}"))?;
    }
    writer.flush().context("Failed to flush wallet balances")
}
