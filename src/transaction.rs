use rust_decimal::Decimal;

use crate::{
    command::{OperationType, TransactionCommand},
    wallet::WalletId,
};

/// Outcome of a mutation that was applied and committed.
///
/// `balance` is the wallet balance observed inside the same locked section
/// that applied the mutation, so no other mutation sits between the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub wallet_id: WalletId,
    pub operation: OperationType,
    pub amount: Decimal,
    pub balance: Decimal,
}

impl Transaction {
    pub fn completed(wallet_id: WalletId, command: TransactionCommand, balance: Decimal) -> Self {
        Self {
            wallet_id,
            operation: command.operation,
            amount: command.amount,
            balance,
        }
    }
}
