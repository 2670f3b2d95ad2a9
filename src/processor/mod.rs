use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    command::CommandError,
    store::StoreError,
    wallet::{WalletError, WalletId},
};

pub mod transaction_processor;

pub use transaction_processor::TransactionProcessor;

/// Everything a ledger operation can fail with.
///
/// The set is closed so callers can match exhaustively, e.g. to pick a
/// response status. See [`LedgerError::class`] for the coarse grouping.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Wallet {wallet_id} not found")]
    NotFound { wallet_id: WalletId },
    #[error("Insufficient funds in wallet {wallet_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        wallet_id: WalletId,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("Invalid operation type {operation} for wallet {wallet_id}")]
    InvalidOperation {
        wallet_id: WalletId,
        operation: String,
    },
    #[error("Invalid amount {amount} for wallet {wallet_id}: {reason}")]
    InvalidAmount {
        wallet_id: WalletId,
        amount: Decimal,
        reason: String,
    },
    #[error("Wallet {wallet_id} already exists")]
    DuplicateIdentifier { wallet_id: WalletId },
    #[error("Storage failure while trying to {operation} wallet {wallet_id}")]
    Storage {
        operation: &'static str,
        wallet_id: WalletId,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is unacceptable; retrying it unchanged fails again.
    Rejected,
    NotFound,
    /// Storage trouble, the same request may succeed later.
    Internal,
}

impl LedgerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::NotFound { .. } => ErrorClass::NotFound,
            LedgerError::InsufficientFunds { .. }
            | LedgerError::InvalidOperation { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::DuplicateIdentifier { .. } => ErrorClass::Rejected,
            LedgerError::Storage { .. } => ErrorClass::Internal,
        }
    }

    pub(crate) fn from_store(
        operation: &'static str,
        wallet_id: WalletId,
        err: StoreError,
    ) -> Self {
        match err {
            StoreError::NotFound(wallet_id) => LedgerError::NotFound { wallet_id },
            StoreError::DuplicateIdentifier(wallet_id) => {
                LedgerError::DuplicateIdentifier { wallet_id }
            }
            source @ StoreError::Backend { .. } => LedgerError::Storage {
                operation,
                wallet_id,
                source,
            },
        }
    }

    pub(crate) fn from_wallet(wallet_id: WalletId, err: WalletError) -> Self {
        match err {
            WalletError::InsufficientFunds { balance, requested } => {
                LedgerError::InsufficientFunds {
                    wallet_id,
                    balance,
                    requested,
                }
            }
            WalletError::BalanceOverflow { balance, .. } => LedgerError::InvalidAmount {
                wallet_id,
                amount: balance,
                reason: err.to_string(),
            },
            WalletError::NegativeBalance(amount) => LedgerError::InvalidAmount {
                wallet_id,
                amount,
                reason: err.to_string(),
            },
        }
    }

    pub(crate) fn from_command(wallet_id: WalletId, err: CommandError) -> Self {
        match err {
            CommandError::InvalidOperation(operation) => LedgerError::InvalidOperation {
                wallet_id,
                operation,
            },
            CommandError::NonPositiveAmount { amount, .. }
            | CommandError::UnrepresentableAmount { amount, .. } => LedgerError::InvalidAmount {
                wallet_id,
                amount,
                reason: err.to_string(),
            },
        }
    }
}
