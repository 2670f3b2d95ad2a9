use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::wallet::BalancePrecision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Deposit,
    Withdraw,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Deposit => "DEPOSIT",
            OperationType::Withdraw => "WITHDRAW",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names are matched exactly, `"deposit"` is not an operation.
impl FromStr for OperationType {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(OperationType::Deposit),
            "WITHDRAW" => Ok(OperationType::Withdraw),
            other => Err(CommandError::InvalidOperation(other.to_owned())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid operation type: {0}")]
    InvalidOperation(String),
    #[error("Amount must be positive for {operation}, got {amount}")]
    NonPositiveAmount {
        operation: OperationType,
        amount: Decimal,
    },
    #[error("Amount {amount} cannot be represented as {precision}")]
    UnrepresentableAmount {
        amount: Decimal,
        precision: BalancePrecision,
    },
}

/// A validated balance mutation, ready to be handled by a locked wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionCommand {
    pub operation: OperationType,
    pub amount: Decimal,
}

impl TransactionCommand {
    pub fn parse(
        operation: &str,
        amount: Decimal,
        precision: BalancePrecision,
    ) -> Result<Self, CommandError> {
        Self::new(operation.parse()?, amount, precision)
    }

    pub fn new(
        operation: OperationType,
        amount: Decimal,
        precision: BalancePrecision,
    ) -> Result<Self, CommandError> {
        if amount <= Decimal::ZERO {
            return Err(CommandError::NonPositiveAmount { operation, amount });
        }
        if !precision.can_represent(amount) {
            return Err(CommandError::UnrepresentableAmount { amount, precision });
        }
        Ok(Self { operation, amount })
    }
}
