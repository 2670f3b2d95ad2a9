use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::command::{OperationType, TransactionCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for WalletId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for WalletId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shape of the persisted balance column, `NUMERIC(digits, scale)`.
///
/// Every amount and every resulting balance must be representable in it,
/// otherwise the database would round or reject what the ledger computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancePrecision {
    digits: u32,
    scale: u32,
}

impl BalancePrecision {
    /// Largest `NUMERIC` precision a [`Decimal`] can hold without loss.
    pub const MAX_DIGITS: u32 = 28;

    pub fn new(digits: u32, scale: u32) -> Option<Self> {
        (digits > scale && digits <= Self::MAX_DIGITS).then_some(Self { digits, scale })
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// True when `value` needs no rounding and stays below `10^(digits - scale)`.
    pub fn can_represent(&self, value: Decimal) -> bool {
        value.normalize().scale() <= self.scale && value.abs() < self.integer_bound()
    }

    fn integer_bound(&self) -> Decimal {
        Decimal::from_i128_with_scale(10i128.pow(self.digits - self.scale), 0)
    }
}

impl Default for BalancePrecision {
    fn default() -> Self {
        Self {
            digits: 15,
            scale: 2,
        }
    }
}

impl fmt::Display for BalancePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NUMERIC({}, {})", self.digits, self.scale)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum WalletEventKind {
    Deposited,
    Withdrawn,
}

#[derive(Debug)]
pub struct WalletEvent {
    amount: Decimal,
    kind: WalletEventKind,
}

impl WalletEvent {
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> &WalletEventKind {
        &self.kind
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
    #[error("Resulting balance {balance} does not fit into {precision}")]
    BalanceOverflow {
        balance: Decimal,
        precision: BalancePrecision,
    },
    #[error("Balance must not be negative, got {0}")]
    NegativeBalance(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    id: WalletId,
    balance: Decimal,
}

impl Wallet {
    pub fn new(id: WalletId, balance: Decimal) -> Result<Self, WalletError> {
        if balance < Decimal::ZERO {
            return Err(WalletError::NegativeBalance(balance));
        }
        Ok(Self { id, balance })
    }

    /// Rebuilds a wallet from a stored row; the store's constraints already hold.
    pub(crate) fn restore(id: WalletId, balance: Decimal) -> Self {
        Self { id, balance }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn apply(&mut self, event: &WalletEvent) {
        match event.kind {
            WalletEventKind::Deposited => {
                self.balance += event.amount;
            }
            WalletEventKind::Withdrawn => {
                self.balance -= event.amount;
            }
        }
    }

    /// Decides whether `command` may be applied to the current balance.
    ///
    /// Nothing is mutated here; the returned event is applied with [`Wallet::apply`].
    pub fn handle_transaction(
        &self,
        command: &TransactionCommand,
        precision: BalancePrecision,
    ) -> Result<WalletEvent, WalletError> {
        let amount = command.amount;
        match command.operation {
            OperationType::Deposit => {
                let overflow = || WalletError::BalanceOverflow {
                    balance: self.balance.saturating_add(amount),
                    precision,
                };
                let balance = self.balance.checked_add(amount).ok_or_else(overflow)?;
                if !precision.can_represent(balance) {
                    return Err(overflow());
                }
                Ok(WalletEvent {
                    amount,
                    kind: WalletEventKind::Deposited,
                })
            }
            OperationType::Withdraw => {
                if self.balance >= amount {
                    Ok(WalletEvent {
                        amount,
                        kind: WalletEventKind::Withdrawn,
                    })
                } else {
                    Err(WalletError::InsufficientFunds {
                        balance: self.balance,
                        requested: amount,
                    })
                }
            }
        }
    }
}
