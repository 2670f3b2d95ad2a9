use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::{
    command::TransactionCommand,
    store::{LedgerStore, MutationError},
    transaction::Transaction,
    wallet::{Wallet, WalletError, WalletId},
};

use super::{ErrorClass, LedgerError};

/// Business rules for wallet operations on top of a [`LedgerStore`].
///
/// Every balance change goes through [`LedgerStore::mutate_under_lock`];
/// nothing here reads a balance and writes it back on its own. Failures are
/// never retried.
pub struct TransactionProcessor<S> {
    store: S,
}

impl<S> TransactionProcessor<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(skip_all, fields(wallet_id = %wallet_id))]
    pub async fn create_wallet(
        &self,
        wallet_id: WalletId,
        balance: Decimal,
    ) -> Result<Wallet, LedgerError> {
        let wallet = Wallet::new(wallet_id, balance)
            .map_err(|err| LedgerError::from_wallet(wallet_id, err))?;
        let precision = self.store.precision();
        if !precision.can_represent(balance) {
            return Err(LedgerError::InvalidAmount {
                wallet_id,
                amount: balance,
                reason: format!("Initial balance cannot be represented as {precision}"),
            });
        }

        let wallet = self
            .store
            .create(wallet)
            .await
            .map_err(|err| log_failure(LedgerError::from_store("create", wallet_id, err)))?;
        info!(balance = %wallet.balance(), "wallet created");
        Ok(wallet)
    }

    /// Creates a wallet under a freshly generated identifier.
    pub async fn open_wallet(&self, balance: Decimal) -> Result<Wallet, LedgerError> {
        self.create_wallet(WalletId::new_v4(), balance).await
    }

    /// Current committed state, read without locking. A concurrent mutation
    /// may change it right after; never decide a mutation on this value.
    pub async fn get_wallet(&self, wallet_id: WalletId) -> Result<Wallet, LedgerError> {
        self.store
            .get_by_id(wallet_id)
            .await
            .map_err(|err| log_failure(LedgerError::from_store("read", wallet_id, err)))
    }

    /// Applies a deposit or withdrawal named by `operation`.
    ///
    /// Unknown operations and unusable amounts are rejected before the wallet
    /// is locked.
    #[instrument(skip_all, fields(wallet_id = %wallet_id, operation = operation, amount = %amount))]
    pub async fn apply(
        &self,
        wallet_id: WalletId,
        operation: &str,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        let command = TransactionCommand::parse(operation, amount, self.store.precision())
            .map_err(|err| log_failure(LedgerError::from_command(wallet_id, err)))?;
        self.execute(wallet_id, command).await
    }

    pub async fn execute(
        &self,
        wallet_id: WalletId,
        command: TransactionCommand,
    ) -> Result<Transaction, LedgerError> {
        let precision = self.store.precision();
        let wallet = self
            .store
            .mutate_under_lock(
                wallet_id,
                move |wallet: &mut Wallet| -> Result<(), WalletError> {
                    let event = wallet.handle_transaction(&command, precision)?;
                    wallet.apply(&event);
                    Ok(())
                },
            )
            .await
            .map_err(|err| {
                log_failure(match err {
                    MutationError::Store(err) => LedgerError::from_store("apply", wallet_id, err),
                    MutationError::Rejected(err) => LedgerError::from_wallet(wallet_id, err),
                })
            })?;

        info!(
            operation = %command.operation,
            balance = %wallet.balance(),
            "transaction applied"
        );
        Ok(Transaction::completed(wallet_id, command, wallet.balance()))
    }
}

/// Storage trouble is worth a warning, refusals are routine.
fn log_failure(err: LedgerError) -> LedgerError {
    match err.class() {
        ErrorClass::Internal => warn!(error = %err, "ledger operation failed"),
        ErrorClass::Rejected | ErrorClass::NotFound => debug!(error = %err, "request refused"),
    }
    err
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{command::OperationType, store::in_memory::InMemoryLedgerStore};

    use super::*;

    async fn processor_with_wallet(
        balance: Decimal,
    ) -> (TransactionProcessor<InMemoryLedgerStore>, WalletId) {
        let processor = TransactionProcessor::new(InMemoryLedgerStore::default());
        let wallet = processor.open_wallet(balance).await.unwrap();
        (processor, wallet.id())
    }

    #[tokio::test]
    async fn deposit() {
        let (processor, id) = processor_with_wallet(dec!(1000.00)).await;
        let tx = processor.apply(id, "DEPOSIT", dec!(500.00)).await.unwrap();
        assert_eq!(
            tx,
            Transaction {
                wallet_id: id,
                operation: OperationType::Deposit,
                amount: dec!(500.00),
                balance: dec!(1500.00),
            }
        );
        assert_eq!(
            processor.get_wallet(id).await.unwrap().balance(),
            dec!(1500.00)
        );
    }

    #[tokio::test]
    async fn withdraw() {
        let (processor, id) = processor_with_wallet(dec!(1000.00)).await;
        let tx = processor.apply(id, "WITHDRAW", dec!(300.00)).await.unwrap();
        assert_eq!(tx.balance, dec!(700.00));
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_balance() {
        let (processor, id) = processor_with_wallet(dec!(100.00)).await;
        let err = processor
            .apply(id, "WITHDRAW", dec!(500.00))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { wallet_id, .. } if wallet_id == id));
        assert_eq!(err.class(), ErrorClass::Rejected);
        assert_eq!(
            processor.get_wallet(id).await.unwrap().balance(),
            dec!(100.00)
        );
    }

    #[tokio::test]
    async fn invalid_operation() {
        let (processor, id) = processor_with_wallet(dec!(100.00)).await;
        let err = processor
            .apply(id, "TRANSFER", dec!(10.00))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidOperation { wallet_id, ref operation }
                if wallet_id == id && operation == "TRANSFER"
        ));
        assert_eq!(
            processor.get_wallet(id).await.unwrap().balance(),
            dec!(100.00)
        );

        // rejected before the store is consulted, so even unknown wallets say so
        let missing = WalletId::new_v4();
        let err = processor
            .apply(missing, "TRANSFER", dec!(10.00))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidOperation { wallet_id, .. } if wallet_id == missing
        ));
    }

    #[tokio::test]
    async fn unknown_wallet() {
        let processor = TransactionProcessor::new(InMemoryLedgerStore::default());
        let missing = WalletId::new_v4();
        let err = processor
            .apply(missing, "DEPOSIT", dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { wallet_id } if wallet_id == missing));
        assert_eq!(err.class(), ErrorClass::NotFound);

        let err = processor.get_wallet(missing).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn invalid_amounts() {
        let (processor, id) = processor_with_wallet(dec!(100.00)).await;
        for amount in [dec!(0), dec!(-1.00), dec!(0.001)] {
            let err = processor.apply(id, "DEPOSIT", amount).await.unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidAmount { wallet_id, .. } if wallet_id == id),
                "{amount}"
            );
        }

        let fresh = WalletId::new_v4();
        for balance in [dec!(-5), dec!(1.005)] {
            let err = processor.create_wallet(fresh, balance).await.unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidAmount { wallet_id, .. } if wallet_id == fresh),
                "{balance}"
            );
        }
    }

    #[tokio::test]
    async fn deposit_past_column_capacity() {
        let (processor, id) = processor_with_wallet(dec!(9999999999999.00)).await;
        let err = processor
            .apply(id, "DEPOSIT", dec!(1.00))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { wallet_id, .. } if wallet_id == id));
        assert_eq!(
            processor.get_wallet(id).await.unwrap().balance(),
            dec!(9999999999999.00)
        );
    }

    #[tokio::test]
    async fn duplicate_wallet() {
        let (processor, id) = processor_with_wallet(dec!(0)).await;
        let err = processor.create_wallet(id, dec!(10)).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateIdentifier { wallet_id } if wallet_id == id));
        assert!(processor.get_wallet(id).await.unwrap().balance().is_zero());
    }

    #[tokio::test]
    async fn decimal_arithmetic_is_exact() {
        let (processor, id) = processor_with_wallet(dec!(1000.00)).await;
        for _ in 0..3 {
            processor.apply(id, "DEPOSIT", dec!(0.10)).await.unwrap();
        }
        let tx = processor.apply(id, "WITHDRAW", dec!(0.30)).await.unwrap();
        assert_eq!(tx.balance, dec!(1000.00));
    }
}
