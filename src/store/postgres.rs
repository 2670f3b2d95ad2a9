use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::DbConfig,
    wallet::{BalancePrecision, Wallet, WalletId},
};

use super::{LedgerStore, MutationError, StoreError};

/// [`LedgerStore`] backed by a Postgres `wallets` table.
///
/// Mutations hold `SELECT ... FOR UPDATE` on the wallet row for the length of
/// one database transaction, so serialization also holds across processes
/// sharing the database.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
    precision: BalancePrecision,
    lock_timeout: Option<Duration>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool, precision: BalancePrecision) -> Self {
        Self {
            pool,
            precision,
            lock_timeout: None,
        }
    }

    /// Gives up waiting for a row lock after `timeout`; the wait then fails
    /// with [`StoreError::Backend`] and nothing is written. A zero timeout
    /// waits indefinitely.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub async fn connect(
        config: &DbConfig,
        precision: BalancePrecision,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_url())
            .await
            .map_err(|err| StoreError::backend("connect to database", err))?;
        let store = Self::new(pool, precision);
        Ok(match config.lock_timeout {
            Some(timeout) => store.with_lock_timeout(timeout),
            None => store,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let statement = format!(
            "CREATE TABLE IF NOT EXISTS wallets (\
                id UUID PRIMARY KEY, \
                balance NUMERIC({}, {}) NOT NULL DEFAULT 0 CHECK (balance >= 0)\
            )",
            self.precision.digits(),
            self.precision.scale()
        );
        sqlx::query(&statement)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::backend("create wallets table", err))?;
        Ok(())
    }
}

fn insert_error(id: WalletId, error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return StoreError::DuplicateIdentifier(id);
        }
    }
    StoreError::backend("insert wallet", error)
}

impl LedgerStore for PostgresLedgerStore {
    fn precision(&self) -> BalancePrecision {
        self.precision
    }

    async fn create(&self, wallet: Wallet) -> Result<Wallet, StoreError> {
        let (id, balance): (Uuid, Decimal) = sqlx::query_as(
            "INSERT INTO wallets (id, balance) VALUES ($1, $2) RETURNING id, balance",
        )
        .bind(*wallet.id().as_uuid())
        .bind(wallet.balance())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| insert_error(wallet.id(), err))?;
        Ok(Wallet::restore(id.into(), balance))
    }

    async fn get_by_id(&self, id: WalletId) -> Result<Wallet, StoreError> {
        let row: Option<(Uuid, Decimal)> =
            sqlx::query_as("SELECT id, balance FROM wallets WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| StoreError::backend("read wallet", err))?;
        let (id, balance) = row.ok_or(StoreError::NotFound(id))?;
        Ok(Wallet::restore(id.into(), balance))
    }

    async fn mutate_under_lock<F, E>(
        &self,
        id: WalletId,
        mutation: F,
    ) -> Result<Wallet, MutationError<E>>
    where
        F: FnOnce(&mut Wallet) -> Result<(), E> + Send,
        E: Send,
    {
        // dropping `tx` before commit rolls the transaction back
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StoreError::backend("begin transaction", err))?;

        if let Some(timeout) = self.lock_timeout {
            sqlx::query(&lock_timeout_statement(timeout))
                .execute(&mut *tx)
                .await
                .map_err(|err| StoreError::backend("set lock timeout", err))?;
        }

        let row: Option<(Uuid, Decimal)> =
            sqlx::query_as("SELECT id, balance FROM wallets WHERE id = $1 FOR UPDATE")
                .bind(*id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|err| StoreError::backend("lock wallet row", err))?;
        let Some((row_id, balance)) = row else {
            return Err(StoreError::NotFound(id).into());
        };
        debug!(wallet_id = %id, "row lock acquired");

        let mut wallet = Wallet::restore(row_id.into(), balance);
        if let Err(err) = mutation(&mut wallet) {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(wallet_id = %id, error = %rollback_err, "rollback failed");
            }
            debug!(wallet_id = %id, "mutation rejected, transaction rolled back");
            return Err(MutationError::Rejected(err));
        }

        sqlx::query("UPDATE wallets SET balance = $1 WHERE id = $2")
            .bind(wallet.balance())
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|err| StoreError::backend("update wallet balance", err))?;
        tx.commit()
            .await
            .map_err(|err| StoreError::backend("commit transaction", err))?;
        debug!(wallet_id = %id, balance = %wallet.balance(), "mutation committed");
        Ok(wallet)
    }
}

/// Rounds sub-millisecond timeouts up, `0` would disable the timeout.
fn lock_timeout_statement(timeout: Duration) -> String {
    format!("SET LOCAL lock_timeout = {}", timeout.as_millis().max(1))
}
