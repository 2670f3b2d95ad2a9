use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, PoisonError, RwLock},
};

use tokio::sync::Mutex;
use tracing::debug;

use crate::wallet::{BalancePrecision, Wallet, WalletId};

use super::{LedgerStore, MutationError, StoreError};

/// Stand-in for a database row: an exclusive lock for writers plus the
/// last committed state, which readers see without taking the lock.
#[derive(Debug)]
struct Row {
    lock: Mutex<()>,
    committed: RwLock<Wallet>,
}

/// Process-local [`LedgerStore`], one async mutex per wallet.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    rows: RwLock<HashMap<WalletId, Arc<Row>>>,
    precision: BalancePrecision,
}

impl InMemoryLedgerStore {
    pub fn with_precision(precision: BalancePrecision) -> Self {
        Self {
            rows: RwLock::default(),
            precision,
        }
    }

    fn row(&self, id: WalletId) -> Option<Arc<Row>> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn precision(&self) -> BalancePrecision {
        self.precision
    }

    async fn create(&self, wallet: Wallet) -> Result<Wallet, StoreError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.entry(wallet.id()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateIdentifier(wallet.id())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Row {
                    lock: Mutex::new(()),
                    committed: RwLock::new(wallet.clone()),
                }));
                Ok(wallet)
            }
        }
    }

    async fn get_by_id(&self, id: WalletId) -> Result<Wallet, StoreError> {
        let row = self.row(id).ok_or(StoreError::NotFound(id))?;
        let wallet = row
            .committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(wallet)
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
        let row = self.row(id).ok_or(StoreError::NotFound(id))?;
        // the only suspension point; past it the section runs to completion
        let _guard = row.lock.lock().await;
        debug!(wallet_id = %id, "row lock acquired");

        let mut wallet = row
            .committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Err(err) = mutation(&mut wallet) {
            debug!(wallet_id = %id, "mutation rejected, nothing written");
            return Err(MutationError::Rejected(err));
        }
        *row.committed.write().unwrap_or_else(PoisonError::into_inner) = wallet.clone();
        debug!(wallet_id = %id, balance = %wallet.balance(), "mutation committed");
        Ok(wallet)
    }
}
