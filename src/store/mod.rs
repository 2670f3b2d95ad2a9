use std::{error::Error as StdError, future::Future};

use thiserror::Error;

use crate::wallet::{BalancePrecision, Wallet, WalletId};

pub mod in_memory;
pub mod postgres;

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Wallet {0} not found")]
    NotFound(WalletId),
    #[error("Wallet {0} already exists")]
    DuplicateIdentifier(WalletId),
    #[error("Storage backend failed to {context}")]
    Backend {
        context: &'static str,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn backend(context: &'static str, source: impl Into<BoxError>) -> Self {
        StoreError::Backend {
            context,
            source: source.into(),
        }
    }
}

/// Failure of [`LedgerStore::mutate_under_lock`].
///
/// `Rejected` carries the mutation's own error unchanged; in that case
/// nothing was written.
#[derive(Debug)]
pub enum MutationError<E> {
    Store(StoreError),
    Rejected(E),
}

impl<E> From<StoreError> for MutationError<E> {
    fn from(value: StoreError) -> Self {
        MutationError::Store(value)
    }
}

/// Durable wallet storage.
///
/// [`LedgerStore::mutate_under_lock`] is the only way to change a balance.
/// Calls for the same wallet are serialized by the backend; calls for
/// different wallets never wait on each other.
pub trait LedgerStore: Send + Sync {
    /// Column shape every balance written by this store must fit.
    fn precision(&self) -> BalancePrecision;

    fn create(&self, wallet: Wallet) -> impl Future<Output = Result<Wallet, StoreError>> + Send;

    /// Unlocked read. The result may already be stale when it is returned and
    /// must not be used to decide a mutation.
    fn get_by_id(&self, id: WalletId)
    -> impl Future<Output = Result<Wallet, StoreError>> + Send;

    /// Locks the wallet row, runs `mutation` on a copy of it and persists the
    /// copy only when `mutation` succeeds.
    ///
    /// Dropping the returned future before it completes leaves the stored
    /// wallet untouched.
    fn mutate_under_lock<F, E>(
        &self,
        id: WalletId,
        mutation: F,
    ) -> impl Future<Output = Result<Wallet, MutationError<E>>> + Send
    where
        F: FnOnce(&mut Wallet) -> Result<(), E> + Send,
        E: Send;
}
