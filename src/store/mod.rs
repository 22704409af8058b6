//! Client state store: the durable, serialized-access record of each client's
//! transactions and cached balance.
//!
//! Every [`LedgerStore::commit`] is a single all-or-nothing unit guarded by the
//! client's state version, so a writer that decided on stale state loses with
//! [`StoreError::Conflict`] instead of overwriting a concurrent update.

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::ClientLedgerState;
use crate::model::{ClientId, Transaction, TxId};

mod memory;
pub use memory::MemoryStore;

/// Errors reported by a [`LedgerStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("client {client} state is at version {actual:?}, expected {expected:?}")]
    Conflict {
        client: ClientId,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("transaction {0} already exists")]
    DuplicateTransaction(TxId),

    #[error("transaction {0} is already reverted")]
    AlreadyReverted(TxId),

    #[error("inconsistent ledger data: {0}")]
    Inconsistent(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One atomic write: a new transaction plus the client state derived from it.
#[derive(Debug, Clone)]
pub struct Commit {
    /// Version of the client state the decision was made on; `None` for a
    /// client without history.
    pub expected_version: Option<u64>,
    /// The transaction to append. When `reverts` is set, the target's
    /// `reverted_by` is set in the same unit.
    pub transaction: Transaction,
}

/// Storage collaborator required by the [`Ledger`](crate::Ledger).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Cached state of a client, `None` when it has no transactions.
    async fn client_state(&self, client: ClientId) -> Result<Option<ClientLedgerState>, StoreError>;

    /// Most recently recorded transaction of a client.
    async fn last_transaction(&self, client: ClientId) -> Result<Option<Transaction>, StoreError>;

    /// Look up a transaction by its caller-supplied id.
    async fn transaction(&self, tx: TxId) -> Result<Option<Transaction>, StoreError>;

    /// All transactions of a client in recorded order.
    async fn history(&self, client: ClientId) -> Result<Vec<Transaction>, StoreError>;

    /// Atomically append a transaction and update the cached client state.
    ///
    /// Fails without any effect when the client's version differs from
    /// `expected_version`, when the transaction id is already taken, or when
    /// the reverted target is missing or already reverted.
    async fn commit(&self, commit: Commit) -> Result<ClientLedgerState, StoreError>;
}

#[async_trait]
impl<S: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<S> {
    async fn client_state(&self, client: ClientId) -> Result<Option<ClientLedgerState>, StoreError> {
        (**self).client_state(client).await
    }

    async fn last_transaction(&self, client: ClientId) -> Result<Option<Transaction>, StoreError> {
        (**self).last_transaction(client).await
    }

    async fn transaction(&self, tx: TxId) -> Result<Option<Transaction>, StoreError> {
        (**self).transaction(tx).await
    }

    async fn history(&self, client: ClientId) -> Result<Vec<Transaction>, StoreError> {
        (**self).history(client).await
    }

    async fn commit(&self, commit: Commit) -> Result<ClientLedgerState, StoreError> {
        (**self).commit(commit).await
    }
}
