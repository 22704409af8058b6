use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use std::collections::HashMap;

use super::{Commit, LedgerStore, StoreError};
use crate::engine::ClientLedgerState;
use crate::model::{ClientId, Transaction, TxId};

/// In-process [`LedgerStore`].
///
/// Each client owns a shard, so commits for different clients rarely
/// contend; a global index maps transaction ids to their owner and enforces
/// id uniqueness across clients. A client's shard exists only once its first
/// commit has succeeded.
#[derive(Debug, Default)]
pub struct MemoryStore {
    shards: DashMap<ClientId, ClientShard>,
    index: DashMap<TxId, ClientId>,
}

#[derive(Debug, Default)]
struct ClientShard {
    state: Option<ClientLedgerState>,
    /// Transactions in recorded order; the position is the row key.
    rows: Vec<Transaction>,
    positions: HashMap<TxId, usize>,
}

impl ClientShard {
    fn get(&self, tx: &TxId) -> Option<&Transaction> {
        self.positions.get(tx).map(|&pos| &self.rows[pos])
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transactions across all clients.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of clients with at least one transaction.
    pub fn client_count(&self) -> usize {
        self.shards.len()
    }

    fn apply(&self, commit: Commit) -> Result<ClientLedgerState, StoreError> {
        let client = commit.transaction.client_id;
        // the shard entry stays locked for the whole commit
        match self.shards.entry(client) {
            MapEntry::Occupied(mut occupied) => self.apply_to(occupied.get_mut(), commit),
            MapEntry::Vacant(vacant) => {
                let mut shard = ClientShard::default();
                let state = self.apply_to(&mut shard, commit)?;
                vacant.insert(shard);
                Ok(state)
            }
        }
    }

    fn apply_to(&self, shard: &mut ClientShard, commit: Commit) -> Result<ClientLedgerState, StoreError> {
        let Commit {
            expected_version,
            transaction,
        } = commit;
        let client = transaction.client_id;

        // all checks first: nothing below the index insert can fail
        let actual = shard.state.as_ref().map(|state| state.version);
        if actual != expected_version {
            return Err(StoreError::Conflict {
                client,
                expected: expected_version,
                actual,
            });
        }

        let target_pos = match transaction.reverts {
            Some(target) => {
                let pos = *shard.positions.get(&target).ok_or_else(|| {
                    StoreError::Inconsistent(format!(
                        "reverted transaction {target} is not in client {client} ledger"
                    ))
                })?;
                if shard.rows[pos].reverted_by.is_some() {
                    return Err(StoreError::AlreadyReverted(target));
                }
                Some(pos)
            }
            None => None,
        };

        match self.index.entry(transaction.transaction_id) {
            MapEntry::Occupied(_) => {
                return Err(StoreError::DuplicateTransaction(transaction.transaction_id));
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(client);
            }
        }

        if let Some(pos) = target_pos {
            shard.rows[pos].reverted_by = Some(transaction.transaction_id);
        }

        let state = ClientLedgerState::after(shard.state.as_ref(), &transaction);
        shard.positions.insert(transaction.transaction_id, shard.rows.len());
        shard.rows.push(transaction);
        shard.state = Some(state.clone());

        Ok(state)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn client_state(&self, client: ClientId) -> Result<Option<ClientLedgerState>, StoreError> {
        Ok(self.shards.get(&client).and_then(|shard| shard.state.clone()))
    }

    async fn last_transaction(&self, client: ClientId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.shards.get(&client).and_then(|shard| shard.rows.last().cloned()))
    }

    async fn transaction(&self, tx: TxId) -> Result<Option<Transaction>, StoreError> {
        // copy the owner out so the index entry is released before the shard lookup
        let Some(owner) = self.index.get(&tx).map(|owner| *owner) else {
            return Ok(None);
        };
        let shard = self.shards.get(&owner).ok_or_else(|| {
            StoreError::Inconsistent(format!("transaction {tx} indexed under missing client {owner}"))
        })?;
        Ok(shard.get(&tx).cloned())
    }

    async fn history(&self, client: ClientId) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .shards
            .get(&client)
            .map(|shard| shard.rows.clone())
            .unwrap_or_default())
    }

    async fn commit(&self, commit: Commit) -> Result<ClientLedgerState, StoreError> {
        self.apply(commit)
    }
}
