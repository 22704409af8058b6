use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Amount;
use crate::model::{BalanceSnapshot, ClientId, Transaction};

/// Cached view of a client's ledger: always equal to the latest transaction's
/// balance and recorded time.
/// `version` is bumped on every commit and guards optimistic writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientLedgerState {
    pub client_id: ClientId,
    pub current_balance: Amount,
    pub last_transaction_time: DateTime<Utc>,
    pub version: u64,
}

impl ClientLedgerState {
    /// State after committing `tx` on top of `previous` (`None` for a new client).
    pub fn after(previous: Option<&ClientLedgerState>, tx: &Transaction) -> Self {
        Self {
            client_id: tx.client_id,
            current_balance: tx.resulting_balance,
            last_transaction_time: tx.recorded_time,
            version: previous.map_or(1, |state| state.version + 1),
        }
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            as_of_time: self.last_transaction_time,
            balance: self.current_balance,
        }
    }
}
