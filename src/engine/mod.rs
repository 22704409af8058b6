//! Ledger engine.
//!
//! Validates submissions and reversals against the client's last recorded
//! state and commits the resulting transaction through a [`LedgerStore`].
//! Operations for one client are linearized by a per-client lock and every
//! commit is version-checked, so a read-decide-write cycle never acts on a
//! stale balance. Operations for different clients run in parallel.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::Amount;
use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::model::{BalanceSnapshot, ClientId, Entry, Receipt, Transaction, TxId};
use crate::request::{Request, Response};
use crate::store::{Commit, LedgerStore, StoreError};

mod decide;
use decide::Submission;

mod locks;
use locks::ClientLocks;

mod state;
pub use state::ClientLedgerState;

mod error;
pub use error::LedgerError;

/// The ledger engine. Stateless between calls apart from the store it owns.
pub struct Ledger<S, C = SystemClock> {
    store: S,
    clock: C,
    config: LedgerConfig,
    locks: ClientLocks,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

/// Public API
impl<S: LedgerStore, C: Clock> Ledger<S, C> {
    pub fn with_clock(store: S, clock: C, config: LedgerConfig) -> Self {
        Self {
            store,
            clock,
            config,
            locks: ClientLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append a debit or credit to the client's ledger.
    ///
    /// Re-submitting a recorded `transaction_id` returns the recorded result
    /// without any further effect.
    pub async fn submit(
        &self,
        client_id: ClientId,
        transaction_id: TxId,
        effective_time: DateTime<Utc>,
        entry: Entry,
    ) -> Result<Receipt, LedgerError> {
        let submission = Submission {
            client_id,
            transaction_id,
            effective_time,
            entry,
        };
        let result = self.try_submit(&submission).await;
        Self::log_result(entry.kind(), client_id, transaction_id, Some(entry.amount()), &result);
        result
    }

    /// Reverse a transaction with a compensating entry dated now.
    ///
    /// Reverting an already reverted transaction returns the existing
    /// compensating transaction's result.
    pub async fn revert(&self, transaction_id: TxId, client_id: ClientId) -> Result<Receipt, LedgerError> {
        let result = self.try_revert(transaction_id, client_id).await;
        Self::log_result("revert", client_id, transaction_id, None, &result);
        result
    }

    /// Current balance of a client and the time it was last changed.
    pub async fn get_balance(&self, client_id: ClientId) -> Result<BalanceSnapshot, LedgerError> {
        self.store
            .client_state(client_id)
            .await?
            .map(|state| state.snapshot())
            .ok_or(LedgerError::ClientNotFound(client_id))
    }

    /// Look up a single recorded transaction.
    pub async fn transaction(&self, transaction_id: TxId) -> Result<Transaction, LedgerError> {
        self.store
            .transaction(transaction_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))
    }

    /// All transactions of a client in recorded order.
    pub async fn history(&self, client_id: ClientId) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.store.history(client_id).await?)
    }

    /// Answer a single driver request.
    pub async fn handle(&self, request: Request) -> Response {
        let result = match request {
            Request::Submit {
                client,
                tx,
                time,
                debit,
                credit,
            } => match Entry::from_parts(debit, credit) {
                Ok(entry) => self.submit(client, tx, time, entry).await.map(Response::from),
                Err(e) => {
                    info!(client = %client, tx = %tx, reason = %e, "submit rejected");
                    Err(e)
                }
            },
            Request::Revert { client, tx } => self.revert(tx, client).await.map(Response::from),
            Request::Balance { client } => self.get_balance(client).await.map(Response::from),
        };
        result.unwrap_or_else(|e| Response::from(&e))
    }

    /// Run the engine over a request stream, sending one response per request.
    /// A rejected request never stops the loop; a closed response channel does.
    pub async fn run(
        &self,
        mut requests: impl Stream<Item = Request> + Unpin,
        responses: mpsc::Sender<Response>,
    ) {
        while let Some(request) = requests.next().await {
            let response = self.handle(request).await;
            if responses.send(response).await.is_err() {
                warn!("response channel closed, stopping");
                break;
            }
        }
    }
}

/// Private API
impl<S: LedgerStore, C: Clock> Ledger<S, C> {
    /// Small helper to log operation results
    fn log_result<T>(
        op: &str,
        client: ClientId,
        tx: TxId,
        amount: Option<Amount>,
        result: &Result<T, LedgerError>,
    ) {
        match (result, amount) {
            (Ok(_), Some(amt)) => {
                info!(client = %client, tx = %tx, amount = %amt, "{op} recorded");
            }
            (Ok(_), None) => {
                info!(client = %client, tx = %tx, "{op} recorded");
            }
            (Err(e), Some(amt)) => {
                info!(client = %client, tx = %tx, amount = %amt, reason = %e, "{op} rejected");
            }
            (Err(e), None) => {
                info!(client = %client, tx = %tx, reason = %e, "{op} rejected");
            }
        }
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_conflict_retries.saturating_add(1)
    }

    /// Read the client's cached state and last transaction.
    /// `None` when the two reads straddled a concurrent commit.
    async fn read_client(
        &self,
        client: ClientId,
    ) -> Result<Option<(Option<ClientLedgerState>, Option<Transaction>)>, LedgerError> {
        // state first: a commit landing in between shows up as a mismatch here
        // or as a version conflict at commit time
        let state = self.store.client_state(client).await?;
        let last = self.store.last_transaction(client).await?;
        if decide::is_consistent(state.as_ref(), last.as_ref()) {
            Ok(Some((state, last)))
        } else {
            Ok(None)
        }
    }

    /// `Submit`:
    /// - Return the recorded result if the transaction id is known
    /// - Decide against the latest state (ordering, funds)
    /// - Commit guarded by the state version, re-deciding on a lost race
    async fn try_submit(&self, submission: &Submission) -> Result<Receipt, LedgerError> {
        let client = submission.client_id;
        let tx = submission.transaction_id;
        let _guard = self.locks.lock(client).await;

        let attempts = self.max_attempts();
        for attempt in 1..=attempts {
            if let Some(existing) = self.store.transaction(tx).await? {
                let receipt = decide::replay(&existing, client)?;
                if existing.entry != submission.entry
                    || existing.effective_time != submission.effective_time
                {
                    warn!(
                        client = %client,
                        tx = %tx,
                        "transaction id resubmitted with a different payload, returning recorded result"
                    );
                }
                debug!(client = %client, tx = %tx, "submit replayed");
                return Ok(receipt);
            }

            let Some((state, last)) = self.read_client(client).await? else {
                warn!(client = %client, attempt, "client state moved while reading, retrying");
                continue;
            };

            let transaction =
                decide::submit(submission, state.as_ref(), last.as_ref(), self.clock.now())?;
            let receipt = transaction.receipt();
            let commit = Commit {
                expected_version: state.map(|state| state.version),
                transaction,
            };

            match self.store.commit(commit).await {
                Ok(_) => return Ok(receipt),
                Err(e @ (StoreError::Conflict { .. } | StoreError::DuplicateTransaction(_))) => {
                    warn!(client = %client, tx = %tx, attempt, reason = %e, "commit lost a race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::ConcurrencyConflict { client, attempts })
    }

    /// `Revert`:
    /// - Find the target and validate client ownership
    /// - Return the compensating transaction's result if already reverted
    /// - Commit the inverse entry and the target's `reverted_by` as one unit
    async fn try_revert(&self, tx: TxId, client: ClientId) -> Result<Receipt, LedgerError> {
        let _guard = self.locks.lock(client).await;

        let attempts = self.max_attempts();
        for attempt in 1..=attempts {
            let target = self
                .store
                .transaction(tx)
                .await?
                .ok_or(LedgerError::TransactionNotFound(tx))?;
            decide::ensure_owner(&target, client)?;

            if let Some(compensating_id) = target.reverted_by {
                let compensating = self.store.transaction(compensating_id).await?.ok_or_else(|| {
                    StoreError::Inconsistent(format!(
                        "transaction {tx} is reverted by missing transaction {compensating_id}"
                    ))
                })?;
                debug!(client = %client, tx = %tx, by = %compensating_id, "revert replayed");
                return Ok(compensating.receipt());
            }

            let Some((state, last)) = self.read_client(client).await? else {
                warn!(client = %client, attempt, "client state moved while reading, retrying");
                continue;
            };
            let state = state.ok_or(LedgerError::ClientNotFound(client))?;

            let compensating =
                decide::revert(&target, &state, last.as_ref(), TxId::new_v4(), self.clock.now())?;
            let receipt = compensating.receipt();
            let commit = Commit {
                expected_version: Some(state.version),
                transaction: compensating,
            };

            match self.store.commit(commit).await {
                Ok(_) => return Ok(receipt),
                Err(
                    e @ (StoreError::Conflict { .. }
                    | StoreError::AlreadyReverted(_)
                    | StoreError::DuplicateTransaction(_)),
                ) => {
                    warn!(client = %client, tx = %tx, attempt, reason = %e, "commit lost a race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::ConcurrencyConflict { client, attempts })
    }
}

impl Default for Ledger<crate::store::MemoryStore> {
    fn default() -> Self {
        Self::new(crate::store::MemoryStore::new())
    }
}
