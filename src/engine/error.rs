//! Error types for ledger operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::Amount;
use crate::model::{ClientId, TxId};
use crate::store::StoreError;

/// Error returned by [`Ledger`](super::Ledger) operations.
///
/// Every variant leaves the client's history and cached balance untouched.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("client {0} not found")]
    ClientNotFound(ClientId),

    #[error("transaction {0} not found")]
    TransactionNotFound(TxId),

    #[error(
        "client {client} has more recent transactions: effective time {attempted} is not after {last}"
    )]
    OrderingViolation {
        client: ClientId,
        attempted: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    #[error("insufficient funds for client {client}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        client: ClientId,
        balance: Amount,
        requested: Amount,
    },

    #[error("malformed operation: {0}")]
    MalformedOperation(String),

    #[error("transaction {tx} belongs to client {owner}, not {requested}")]
    ClientMismatch {
        tx: TxId,
        owner: ClientId,
        requested: ClientId,
    },

    #[error("client {client} balance changed concurrently after {attempts} attempts, please retry")]
    ConcurrencyConflict { client: ClientId, attempts: u32 },

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Stable machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::ClientNotFound(_) | LedgerError::TransactionNotFound(_) => "not_found",
            LedgerError::OrderingViolation { .. } => "ordering_violation",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::MalformedOperation(_) => "malformed_operation",
            LedgerError::ClientMismatch { .. } => "client_mismatch",
            LedgerError::ConcurrencyConflict { .. } => "concurrency_conflict",
            LedgerError::Store(_) => "persistence_failure",
        }
    }
}
