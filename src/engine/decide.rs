//! Pure decision logic: a proposed operation plus the client's current ledger
//! state in, the transaction to commit (or a rejection) out.
//! Nothing here touches the store or awaits.

use chrono::{DateTime, Utc};

use super::{ClientLedgerState, LedgerError};
use crate::Amount;
use crate::clock::strictly_after;
use crate::model::{ClientId, Entry, Receipt, Side, Transaction, TxId};

/// A caller's request to append a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Submission {
    pub client_id: ClientId,
    pub transaction_id: TxId,
    pub effective_time: DateTime<Utc>,
    pub entry: Entry,
}

/// Reject access to `tx` on behalf of a client that does not own it.
pub(crate) fn ensure_owner(tx: &Transaction, client: ClientId) -> Result<(), LedgerError> {
    if tx.client_id == client {
        Ok(())
    } else {
        Err(LedgerError::ClientMismatch {
            tx: tx.transaction_id,
            owner: tx.client_id,
            requested: client,
        })
    }
}

/// Result of re-submitting an already recorded transaction id.
pub(crate) fn replay(existing: &Transaction, client: ClientId) -> Result<Receipt, LedgerError> {
    ensure_owner(existing, client)?;
    Ok(existing.receipt())
}

/// Cached state and last transaction were read separately; they only describe
/// the same ledger if they agree.
pub(crate) fn is_consistent(state: Option<&ClientLedgerState>, last: Option<&Transaction>) -> bool {
    match (state, last) {
        (None, None) => true,
        (Some(state), Some(last)) => {
            state.last_transaction_time == last.recorded_time
                && state.current_balance == last.resulting_balance
        }
        _ => false,
    }
}

fn apply(client: ClientId, balance: Amount, entry: &Entry) -> Result<Amount, LedgerError> {
    balance.checked_add(entry.signed_amount()).ok_or_else(|| {
        LedgerError::MalformedOperation(format!(
            "client {client} balance {balance} cannot absorb {} {}",
            entry.kind(),
            entry.amount()
        ))
    })
}

/// Decide a submission against the client's latest state.
///
/// - amount must be positive and effective time may not be after `now`
/// - effective time must be strictly after the last transaction's
/// - a credit may not exceed the current balance (zero without history)
pub(crate) fn submit(
    submission: &Submission,
    state: Option<&ClientLedgerState>,
    last: Option<&Transaction>,
    now: DateTime<Utc>,
) -> Result<Transaction, LedgerError> {
    let client = submission.client_id;
    let entry = submission.entry;

    if !entry.amount().is_positive() {
        return Err(LedgerError::MalformedOperation(format!(
            "transaction amount must be positive, got {}",
            entry.amount()
        )));
    }
    if submission.effective_time > now {
        return Err(LedgerError::MalformedOperation(format!(
            "effective time {} is in the future",
            submission.effective_time
        )));
    }

    if let Some(last) = last {
        if submission.effective_time <= last.effective_time {
            return Err(LedgerError::OrderingViolation {
                client,
                attempted: submission.effective_time,
                last: last.effective_time,
            });
        }
    }

    let balance = state.map_or(Amount::ZERO, |state| state.current_balance);
    if entry.side() == Side::Credit && entry.amount() > balance {
        return Err(LedgerError::InsufficientFunds {
            client,
            balance,
            requested: entry.amount(),
        });
    }

    Ok(Transaction {
        transaction_id: submission.transaction_id,
        client_id: client,
        effective_time: submission.effective_time,
        entry,
        resulting_balance: apply(client, balance, &entry)?,
        recorded_time: strictly_after(now, state.map(|state| state.last_transaction_time)),
        reverts: None,
        reverted_by: None,
    })
}

/// Build the compensating transaction for `target`.
///
/// The inverse entry is dated now and applied to the current balance. Should
/// the clock have stepped back, the date is kept strictly after the last
/// effective time. It is not funds-checked: the
/// balance may go negative.
pub(crate) fn revert(
    target: &Transaction,
    state: &ClientLedgerState,
    last: Option<&Transaction>,
    compensating_id: TxId,
    now: DateTime<Utc>,
) -> Result<Transaction, LedgerError> {
    let client = state.client_id;
    ensure_owner(target, client)?;

    let entry = target.entry.inverse();
    Ok(Transaction {
        transaction_id: compensating_id,
        client_id: client,
        effective_time: strictly_after(now, last.map(|last| last.effective_time)),
        entry,
        resulting_balance: apply(client, state.current_balance, &entry)?,
        recorded_time: strictly_after(now, Some(state.last_transaction_time)),
        reverts: Some(target.transaction_id),
        reverted_by: None,
    })
}
