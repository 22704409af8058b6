//! Core domain types for the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Amount;
use crate::engine::LedgerError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id!(
    /// Client identifier; owns exactly one ledger.
    ClientId
);

uuid_id!(
    /// Globally unique, caller-supplied transaction identifier.
    TxId
);

/// Direction of an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Increases the balance.
    Debit,
    /// Decreases the balance.
    Credit,
}

/// The monetary effect of a transaction: a side and a strictly positive amount.
///
/// Only the checked constructors (and deserialization, which goes through
/// them) produce an `Entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct Entry {
    kind: Side,
    amount: Amount,
}

#[derive(Deserialize)]
struct RawEntry {
    kind: Side,
    amount: Amount,
}

impl TryFrom<RawEntry> for Entry {
    type Error = LedgerError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Entry::new(raw.kind, raw.amount)
    }
}

impl Entry {
    pub fn new(side: Side, amount: Amount) -> Result<Self, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::MalformedOperation(format!(
                "transaction amount must be positive, got {amount}"
            )));
        }
        Ok(Entry { kind: side, amount })
    }

    pub fn debit(amount: Amount) -> Result<Self, LedgerError> {
        Self::new(Side::Debit, amount)
    }

    pub fn credit(amount: Amount) -> Result<Self, LedgerError> {
        Self::new(Side::Credit, amount)
    }

    /// Build an entry from the two optional fields of an inbound request.
    /// Exactly one of them must be present.
    pub fn from_parts(debit: Option<Amount>, credit: Option<Amount>) -> Result<Self, LedgerError> {
        match (debit, credit) {
            (Some(amount), None) => Self::debit(amount),
            (None, Some(amount)) => Self::credit(amount),
            (None, None) => Err(LedgerError::MalformedOperation(
                "neither debit nor credit amount is specified".to_string(),
            )),
            (Some(_), Some(_)) => Err(LedgerError::MalformedOperation(
                "both debit and credit amounts are specified".to_string(),
            )),
        }
    }

    pub fn side(&self) -> Side {
        self.kind
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Effect on the balance: positive for a debit, negative for a credit.
    pub fn signed_amount(&self) -> Amount {
        match self.kind {
            Side::Debit => self.amount,
            Side::Credit => -self.amount,
        }
    }

    /// The entry that exactly cancels this one.
    pub fn inverse(&self) -> Entry {
        let kind = match self.kind {
            Side::Debit => Side::Credit,
            Side::Credit => Side::Debit,
        };
        Entry {
            kind,
            amount: self.amount,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.kind {
            Side::Debit => "debit",
            Side::Credit => "credit",
        }
    }
}

/// A committed ledger transaction. Immutable apart from `reverted_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TxId,
    pub client_id: ClientId,
    pub effective_time: DateTime<Utc>,
    pub entry: Entry,
    /// Client balance immediately after this transaction.
    pub resulting_balance: Amount,
    /// Server-assigned commit time, strictly increasing per client.
    pub recorded_time: DateTime<Utc>,
    /// Set on compensating transactions: the transaction being reversed.
    pub reverts: Option<TxId>,
    /// Set once, when a compensating transaction reverses this one.
    pub reverted_by: Option<TxId>,
}

impl Transaction {
    pub fn receipt(&self) -> Receipt {
        Receipt {
            recorded_time: self.recorded_time,
            balance: self.resulting_balance,
        }
    }
}

/// Result of an accepted (or replayed) submit or revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub recorded_time: DateTime<Utc>,
    pub balance: Amount,
}

/// Result of a balance lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub as_of_time: DateTime<Utc>,
    pub balance: Amount,
}
