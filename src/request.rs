use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;

use crate::engine::LedgerError;
use crate::{Amount, BalanceSnapshot, ClientId, Receipt, TxId};

/// Errors that can occur when reading requests or writing responses.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("line {line}: failed to parse request: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write response: {0}")]
    Io(#[from] io::Error),
}

/// One inbound operation, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Exactly one of `debit` and `credit` must be set.
    Submit {
        client: ClientId,
        tx: TxId,
        time: DateTime<Utc>,
        debit: Option<Amount>,
        credit: Option<Amount>,
    },
    Revert {
        client: ClientId,
        tx: TxId,
    },
    Balance {
        client: ClientId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Recorded {
        recorded_time: DateTime<Utc>,
        balance: Amount,
    },
    Balance {
        as_of_time: DateTime<Utc>,
        balance: Amount,
    },
    Rejected {
        kind: String,
        message: String,
    },
}

impl From<Receipt> for Response {
    fn from(receipt: Receipt) -> Self {
        Response::Recorded {
            recorded_time: receipt.recorded_time,
            balance: receipt.balance,
        }
    }
}

impl From<BalanceSnapshot> for Response {
    fn from(snapshot: BalanceSnapshot) -> Self {
        Response::Balance {
            as_of_time: snapshot.as_of_time,
            balance: snapshot.balance,
        }
    }
}

impl From<&LedgerError> for Response {
    fn from(error: &LedgerError) -> Self {
        Response::Rejected {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Parse one request line; `line` is 1-indexed and only used for error reporting.
pub fn parse_line(line: usize, text: &str) -> Result<Request, RequestError> {
    serde_json::from_str(text).map_err(|source| RequestError::Parse { line, source })
}

/// Write a response as a single JSON line and flush.
pub fn write_response(mut writer: impl Write, response: &Response) -> Result<(), RequestError> {
    serde_json::to_writer(&mut writer, response)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
