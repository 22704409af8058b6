pub mod amount;
pub mod clock;
pub mod config;
pub mod engine;
pub mod model;
pub mod request;
pub mod store;

pub use amount::Amount;
pub use config::LedgerConfig;
pub use engine::{ClientLedgerState, Ledger, LedgerError};
pub use model::{BalanceSnapshot, ClientId, Entry, Receipt, Side, Transaction, TxId};
pub use store::{LedgerStore, MemoryStore, StoreError};
