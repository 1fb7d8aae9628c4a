//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account rows and currencies
//! - `transfer`: Transfers, entries and the composite transfer result
//! - `error`: Error types for the ledger

pub mod account;
pub mod error;
pub mod transfer;

pub use account::{Account, AccountId, Currency};
pub use error::{ErrorKind, LedgerError};
pub use transfer::{Entry, EntryId, Transfer, TransferId, TransferResult, TransferTxParams};
