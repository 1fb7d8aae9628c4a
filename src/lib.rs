//! Ledger Transfer Engine Library
//! # Overview
//!
//! This library moves money between two accounts of a double-entry ledger as
//! one atomic storage transaction, and ships a batch CLI that replays a file
//! of transfer requests with either an in-order or a concurrent strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Transfer, Entry, errors)
//! - [`core`] - Business logic components:
//!   - [`core::store`] - Transactional in-process store with per-row locks
//!   - [`core::validator`] - Lock-free account checks before a transfer
//!   - [`core::transfer_tx`] - Transfer orchestration and lock ordering
//! - [`api`] - Framework-agnostic transfer endpoint
//! - [`io`] - CSV input and output
//! - [`strategy`] - Batch processing pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Transfer Semantics
//!
//! A successful transfer of `amount` from account A to account B commits,
//! in one transaction, a transfer record, a debit entry of `-amount` on A, a
//! credit entry of `+amount` on B, and the two balance updates. A failed
//! transfer commits nothing.
//!
//! Row locks are always taken lower account id first, so concurrent
//! transfers in opposite directions over the same pair cannot deadlock.

pub mod api;
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use api::{TransferExchange, TransferService};
pub use crate::core::{lock_order, EngineConfig, LedgerStore, TransferTx};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, Currency, Entry, LedgerError, Transfer, TransferResult, TransferTxParams,
};
