//! Core business logic module
//!
//! This module contains the transfer engine components:
//! - `traits` - Storage seam (account reads, ledger repository, record writer)
//! - `store` - Transactional in-process store with per-row locks
//! - `ledger_tx` - Storage transaction implementing the repository and writer
//! - `validator` - Lock-free pre-transfer account checks
//! - `transfer_tx` - Transfer orchestration with deterministic lock ordering

pub mod ledger_tx;
pub mod store;
pub mod traits;
pub mod transfer_tx;
pub mod validator;

pub use ledger_tx::LedgerTx;
pub use store::LedgerStore;
pub use traits::{AccountLedger, AccountReader, TransferWriter};
pub use transfer_tx::{lock_order, EngineConfig, TransferTx};
pub use validator::{validate_account, validate_transfer};
