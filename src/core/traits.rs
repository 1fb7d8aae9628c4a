//! Core traits at the storage seam
//!
//! The validator and the transfer orchestrator talk to storage only through
//! these traits. `LedgerStore` and `LedgerTx` implement them for the
//! in-process store; another relational backend would implement the same
//! three traits.

use async_trait::async_trait;

use crate::types::{Account, AccountId, Entry, LedgerError, Transfer};

/// Non-locking, committed-state reads of account rows
///
/// Used by the validator, which must never hold storage resources.
#[async_trait]
pub trait AccountReader: Send + Sync {
    /// Read the committed version of an account
    ///
    /// Fails with `AccountNotFound` if no such account exists.
    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError>;
}

/// Single-row balance operations inside an open transaction
#[async_trait]
pub trait AccountLedger: Send {
    /// Take the exclusive row lock on an account for the rest of the
    /// transaction and return the row as this transaction sees it
    ///
    /// Blocks while another transaction holds the lock.
    async fn lock_account(&mut self, id: AccountId) -> Result<Account, LedgerError>;

    /// Atomically add `delta` to the account balance and return the updated row
    ///
    /// The increment is applied to the latest row version inside the
    /// transaction, so calling it for both legs of a transfer needs no
    /// re-read in between.
    async fn add_balance(&mut self, id: AccountId, delta: i64) -> Result<Account, LedgerError>;
}

/// Append-only inserts of ledger records inside an open transaction
#[async_trait]
pub trait TransferWriter: Send {
    async fn record_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, LedgerError>;

    async fn record_entry(&mut self, account_id: AccountId, amount: i64)
        -> Result<Entry, LedgerError>;
}
