//! Storage transaction over the ledger store
//!
//! A `LedgerTx` is the isolation boundary of one transfer. It implements the
//! account ledger repository (`lock_account`, `add_balance`) and the transfer
//! record writer (`record_transfer`, `record_entry`).
//!
//! Row locks taken by the transaction are held until it ends. Balance updates
//! and inserts are staged in the transaction and become visible only when
//! [`LedgerTx::commit`] publishes them. A transaction that is dropped without
//! committing, including one whose future was cancelled mid-flight, is rolled
//! back: staged writes are discarded and the locks released.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::store::{CommitSet, LedgerStore};
use super::traits::{AccountLedger, TransferWriter};
use crate::types::{Account, AccountId, Entry, LedgerError, Transfer, TransferResult};

/// An open storage transaction
#[derive(Debug)]
pub struct LedgerTx {
    id: u64,
    store: Arc<LedgerStore>,

    /// Row locks held by this transaction
    row_guards: HashMap<AccountId, OwnedMutexGuard<()>>,

    /// Idempotency key and its lock, taken before any row lock
    key_guard: Option<(String, OwnedMutexGuard<()>)>,

    /// Row versions written by this transaction
    written: HashMap<AccountId, Account>,

    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
    replay: Option<(String, TransferResult)>,

    finished: bool,
}

impl LedgerTx {
    pub(crate) fn new(id: u64, store: Arc<LedgerStore>) -> Self {
        Self {
            id,
            store,
            row_guards: HashMap::new(),
            key_guard: None,
            written: HashMap::new(),
            transfers: Vec::new(),
            entries: Vec::new(),
            replay: None,
            finished: false,
        }
    }

    /// Transaction serial number, for logging
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this transaction currently holds the row lock of `id`
    pub fn holds_lock(&self, id: AccountId) -> bool {
        self.row_guards.contains_key(&id)
    }

    /// Take the exclusive lock of an idempotency key and return the result
    /// already committed under it, if any
    ///
    /// Must be called before any row lock is taken so that every transaction
    /// acquires key and row locks in the same global order.
    pub async fn lock_request_key(
        &mut self,
        key: &str,
    ) -> Result<Option<TransferResult>, LedgerError> {
        if !self.row_guards.is_empty() {
            return Err(LedgerError::storage(
                "idempotency key must be locked before any account row",
            ));
        }
        if self.key_guard.is_none() {
            let guard = self.store.key_lock(key).lock_owned().await;
            debug!(tx = self.id, key, "idempotency key locked");
            self.key_guard = Some((key.to_string(), guard));
        }
        Ok(self.store.replay(key))
    }

    /// Stage the result to be stored under `key` at commit
    pub fn remember_result(&mut self, key: String, result: TransferResult) {
        self.replay = Some((key, result));
    }

    /// Publish every staged write, then release all locks
    ///
    /// Contains no suspension point: once called, the commit either happens
    /// in full or not at all.
    pub fn commit(mut self) -> Result<(), LedgerError> {
        let set = CommitSet {
            rows: std::mem::take(&mut self.written),
            transfers: std::mem::take(&mut self.transfers),
            entries: std::mem::take(&mut self.entries),
            replay: self.replay.take(),
        };

        // Every written row must still be locked by us
        if let Some(id) = set.rows.keys().find(|id| !self.row_guards.contains_key(*id)) {
            return Err(LedgerError::storage(format!(
                "row {} written without holding its lock",
                id
            )));
        }

        self.store.apply(set);
        self.finished = true;
        debug!(tx = self.id, rows = self.row_guards.len(), "transaction committed");
        Ok(())
    }

    /// Discard every staged write and release all locks
    pub fn rollback(mut self) {
        self.finished = true;
        debug!(tx = self.id, "transaction rolled back");
    }

    fn current_row(&self, id: AccountId) -> Option<Account> {
        self.written
            .get(&id)
            .cloned()
            .or_else(|| self.store.find_account(id))
    }
}

impl Drop for LedgerTx {
    fn drop(&mut self) {
        if !self.finished && (!self.row_guards.is_empty() || self.key_guard.is_some()) {
            debug!(tx = self.id, "transaction dropped before commit, rolled back");
        }
        if let Some((key, guard)) = self.key_guard.take() {
            drop(guard);
            self.store.prune_key_lock(&key);
        }
    }
}

#[async_trait]
impl AccountLedger for LedgerTx {
    async fn lock_account(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        if !self.row_guards.contains_key(&id) {
            let lock = self
                .store
                .row_lock(id)
                .ok_or_else(|| LedgerError::account_not_found(id))?;
            let guard = lock.lock_owned().await;
            debug!(tx = self.id, account = id, "row lock acquired");
            self.row_guards.insert(id, guard);
        }

        self.current_row(id)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    async fn add_balance(&mut self, id: AccountId, delta: i64) -> Result<Account, LedgerError> {
        // An update locks the row implicitly
        let current = self.lock_account(id).await?;

        let balance = current
            .balance
            .checked_add(delta)
            .ok_or(LedgerError::ArithmeticOverflow { account: id })?;
        if delta < 0 && balance < 0 {
            return Err(LedgerError::insufficient_funds(
                id,
                current.balance,
                delta.saturating_neg(),
            ));
        }

        let updated = Account { balance, ..current };
        self.written.insert(id, updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl TransferWriter for LedgerTx {
    async fn record_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, LedgerError> {
        let transfer = Transfer {
            id: self.store.next_transfer_id(),
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn record_entry(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, LedgerError> {
        let entry = Entry {
            id: self.store.next_entry_id(),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }
}
