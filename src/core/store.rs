//! In-process transactional ledger store
//!
//! This module provides the `LedgerStore` struct, the storage layer the
//! transfer orchestrator runs on. It holds the committed tables (accounts,
//! transfers, entries) and the per-row locks that transactions acquire.
//!
//! # Design
//!
//! Committed rows live in `DashMap`s, so non-locking readers (the account
//! validator, output generation) never wait on writers and always see the
//! last committed version of a row.
//!
//! Every account row also has an exclusive lock (`tokio::sync::Mutex<()>`).
//! A `LedgerTx` acquires it with an owned guard and keeps it until commit or
//! rollback, which gives the "SELECT ... FOR UPDATE" semantics the
//! orchestrator's lock-ordering rule is built on. Waiting for a row lock is
//! the only point where a transfer suspends.
//!
//! # Isolation
//!
//! Writes made inside a transaction are staged in the `LedgerTx` and
//! published at commit while all of its row locks are still held. The
//! publish runs under the write side of a commit gate and every snapshot
//! reader takes the read side, so a reader sees either none or all of a
//! transaction's rows and records.
//!
//! # Identifiers
//!
//! Account, transfer and entry identifiers come from per-table sequences
//! starting at 1. Identifiers drawn by a transaction that later rolls back are
//! not reused.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::ledger_tx::LedgerTx;
use super::traits::AccountReader;
use crate::types::{
    Account, AccountId, Currency, Entry, EntryId, LedgerError, Transfer, TransferId,
    TransferResult,
};

/// Thread-safe transactional store for accounts and ledger records
///
/// Shared between tasks as `Arc<LedgerStore>`; transactions are opened with
/// [`LedgerStore::begin`].
#[derive(Debug, Default)]
pub struct LedgerStore {
    /// Committed account rows
    accounts: DashMap<AccountId, Account>,

    /// Exclusive row lock per account
    row_locks: DashMap<AccountId, Arc<Mutex<()>>>,

    transfers: DashMap<TransferId, Transfer>,
    entries: DashMap<EntryId, Entry>,

    /// Committed results keyed by client idempotency key
    replays: DashMap<String, TransferResult>,

    /// Exclusive lock per idempotency key, present only while in use
    key_locks: DashMap<String, Arc<Mutex<()>>>,

    /// Held for writing while a commit is published, for reading while a
    /// snapshot is taken
    commit_gate: RwLock<()>,

    account_seq: AtomicI64,
    transfer_seq: AtomicI64,
    entry_seq: AtomicI64,
    tx_seq: AtomicU64,
}

/// Everything a transaction publishes when it commits
#[derive(Debug, Default)]
pub(crate) struct CommitSet {
    pub rows: HashMap<AccountId, Account>,
    pub transfers: Vec<Transfer>,
    pub entries: Vec<Entry>,
    pub replay: Option<(String, TransferResult)>,
}

impl LedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new account with the next identifier
    ///
    /// Seeding operation; the opening balance must not be negative.
    pub fn create_account(
        &self,
        owner: impl Into<String>,
        currency: Currency,
        balance: i64,
    ) -> Result<Account, LedgerError> {
        if balance < 0 {
            return Err(LedgerError::invalid_request(format!(
                "opening balance {} must not be negative",
                balance
            )));
        }

        let id = self.account_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let account = Account::new(id, owner, currency, balance);

        let _gate = self.write_gate();
        self.row_locks.insert(id, Arc::new(Mutex::new(())));
        self.accounts.insert(id, account.clone());

        debug!(account = id, owner = %account.owner, %currency, balance, "account created");
        Ok(account)
    }

    /// Open a new transaction
    pub fn begin(self: &Arc<Self>) -> LedgerTx {
        let tx_id = self.tx_seq.fetch_add(1, Ordering::Relaxed) + 1;
        LedgerTx::new(tx_id, Arc::clone(self))
    }

    /// Committed version of an account, if it exists
    pub fn find_account(&self, id: AccountId) -> Option<Account> {
        let _gate = self.read_gate();
        self.accounts.get(&id).map(|row| row.value().clone())
    }

    /// All committed accounts, sorted by identifier
    pub fn accounts(&self) -> Vec<Account> {
        let _gate = self.read_gate();
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|row| row.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    /// A committed transfer by identifier
    pub fn transfer(&self, id: TransferId) -> Option<Transfer> {
        let _gate = self.read_gate();
        self.transfers.get(&id).map(|row| row.value().clone())
    }

    /// All committed transfers, sorted by identifier
    pub fn transfers(&self) -> Vec<Transfer> {
        let _gate = self.read_gate();
        let mut transfers: Vec<Transfer> = self
            .transfers
            .iter()
            .map(|row| row.value().clone())
            .collect();
        transfers.sort_by_key(|transfer| transfer.id);
        transfers
    }

    /// Committed entries of one account, oldest first
    pub fn entries_for_account(&self, account_id: AccountId) -> Vec<Entry> {
        let _gate = self.read_gate();
        let mut entries: Vec<Entry> = self
            .entries
            .iter()
            .filter(|row| row.value().account_id == account_id)
            .map(|row| row.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.id);
        entries
    }

    /// Number of committed entries across all accounts
    pub fn entry_count(&self) -> usize {
        let _gate = self.read_gate();
        self.entries.len()
    }

    // The gate guards no data of its own, so a poisoned gate is still usable
    fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.commit_gate
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.commit_gate
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn row_lock(&self, id: AccountId) -> Option<Arc<Mutex<()>>> {
        // Clone the Arc so no map guard is held across the lock await
        self.row_locks.get(&id).map(|lock| Arc::clone(lock.value()))
    }

    pub(crate) fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let lock = self
            .key_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(lock.value())
    }

    /// Drop the lock of `key` once no transaction holds or waits for it
    ///
    /// The check runs under the map's shard lock, which `key_lock` also
    /// takes before handing out a clone.
    pub(crate) fn prune_key_lock(&self, key: &str) {
        self.key_locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub(crate) fn key_lock_count(&self) -> usize {
        self.key_locks.len()
    }

    pub(crate) fn replay(&self, key: &str) -> Option<TransferResult> {
        let _gate = self.read_gate();
        self.replays.get(key).map(|result| result.value().clone())
    }

    pub(crate) fn next_transfer_id(&self) -> TransferId {
        self.transfer_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn next_entry_id(&self) -> EntryId {
        self.entry_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish a transaction's writes
    ///
    /// Called by `LedgerTx::commit` while it still holds the row locks of
    /// every row in `set.rows`. Contains no suspension point.
    pub(crate) fn apply(&self, set: CommitSet) {
        let _gate = self.write_gate();
        for (id, row) in set.rows {
            self.accounts.insert(id, row);
        }
        for transfer in set.transfers {
            self.transfers.insert(transfer.id, transfer);
        }
        for entry in set.entries {
            self.entries.insert(entry.id, entry);
        }
        if let Some((key, result)) = set.replay {
            self.replays.insert(key, result);
        }
    }
}

#[async_trait]
impl AccountReader for LedgerStore {
    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.find_account(id)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }
}
