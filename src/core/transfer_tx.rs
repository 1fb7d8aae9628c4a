//! Transfer orchestration
//!
//! This module provides `TransferTx`, which moves funds between two accounts
//! inside a single storage transaction.
//!
//! # Algorithm
//!
//! 1. Reject a self-transfer or a non-positive amount before touching storage
//! 2. Begin a transaction
//! 3. If the request carries an idempotency key, lock the key and replay a
//!    previously committed result
//! 4. Lock and update the two accounts, numerically lower identifier first
//! 5. Record the transfer and its debit and credit entries
//! 6. Commit, or roll back on any failure
//!
//! # Lock Ordering
//!
//! Any two transfers touching the same pair of accounts, in either direction,
//! lock the rows in the same global order (ascending account id), so they
//! can never wait on each other in a cycle. The order is decided by
//! [`lock_order`], a pure comparison of the two identifiers, before any
//! storage lock is requested. Idempotency keys are always locked before rows.
//!
//! # Cancellation
//!
//! [`TransferTx::execute`] races the transaction against a
//! `CancellationToken` and an optional timeout. A losing transaction future
//! is dropped, which rolls the transaction back; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ledger_tx::LedgerTx;
use super::store::LedgerStore;
use super::traits::{AccountLedger, TransferWriter};
use crate::types::{Account, AccountId, LedgerError, TransferResult, TransferTxParams};

/// Configuration of the transfer orchestrator
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Upper bound on one transfer, lock waiting included. `None` waits
    /// indefinitely.
    pub request_timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            request_timeout: Some(timeout),
        }
    }
}

/// The order in which a transfer locks and updates its accounts
///
/// Returns `(account, balance delta)` pairs, lower account id first.
pub fn lock_order(
    from_account_id: AccountId,
    to_account_id: AccountId,
    amount: i64,
) -> [(AccountId, i64); 2] {
    if from_account_id < to_account_id {
        [(from_account_id, -amount), (to_account_id, amount)]
    } else {
        [(to_account_id, amount), (from_account_id, -amount)]
    }
}

/// Transfer orchestrator
///
/// Cheap to clone; clones share the same store.
#[derive(Debug, Clone)]
pub struct TransferTx {
    store: Arc<LedgerStore>,
    config: EngineConfig,
}

impl TransferTx {
    pub fn new(store: Arc<LedgerStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    /// Run a transfer that can only be cancelled by dropping the future
    pub async fn transfer(&self, params: TransferTxParams) -> Result<TransferResult, LedgerError> {
        self.execute(params, &CancellationToken::new()).await
    }

    /// Run a transfer, rolling it back if `cancel` fires or the configured
    /// timeout elapses before it commits
    ///
    /// # Errors
    ///
    /// * `SameAccount` / `InvalidAmount` for requests rejected up front
    /// * `AccountNotFound`, `InsufficientFunds`, `ArithmeticOverflow` from the
    ///   repository, after rollback
    /// * `IdempotencyKeyReused` if the key belongs to a different transfer
    /// * `Cancelled` / `Timeout` if the transaction lost the race
    pub async fn execute(
        &self,
        params: TransferTxParams,
        cancel: &CancellationToken,
    ) -> Result<TransferResult, LedgerError> {
        check_params(&params)?;

        let run = async {
            match self.config.request_timeout {
                Some(limit) => tokio::time::timeout(limit, self.run(&params))
                    .await
                    .map_err(|_| LedgerError::Timeout {
                        after_ms: limit.as_millis() as u64,
                    })?,
                None => self.run(&params).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(from = params.from_account_id, to = params.to_account_id, "transfer cancelled");
                Err(LedgerError::Cancelled)
            }
            result = run => result,
        }
    }

    async fn run(&self, params: &TransferTxParams) -> Result<TransferResult, LedgerError> {
        let mut tx = self.store.begin();

        if let Some(key) = &params.idempotency_key {
            if let Some(previous) = tx.lock_request_key(key).await? {
                tx.rollback();
                if !params.matches(&previous.transfer) {
                    return Err(LedgerError::IdempotencyKeyReused { key: key.clone() });
                }
                info!(transfer = previous.transfer.id, key = %key, "replayed committed transfer");
                return Ok(previous);
            }
        }

        match apply_transfer(&mut tx, params).await {
            Ok(result) => {
                if let Some(key) = &params.idempotency_key {
                    tx.remember_result(key.clone(), result.clone());
                }
                let tx_id = tx.id();
                tx.commit()?;
                info!(
                    tx = tx_id,
                    transfer = result.transfer.id,
                    from = params.from_account_id,
                    to = params.to_account_id,
                    amount = params.amount,
                    "transfer committed"
                );
                Ok(result)
            }
            Err(e) => {
                debug!(tx = tx.id(), error = %e, "transfer failed");
                tx.rollback();
                Err(e)
            }
        }
    }
}

fn check_params(params: &TransferTxParams) -> Result<(), LedgerError> {
    if params.from_account_id == params.to_account_id {
        return Err(LedgerError::SameAccount {
            account: params.from_account_id,
        });
    }
    if params.amount <= 0 {
        return Err(LedgerError::InvalidAmount {
            amount: params.amount,
        });
    }
    Ok(())
}

/// Move the money and write the ledger records inside an open transaction
async fn apply_transfer<T>(tx: &mut T, params: &TransferTxParams) -> Result<TransferResult, LedgerError>
where
    T: AccountLedger + TransferWriter,
{
    let mut from_account: Option<Account> = None;
    let mut to_account: Option<Account> = None;

    for (account_id, delta) in lock_order(params.from_account_id, params.to_account_id, params.amount) {
        tx.lock_account(account_id).await?;
        let updated = tx.add_balance(account_id, delta).await?;
        if account_id == params.from_account_id {
            from_account = Some(updated);
        } else {
            to_account = Some(updated);
        }
    }

    let (from_account, to_account) = match (from_account, to_account) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(LedgerError::storage("transfer leg was not applied")),
    };

    let transfer = tx
        .record_transfer(params.from_account_id, params.to_account_id, params.amount)
        .await?;
    let from_entry = tx.record_entry(params.from_account_id, -params.amount).await?;
    let to_entry = tx.record_entry(params.to_account_id, params.amount).await?;

    Ok(TransferResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use rstest::rstest;

    fn engine(balances: &[(&str, i64)]) -> TransferTx {
        let store = Arc::new(LedgerStore::new());
        for (owner, balance) in balances {
            store.create_account(*owner, Currency::Usd, *balance).unwrap();
        }
        TransferTx::new(store, EngineConfig::default())
    }

    #[rstest]
    #[case::source_lower(1, 2, [(1, -30), (2, 30)])]
    #[case::destination_lower(2, 1, [(1, 30), (2, -30)])]
    #[case::far_apart(900, 7, [(7, 30), (900, -30)])]
    fn test_lock_order_lower_id_first(
        #[case] from: AccountId,
        #[case] to: AccountId,
        #[case] expected: [(AccountId, i64); 2],
    ) {
        assert_eq!(lock_order(from, to, 30), expected);
    }

    #[tokio::test]
    async fn test_transfer_moves_funds() {
        let engine = engine(&[("alice", 100), ("bob", 50)]);

        let result = engine.transfer(TransferTxParams::new(1, 2, 30)).await.unwrap();

        assert_eq!(result.transfer.from_account_id, 1);
        assert_eq!(result.transfer.to_account_id, 2);
        assert_eq!(result.transfer.amount, 30);
        assert_eq!(result.from_account.balance, 70);
        assert_eq!(result.to_account.balance, 80);
        assert_eq!((result.from_entry.account_id, result.from_entry.amount), (1, -30));
        assert_eq!((result.to_entry.account_id, result.to_entry.amount), (2, 30));

        let store = engine.store();
        assert_eq!(store.find_account(1).unwrap().balance, 70);
        assert_eq!(store.find_account(2).unwrap().balance, 80);
        assert_eq!(store.transfers().len(), 1);
        assert_eq!(store.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_transfer_from_higher_id() {
        let engine = engine(&[("alice", 100), ("bob", 50)]);

        let result = engine.transfer(TransferTxParams::new(2, 1, 50)).await.unwrap();

        assert_eq!(result.from_account.id, 2);
        assert_eq!(result.from_account.balance, 0);
        assert_eq!(result.to_account.id, 1);
        assert_eq!(result.to_account.balance, 150);
    }

    #[rstest]
    #[case::same_account(TransferTxParams::new(1, 1, 10), LedgerError::SameAccount { account: 1 })]
    #[case::zero_amount(TransferTxParams::new(1, 2, 0), LedgerError::InvalidAmount { amount: 0 })]
    #[case::negative_amount(TransferTxParams::new(1, 2, -5), LedgerError::InvalidAmount { amount: -5 })]
    #[case::unknown_destination(TransferTxParams::new(1, 3, 10), LedgerError::account_not_found(3))]
    #[case::unknown_source(TransferTxParams::new(3, 1, 10), LedgerError::account_not_found(3))]
    #[case::overdraft(TransferTxParams::new(2, 1, 51), LedgerError::insufficient_funds(2, 50, 51))]
    #[tokio::test]
    async fn test_rejected_transfer_leaves_state_unchanged(
        #[case] params: TransferTxParams,
        #[case] expected: LedgerError,
    ) {
        let engine = engine(&[("alice", 100), ("bob", 50)]);

        let result = engine.transfer(params).await;

        assert_eq!(result, Err(expected));
        let store = engine.store();
        assert_eq!(store.find_account(1).unwrap().balance, 100);
        assert_eq!(store.find_account(2).unwrap().balance, 50);
        assert!(store.transfers().is_empty());
        assert_eq!(store.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_after_first_leg_releases_locks() {
        // Account 1 is updated before the lookup of account 3 fails
        let engine = engine(&[("alice", 100), ("bob", 50)]);
        let _ = engine.transfer(TransferTxParams::new(1, 3, 10)).await;

        let result = engine.transfer(TransferTxParams::new(1, 2, 10)).await.unwrap();

        assert_eq!(result.from_account.balance, 90);
    }

    #[tokio::test]
    async fn test_idempotent_replay_moves_money_once() {
        let engine = engine(&[("alice", 100), ("bob", 50)]);
        let params = TransferTxParams::new(1, 2, 30).with_idempotency_key("req-1");

        let first = engine.transfer(params.clone()).await.unwrap();
        let second = engine.transfer(params).await.unwrap();

        assert_eq!(first, second);
        let store = engine.store();
        assert_eq!(store.find_account(1).unwrap().balance, 70);
        assert_eq!(store.transfers().len(), 1);
    }

    #[tokio::test]
    async fn test_idempotency_key_reuse_rejected() {
        let engine = engine(&[("alice", 100), ("bob", 50)]);
        engine
            .transfer(TransferTxParams::new(1, 2, 30).with_idempotency_key("req-1"))
            .await
            .unwrap();

        let result = engine
            .transfer(TransferTxParams::new(1, 2, 31).with_idempotency_key("req-1"))
            .await;

        assert_eq!(
            result,
            Err(LedgerError::IdempotencyKeyReused {
                key: "req-1".to_string()
            })
        );
        assert_eq!(engine.store().find_account(1).unwrap().balance, 70);
    }

    #[tokio::test]
    async fn test_failed_keyed_transfer_can_be_resubmitted() {
        let engine = engine(&[("alice", 100), ("bob", 50)]);
        let params = TransferTxParams::new(2, 1, 60).with_idempotency_key("req-2");

        assert!(engine.transfer(params.clone()).await.is_err());
        engine.transfer(TransferTxParams::new(1, 2, 20)).await.unwrap();
        let result = engine.transfer(params).await.unwrap();

        assert_eq!(result.from_account.balance, 10);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let engine = engine(&[("alice", 100), ("bob", 50)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine.execute(TransferTxParams::new(1, 2, 10), &cancel).await;

        assert_eq!(result, Err(LedgerError::Cancelled));
        assert_eq!(engine.store().find_account(1).unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_lock_rolls_back() {
        let engine = engine(&[("alice", 100), ("bob", 50)]);
        let store = Arc::clone(engine.store());

        // Hold account 2 so the transfer blocks after updating account 1
        let mut holder = store.begin();
        holder.lock_account(2).await.unwrap();

        let cancel = CancellationToken::new();
        let task = {
            let engine = engine.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { engine.execute(TransferTxParams::new(1, 2, 10), &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let result = task.await.unwrap();
        holder.rollback();

        assert_eq!(result, Err(LedgerError::Cancelled));
        assert_eq!(store.find_account(1).unwrap().balance, 100);
        assert!(store.transfers().is_empty());

        // Account 1's lock was released by the rollback
        engine.transfer(TransferTxParams::new(1, 2, 10)).await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_rolls_back() {
        let store = Arc::new(LedgerStore::new());
        store.create_account("alice", Currency::Usd, 100).unwrap();
        store.create_account("bob", Currency::Usd, 50).unwrap();
        let engine = TransferTx::new(Arc::clone(&store), EngineConfig::with_timeout(Duration::from_millis(20)));

        // Account 1 is debited in the transaction, then account 2 blocks
        let mut holder = store.begin();
        holder.lock_account(2).await.unwrap();

        let result = engine.transfer(TransferTxParams::new(1, 2, 10)).await;

        assert_eq!(result, Err(LedgerError::Timeout { after_ms: 20 }));
        holder.rollback();
        assert_eq!(store.find_account(1).unwrap().balance, 100);
        assert!(store.transfers().is_empty());
    }
}
