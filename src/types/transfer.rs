//! Ledger record types: transfers, entries and the composite transfer result
//!
//! A Transfer and its two Entries (the debit and credit legs) are always
//! created together inside one storage transaction. None of them is ever
//! updated after commit.

use super::account::{Account, AccountId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transfer identifier
pub type TransferId = i64;

/// Entry identifier
pub type EntryId = i64;

/// Immutable record of money moved from one account to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,

    /// Amount moved, in minor units (always positive)
    pub amount: i64,

    pub created_at: DateTime<Utc>,
}

/// One leg of a double-entry transfer
///
/// The amount is negative for the debit leg (source account) and positive
/// for the credit leg (destination account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Input to the transfer orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTxParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,

    /// Client-supplied token that makes resubmission of the same logical
    /// transfer safe. `None` means every call is a new transfer.
    pub idempotency_key: Option<String>,
}

impl TransferTxParams {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Whether `transfer` moved exactly what these parameters ask for
    pub fn matches(&self, transfer: &Transfer) -> bool {
        transfer.from_account_id == self.from_account_id
            && transfer.to_account_id == self.to_account_id
            && transfer.amount == self.amount
    }
}

/// Everything a successful transfer produced
///
/// Not persisted as such; the account snapshots are the rows as they stood
/// right after their balance update inside the committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn transfer(from: AccountId, to: AccountId, amount: i64) -> Transfer {
        Transfer {
            id: 1,
            from_account_id: from,
            to_account_id: to,
            amount,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case::identical(transfer(1, 2, 30), true)]
    #[case::other_amount(transfer(1, 2, 31), false)]
    #[case::reversed(transfer(2, 1, 30), false)]
    #[case::other_destination(transfer(1, 3, 30), false)]
    fn test_params_matches(#[case] existing: Transfer, #[case] expected: bool) {
        let params = TransferTxParams::new(1, 2, 30);
        assert_eq!(params.matches(&existing), expected);
    }

    #[test]
    fn test_with_idempotency_key() {
        let params = TransferTxParams::new(1, 2, 30).with_idempotency_key("req-1");
        assert_eq!(params.idempotency_key.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_transfer_result_serializes_field_names() {
        let now = Utc::now();
        let result = TransferResult {
            transfer: transfer(1, 2, 30),
            from_account: Account::new(1, "alice", crate::types::Currency::Usd, 70),
            to_account: Account::new(2, "bob", crate::types::Currency::Usd, 80),
            from_entry: Entry { id: 1, account_id: 1, amount: -30, created_at: now },
            to_entry: Entry { id: 2, account_id: 2, amount: 30, created_at: now },
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["transfer"]["from_account_id"], 1);
        assert_eq!(json["from_entry"]["amount"], -30);
        assert_eq!(json["to_account"]["balance"], 80);
        assert_eq!(json["to_account"]["currency"], "USD");
    }
}
