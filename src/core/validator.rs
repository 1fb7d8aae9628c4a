//! Pre-transfer account validation
//!
//! Checks run against committed state, without taking any lock, so an
//! invalid request is rejected before it can hold storage resources:
//!
//! - the account exists
//! - its currency matches the currency of the request
//! - for the source leg only, the authenticated caller owns it

use tracing::debug;

use super::traits::AccountReader;
use crate::types::{Account, AccountId, Currency, LedgerError};

/// Validate a single account
///
/// `caller` is `Some` only for the source leg; the recipient of a transfer
/// need not be the caller.
///
/// # Errors
///
/// * `AccountNotFound` if the account does not exist
/// * `CurrencyMismatch` if its currency differs from `expected_currency`
/// * `Unauthorized` if `caller` is given and does not own the account
pub async fn validate_account<R>(
    reader: &R,
    id: AccountId,
    expected_currency: Currency,
    caller: Option<&str>,
) -> Result<Account, LedgerError>
where
    R: AccountReader + ?Sized,
{
    let account = reader.get_account(id).await?;

    if account.currency != expected_currency {
        return Err(LedgerError::currency_mismatch(
            id,
            expected_currency,
            account.currency,
        ));
    }

    if let Some(caller) = caller {
        if account.owner != caller {
            return Err(LedgerError::unauthorized(id, caller));
        }
    }

    Ok(account)
}

/// Validate both legs of a transfer request
///
/// The source is checked first (existence, currency, ownership), then the
/// destination (existence, currency). Returns both accounts as read.
pub async fn validate_transfer<R>(
    reader: &R,
    from_account_id: AccountId,
    to_account_id: AccountId,
    currency: Currency,
    caller: &str,
) -> Result<(Account, Account), LedgerError>
where
    R: AccountReader + ?Sized,
{
    let from_account = validate_account(reader, from_account_id, currency, Some(caller)).await?;
    let to_account = validate_account(reader, to_account_id, currency, None).await?;

    debug!(
        from = from_account_id,
        to = to_account_id,
        %currency,
        caller,
        "transfer request validated"
    );
    Ok((from_account, to_account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LedgerStore;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> LedgerStore {
        let store = LedgerStore::new();
        store.create_account("alice", Currency::Usd, 100).unwrap();
        store.create_account("bob", Currency::Usd, 50).unwrap();
        store.create_account("carol", Currency::Eur, 10).unwrap();
        store
    }

    #[tokio::test]
    async fn test_validate_account_ok() {
        let store = store();

        let account = validate_account(&store, 1, Currency::Usd, Some("alice"))
            .await
            .unwrap();

        assert_eq!(account.id, 1);
        assert_eq!(account.balance, 100);
    }

    #[rstest]
    #[case::missing(9, Currency::Usd, Some("alice"), LedgerError::account_not_found(9))]
    #[case::currency(3, Currency::Usd, None, LedgerError::currency_mismatch(3, Currency::Usd, Currency::Eur))]
    #[case::owner(1, Currency::Usd, Some("bob"), LedgerError::unauthorized(1, "bob"))]
    #[tokio::test]
    async fn test_validate_account_errors(
        #[case] id: AccountId,
        #[case] currency: Currency,
        #[case] caller: Option<&str>,
        #[case] expected: LedgerError,
    ) {
        let store = store();

        let result = validate_account(&store, id, currency, caller).await;

        assert_eq!(result, Err(expected));
    }

    #[tokio::test]
    async fn test_currency_checked_before_ownership() {
        let store = store();

        let result = validate_account(&store, 3, Currency::Usd, Some("mallory")).await;

        assert!(matches!(result, Err(LedgerError::CurrencyMismatch { .. })));
    }

    #[tokio::test]
    async fn test_validate_transfer_recipient_need_not_be_caller() {
        let store = store();

        let (from, to) = validate_transfer(&store, 1, 2, Currency::Usd, "alice")
            .await
            .unwrap();

        assert_eq!(from.owner, "alice");
        assert_eq!(to.owner, "bob");
    }

    #[rstest]
    #[case::unknown_destination(1, 9, Currency::Usd, "alice", LedgerError::account_not_found(9))]
    #[case::destination_currency(1, 3, Currency::Usd, "alice", LedgerError::currency_mismatch(3, Currency::Usd, Currency::Eur))]
    #[case::source_currency(1, 3, Currency::Eur, "alice", LedgerError::currency_mismatch(1, Currency::Eur, Currency::Usd))]
    #[case::not_owner(2, 1, Currency::Usd, "alice", LedgerError::unauthorized(2, "alice"))]
    #[tokio::test]
    async fn test_validate_transfer_errors(
        #[case] from: AccountId,
        #[case] to: AccountId,
        #[case] currency: Currency,
        #[case] caller: &str,
        #[case] expected: LedgerError,
    ) {
        let store = store();

        let result = validate_transfer(&store, from, to, currency, caller).await;

        assert_eq!(result, Err(expected));
    }

    /// Reader that counts lookups, to check the validator stops at the first failure
    struct CountingReader {
        inner: LedgerStore,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl AccountReader for CountingReader {
        async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_account(id).await
        }
    }

    #[tokio::test]
    async fn test_source_failure_skips_destination_lookup() {
        let reader = CountingReader {
            inner: store(),
            reads: AtomicUsize::new(0),
        };

        let result = validate_transfer(&reader, 1, 2, Currency::Usd, "bob").await;

        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
    }
}
