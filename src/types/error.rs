//! Error types for the ledger transfer engine
//!
//! Every failure of the validator or the transfer orchestrator is returned
//! verbatim to the caller as a `LedgerError`; the request boundary decides
//! how to present it using [`LedgerError::kind`].
//!
//! # Error Categories
//!
//! - **Validation**: malformed or inconsistent requests the caller can fix
//! - **Not found**: an account identifier that does not exist
//! - **Unauthorized**: the caller does not own the source account
//! - **Storage**: transaction, cancellation and I/O failures

use super::account::{AccountId, Currency};
use thiserror::Error;

/// Coarse classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    Storage,
}

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Structurally invalid request (missing or malformed field)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Transfer amount is zero or negative
    #[error("Invalid transfer amount {amount}: must be positive")]
    InvalidAmount { amount: i64 },

    /// Source and destination are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SameAccount { account: AccountId },

    /// Account currency differs from the currency of the request
    #[error("Account {account} currency mismatch: {actual} vs {expected}")]
    CurrencyMismatch {
        account: AccountId,
        expected: Currency,
        actual: Currency,
    },

    /// Account does not exist
    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    /// Caller does not own the account
    #[error("Account {account} doesn't belong to the authenticated user '{caller}'")]
    Unauthorized { account: AccountId, caller: String },

    /// Debit would leave the balance negative
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: i64,
        requested: i64,
    },

    /// Balance update would overflow
    #[error("Arithmetic overflow updating balance of account {account}")]
    ArithmeticOverflow { account: AccountId },

    /// Idempotency key already used for a transfer with other parameters
    #[error("Idempotency key '{key}' was already used for a different transfer")]
    IdempotencyKeyReused { key: String },

    /// Storage-level failure; the transaction has been rolled back
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// The request was cancelled before it committed
    #[error("Transfer cancelled before commit")]
    Cancelled,

    /// The request did not complete within the configured timeout
    #[error("Transfer timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// File could not be opened
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    Io { message: String },

    /// CSV parsing error
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse { line: Option<u64>, message: String },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Classify the error for presentation at the request boundary
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidRequest { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::SameAccount { .. }
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::ArithmeticOverflow { .. }
            | LedgerError::IdempotencyKeyReused { .. } => ErrorKind::Validation,
            LedgerError::AccountNotFound { .. } => ErrorKind::NotFound,
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::Storage { .. }
            | LedgerError::Cancelled
            | LedgerError::Timeout { .. }
            | LedgerError::FileNotFound { .. }
            | LedgerError::Io { .. }
            | LedgerError::Parse { .. } => ErrorKind::Storage,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        LedgerError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn account_not_found(account: AccountId) -> Self {
        LedgerError::AccountNotFound { account }
    }

    pub fn currency_mismatch(account: AccountId, expected: Currency, actual: Currency) -> Self {
        LedgerError::CurrencyMismatch {
            account,
            expected,
            actual,
        }
    }

    pub fn unauthorized(account: AccountId, caller: &str) -> Self {
        LedgerError::Unauthorized {
            account,
            caller: caller.to_string(),
        }
    }

    pub fn insufficient_funds(account: AccountId, balance: i64, requested: i64) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }
}
