//! CSV format handling for account seeds, transfer requests and output
//!
//! This module centralizes all CSV format concerns:
//! - `CsvAccountRecord` / `CsvTransferRecord` structures for deserialization
//! - Conversion from CSV records to domain types
//! - `CsvExchange`, the batch-file transport for the transfer endpoint
//! - Account table and response line serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

use crate::api::{AuthenticatedRequest, Response, Status, TransferExchange, TransferRequest};
use crate::types::{Account, AccountId, Currency, LedgerError};

/// Row of the accounts seed file: `owner,currency,balance`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvAccountRecord {
    pub owner: String,
    pub currency: String,
    pub balance: String,
}

/// A validated account seed, ready to be inserted into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSeed {
    pub owner: String,
    pub currency: Currency,
    pub balance: i64,
}

/// Row of the transfer request file:
/// `caller,from,to,amount,currency,idempotency_key`
///
/// Numeric columns are kept as strings so that a bad value rejects only its
/// own request, with a message naming the column.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvTransferRecord {
    pub caller: String,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// One request of the transfer file, tagged with its line number
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLine {
    /// 1-based file line the record starts on, the header being line 1
    pub line: u64,
    pub request: Result<AuthenticatedRequest, LedgerError>,
}

/// File line a record starts on, from the reader's line before reading it
///
/// `after_header` is the reader's line once the header was read: 2 for LF
/// files. A CRLF file leaves the reader on line 1 with the header's `\n`
/// still unread, and every later position trails its record the same way.
/// A record preceded by blank lines is reported at the first blank line.
pub fn record_start_line(position_line: u64, after_header: u64) -> u64 {
    if after_header == 1 {
        position_line + 1
    } else {
        position_line
    }
}

pub fn convert_account_record(record: CsvAccountRecord) -> Result<AccountSeed, String> {
    let owner = record.owner.trim();
    if owner.is_empty() {
        return Err("owner must not be empty".to_string());
    }

    let currency = record.currency.parse::<Currency>()?;

    let balance = record
        .balance
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid balance '{}': {}", record.balance, e))?;
    if balance < 0 {
        return Err(format!("balance {} must not be negative", balance));
    }

    Ok(AccountSeed {
        owner: owner.to_string(),
        currency,
        balance,
    })
}

/// Convert a `CsvTransferRecord` into an authenticated transfer request
///
/// The `caller` column stands in for the identity an authentication layer
/// would attach. Range checks are left to [`TransferRequest::validate`].
pub fn convert_transfer_record(
    record: CsvTransferRecord,
) -> Result<AuthenticatedRequest, LedgerError> {
    let caller = record.caller.trim();
    if caller.is_empty() {
        return Err(LedgerError::invalid_request("caller must not be empty"));
    }

    let from_account_id = parse_id("from", &record.from)?;
    let to_account_id = parse_id("to", &record.to)?;
    let amount = record.amount.trim().parse::<i64>().map_err(|e| {
        LedgerError::invalid_request(format!("amount '{}': {}", record.amount, e))
    })?;
    let currency = record
        .currency
        .parse::<Currency>()
        .map_err(LedgerError::invalid_request)?;

    let idempotency_key = record
        .idempotency_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());

    Ok(AuthenticatedRequest {
        caller: caller.to_string(),
        request: TransferRequest {
            from_account_id,
            to_account_id,
            amount,
            currency,
            idempotency_key,
        },
    })
}

fn parse_id(column: &str, value: &str) -> Result<AccountId, LedgerError> {
    value
        .trim()
        .parse::<AccountId>()
        .map_err(|e| LedgerError::invalid_request(format!("{} '{}': {}", column, value, e)))
}

/// Batch-file transport for the transfer endpoint
///
/// Carries one decoded request line in and the single response written for
/// it out.
#[derive(Debug)]
pub struct CsvExchange {
    line: u64,
    request: Result<AuthenticatedRequest, LedgerError>,
    response: Option<Response>,
}

impl CsvExchange {
    pub fn new(request_line: RequestLine) -> Self {
        Self {
            line: request_line.line,
            request: request_line.request,
            response: None,
        }
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }
}

impl TransferExchange for CsvExchange {
    fn decoded_request(&self) -> Result<AuthenticatedRequest, LedgerError> {
        self.request.clone()
    }

    fn write_response(&mut self, status: Status, body: Value) {
        self.response = Some(Response::new(status, body));
    }
}

#[derive(Serialize)]
struct ResponseLine<'a> {
    line: u64,
    #[serde(flatten)]
    response: &'a Response,
}

/// Write one response as a JSON line: `{"line":n,"status":code,"body":...}`
pub fn write_response_line(
    line: u64,
    response: &Response,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    serde_json::to_writer(&mut *output, &ResponseLine { line, response })
        .map_err(|e| LedgerError::Io {
            message: format!("Failed to write response for line {}: {}", line, e),
        })?;
    output.write_all(b"\n")?;
    Ok(())
}

/// Write the account table as CSV: `id,owner,currency,balance`
///
/// Accounts are sorted by id for deterministic output.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["id", "owner", "currency", "balance"])?;

    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by_key(|account| account.id);

    for account in sorted {
        writer.write_record([
            account.id.to_string(),
            account.owner.clone(),
            account.currency.to_string(),
            account.balance.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
