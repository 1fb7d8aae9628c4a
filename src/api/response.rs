//! Response statuses and bodies
//!
//! Maps [`LedgerError`] kinds onto the four failure statuses of the transfer
//! endpoint. Error bodies are `{"error": "<message>"}`.

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::{ErrorKind, LedgerError};

/// Outcome status of a transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    Unauthorized,
    NotFound,
    InternalError,
}

impl Status {
    /// HTTP-equivalent status code
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::Unauthorized => 401,
            Status::NotFound => 404,
            Status::InternalError => 500,
        }
    }

    pub fn for_error(error: &LedgerError) -> Self {
        match error.kind() {
            ErrorKind::Validation => Status::BadRequest,
            ErrorKind::NotFound => Status::NotFound,
            ErrorKind::Unauthorized => Status::Unauthorized,
            ErrorKind::Storage => Status::InternalError,
        }
    }
}

/// Body written for a failed request
pub fn error_body(error: &LedgerError) -> Value {
    json!({ "error": error.to_string() })
}

/// A written response, as recorded by non-HTTP transports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn new(status: Status, body: Value) -> Self {
        Self {
            status: status.code(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use rstest::rstest;

    #[rstest]
    #[case(LedgerError::invalid_request("bad"), Status::BadRequest)]
    #[case(LedgerError::currency_mismatch(1, Currency::Usd, Currency::Krw), Status::BadRequest)]
    #[case(LedgerError::SameAccount { account: 1 }, Status::BadRequest)]
    #[case(LedgerError::insufficient_funds(1, 0, 5), Status::BadRequest)]
    #[case(LedgerError::unauthorized(1, "eve"), Status::Unauthorized)]
    #[case(LedgerError::account_not_found(7), Status::NotFound)]
    #[case(LedgerError::storage("boom"), Status::InternalError)]
    #[case(LedgerError::Cancelled, Status::InternalError)]
    fn test_status_for_error(#[case] error: LedgerError, #[case] expected: Status) {
        assert_eq!(Status::for_error(&error), expected);
    }

    #[rstest]
    #[case(Status::Ok, 200)]
    #[case(Status::BadRequest, 400)]
    #[case(Status::Unauthorized, 401)]
    #[case(Status::NotFound, 404)]
    #[case(Status::InternalError, 500)]
    fn test_status_code(#[case] status: Status, #[case] code: u16) {
        assert_eq!(status.code(), code);
    }

    #[test]
    fn test_error_body() {
        let body = error_body(&LedgerError::account_not_found(7));
        assert_eq!(body, json!({ "error": "Account 7 not found" }));
    }
}
