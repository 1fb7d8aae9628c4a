//! Decoded transfer requests
//!
//! The transport layer decodes a request into [`TransferRequest`] and
//! attaches the already-verified caller identity. Structural validation
//! (identifier and amount ranges) lives here; everything that needs storage
//! is left to the validator and the orchestrator.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Currency, LedgerError, TransferTxParams};

/// Body of a transfer request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    /// Check field ranges: account ids at least 1, amount strictly positive
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.from_account_id < 1 {
            return Err(LedgerError::invalid_request(format!(
                "from_account_id must be at least 1, got {}",
                self.from_account_id
            )));
        }
        if self.to_account_id < 1 {
            return Err(LedgerError::invalid_request(format!(
                "to_account_id must be at least 1, got {}",
                self.to_account_id
            )));
        }
        if self.amount <= 0 {
            return Err(LedgerError::invalid_request(format!(
                "amount must be greater than 0, got {}",
                self.amount
            )));
        }
        if matches!(&self.idempotency_key, Some(key) if key.trim().is_empty()) {
            return Err(LedgerError::invalid_request("idempotency_key must not be blank"));
        }
        Ok(())
    }

    /// Orchestrator input for this request
    pub fn to_params(&self) -> TransferTxParams {
        TransferTxParams {
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount: self.amount,
            idempotency_key: self.idempotency_key.clone(),
        }
    }
}

/// A decoded request together with the principal that sent it
///
/// The caller has been verified by the authentication layer and is trusted
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedRequest {
    pub caller: String,
    pub request: TransferRequest,
}
