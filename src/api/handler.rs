//! Transfer endpoint, independent of any web framework
//!
//! A transport hands the service a [`TransferExchange`]: something that can
//! produce the decoded, authenticated request and accept a response. The
//! service runs structural validation, the account validator and the
//! transfer orchestrator, then writes exactly one response.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::request::AuthenticatedRequest;
use super::response::{error_body, Status};
use crate::core::{validate_transfer, TransferTx};
use crate::types::{LedgerError, TransferResult};

/// The two operations the transfer endpoint needs from a transport
pub trait TransferExchange: Send {
    /// The decoded request with its verified caller, or why decoding failed
    fn decoded_request(&self) -> Result<AuthenticatedRequest, LedgerError>;

    /// Write the response for this request
    fn write_response(&mut self, status: Status, body: Value);
}

/// Transfer endpoint
#[derive(Debug, Clone)]
pub struct TransferService {
    engine: TransferTx,
}

impl TransferService {
    pub fn new(engine: TransferTx) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &TransferTx {
        &self.engine
    }

    /// Serve one transfer request
    ///
    /// On success the body is the serialized `TransferResult`; on failure it
    /// is an error body with the status derived from the error kind.
    pub async fn create_transfer<E>(&self, exchange: &mut E, cancel: &CancellationToken)
    where
        E: TransferExchange + ?Sized,
    {
        let outcome = match exchange.decoded_request() {
            Ok(request) => self.handle(&request, cancel).await,
            Err(e) => Err(e),
        };

        let outcome = outcome.and_then(|result| {
            serde_json::to_value(&result).map_err(|e| LedgerError::storage(e.to_string()))
        });

        match outcome {
            Ok(body) => exchange.write_response(Status::Ok, body),
            Err(e) => {
                let status = Status::for_error(&e);
                warn!(status = status.code(), error = %e, "transfer rejected");
                exchange.write_response(status, error_body(&e));
            }
        }
    }

    /// Validate and execute a decoded request
    pub async fn handle(
        &self,
        request: &AuthenticatedRequest,
        cancel: &CancellationToken,
    ) -> Result<TransferResult, LedgerError> {
        let body = &request.request;
        body.validate()?;

        validate_transfer(
            self.engine.store().as_ref(),
            body.from_account_id,
            body.to_account_id,
            body.currency,
            &request.caller,
        )
        .await?;

        self.engine.execute(body.to_params(), cancel).await
    }
}
