//! Processing strategy module for the batch CLI
//!
//! A strategy is a complete pipeline: seed the ledger from the accounts file,
//! run every request of the transfer file through the transfer endpoint,
//! then write the final account table. Different implementations
//! (in-order, concurrent batches) are selected at runtime.

use crate::api::{error_body, Response, Status, TransferService};
use crate::cli::StrategyType;
use crate::core::{EngineConfig, LedgerStore, TransferTx};
use crate::io::{read_account_seeds, write_response_line, CsvExchange};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Complete batch pipeline
pub trait ProcessingStrategy: Send + Sync {
    /// Process the transfer file against a ledger seeded from the accounts file
    ///
    /// Writes the final account table to `output` and one JSON line per
    /// request to `responses`, in file order.
    ///
    /// # Errors
    ///
    /// Only fatal conditions are returned: a missing or malformed accounts
    /// file, a missing transfer file, or a failed write. A rejected request
    /// is answered and processing continues.
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
        responses: &mut dyn Write,
    ) -> Result<(), LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `batch_config` is ignored by the sync strategy.
pub fn create_strategy(
    strategy_type: StrategyType,
    batch_config: Option<BatchConfig>,
    engine_config: EngineConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(engine_config)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            batch_config.unwrap_or_default(),
            engine_config,
        )),
    }
}

/// Build the transfer endpoint over a store seeded from `accounts_path`
pub(crate) fn seeded_service(
    accounts_path: &Path,
    engine_config: &EngineConfig,
) -> Result<TransferService, LedgerError> {
    let store = Arc::new(LedgerStore::new());
    for seed in read_account_seeds(accounts_path)? {
        store.create_account(seed.owner, seed.currency, seed.balance)?;
    }
    info!(accounts = store.accounts().len(), "ledger seeded");

    Ok(TransferService::new(TransferTx::new(
        store,
        engine_config.clone(),
    )))
}

/// Record the response an exchange received
pub(crate) fn write_exchange(
    exchange: &CsvExchange,
    responses: &mut dyn Write,
) -> Result<(), LedgerError> {
    match exchange.response() {
        Some(response) => write_response_line(exchange.line(), response, responses),
        None => Err(LedgerError::storage(format!(
            "no response written for line {}",
            exchange.line()
        ))),
    }
}

/// Record a response for a request whose task never finished
pub(crate) fn write_failed_line(
    line: u64,
    error: &LedgerError,
    responses: &mut dyn Write,
) -> Result<(), LedgerError> {
    let response = Response::new(Status::for_error(error), error_body(error));
    write_response_line(line, &response, responses)
}
