use crate::core::EngineConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Apply a file of transfer requests to a seeded double-entry ledger
#[derive(Parser, Debug)]
#[command(name = "ledger-transfer")]
#[command(about = "Apply transfer requests to a double-entry ledger", long_about = None)]
pub struct CliArgs {
    /// Account seed CSV (owner,currency,balance)
    #[arg(value_name = "ACCOUNTS", help = "Path to the account seed CSV file")]
    pub accounts_file: PathBuf,

    /// Transfer request CSV (caller,from,to,amount,currency[,idempotency_key])
    #[arg(value_name = "TRANSFERS", help = "Path to the transfer request CSV file")]
    pub transfers_file: PathBuf,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for in-order or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests per batch (async mode only, default: 1000)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum requests in flight, also the worker thread count (async mode only, default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    #[arg(
        long = "timeout-ms",
        value_name = "MS",
        help = "Abort and roll back a transfer that takes longer than this"
    )]
    pub timeout_ms: Option<u64>,

    #[arg(
        long = "responses",
        value_name = "FILE",
        help = "Write one JSON response line per request to this file"
    )]
    pub responses: Option<PathBuf>,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// A zero timeout is ignored
    pub fn to_engine_config(&self) -> EngineConfig {
        match self.timeout_ms {
            Some(0) => {
                warn!("ignoring zero request timeout");
                EngineConfig::default()
            }
            Some(ms) => EngineConfig::with_timeout(Duration::from_millis(ms)),
            None => EngineConfig::default(),
        }
    }
}
