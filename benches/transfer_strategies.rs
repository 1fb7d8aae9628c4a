//! Benchmark suite for comparing processing strategies
//!
//! ```bash
//! cargo bench
//! ```
//!
//! All runs seed the same 50 USD accounts (`accounts.csv`) and replay one of
//! three request files:
//! - `transfers_small.csv` - 100 transfers
//! - `transfers_medium.csv` - 1,000 transfers
//! - `transfers_large.csv` - 10,000 transfers
//!
//! Every tenth request carries an idempotency key.

use ledger_transfer::cli::StrategyType;
use ledger_transfer::core::EngineConfig;
use ledger_transfer::strategy::{create_strategy, BatchConfig};
use std::path::Path;

fn main() {
    divan::main();
}

const ACCOUNTS: &str = "benches/fixtures/accounts.csv";

fn run(strategy_type: StrategyType, transfers: &str) {
    let batch_config = match strategy_type {
        StrategyType::Sync => None,
        StrategyType::Async => Some(BatchConfig::default()),
    };
    let strategy = create_strategy(strategy_type, batch_config, EngineConfig::default());
    let mut output = Vec::new();

    strategy
        .process(
            Path::new(ACCOUNTS),
            Path::new(transfers),
            &mut output,
            &mut std::io::sink(),
        )
        .expect("Processing failed");
}

#[divan::bench(args = ["small", "medium", "large"])]
fn sync_strategy(size: &str) {
    run(
        StrategyType::Sync,
        &format!("benches/fixtures/transfers_{}.csv", size),
    );
}

#[divan::bench(args = ["small", "medium", "large"])]
fn async_strategy(size: &str) {
    run(
        StrategyType::Async,
        &format!("benches/fixtures/transfers_{}.csv", size),
    );
}
