//! Ledger Transfer CLI
//!
//! # Usage
//!
//! ```bash
//! cargo run -- accounts.csv transfers.csv > accounts_out.csv
//! cargo run -- --strategy sync accounts.csv transfers.csv > accounts_out.csv
//! cargo run -- --strategy async --batch-size 500 --max-concurrent 8 accounts.csv transfers.csv
//! cargo run -- --timeout-ms 250 --responses responses.jsonl accounts.csv transfers.csv
//! ```
//!
//! The final account table is written to stdout; diagnostics go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success (individual requests may still have been rejected)
//! - 1: Error (missing arguments, file not found, malformed accounts file, etc.)

use ledger_transfer::{cli, logging, strategy};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process;

fn main() {
    logging::init();

    let args = cli::parse_args();

    let strategy = {
        let batch_config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), batch_config, args.to_engine_config())
    };

    let mut responses: Box<dyn Write> = match &args.responses {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(e) => {
                eprintln!("Error: cannot create '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => Box::new(io::sink()),
    };

    let mut output = io::stdout();
    if let Err(e) = strategy.process(
        &args.accounts_file,
        &args.transfers_file,
        &mut output,
        &mut responses,
    ) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
