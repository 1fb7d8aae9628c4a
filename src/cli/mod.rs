// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{CliArgs, StrategyType};

use clap::Parser;

/// Parse command-line arguments, exiting with usage text on failure
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
