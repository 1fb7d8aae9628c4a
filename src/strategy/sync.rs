//! Synchronous processing strategy
//!
//! Runs the transfer requests one at a time, in file order, on a
//! single-threaded runtime. Each request commits or rolls back before the
//! next one is read, so the outcome of a file is fully deterministic.

use crate::core::EngineConfig;
use crate::io::csv_format::{write_accounts_csv, CsvExchange};
use crate::io::sync_reader::SyncReader;
use crate::strategy::{seeded_service, write_exchange, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// In-order processing strategy
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    engine_config: EngineConfig,
}

impl SyncProcessingStrategy {
    pub fn new(engine_config: EngineConfig) -> Self {
        Self { engine_config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
        responses: &mut dyn Write,
    ) -> Result<(), LedgerError> {
        let service = seeded_service(accounts_path, &self.engine_config)?;
        let reader = SyncReader::new(transfers_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let cancel = CancellationToken::new();

        runtime.block_on(async {
            for request_line in reader {
                let mut exchange = CsvExchange::new(request_line);
                service.create_transfer(&mut exchange, &cancel).await;
                write_exchange(&exchange, responses)?;
            }
            Ok::<(), LedgerError>(())
        })?;

        responses.flush()?;
        write_accounts_csv(&service.engine().store().accounts(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ACCOUNTS: &str = "owner,currency,balance\nalice,USD,100\nbob,USD,50\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(transfers: &str) -> Result<(String, String), LedgerError> {
        let accounts = create_temp_csv(ACCOUNTS);
        let transfers = create_temp_csv(transfers);
        let mut output = Vec::new();
        let mut responses = Vec::new();

        SyncProcessingStrategy::default().process(
            accounts.path(),
            transfers.path(),
            &mut output,
            &mut responses,
        )?;

        Ok((
            String::from_utf8(output).unwrap(),
            String::from_utf8(responses).unwrap(),
        ))
    }

    #[test]
    fn test_sync_strategy_worked_example() {
        let (output, responses) =
            run("caller,from,to,amount,currency\nalice,1,2,30,USD\n").unwrap();

        assert_eq!(
            output,
            "id,owner,currency,balance\n1,alice,USD,70\n2,bob,USD,80\n"
        );
        let response: serde_json::Value = serde_json::from_str(responses.trim()).unwrap();
        assert_eq!(response["line"], 2);
        assert_eq!(response["status"], 200);
        assert_eq!(response["body"]["transfer"]["id"], 1);
    }

    #[test]
    fn test_sync_strategy_applies_requests_in_file_order() {
        // The second request only succeeds after the first credit to bob
        let (output, responses) = run(
            "caller,from,to,amount,currency\nalice,1,2,100,USD\nbob,2,1,150,USD\n",
        )
        .unwrap();

        assert_eq!(
            output,
            "id,owner,currency,balance\n1,alice,USD,150\n2,bob,USD,0\n"
        );
        assert_eq!(responses.lines().count(), 2);
    }

    #[test]
    fn test_sync_strategy_answers_every_line() {
        let (output, responses) = run(
            "caller,from,to,amount,currency\nbob,1,2,30,USD\nalice,1,2,x,USD\nalice,1,9,1,USD\n",
        )
        .unwrap();

        assert_eq!(
            output,
            "id,owner,currency,balance\n1,alice,USD,100\n2,bob,USD,50\n"
        );
        let statuses: Vec<u64> = responses
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["status"].as_u64().unwrap())
            .collect();
        assert_eq!(statuses, vec![401, 400, 404]);
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let accounts = create_temp_csv(ACCOUNTS);
        let mut output = Vec::new();

        let result = SyncProcessingStrategy::default().process(
            accounts.path(),
            Path::new("nonexistent.csv"),
            &mut output,
            &mut std::io::sink(),
        );

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
        assert!(output.is_empty());
    }

    #[test]
    fn test_sync_strategy_rejects_malformed_seed_file() {
        let accounts = create_temp_csv("owner,currency,balance\nalice,USD,-5\n");
        let transfers = create_temp_csv("caller,from,to,amount,currency\n");

        let result = SyncProcessingStrategy::default().process(
            accounts.path(),
            transfers.path(),
            &mut Vec::new(),
            &mut std::io::sink(),
        );

        assert!(matches!(result, Err(LedgerError::Parse { line: Some(2), .. })));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
