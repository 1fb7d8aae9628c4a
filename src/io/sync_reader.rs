//! Synchronous CSV readers
//!
//! Provides a streaming iterator over transfer requests and a loader for the
//! account seed file. Delegates CSV format concerns to the csv_format module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, unreadable header) are returned from
//!   `new()` / `read_account_seeds()`
//! - A malformed transfer row is yielded as a `RequestLine` carrying the
//!   error, so it is still answered
//! - Any malformed seed row is fatal: the ledger cannot start half-seeded

use crate::io::csv_format::{
    convert_account_record, convert_transfer_record, record_start_line, AccountSeed,
    CsvAccountRecord, CsvTransferRecord, RequestLine,
};
use crate::types::LedgerError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

fn open_csv(path: &Path) -> Result<csv::Reader<File>, LedgerError> {
    let file = File::open(path).map_err(|e| LedgerError::FileNotFound {
        path: format!("{} ({})", path.display(), e),
    })?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024)
        .from_reader(file))
}

/// Read every account seed from `path`, in file order
pub fn read_account_seeds(path: &Path) -> Result<Vec<AccountSeed>, LedgerError> {
    let mut reader = open_csv(path)?;
    reader.headers()?;
    let after_header = reader.position().line();
    let mut records = reader.deserialize::<CsvAccountRecord>();
    let mut seeds = Vec::new();

    loop {
        let line = record_start_line(records.reader().position().line(), after_header);
        let Some(record) = records.next() else {
            break;
        };
        let seed = record
            .map_err(|e| e.to_string())
            .and_then(convert_account_record)
            .map_err(|message| LedgerError::Parse {
                line: Some(line),
                message,
            })?;
        seeds.push(seed);
    }

    Ok(seeds)
}

/// Streaming reader over the transfer request file
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    /// Reader line once the header was read
    after_header: u64,
}

impl SyncReader {
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let mut reader = open_csv(path)?;
        reader.headers()?;
        let after_header = reader.position().line();

        Ok(Self {
            reader,
            after_header,
        })
    }
}

impl Iterator for SyncReader {
    type Item = RequestLine;

    fn next(&mut self) -> Option<Self::Item> {
        let line = record_start_line(self.reader.position().line(), self.after_header);
        let record = self.reader.deserialize::<CsvTransferRecord>().next()?;

        let request = match record {
            Ok(record) => convert_transfer_record(record),
            Err(e) => Err(LedgerError::invalid_request(e.to_string())),
        };

        Some(RequestLine { line, request })
    }
}
