//! I/O module
//!
//! Handles the batch CLI's CSV input and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, `CsvExchange`, output serialization)
//! - `sync_reader` - Synchronous request iterator and account seed loader
//! - `async_reader` - Asynchronous CSV reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_transfer_record, write_accounts_csv, write_response_line, AccountSeed, CsvExchange,
    RequestLine,
};
pub use sync_reader::{read_account_seeds, SyncReader};
