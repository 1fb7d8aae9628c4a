//! Asynchronous CSV reader with batch interface
//!
//! Reads transfer requests in batches for the async processing strategy.
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of RequestLines
//!                  ↓
//!           csv_format module
//!           (CsvTransferRecord, convert_transfer_record)
//! ```

use crate::io::csv_format::{
    convert_transfer_record, record_start_line, CsvTransferRecord, RequestLine,
};
use crate::types::LedgerError;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous transfer request reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    /// Reader line once the header was read, known after the first batch
    after_header: Option<u64>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            after_header: None,
        }
    }

    /// Read up to `batch_size` request lines
    ///
    /// Malformed rows are returned as lines carrying the error. An empty
    /// batch means the end of the file was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<RequestLine> {
        let after_header = match self.after_header {
            Some(line) => line,
            None => {
                // A header error resurfaces from the record stream below
                let line = match self.csv_reader.headers().await {
                    Ok(_) => self.csv_reader.position().line(),
                    Err(_) => 2,
                };
                self.after_header = Some(line);
                line
            }
        };

        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize_with_pos::<CsvTransferRecord>();

        while batch.len() < batch_size {
            let Some((record, position)) = records.next().await else {
                break;
            };
            let request = match record {
                Ok(record) => convert_transfer_record(record),
                Err(e) => Err(LedgerError::invalid_request(e.to_string())),
            };
            batch.push(RequestLine {
                line: record_start_line(position.line(), after_header),
                request,
            });
        }

        batch
    }
}
