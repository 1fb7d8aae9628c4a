//! Asynchronous batch processing strategy
//!
//! Requests are read in batches. Every request of a batch is spawned as its
//! own task on a multi-threaded runtime, so transfers touching the same
//! accounts really do contend for row locks; the batch is awaited before the
//! next one is read. At most `max_concurrent` requests execute at once,
//! including those suspended on a row lock.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── AsyncReader (batch CSV reading)
//!     └── TransferService (one spawned task per request)
//!         └── TransferTx → LedgerStore (row locks, DashMap tables)
//! ```
//!
//! Requests within a batch run in no particular order. Responses are still
//! written in file order.

use crate::core::EngineConfig;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{write_accounts_csv, CsvExchange};
use crate::strategy::{seeded_service, write_exchange, write_failed_line, ProcessingStrategy};
use crate::types::LedgerError;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of requests per batch
    pub batch_size: usize,
    /// Maximum number of requests in flight at once; also the number of
    /// runtime worker threads
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig; zero values fall back to the defaults
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            warn!(
                max_concurrent,
                default = default.max_concurrent,
                "invalid concurrency limit, using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

/// Concurrent batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    engine_config: EngineConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, engine_config: EngineConfig) -> Self {
        Self {
            config,
            engine_config,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
        responses: &mut dyn Write,
    ) -> Result<(), LedgerError> {
        let service = seeded_service(accounts_path, &self.engine_config)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent)
            .enable_all()
            .build()?;
        let cancel = CancellationToken::new();
        let limit = Arc::new(Semaphore::new(self.config.max_concurrent));

        runtime.block_on(async {
            let file = tokio::fs::File::open(transfers_path)
                .await
                .map_err(|e| LedgerError::FileNotFound {
                    path: format!("{} ({})", transfers_path.display(), e),
                })?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                debug!(size = batch.len(), "processing batch");

                let tasks: Vec<_> = batch
                    .into_iter()
                    .map(|request_line| {
                        let line = request_line.line;
                        let service = service.clone();
                        let cancel = cancel.clone();
                        let task = spawn_limited(&limit, async move {
                            let mut exchange = CsvExchange::new(request_line);
                            service.create_transfer(&mut exchange, &cancel).await;
                            exchange
                        });
                        (line, task)
                    })
                    .collect();

                for (line, task) in tasks {
                    match task.await {
                        Ok(exchange) => write_exchange(&exchange, responses)?,
                        Err(e) => {
                            error!(line, error = %e, "request task failed");
                            let failure = LedgerError::storage(format!("request task failed: {}", e));
                            write_failed_line(line, &failure, responses)?;
                        }
                    }
                }
            }

            Ok::<(), LedgerError>(())
        })?;

        responses.flush()?;
        write_accounts_csv(&service.engine().store().accounts(), output)
    }
}

/// Spawn `future` as a task that first waits for a permit of `limit`
fn spawn_limited<F>(limit: &Arc<Semaphore>, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let limit = Arc::clone(limit);
    tokio::spawn(async move {
        // The semaphore is never closed, so acquiring cannot fail
        let _permit = limit.acquire_owned().await.ok();
        future.await
    })
}
