use crate::common::UploadError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// One chunk transfer attempt, keyed by chunk index. The pool never retries;
/// a single attempt per index is the contract.
#[async_trait]
pub trait ChunkTransfer: Send + Sync {
    async fn send(&self, index: u32) -> Result<(), UploadError>;
}

/// What the pool reports back to the orchestrator.
#[derive(Debug)]
pub struct PoolOutcome {
    pub all_succeeded: bool,
    /// First recorded failure; later failures do not overwrite it.
    pub failure: Option<String>,
}

/// Executes chunk indices `0..total_chunks` across a bounded set of workers.
///
/// All workers share one dispatch cursor, so each index is claimed exactly
/// once, and one abort flag. Cancellation is cooperative at dispatch
/// granularity: a set flag stops new claims but an in-flight transfer is
/// allowed to finish.
pub struct WorkerPool {
    parallelism: usize,
}

impl WorkerPool {
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    pub async fn run(&self, total_chunks: u32, transfer: Arc<dyn ChunkTransfer>) -> PoolOutcome {
        if total_chunks == 0 {
            return PoolOutcome {
                all_succeeded: true,
                failure: None,
            };
        }

        let workers = self.parallelism.min(total_chunks as usize);
        let aborted = Arc::new(AtomicBool::new(false));
        let cursor = Arc::new(AtomicU32::new(0));
        let failure = Arc::new(Mutex::new(None::<String>));

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let aborted = Arc::clone(&aborted);
                let cursor = Arc::clone(&cursor);
                let failure = Arc::clone(&failure);
                let transfer = Arc::clone(&transfer);

                tokio::spawn(async move {
                    loop {
                        if aborted.load(Ordering::SeqCst) {
                            break;
                        }
                        let index = cursor.fetch_add(1, Ordering::SeqCst);
                        if index >= total_chunks {
                            break;
                        }
                        if let Err(err) = transfer.send(index).await {
                            record_failure(&failure, format!("chunk {index}: {err}"));
                            aborted.store(true, Ordering::SeqCst);
                            break;
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            if let Err(err) = handle.await {
                // A panicking transfer counts as a failure like any other.
                record_failure(&failure, format!("chunk worker panicked: {err}"));
                aborted.store(true, Ordering::SeqCst);
            }
        }

        let failure = failure.lock().unwrap().take();
        PoolOutcome {
            all_succeeded: failure.is_none(),
            failure,
        }
    }
}

fn record_failure(slot: &Mutex<Option<String>>, reason: String) {
    let mut slot = slot.lock().unwrap();
    if slot.is_none() {
        *slot = Some(reason);
    }
}
