//! Bulk indexing session.
//!
//! Documents are queued on a shared channel and drained by a small pool of
//! workers. Each worker keeps its own NDJSON buffer and sends it to
//! `POST /_bulk` when it grows past `flush_bytes` or when `flush_interval`
//! elapses. Item outcomes are counted individually, so one rejected
//! document never stops the rest of the batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::error::IndexError;
use super::types::BulkResponse;

/// Default number of concurrent bulk writers.
const DEFAULT_WORKERS: usize = 4;

/// Default flush threshold per worker buffer (5 MB).
const DEFAULT_FLUSH_BYTES: usize = 5_000_000;

/// Default periodic flush.
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Default deadline for a whole session.
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(120);

/// Queued documents per worker before `add` waits.
const QUEUE_DEPTH_PER_WORKER: usize = 256;

/// Configuration for bulk sessions.
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Number of concurrent writers.
    pub workers: usize,

    /// Flush a worker's buffer once it holds this many bytes.
    pub flush_bytes: usize,

    /// Flush non-empty buffers at least this often.
    pub flush_interval: Duration,

    /// Deadline for the whole session, from creation to close.
    pub session_timeout: Duration,
}

impl BulkConfig {
    /// Set the session deadline.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Set the per-worker flush threshold.
    pub fn with_flush_bytes(mut self, bytes: usize) -> Self {
        self.flush_bytes = bytes;
        self
    }

    /// Set the periodic flush.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the number of writers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            flush_bytes: DEFAULT_FLUSH_BYTES,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

/// Aggregate outcome of a bulk session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkStats {
    /// Documents queued.
    pub added: u64,
    /// Documents the engine accepted.
    pub written: u64,
    /// Documents rejected or lost to a failed request.
    pub failed: u64,
    /// `_bulk` requests sent.
    pub requests: u64,
}

impl BulkStats {
    /// Turn any failed document into a [`IndexError::PartialBulkFailure`].
    pub fn ensure_complete(self, index: &str) -> Result<Self, IndexError> {
        if self.failed > 0 {
            return Err(IndexError::PartialBulkFailure {
                index: index.to_string(),
                written: self.written,
                failed: self.failed,
            });
        }
        Ok(self)
    }
}

#[derive(Debug, Default)]
struct Counters {
    added: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    requests: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> BulkStats {
        BulkStats {
            added: self.added.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
        }
    }
}

/// One queued document, already serialized.
#[derive(Debug)]
struct BulkItem {
    id: String,
    body: String,
}

/// A worker's pending NDJSON payload.
#[derive(Debug, Default)]
struct Buffer {
    ids: Vec<String>,
    payload: String,
}

impl Buffer {
    fn push(&mut self, index: &str, item: BulkItem) {
        let action = serde_json::json!({ "index": { "_index": index, "_id": item.id } });
        self.payload.push_str(&action.to_string());
        self.payload.push('\n');
        self.payload.push_str(&item.body);
        self.payload.push('\n');
        self.ids.push(item.id);
    }

    fn len_bytes(&self) -> usize {
        self.payload.len()
    }

    fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn take(&mut self) -> Buffer {
        std::mem::take(self)
    }
}

/// Sends buffers to the engine and records item outcomes.
#[derive(Debug)]
struct Flusher {
    http: reqwest::Client,
    url: String,
    index: String,
    counters: Arc<Counters>,
}

impl Flusher {
    async fn flush(&self, buffer: Buffer) {
        let count = buffer.ids.len() as u64;
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        match self.send(buffer.payload).await {
            Ok(response) => self.record(&buffer.ids, response),
            Err(e) => {
                warn!(index = %self.index, documents = count, error = %e, "bulk request failed");
                self.counters.failed.fetch_add(count, Ordering::Relaxed);
            }
        }
    }

    async fn send(&self, payload: String) -> Result<BulkResponse, IndexError> {
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(IndexError::from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| IndexError::Decode {
            message: e.to_string(),
        })
    }

    fn record(&self, ids: &[String], response: BulkResponse) {
        let mut written = 0u64;
        let mut failed = 0u64;

        for item in response.items.iter().flat_map(|entry| entry.values()) {
            if item.is_success() {
                written += 1;
            } else {
                failed += 1;
                match &item.error {
                    Some(cause) => warn!(
                        index = %self.index,
                        id = %item.id,
                        status = item.status,
                        "ERROR: {}: {}",
                        cause.kind,
                        cause.reason
                    ),
                    None => warn!(index = %self.index, id = %item.id, status = item.status, "document rejected"),
                }
            }
        }

        // Items the engine never reported on are treated as lost.
        let reported = written + failed;
        let sent = ids.len() as u64;
        if reported < sent {
            warn!(index = %self.index, missing = sent - reported, "bulk response omitted items");
            failed += sent - reported;
        }

        debug!(index = %self.index, written, failed, "bulk flush complete");
        self.counters.written.fetch_add(written, Ordering::Relaxed);
        self.counters.failed.fetch_add(failed, Ordering::Relaxed);
    }
}

/// An open bulk session against one index.
///
/// Dropping the session without calling [`BulkIndexer::close`] aborts its
/// workers; unflushed documents are discarded.
pub struct BulkIndexer {
    index: String,
    sender: Option<mpsc::Sender<BulkItem>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
    deadline: Instant,
    timeout: Duration,
}

impl BulkIndexer {
    /// Open a session. Must be called from within a Tokio runtime.
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: &str,
        index: &str,
        config: &BulkConfig,
    ) -> Self {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel(workers * QUEUE_DEPTH_PER_WORKER);
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let flusher = Arc::new(Flusher {
            http,
            url: format!("{base_url}/_bulk"),
            index: index.to_string(),
            counters: Arc::clone(&counters),
        });

        let handles = (0..workers)
            .map(|_| {
                tokio::spawn(run_worker(
                    Arc::clone(&receiver),
                    Arc::clone(&flusher),
                    config.flush_bytes,
                    config.flush_interval,
                ))
            })
            .collect();

        Self {
            index: index.to_string(),
            sender: Some(sender),
            workers: handles,
            counters,
            deadline: Instant::now() + config.session_timeout,
            timeout: config.session_timeout,
        }
    }

    /// Queue a document for indexing under `id`.
    ///
    /// Waits if the queue is full.
    pub async fn add<T: Serialize>(&self, id: &str, document: &T) -> Result<(), IndexError> {
        let body = serde_json::to_string(document).map_err(|e| IndexError::Encode {
            id: id.to_string(),
            message: e.to_string(),
        })?;

        let sender = self.sender.as_ref().ok_or_else(|| self.closed())?;
        if Instant::now() >= self.deadline {
            return Err(self.timed_out());
        }
        let item = BulkItem {
            id: id.to_string(),
            body,
        };

        match tokio::time::timeout_at(self.deadline, sender.send(item)).await {
            Ok(Ok(())) => {
                self.counters.added.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Ok(Err(_)) => Err(self.closed()),
            Err(_) => Err(self.timed_out()),
        }
    }

    /// Flush everything still buffered, wait for the workers and report.
    pub async fn close(mut self) -> Result<BulkStats, IndexError> {
        self.sender.take();
        let workers = std::mem::take(&mut self.workers);
        let aborts: Vec<_> = workers.iter().map(|h| h.abort_handle()).collect();

        match tokio::time::timeout_at(self.deadline, join_all(workers)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        error!(index = %self.index, error = %e, "bulk worker crashed");
                    }
                }
            }
            Err(_) => {
                for abort in aborts {
                    abort.abort();
                }
                return Err(self.timed_out());
            }
        }

        Ok(self.counters.snapshot())
    }

    /// Current counters, without closing the session.
    pub fn stats(&self) -> BulkStats {
        self.counters.snapshot()
    }

    fn closed(&self) -> IndexError {
        IndexError::SessionClosed {
            index: self.index.clone(),
        }
    }

    fn timed_out(&self) -> IndexError {
        IndexError::Timeout {
            index: self.index.clone(),
            secs: self.timeout.as_secs(),
        }
    }
}

impl Drop for BulkIndexer {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

async fn run_worker(
    receiver: Arc<Mutex<mpsc::Receiver<BulkItem>>>,
    flusher: Arc<Flusher>,
    flush_bytes: usize,
    flush_interval: Duration,
) {
    let mut buffer = Buffer::default();
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.tick().await; // First tick is immediate, skip it

    loop {
        tokio::select! {
            item = next_item(&receiver) => match item {
                Some(item) => {
                    buffer.push(&flusher.index, item);
                    if buffer.len_bytes() >= flush_bytes {
                        flusher.flush(buffer.take()).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flusher.flush(buffer.take()).await;
                }
            }
        }
    }

    if !buffer.is_empty() {
        flusher.flush(buffer.take()).await;
    }
}

async fn next_item(receiver: &Mutex<mpsc::Receiver<BulkItem>>) -> Option<BulkItem> {
    receiver.lock().await.recv().await
}
