//! Moves large parses onto a background worker thread.
//!
//! Requests carry a correlation id, the source and the options; the worker
//! answers on a oneshot channel with the tree or an error message. Inputs
//! below the size threshold are always parsed in the caller's context.
//!
//! Failure handling:
//!
//! - the worker thread cannot be spawned, or it dies (a panic drops the reply
//!   channel): the adapter marks itself failed for good and every later call
//!   parses synchronously, including the call that saw the failure
//! - the worker reports an error: that one call falls back to a synchronous
//!   parse and the worker stays in use
//!
//! Offload errors never reach the caller; only a failing synchronous fallback
//! does.

use crate::error::FormatError;
use crate::formats::markdown::parse_syntax_tree;
use crate::ir::nodes::Root;
use crate::options::PipelineOptions;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// The parse run on the worker thread.
pub type ParseJob =
    Arc<dyn Fn(&str, Option<&PipelineOptions>, bool) -> Result<Root, FormatError> + Send + Sync>;

const WORKER_THREAD_NAME: &str = "vmark-parse";

/// Why an offloaded parse did not produce a tree.
#[derive(Debug, Error)]
pub enum OffloadError {
    #[error("offloading is disabled after an earlier worker failure")]
    Disabled,
    #[error("failed to spawn parse worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("parse worker is gone")]
    WorkerGone,
    #[error("parse worker reported: {0}")]
    Worker(String),
}

/// Observable state of the background worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffloadState {
    /// No worker started yet.
    Idle,
    Running,
    /// Permanently falling back to synchronous parsing.
    Failed,
}

struct ParseRequest {
    id: u64,
    source: String,
    options: Option<PipelineOptions>,
    strict: bool,
    reply: oneshot::Sender<ParseResponse>,
}

struct ParseResponse {
    id: u64,
    outcome: Result<Root, String>,
}

enum Worker {
    Idle,
    Running(mpsc::Sender<ParseRequest>),
    Failed,
}

pub struct OffloadAdapter {
    threshold: usize,
    worker: Mutex<Worker>,
    next_id: AtomicU64,
    job: ParseJob,
}

impl OffloadAdapter {
    pub fn new(threshold: usize, enabled: bool) -> Self {
        Self::with_worker_job(threshold, enabled, Arc::new(parse_syntax_tree))
    }

    /// An adapter whose worker runs `job` instead of the markdown parser.
    pub fn with_worker_job(threshold: usize, enabled: bool, job: ParseJob) -> Self {
        OffloadAdapter {
            threshold,
            worker: Mutex::new(if enabled { Worker::Idle } else { Worker::Failed }),
            next_id: AtomicU64::new(1),
            job,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn state(&self) -> OffloadState {
        match &*self.lock() {
            Worker::Idle => OffloadState::Idle,
            Worker::Running(_) => OffloadState::Running,
            Worker::Failed => OffloadState::Failed,
        }
    }

    /// Parse `source`, on the worker when it is large enough.
    pub async fn parse(
        &self,
        source: &str,
        options: Option<&PipelineOptions>,
        strict: bool,
    ) -> Result<Root, FormatError> {
        if source.len() < self.threshold {
            return parse_syntax_tree(source, options, strict);
        }
        match self.offload(source, options, strict).await {
            Ok(root) => Ok(root),
            Err(OffloadError::Disabled) => parse_syntax_tree(source, options, strict),
            Err(err) => {
                warn!(error = %err, bytes = source.len(), "offloaded parse failed, parsing synchronously");
                parse_syntax_tree(source, options, strict)
            }
        }
    }

    async fn offload(
        &self,
        source: &str,
        options: Option<&PipelineOptions>,
        strict: bool,
    ) -> Result<Root, OffloadError> {
        let sender = self.sender()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, response) = oneshot::channel();
        let request = ParseRequest {
            id,
            source: source.to_string(),
            options: options.copied(),
            strict,
            reply,
        };
        if sender.send(request).is_err() {
            self.mark_failed();
            return Err(OffloadError::WorkerGone);
        }

        let Ok(response) = response.await else {
            error!("parse worker died, disabling offload");
            self.mark_failed();
            return Err(OffloadError::WorkerGone);
        };
        // Each request has its own reply channel.
        debug_assert_eq!(response.id, id);
        response.outcome.map_err(OffloadError::Worker)
    }

    /// The request channel, starting the worker on first use.
    fn sender(&self) -> Result<mpsc::Sender<ParseRequest>, OffloadError> {
        let mut worker = self.lock();
        match &*worker {
            Worker::Running(sender) => return Ok(sender.clone()),
            Worker::Failed => return Err(OffloadError::Disabled),
            Worker::Idle => {}
        }

        let (sender, receiver) = mpsc::channel();
        let job = Arc::clone(&self.job);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(receiver, job));
        match spawned {
            Ok(_) => {
                debug!("parse worker started");
                *worker = Worker::Running(sender.clone());
                Ok(sender)
            }
            Err(err) => {
                error!(error = %err, "could not start parse worker, disabling offload");
                *worker = Worker::Failed;
                Err(OffloadError::Spawn(err))
            }
        }
    }

    fn mark_failed(&self) {
        *self.lock() = Worker::Failed;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Worker> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_worker(requests: mpsc::Receiver<ParseRequest>, job: ParseJob) {
    while let Ok(request) = requests.recv() {
        debug!(id = request.id, bytes = request.source.len(), "parsing on worker");
        let outcome =
            job(&request.source, request.options.as_ref(), request.strict).map_err(|err| err.to_string());
        // The caller may have stopped waiting; its result is discarded.
        let _ = request.reply.send(ParseResponse {
            id: request.id,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{Block, Inline};

    fn job(
        f: impl Fn(&str, Option<&PipelineOptions>, bool) -> Result<Root, FormatError>
            + Send
            + Sync
            + 'static,
    ) -> ParseJob {
        Arc::new(f)
    }

    fn paragraph(text: &str) -> Root {
        Root {
            children: vec![Block::Paragraph(vec![Inline::Text(text.into())])],
        }
    }

    #[tokio::test]
    async fn small_inputs_stay_synchronous() {
        let adapter = OffloadAdapter::new(1024, true);
        let root = adapter.parse("hello", None, false).await.unwrap();
        assert_eq!(root, paragraph("hello"));
        assert_eq!(adapter.state(), OffloadState::Idle);
    }

    #[tokio::test]
    async fn large_inputs_run_on_the_worker() {
        let job = job(|source, _, _| Ok(paragraph(&format!("worker:{source}"))));
        let adapter = OffloadAdapter::with_worker_job(0, true, job);
        let root = adapter.parse("hello", None, false).await.unwrap();
        assert_eq!(root, paragraph("worker:hello"));
        assert_eq!(adapter.state(), OffloadState::Running);
    }

    #[tokio::test]
    async fn worker_errors_fall_back_for_one_call() {
        let job = job(|source, _, _| Err(FormatError::parse("boom", source)));
        let adapter = OffloadAdapter::with_worker_job(0, true, job);
        let root = adapter.parse("hello", None, false).await.unwrap();
        assert_eq!(root, paragraph("hello"));
        assert_eq!(adapter.state(), OffloadState::Running);
    }

    #[tokio::test]
    async fn dead_worker_disables_offload() {
        let job = job(|_, _, _| panic!("worker crashed"));
        let adapter = OffloadAdapter::with_worker_job(0, true, job);
        let root = adapter.parse("hello", None, false).await.unwrap();
        assert_eq!(root, paragraph("hello"));
        assert_eq!(adapter.state(), OffloadState::Failed);

        let root = adapter.parse("again", None, false).await.unwrap();
        assert_eq!(root, paragraph("again"));
    }

    #[tokio::test]
    async fn disabled_adapter_never_spawns() {
        let adapter = OffloadAdapter::new(0, false);
        assert_eq!(adapter.state(), OffloadState::Failed);
        let root = adapter.parse("hello", None, false).await.unwrap();
        assert_eq!(root, paragraph("hello"));
    }
}
