//! Background merge worker.
//!
//! A [`MergeWorker`] is an actor: it owns its [`Merger`], receives
//! [`Request`]s over a channel and answers every merge request with exactly
//! one [`Response`]. Merges run one at a time on the blocking thread pool.
//!
//! Cancellation is cooperative. The worker keeps the id of the task that is
//! allowed to run in an [`ActiveTask`] slot; the running merge compares its
//! own id against that slot at each checkpoint and stops with
//! [`MergeError::Cancelled`] once they differ. An abort clears the slot, and
//! a newer merge request overwrites it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{MergeError, Result};
use crate::merge::{CancelCheck, Merger};
use crate::protocol::{MergeJob, MergeResult, Request, Response, TaskId};

/// The id of the task currently allowed to run, or none.
#[derive(Debug, Default)]
pub struct ActiveTask(AtomicU64);

impl ActiveTask {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active task, if any.
    pub fn get(&self) -> Option<TaskId> {
        TaskId::from_raw(self.0.load(Ordering::Acquire))
    }

    /// Make `id` the active task, deactivating any other.
    pub fn set(&self, id: TaskId) {
        self.0.store(id.get(), Ordering::Release);
    }

    /// Deactivate `id`. Returns `false` if another task (or none) was active.
    pub fn clear_if(&self, id: TaskId) -> bool {
        self.0
            .compare_exchange(id.get(), 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Deactivate whatever task is active.
    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }

    /// Whether `id` is the active task.
    pub fn is(&self, id: TaskId) -> bool {
        self.0.load(Ordering::Acquire) == id.get()
    }
}

/// Cancel check handed to one running merge.
struct TaskCancel {
    active: Arc<ActiveTask>,
    id: TaskId,
}

impl CancelCheck for TaskCancel {
    fn is_cancelled(&self) -> bool {
        !self.active.is(self.id)
    }
}

/// The client side of a spawned worker's channels.
#[derive(Debug)]
pub struct WorkerHandle {
    /// Requests into the worker.
    pub requests: mpsc::UnboundedSender<Request>,
    /// Responses out of the worker.
    pub responses: mpsc::UnboundedReceiver<Response>,
    /// The actor task; finishes once every request sender is dropped.
    pub task: JoinHandle<()>,
}

struct Running {
    id: TaskId,
    handle: JoinHandle<MergeResult>,
}

/// Merge actor; see the module docs.
pub struct MergeWorker {
    merger: Arc<Merger>,
    active: Arc<ActiveTask>,
    requests: mpsc::UnboundedReceiver<Request>,
    responses: mpsc::UnboundedSender<Response>,
    running: Option<Running>,
    queued: Option<MergeJob>,
}

impl MergeWorker {
    /// Validate `config` and start a worker on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidConfig`] if the configuration is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(config: Config) -> Result<WorkerHandle> {
        config.validate()?;

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let worker = Self {
            merger: Arc::new(Merger::new(config)),
            active: Arc::new(ActiveTask::new()),
            requests: request_rx,
            responses: response_tx,
            running: None,
            queued: None,
        };
        let task = tokio::spawn(worker.run());

        Ok(WorkerHandle {
            requests: request_tx,
            responses: response_rx,
            task,
        })
    }

    async fn run(mut self) {
        info!(
            batch_size = self.merger.config().batch_size,
            "merge worker started"
        );

        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => break,
                },
                joined = join_running(&mut self.running), if self.running.is_some() => {
                    self.finish_running(joined);
                }
            }
        }

        self.active.clear();
        if let Some(job) = self.queued.take() {
            self.respond(job.id, Err(MergeError::Cancelled));
        }
        info!("merge worker stopped");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Merge {
                id,
                buffers,
                pages_by_file,
            } => {
                self.supersede(id);
                match MergeJob::from_parts(id, buffers, pages_by_file) {
                    Ok(job) if self.running.is_some() => {
                        debug!(task = %id, "queued behind running merge");
                        self.active.set(id);
                        self.queued = Some(job);
                    }
                    Ok(job) => self.start(job),
                    Err(e) => {
                        debug!(task = %id, error = %e, "rejected merge request");
                        self.respond(id, Err(e));
                    }
                }
            }
            Request::Abort { id } => self.abort(id),
        }
    }

    /// Make room for task `id`: stop the running merge and drop the queued one.
    fn supersede(&mut self, id: TaskId) {
        if let Some(previous) = self.queued.take() {
            debug!(task = %previous.id, by = %id, "queued merge superseded");
            self.respond(previous.id, Err(MergeError::Cancelled));
        }
        if let Some(running) = &self.running
            && self.active.clear_if(running.id)
        {
            debug!(task = %running.id, by = %id, "running merge superseded");
        }
    }

    fn abort(&mut self, id: TaskId) {
        if self.queued.as_ref().is_some_and(|job| job.id == id) {
            self.queued = None;
            self.active.clear_if(id);
            info!(task = %id, "queued merge aborted");
            self.respond(id, Err(MergeError::Cancelled));
            return;
        }

        if self.running.as_ref().is_some_and(|r| r.id == id) {
            self.active.clear_if(id);
            info!(task = %id, "abort requested for running merge");
            return;
        }

        debug!(task = %id, "abort for task that is not running");
    }

    fn start(&mut self, job: MergeJob) {
        let MergeJob { id, plan } = job;
        info!(
            task = %id,
            files = plan.len(),
            pages = plan.total_pages(),
            "starting merge"
        );

        self.active.set(id);
        let merger = Arc::clone(&self.merger);
        let cancel = TaskCancel {
            active: Arc::clone(&self.active),
            id,
        };
        let handle = task::spawn_blocking(move || merger.merge(id, plan, &cancel));
        self.running = Some(Running { id, handle });
    }

    fn finish_running(&mut self, joined: std::result::Result<MergeResult, JoinError>) {
        let Some(Running { id, .. }) = self.running.take() else {
            return;
        };
        self.active.clear_if(id);

        let outcome = joined.unwrap_or_else(|e| {
            warn!(task = %id, error = %e, "merge task panicked");
            Err(MergeError::serialize(format!("merge task failed: {e}")))
        });

        match &outcome {
            Ok(merged) => debug!(task = %id, pages = merged.page_count, "merge succeeded"),
            Err(e) if e.is_cancelled() => info!(task = %id, "merge cancelled"),
            Err(e) => warn!(task = %id, error = %e, "merge failed"),
        }
        self.respond(id, outcome);

        if let Some(job) = self.queued.take() {
            self.start(job);
        }
    }

    fn respond(&self, id: TaskId, outcome: MergeResult) {
        if self.responses.send(Response::merge(id, outcome)).is_err() {
            debug!(task = %id, "response dropped, client is gone");
        }
    }
}

async fn join_running(
    running: &mut Option<Running>,
) -> std::result::Result<MergeResult, JoinError> {
    match running {
        Some(running) => (&mut running.handle).await,
        None => std::future::pending().await,
    }
}
