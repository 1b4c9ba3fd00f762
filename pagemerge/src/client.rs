//! Controlling side of the merge worker.
//!
//! A [`MergeClient`] owns one [`MergeWorker`](crate::worker::MergeWorker) and
//! tracks at most one current task. Every call to
//! [`request_merge`](MergeClient::request_merge) yields a future that
//! resolves exactly once: with the merged PDF, with the merge error, or with
//! [`MergeError::Cancelled`] if the task was aborted or replaced by a newer
//! one first.
//!
//! # Examples
//!
//! ```no_run
//! use pagemerge::client::MergeClient;
//! use pagemerge::plan::{MergePlan, PagePlanEntry, Rotation};
//! use pagemerge::Config;
//!
//! # async fn example(pdf: Vec<u8>) -> pagemerge::Result<()> {
//! let client = MergeClient::spawn(Config::default())?;
//!
//! let plan = MergePlan::new().with_file(pdf, vec![PagePlanEntry::new(1, 1, Rotation::None)]);
//! let merged = client.request_merge(plan).await?;
//! println!("{} pages", merged.page_count);
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{MergeError, Result};
use crate::plan::MergePlan;
use crate::protocol::{MergeResult, Request, Response, TaskId};
use crate::worker::{MergeWorker, WorkerHandle};

#[derive(Default)]
struct ClientState {
    /// The task whose result the caller is waiting for.
    current: Option<TaskId>,
    /// Resolvers for unanswered requests.
    pending: HashMap<TaskId, oneshot::Sender<MergeResult>>,
    /// Aborted task the worker has not answered yet.
    stopping: Option<TaskId>,
}

impl ClientState {
    fn resolve(&mut self, id: TaskId, outcome: MergeResult) -> bool {
        match self.pending.remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// Handle for submitting merges to a background worker.
pub struct MergeClient {
    requests: mpsc::UnboundedSender<Request>,
    state: Arc<Mutex<ClientState>>,
    worker: JoinHandle<()>,
    router: JoinHandle<()>,
}

impl MergeClient {
    /// Start a worker with `config` and a client connected to it.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidConfig`] if the configuration is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(config: Config) -> Result<Self> {
        Ok(Self::from_handle(MergeWorker::spawn(config)?))
    }

    pub(crate) fn from_handle(handle: WorkerHandle) -> Self {
        let WorkerHandle {
            requests,
            responses,
            task,
        } = handle;

        let state = Arc::new(Mutex::new(ClientState::default()));
        let router = tokio::spawn(route_responses(responses, Arc::clone(&state)));

        Self {
            requests,
            state,
            worker: task,
            router,
        }
    }

    /// Submit a plan. The plan's buffers move into the worker.
    ///
    /// The new task becomes current. A task that was current before is
    /// superseded: its caller receives [`MergeError::Cancelled`] right away
    /// and the worker stops it at its next checkpoint.
    ///
    /// The returned future does not need to be polled for the merge to run.
    pub fn request_merge(
        &self,
        plan: MergePlan,
    ) -> impl Future<Output = MergeResult> + Send + 'static {
        let id = TaskId::next();
        let (waiter, result) = oneshot::channel();

        {
            let mut state = self.state.lock();
            if let Some(previous) = state.current.replace(id) {
                debug!(task = %previous, by = %id, "superseding current task");
                state.resolve(previous, Err(MergeError::Cancelled));
            }
            state.pending.insert(id, waiter);
        }

        debug!(
            task = %id,
            files = plan.len(),
            bytes = plan.total_bytes(),
            "sending merge request"
        );
        if self.requests.send(Request::merge(id, plan)).is_err() {
            let mut state = self.state.lock();
            state.pending.remove(&id);
            if state.current == Some(id) {
                state.current = None;
            }
        }

        async move { result.await.unwrap_or(Err(MergeError::WorkerUnavailable)) }
    }

    /// Abort the current task.
    ///
    /// Returns `false` and does nothing when no task is in flight. Otherwise
    /// the pending caller resolves with [`MergeError::Cancelled`]
    /// immediately, the worker is told to stop, and the task counts as
    /// stopping until the worker answers it.
    pub fn abort(&self) -> bool {
        let id = {
            let mut state = self.state.lock();
            let Some(id) = state.current.take() else {
                return false;
            };
            state.resolve(id, Err(MergeError::Cancelled));
            state.stopping = Some(id);
            id
        };

        info!(task = %id, "aborting merge");
        self.send_abort(id);
        true
    }

    /// Send the abort signal again for a task the worker has not answered.
    ///
    /// Returns `false` when no task is stopping.
    pub fn resend_abort(&self) -> bool {
        let Some(id) = self.state.lock().stopping else {
            return false;
        };

        debug!(task = %id, "resending abort");
        self.send_abort(id);
        true
    }

    fn send_abort(&self, id: TaskId) {
        if self.requests.send(Request::abort(id)).is_err() {
            debug!(task = %id, "worker gone, nothing to abort");
            let mut state = self.state.lock();
            if state.stopping == Some(id) {
                state.stopping = None;
            }
        }
    }

    /// Whether a task is in flight.
    pub fn is_busy(&self) -> bool {
        self.state.lock().current.is_some()
    }

    /// The task in flight, if any.
    pub fn current_task(&self) -> Option<TaskId> {
        self.state.lock().current
    }

    /// Whether an aborted task is still waiting for the worker to stop.
    pub fn is_stopping(&self) -> bool {
        self.state.lock().stopping.is_some()
    }

    /// Close the worker's request channel and wait for it to exit.
    ///
    /// Unanswered requests resolve with [`MergeError::WorkerUnavailable`].
    pub async fn shutdown(self) {
        let Self {
            requests,
            worker,
            router,
            ..
        } = self;
        drop(requests);

        if let Err(e) = worker.await {
            debug!(error = %e, "worker task ended abnormally");
        }
        if let Err(e) = router.await {
            debug!(error = %e, "router task ended abnormally");
        }
    }
}

/// Deliver worker responses to their callers by task id.
async fn route_responses(
    mut responses: mpsc::UnboundedReceiver<Response>,
    state: Arc<Mutex<ClientState>>,
) {
    while let Some(response) = responses.recv().await {
        let Response { id, outcome, .. } = response;

        let delivered = {
            let mut state = state.lock();
            if state.stopping == Some(id) {
                state.stopping = None;
                debug!(task = %id, "worker acknowledged abort");
            }
            if state.current == Some(id) {
                state.current = None;
            }
            state.resolve(id, outcome)
        };

        if !delivered {
            debug!(task = %id, "dropping stale response");
        }
    }

    let mut state = state.lock();
    for (_, waiter) in state.pending.drain() {
        let _ = waiter.send(Err(MergeError::WorkerUnavailable));
    }
    state.current = None;
    state.stopping = None;
}
