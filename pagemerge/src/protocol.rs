//! Messages exchanged between a [`MergeClient`](crate::client::MergeClient)
//! and its [`MergeWorker`](crate::worker::MergeWorker).
//!
//! The two sides share nothing but a pair of channels. Requests move the
//! source buffers into the worker; responses move the merged bytes back.
//! Every message carries the [`TaskId`] it belongs to, and responses are
//! matched to callers by that id alone, never by arrival order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MergeError, Result};
use crate::merge::MergedPdf;
use crate::plan::{MergePlan, PagePlanEntry, SourceBuffer};

/// Outcome of one merge task.
pub type MergeResult = std::result::Result<MergedPdf, MergeError>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier correlating a request with its response.
///
/// Ids are unique within the process and never zero; zero is reserved to
/// mean "no task" in the worker's active-task slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Rebuild an id from its raw value; `None` for zero.
    pub fn from_raw(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Raw value of the id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Kind of a request, echoed back on its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Merge a plan.
    Merge,
    /// Stop a running merge.
    Abort,
}

impl RequestKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Abort => "abort",
        }
    }
}

/// Message from client to worker.
#[derive(Debug)]
pub enum Request {
    /// Merge the given files. `buffers` and `pages_by_file` correspond
    /// positionally.
    Merge {
        /// Task the response must carry.
        id: TaskId,
        /// Source documents, moved in.
        buffers: Vec<SourceBuffer>,
        /// Per-file page plans.
        pages_by_file: Vec<Vec<PagePlanEntry>>,
    },

    /// Stop the task with this id if it is still running or queued.
    Abort {
        /// Task to stop.
        id: TaskId,
    },
}

impl Request {
    /// Package a plan as a merge request.
    pub fn merge(id: TaskId, plan: MergePlan) -> Self {
        let (buffers, pages_by_file) = plan.into_parts();
        Self::Merge {
            id,
            buffers,
            pages_by_file,
        }
    }

    /// Create an abort request.
    pub fn abort(id: TaskId) -> Self {
        Self::Abort { id }
    }

    /// Task this request refers to.
    pub fn id(&self) -> TaskId {
        match self {
            Self::Merge { id, .. } | Self::Abort { id } => *id,
        }
    }

    /// Kind of this request.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Merge { .. } => RequestKind::Merge,
            Self::Abort { .. } => RequestKind::Abort,
        }
    }
}

/// A merge request after shape validation.
#[derive(Debug)]
pub struct MergeJob {
    /// Task id.
    pub id: TaskId,
    /// The plan to run.
    pub plan: MergePlan,
}

impl MergeJob {
    /// Validate a merge request's shape and plan invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::MalformedPlan`] when buffers and page lists are
    /// not matched one to one, or when the plan itself is invalid.
    pub fn from_parts(
        id: TaskId,
        buffers: Vec<SourceBuffer>,
        pages_by_file: Vec<Vec<PagePlanEntry>>,
    ) -> Result<Self> {
        let plan = MergePlan::from_parts(buffers, pages_by_file)?;
        plan.validate()?;
        Ok(Self { id, plan })
    }
}

/// Message from worker to client.
#[derive(Debug)]
pub struct Response {
    /// Task this response answers.
    pub id: TaskId,
    /// Kind of the request being answered.
    pub kind: RequestKind,
    /// The merged document or the reason there is none.
    pub outcome: MergeResult,
}

impl Response {
    /// Build the response to a merge request.
    pub fn merge(id: TaskId, outcome: MergeResult) -> Self {
        Self {
            id,
            kind: RequestKind::Merge,
            outcome,
        }
    }

    /// Whether the task succeeded.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}
