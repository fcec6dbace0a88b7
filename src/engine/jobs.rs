//! Job bookkeeping and the task queue boundary.

/// State of a `Job`.
///
/// Transitions are linear and monotonic:
/// `Queued -> Running -> {Done|Failed}`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobState {
    /// The job has been created but not picked up yet.
    #[default]
    Queued,
    /// The job is being executed.
    Running,
    /// The job finished successfully.
    Done,
    /// The job failed; see the error payload.
    Failed,
}

/// An asynchronous execution unit wrapping one query.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Job {
    /// UUID of the job.
    pub uuid: uuid::Uuid,
    /// UUID of the wrapped query.
    pub query_uuid: uuid::Uuid,
    /// Current state.
    pub state: JobState,
    /// Append-only log of human-readable progress messages.
    pub log: Vec<String>,
    /// Terminal error payload, set when `state` is `Failed`.
    pub error: Option<String>,
    /// Creation time.
    pub created: chrono::DateTime<chrono::Utc>,
    /// Time of the last state change or log message.
    pub updated: chrono::DateTime<chrono::Utc>,
}

impl Job {
    /// Construct a new queued job for the given query.
    pub fn new(query_uuid: uuid::Uuid) -> Self {
        let now = chrono::Utc::now();
        Self {
            uuid: uuid::Uuid::new_v4(),
            query_uuid,
            state: JobState::Queued,
            log: Vec::new(),
            error: None,
            created: now,
            updated: now,
        }
    }

    /// Append a log message.
    pub fn push_log(&mut self, message: impl Into<String>) {
        self.log.push(message.into());
        self.updated = chrono::Utc::now();
    }

    /// Move to the given state.
    ///
    /// The engine only ever advances states along
    /// `Queued -> Running -> {Done|Failed}`; re-execution of a query starts
    /// over at `Running`.
    pub fn advance(&mut self, state: JobState) {
        self.state = state;
        self.updated = chrono::Utc::now();
    }
}

/// Handle to an enqueued task.
#[derive(Debug)]
pub struct TaskHandle {
    /// UUID of the job that the task executes.
    pub job_uuid: uuid::Uuid,
    /// Join handle when the task runs on a Tokio runtime.
    join: Option<tokio::task::JoinHandle<()>>,
}

impl TaskHandle {
    /// Wait for the task to finish.  A no-op for queues that execute
    /// synchronously.
    pub async fn wait(self) {
        if let Some(join) = self.join {
            let _ = join.await;
        }
    }
}

/// The task queue boundary.
///
/// The engine hands the execution closure to the queue; the queue invokes
/// it exactly once per submission.  Implementations decide where and when.
pub trait TaskQueue: Send + Sync {
    /// Enqueue the task for the given job.
    fn enqueue(&self, job_uuid: uuid::Uuid, task: Box<dyn FnOnce() + Send + 'static>)
        -> TaskHandle;
}

/// Task queue that executes the task synchronously on the calling thread.
///
/// Used by the command line interface and by tests.
#[derive(Debug, Default)]
pub struct ImmediateTaskQueue;

impl TaskQueue for ImmediateTaskQueue {
    fn enqueue(
        &self,
        job_uuid: uuid::Uuid,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> TaskHandle {
        task();
        TaskHandle {
            job_uuid,
            join: None,
        }
    }
}

/// Task queue that dispatches tasks to a Tokio runtime's blocking pool.
#[derive(Debug)]
pub struct TokioTaskQueue {
    /// Handle to the runtime to spawn on.
    handle: tokio::runtime::Handle,
}

impl TokioTaskQueue {
    /// Construct with the given runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl TaskQueue for TokioTaskQueue {
    fn enqueue(
        &self,
        job_uuid: uuid::Uuid,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> TaskHandle {
        let join = self.handle.spawn_blocking(task);
        TaskHandle {
            job_uuid,
            join: Some(join),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::{ImmediateTaskQueue, Job, JobState, TaskQueue as _, TokioTaskQueue};

    #[test]
    fn job_starts_queued() {
        let query_uuid = uuid::Uuid::new_v4();

        let job = Job::new(query_uuid);

        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.query_uuid, query_uuid);
        assert!(job.log.is_empty());
        assert_eq!(job.error, None);
    }

    #[test]
    fn job_advances_and_logs() {
        let mut job = Job::new(uuid::Uuid::new_v4());

        job.advance(JobState::Running);
        job.push_log("started");
        job.advance(JobState::Done);

        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.log, vec![String::from("started")]);
    }

    #[test]
    fn immediate_queue_runs_synchronously() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_task = ran.clone();

        let handle = ImmediateTaskQueue.enqueue(
            uuid::Uuid::new_v4(),
            Box::new(move || {
                ran_in_task.store(true, Ordering::SeqCst);
            }),
        );

        assert!(ran.load(Ordering::SeqCst));
        assert!(handle.join.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tokio_queue_runs_on_runtime() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_task = ran.clone();
        let queue = TokioTaskQueue::new(tokio::runtime::Handle::current());

        let handle = queue.enqueue(
            uuid::Uuid::new_v4(),
            Box::new(move || {
                ran_in_task.store(true, Ordering::SeqCst);
            }),
        );
        handle.wait().await;

        assert!(ran.load(Ordering::SeqCst));
    }
}
