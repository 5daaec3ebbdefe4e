//! Bounded worker dispatch for engine requests.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::engine::TaskEngine;
use crate::response::{ResponseStatus, TaskRequest, TaskResponse, handle};
use crate::task_store::TaskStore;

/// Runs each request on the blocking pool, at most `workers` at a time.
pub struct TaskDispatcher<S> {
    engine: Arc<TaskEngine<S>>,
    permits: Arc<Semaphore>,
    workers: NonZeroUsize,
}

impl<S> Clone for TaskDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            permits: Arc::clone(&self.permits),
            workers: self.workers,
        }
    }
}

impl<S> TaskDispatcher<S>
where
    S: TaskStore + Send + Sync + 'static,
{
    /// Wrap `engine` behind a pool of `workers` concurrent slots.
    #[must_use]
    pub fn new(engine: TaskEngine<S>, workers: NonZeroUsize) -> Self {
        Self {
            engine: Arc::new(engine),
            permits: Arc::new(Semaphore::new(workers.get())),
            workers,
        }
    }

    /// Configured number of concurrent slots.
    #[must_use]
    pub const fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Shared engine the workers run against.
    #[must_use]
    pub fn engine(&self) -> &TaskEngine<S> {
        &self.engine
    }

    /// Run one request and produce exactly one response.
    ///
    /// Waits for a free slot first. A worker that panics yields a 500.
    pub async fn dispatch(&self, request: TaskRequest) -> TaskResponse {
        let operation = request.operation();
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            warn!(operation, "Worker pool closed");
            return TaskResponse::error(ResponseStatus::InternalServerError, "worker pool closed");
        };
        debug!(operation, "Dispatching request");

        let engine = Arc::clone(&self.engine);
        let joined = tokio::task::spawn_blocking(move || {
            let response = handle(&engine, request);
            drop(permit);
            response
        })
        .await;

        joined.unwrap_or_else(|err| {
            warn!(operation, error = %err, "Worker failed");
            TaskResponse::error(
                ResponseStatus::InternalServerError,
                format!("{operation} worker failed: {err}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use taskdeck_core::{FilterSpec, PushableQuery, Task, TaskId, WriteStatus};
    use taskdeck_store_doc::DocumentStore;

    /// Store whose searches sleep and record the highest overlap seen.
    #[derive(Default)]
    struct SlowStore {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TaskStore for SlowStore {
        type Error = anyhow::Error;

        fn create(&self, _task: &Task) -> Result<(TaskId, WriteStatus), Self::Error> {
            Ok((TaskId::new("1"), WriteStatus::Created))
        }

        fn get(&self, _id: &TaskId) -> Result<Option<Task>, Self::Error> {
            panic!("lookup exploded");
        }

        fn replace(&self, _id: &TaskId, _task: &Task) -> Result<WriteStatus, Self::Error> {
            Ok(WriteStatus::Updated)
        }

        fn delete(&self, _id: &TaskId) -> Result<WriteStatus, Self::Error> {
            Ok(WriteStatus::Deleted)
        }

        fn search(&self, _query: &PushableQuery) -> Result<Vec<Task>, Self::Error> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn workers(count: usize) -> NonZeroUsize {
        NonZeroUsize::new(count).unwrap_or_else(|| panic!("worker count must be non-zero"))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_never_exceeds_worker_count() {
        let dispatcher = TaskDispatcher::new(TaskEngine::new(SlowStore::default()), workers(2));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .dispatch(TaskRequest::Search(FilterSpec::default()))
                        .await
                })
            })
            .collect();
        for handle in handles {
            let response = handle
                .await
                .unwrap_or_else(|err| panic!("dispatch task failed: {err}"));
            assert_eq!(response.status, ResponseStatus::Ok);
        }

        let peak = dispatcher.engine().store().peak.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= 2, "peak concurrency {peak} exceeded two workers");
        assert_eq!(dispatcher.workers().get(), 2);
    }

    #[tokio::test]
    async fn panicking_worker_becomes_internal_error() {
        let dispatcher = TaskDispatcher::new(TaskEngine::new(SlowStore::default()), workers(1));

        let response = dispatcher.dispatch(TaskRequest::Get(Some("1".into()))).await;
        assert_eq!(response.status, ResponseStatus::InternalServerError);

        // The slot is released even though the worker panicked.
        let response = dispatcher.dispatch(TaskRequest::Search(FilterSpec::default())).await;
        assert_eq!(response.status, ResponseStatus::Ok);
    }

    #[tokio::test]
    async fn dispatch_runs_engine_operations() {
        let dispatcher = TaskDispatcher::new(TaskEngine::new(DocumentStore::in_memory()), workers(4));
        let task = Task {
            title: Some("Ship".into()),
            status: Some("PLANNED".into()),
            ..Task::default()
        };

        let created = dispatcher.dispatch(TaskRequest::Create(task)).await;
        assert_eq!(created.status, ResponseStatus::Created);

        let missing = dispatcher.dispatch(TaskRequest::Delete(None)).await;
        assert_eq!(missing.status, ResponseStatus::BadRequest);
        assert_eq!(dispatcher.engine().store().len().unwrap_or_default(), 1);
    }
}
