//! Task engine: validation, existence checks and store calls for every operation.
//!
//! Each call is a self-contained read-then-write against the store. Nothing
//! guards the gap between the existence check and the write, so a concurrent
//! writer on the same id wins or loses at the store.

use anyhow::anyhow;
use taskdeck_core::{
    FilterSpec, StatusRule, Task, TaskId, ValidationError, WriteStatus, check_task, compile, merge,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::response::ResponseStatus;
use crate::task_store::TaskStore;

/// Errors surfaced by [`TaskEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Status or a date field failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The operation needs an id and none was given.
    #[error("task id is missing")]
    MissingId,
    /// No task is stored under the id.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// Backing store returned an error or an unexpected status.
    #[error("store error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl EngineError {
    /// Stable status signal for the error.
    #[must_use]
    pub const fn status(&self) -> ResponseStatus {
        match self {
            Self::Validation(_) | Self::MissingId => ResponseStatus::BadRequest,
            Self::NotFound(_) => ResponseStatus::NotFound,
            Self::Storage(_) => ResponseStatus::InternalServerError,
        }
    }

    fn store(err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        warn!(error = %err, "Store call failed");
        Self::Storage(err)
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Orchestrates validation, lookups and writes for task operations.
pub struct TaskEngine<S> {
    store: S,
}

impl<S> TaskEngine<S> {
    /// Wrap a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Expose a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S: TaskStore> TaskEngine<S> {
    /// Validate and persist a new task, returning it with its assigned id.
    ///
    /// # Errors
    /// Returns [`EngineError::Validation`] without contacting the store when
    /// the status is absent or invalid or a date is malformed, and
    /// [`EngineError::Storage`] when the store fails or does not acknowledge
    /// the creation.
    pub fn create(&self, task: Task) -> EngineResult<Task> {
        info!(title = ?task.title, "Creating task");
        check_task(&task, StatusRule::Required)?;

        let (id, status) = self.store.create(&task).map_err(EngineError::store)?;
        if status != WriteStatus::Created {
            return Err(EngineError::store(anyhow!(
                "store answered {status:?} instead of Created"
            )));
        }
        info!(%id, "Task created");
        Ok(task.with_id(id))
    }

    /// Fetch a task by id.
    ///
    /// # Errors
    /// Returns [`EngineError::MissingId`] for an absent or blank id,
    /// [`EngineError::NotFound`] when nothing is stored under it, and
    /// [`EngineError::Storage`] when the lookup fails.
    pub fn get(&self, id: Option<&str>) -> EngineResult<Task> {
        let id = TaskId::parse_present(id).ok_or(EngineError::MissingId)?;
        debug!(%id, "Getting task");
        self.lookup(&id)
    }

    /// Replace a stored task with `task` in full.
    ///
    /// # Errors
    /// Returns [`EngineError::MissingId`] or [`EngineError::Validation`]
    /// before any store call, [`EngineError::NotFound`] when the id is not
    /// stored, and [`EngineError::Storage`] on store failure.
    pub fn update(&self, task: &Task) -> EngineResult<WriteStatus> {
        let id = require_id(task.id.as_ref())?;
        info!(%id, "Updating task");
        check_task(task, StatusRule::Required)?;
        self.lookup(&id)?;

        let status = self.store.replace(&id, task).map_err(EngineError::store)?;
        written(status, id)
    }

    /// Merge the set fields of `patch` onto the stored task.
    ///
    /// # Errors
    /// Returns [`EngineError::MissingId`] or [`EngineError::Validation`]
    /// before any store call, [`EngineError::NotFound`] when the id is not
    /// stored, and [`EngineError::Storage`] on store failure.
    pub fn patch(&self, patch: &Task) -> EngineResult<WriteStatus> {
        let id = require_id(patch.id.as_ref())?;
        info!(%id, "Patching task");
        check_task(patch, StatusRule::Optional)?;
        let existing = self.lookup(&id)?;

        let merged = merge(existing, patch);
        let status = self.store.replace(&id, &merged).map_err(EngineError::store)?;
        written(status, id)
    }

    /// Delete a stored task.
    ///
    /// # Errors
    /// Returns [`EngineError::MissingId`] for an absent id,
    /// [`EngineError::NotFound`] when nothing is stored under it, and
    /// [`EngineError::Storage`] on store failure.
    pub fn delete(&self, id: Option<&str>) -> EngineResult<(TaskId, WriteStatus)> {
        let id = TaskId::parse_present(id).ok_or(EngineError::MissingId)?;
        info!(%id, "Deleting task");
        self.lookup(&id)?;

        let status = self.store.delete(&id).map_err(EngineError::store)?;
        let status = written(status, id.clone())?;
        Ok((id, status))
    }

    /// Search with a structured filter.
    ///
    /// Equality and date ranges run in the store; containment conditions
    /// are applied to the returned list, keeping its order.
    ///
    /// # Errors
    /// Returns [`EngineError::Storage`] when the store query fails.
    pub fn search(&self, spec: &FilterSpec) -> EngineResult<Vec<Task>> {
        let compiled = compile(spec);
        debug!(query = %compiled.query.to_dsl(), "Searching tasks");

        let hits = self.store.search(&compiled.query).map_err(EngineError::store)?;
        let found = hits.len();
        let tasks = compiled.residual.apply(hits);
        info!(found, kept = tasks.len(), "Search finished");
        Ok(tasks)
    }

    fn lookup(&self, id: &TaskId) -> EngineResult<Task> {
        match self.store.get(id).map_err(EngineError::store)? {
            Some(task) => Ok(task),
            None => {
                info!(%id, "Task not found");
                Err(EngineError::NotFound(id.clone()))
            }
        }
    }
}

fn require_id(id: Option<&TaskId>) -> EngineResult<TaskId> {
    TaskId::parse_present(id.map(TaskId::as_str)).ok_or(EngineError::MissingId)
}

fn written(status: WriteStatus, id: TaskId) -> EngineResult<WriteStatus> {
    if status.is_success() {
        info!(%id, ?status, "Store write finished");
        Ok(status)
    } else {
        Err(EngineError::NotFound(id))
    }
}
