//! Storage contract the task engine is written against.

use anyhow::Error;
use taskdeck_core::{PushableQuery, Task, TaskId, WriteStatus};
use taskdeck_store_doc::{DocumentStore, DocumentStoreError};

/// Minimal storage abstraction required by [`TaskEngine`](crate::engine::TaskEngine).
pub trait TaskStore {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Persist a new task and return the id the store assigned to it.
    ///
    /// # Errors
    /// Returns a store-specific error when indexing fails.
    fn create(&self, task: &Task) -> Result<(TaskId, WriteStatus), Self::Error>;

    /// Load the task stored under `id`, or `None` when it does not exist.
    ///
    /// # Errors
    /// Returns a store-specific error when the lookup fails.
    fn get(&self, id: &TaskId) -> Result<Option<Task>, Self::Error>;

    /// Replace every field of the task stored under `id`.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn replace(&self, id: &TaskId, task: &Task) -> Result<WriteStatus, Self::Error>;

    /// Remove the task stored under `id`.
    ///
    /// # Errors
    /// Returns a store-specific error when the removal fails.
    fn delete(&self, id: &TaskId) -> Result<WriteStatus, Self::Error>;

    /// Run a pushable query. "No matches" is an empty list, not an error.
    ///
    /// # Errors
    /// Returns a store-specific error when the query cannot be executed.
    fn search(&self, query: &PushableQuery) -> Result<Vec<Task>, Self::Error>;
}

impl TaskStore for DocumentStore {
    type Error = DocumentStoreError;

    fn create(&self, task: &Task) -> Result<(TaskId, WriteStatus), Self::Error> {
        Self::create(self, task)
    }

    fn get(&self, id: &TaskId) -> Result<Option<Task>, Self::Error> {
        Self::get(self, id)
    }

    fn replace(&self, id: &TaskId, task: &Task) -> Result<WriteStatus, Self::Error> {
        Self::replace(self, id, task)
    }

    fn delete(&self, id: &TaskId) -> Result<WriteStatus, Self::Error> {
        Self::delete(self, id)
    }

    fn search(&self, query: &PushableQuery) -> Result<Vec<Task>, Self::Error> {
        Self::search(self, query)
    }
}

impl<S> TaskStore for &S
where
    S: TaskStore + ?Sized,
{
    type Error = S::Error;

    fn create(&self, task: &Task) -> Result<(TaskId, WriteStatus), Self::Error> {
        (*self).create(task)
    }

    fn get(&self, id: &TaskId) -> Result<Option<Task>, Self::Error> {
        (*self).get(id)
    }

    fn replace(&self, id: &TaskId, task: &Task) -> Result<WriteStatus, Self::Error> {
        (*self).replace(id, task)
    }

    fn delete(&self, id: &TaskId) -> Result<WriteStatus, Self::Error> {
        (*self).delete(id)
    }

    fn search(&self, query: &PushableQuery) -> Result<Vec<Task>, Self::Error> {
        (*self).search(query)
    }
}

impl<S> TaskStore for std::sync::Arc<S>
where
    S: TaskStore,
{
    type Error = S::Error;

    fn create(&self, task: &Task) -> Result<(TaskId, WriteStatus), Self::Error> {
        (**self).create(task)
    }

    fn get(&self, id: &TaskId) -> Result<Option<Task>, Self::Error> {
        (**self).get(id)
    }

    fn replace(&self, id: &TaskId, task: &Task) -> Result<WriteStatus, Self::Error> {
        (**self).replace(id, task)
    }

    fn delete(&self, id: &TaskId) -> Result<WriteStatus, Self::Error> {
        (**self).delete(id)
    }

    fn search(&self, query: &PushableQuery) -> Result<Vec<Task>, Self::Error> {
        (**self).search(query)
    }
}
