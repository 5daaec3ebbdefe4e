//! Document index backing taskdeck.
//!
//! Tasks are kept in insertion order in memory. When opened with a path the
//! full document list is rewritten to that file after every write.

mod error;

pub use error::DocumentStoreError;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use taskdeck_core::{PushableQuery, Task, TaskId, WriteStatus};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, DocumentStoreError>;

/// Ordered task documents with optional JSON file persistence.
#[derive(Debug, Default)]
pub struct DocumentStore {
    path: Option<PathBuf>,
    documents: Mutex<Vec<Task>>,
}

impl DocumentStore {
    /// Store that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading any documents already there.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let documents = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| DocumentStoreError::Io {
                path: path.clone(),
                source,
            })?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw).map_err(|source| DocumentStoreError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            Vec::new()
        };
        info!(path = %path.display(), documents = documents.len(), "Opened document store");
        Ok(Self {
            path: Some(path),
            documents: Mutex::new(documents),
        })
    }

    /// File the store persists to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored documents.
    ///
    /// # Errors
    /// Returns an error if the document lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// True when no documents are stored.
    ///
    /// # Errors
    /// Returns an error if the document lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Index `task` under a freshly minted id.
    ///
    /// Any id already on `task` is ignored.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned or persisting fails.
    pub fn create(&self, task: &Task) -> Result<(TaskId, WriteStatus)> {
        let id = TaskId::new(Uuid::now_v7().to_string());
        let mut documents = self.lock()?;
        let mut next = documents.clone();
        next.push(task.clone().with_id(id.clone()));
        self.commit(&mut documents, next)?;
        drop(documents);
        info!(%id, "Indexed task");
        Ok((id, WriteStatus::Created))
    }

    /// Fetch the document stored under `id`.
    ///
    /// # Errors
    /// Returns an error if the document lock is poisoned.
    pub fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let documents = self.lock()?;
        Ok(documents
            .iter()
            .find(|doc| doc.id.as_ref() == Some(id))
            .cloned())
    }

    /// Overwrite every field of the document stored under `id`.
    ///
    /// The document keeps its position in the index.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned or persisting fails.
    pub fn replace(&self, id: &TaskId, task: &Task) -> Result<WriteStatus> {
        let mut documents = self.lock()?;
        let Some(position) = position_of(&documents, id) else {
            debug!(%id, "Replace target missing");
            return Ok(WriteStatus::NotFound);
        };
        let mut next = documents.clone();
        next[position] = task.clone().with_id(id.clone());
        self.commit(&mut documents, next)?;
        drop(documents);
        info!(%id, "Replaced task");
        Ok(WriteStatus::Updated)
    }

    /// Remove the document stored under `id`.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned or persisting fails.
    pub fn delete(&self, id: &TaskId) -> Result<WriteStatus> {
        let mut documents = self.lock()?;
        let Some(position) = position_of(&documents, id) else {
            debug!(%id, "Delete target missing");
            return Ok(WriteStatus::NotFound);
        };
        let mut next = documents.clone();
        next.remove(position);
        self.commit(&mut documents, next)?;
        drop(documents);
        info!(%id, "Deleted task");
        Ok(WriteStatus::Deleted)
    }

    /// Documents matching `query`, in insertion order.
    ///
    /// # Errors
    /// Returns an error if the document lock is poisoned.
    pub fn search(&self, query: &PushableQuery) -> Result<Vec<Task>> {
        let documents = self.lock()?;
        let hits: Vec<Task> = documents
            .iter()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();
        drop(documents);
        debug!(query = %query.to_dsl(), hits = hits.len(), "Executed search");
        Ok(hits)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Task>>> {
        self.documents
            .lock()
            .map_err(|_| DocumentStoreError::LockPoisoned)
    }

    /// Persist `next` and only then make it the visible document list.
    fn commit(&self, current: &mut Vec<Task>, next: Vec<Task>) -> Result<()> {
        if let Some(path) = &self.path {
            write_atomically(path, &next)?;
        }
        *current = next;
        Ok(())
    }
}

fn position_of(documents: &[Task], id: &TaskId) -> Option<usize> {
    documents.iter().position(|doc| doc.id.as_ref() == Some(id))
}

fn write_atomically(path: &Path, documents: &[Task]) -> Result<()> {
    let io_err = |source: std::io::Error| DocumentStoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(io_err)?;

    let body = serde_json::to_vec_pretty(documents)?;
    let mut staged = NamedTempFile::new_in(parent).map_err(io_err)?;
    staged.write_all(&body).map_err(io_err)?;
    staged.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
