use serde::{Deserialize, Serialize};

/// Outcome reported by the store for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// A new document was indexed.
    Created,
    /// An existing document was replaced.
    Updated,
    /// An existing document was removed.
    Deleted,
    /// The addressed document does not exist.
    NotFound,
}

impl WriteStatus {
    /// True for every status except [`WriteStatus::NotFound`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::NotFound)
    }
}
