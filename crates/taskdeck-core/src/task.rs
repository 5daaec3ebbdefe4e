use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// A task record as exchanged with callers and the backing store.
///
/// Every field is optional so the same shape serves full records, partial
/// patches, and freshly submitted tasks that have no id yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier; `None` until the first successful create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    /// Short human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Raw status string as supplied by the caller.
    #[serde(default)]
    pub status: Option<String>,
    /// Responsible party.
    #[serde(default)]
    pub assignee: Option<String>,
    /// `YYYY-MM-DD` creation date.
    #[serde(default)]
    pub creation_date: Option<String>,
    /// `YYYY-MM-DD` completion date.
    #[serde(default)]
    pub completion_date: Option<String>,
    /// `YYYY-MM-DD` planned date.
    #[serde(default)]
    pub planned_date: Option<String>,
    /// Free-text security standards note.
    #[serde(default)]
    pub security_standards: Option<String>,
    /// Tag list; order is kept but not significant.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl Task {
    /// Return a copy of this task carrying the given id.
    #[must_use]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Read a string field by name.
    #[must_use]
    pub fn text(&self, field: TaskField) -> Option<&str> {
        match field {
            TaskField::Title => self.title.as_deref(),
            TaskField::Description => self.description.as_deref(),
            TaskField::Status => self.status.as_deref(),
            TaskField::Assignee => self.assignee.as_deref(),
            TaskField::SecurityStandards => self.security_standards.as_deref(),
        }
    }

    /// Read a date field by name.
    #[must_use]
    pub fn date(&self, field: DateField) -> Option<&str> {
        match field {
            DateField::CreationDate => self.creation_date.as_deref(),
            DateField::CompletionDate => self.completion_date.as_deref(),
            DateField::PlannedDate => self.planned_date.as_deref(),
        }
    }

    /// Tag list, empty when unset.
    #[must_use]
    pub fn tag_slice(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// Free-text fields that can appear in equality or containment filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskField {
    /// `title`
    Title,
    /// `description`
    Description,
    /// `status`
    Status,
    /// `assignee`
    Assignee,
    /// `securityStandards`
    SecurityStandards,
}

impl TaskField {
    /// Wire name of the field in stored documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Assignee => "assignee",
            Self::SecurityStandards => "securityStandards",
        }
    }
}

/// Date fields that accept range bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateField {
    /// `creationDate`
    CreationDate,
    /// `completionDate`
    CompletionDate,
    /// `plannedDate`
    PlannedDate,
}

impl DateField {
    /// Every date field, in document order.
    pub const ALL: [Self; 3] = [Self::CreationDate, Self::CompletionDate, Self::PlannedDate];

    /// Wire name of the field in stored documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreationDate => "creationDate",
            Self::CompletionDate => "completionDate",
            Self::PlannedDate => "plannedDate",
        }
    }
}
