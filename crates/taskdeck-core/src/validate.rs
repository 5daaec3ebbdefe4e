//! Field validation applied before a task reaches the store.
//!
//! The boolean predicates are pure and never fail; [`check_task`] combines
//! them into a typed error for callers that need to report which field was
//! rejected.

use thiserror::Error;

use crate::status::TaskStatus;
use crate::task::{DateField, Task};

/// Reason a task was rejected before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Status is required for this operation but was not supplied.
    #[error("status is required")]
    MissingStatus,
    /// Status is not one of the known values.
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    /// A date field does not match `YYYY-MM-DD`.
    #[error("invalid {field}: {value} (expected YYYY-MM-DD)")]
    InvalidDate {
        /// Offending field.
        field: &'static str,
        /// Value that failed the check.
        value: String,
    },
}

/// Whether the status must be present for the operation being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    /// Create and full update.
    Required,
    /// Patch: an absent status leaves the stored one untouched.
    Optional,
}

/// True when `status` is absent or names a [`TaskStatus`], ignoring case.
#[must_use]
pub fn validate_status(status: Option<&str>) -> bool {
    status.is_none_or(|value| value.parse::<TaskStatus>().is_ok())
}

/// True when `date` is absent or is exactly four digits, dash, two digits,
/// dash, two digits. Calendar validity is not checked.
#[must_use]
pub fn validate_date(date: Option<&str>) -> bool {
    date.is_none_or(is_date_shaped)
}

/// Conjunction of the date checks for every date field on `task`.
#[must_use]
pub fn validate_task(task: &Task) -> bool {
    DateField::ALL
        .into_iter()
        .all(|field| validate_date(task.date(field)))
}

/// Validate status and dates, reporting the first rejected field.
///
/// # Errors
/// Returns the first [`ValidationError`] found, status before dates.
pub fn check_task(task: &Task, rule: StatusRule) -> Result<(), ValidationError> {
    match (task.status.as_deref(), rule) {
        (None, StatusRule::Required) => return Err(ValidationError::MissingStatus),
        (Some(value), _) if !validate_status(Some(value)) => {
            return Err(ValidationError::InvalidStatus(value.to_owned()));
        }
        _ => {}
    }

    for field in DateField::ALL {
        let value = task.date(field);
        if !validate_date(value) {
            return Err(ValidationError::InvalidDate {
                field: field.as_str(),
                value: value.unwrap_or_default().to_owned(),
            });
        }
    }
    Ok(())
}

fn is_date_shaped(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, byte)| match idx {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}
