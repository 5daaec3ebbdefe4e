//! Task model, validation, filter compilation and patch merging for taskdeck.
//!
//! Nothing in this crate performs I/O; the store and engine live in
//! `taskdeck-store-doc` and `taskdeck-app`.

/// Filter compilation into pushable and residual parts.
pub mod filter;
/// Identifier types.
pub mod id;
/// Partial-update merging.
pub mod merge;
/// Task status enumeration.
pub mod status;
/// The task record and its field names.
pub mod task;
/// Status and date validation.
pub mod validate;
/// Store write outcomes.
pub mod write;

pub use filter::{
    CompiledFilter, ContainsSpec, EqualsSpec, FilterSpec, Predicate, PushableQuery, ResidualFilter, compile,
};
pub use id::TaskId;
pub use merge::merge;
pub use status::{TaskStatus, UnknownStatus};
pub use task::{DateField, Task, TaskField};
pub use validate::{StatusRule, ValidationError, check_task, validate_date, validate_status, validate_task};
pub use write::WriteStatus;
