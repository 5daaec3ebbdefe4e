use crate::task::Task;

/// Overlay the set fields of `patch` onto `existing`.
///
/// A field left `None` on the patch keeps the stored value, and an empty tag
/// list counts as unset rather than as a request to clear the tags. The id
/// and `securityStandards` always come from `existing`.
#[must_use]
pub fn merge(existing: Task, patch: &Task) -> Task {
    let Task {
        id,
        title,
        description,
        status,
        assignee,
        creation_date,
        completion_date,
        planned_date,
        security_standards,
        tags,
    } = existing;

    Task {
        id,
        title: overlay(title, patch.title.as_ref()),
        description: overlay(description, patch.description.as_ref()),
        status: overlay(status, patch.status.as_ref()),
        assignee: overlay(assignee, patch.assignee.as_ref()),
        creation_date: overlay(creation_date, patch.creation_date.as_ref()),
        completion_date: overlay(completion_date, patch.completion_date.as_ref()),
        planned_date: overlay(planned_date, patch.planned_date.as_ref()),
        security_standards,
        tags: match &patch.tags {
            Some(incoming) if !incoming.is_empty() => Some(incoming.clone()),
            _ => tags,
        },
    }
}

fn overlay<T: Clone>(current: Option<T>, incoming: Option<&T>) -> Option<T> {
    incoming.cloned().or(current)
}
