//! Compile structured search requests into a store query plus an in-memory pass.
//!
//! Equality and date-range conditions are pushed to the store as a
//! [`PushableQuery`]. Substring and tag containment are not assumed to be
//! expressible there, so they become a [`ResidualFilter`] applied to whatever
//! the store returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::task::{DateField, Task, TaskField};

/// Search request as submitted by callers. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Exact-match conditions.
    #[serde(default)]
    pub equals: Option<EqualsSpec>,
    /// Inclusive lower bound on `creationDate`.
    #[serde(default)]
    pub creation_date_from: Option<String>,
    /// Inclusive upper bound on `creationDate`.
    #[serde(default)]
    pub creation_date_to: Option<String>,
    /// Inclusive lower bound on `completionDate`.
    #[serde(default)]
    pub completion_date_from: Option<String>,
    /// Inclusive upper bound on `completionDate`.
    #[serde(default)]
    pub completion_date_to: Option<String>,
    /// Inclusive lower bound on `plannedDate`.
    #[serde(default)]
    pub planned_date_from: Option<String>,
    /// Inclusive upper bound on `plannedDate`.
    #[serde(default)]
    pub planned_date_to: Option<String>,
    /// Containment conditions evaluated after retrieval.
    #[serde(default)]
    pub contains: Option<ContainsSpec>,
}

/// Exact-match conditions keyed by field.
///
/// `statusIs` and `assigneeIs` are accepted as aliases used by older clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualsSpec {
    /// Required `title`.
    #[serde(default)]
    pub title: Option<String>,
    /// Required `description`.
    #[serde(default)]
    pub description: Option<String>,
    /// Required `status`.
    #[serde(default, alias = "statusIs")]
    pub status: Option<String>,
    /// Required `assignee`.
    #[serde(default, alias = "assigneeIs")]
    pub assignee: Option<String>,
    /// Required `securityStandards`.
    #[serde(default)]
    pub security_standards: Option<String>,
}

impl EqualsSpec {
    fn terms(&self) -> impl Iterator<Item = (TaskField, &str)> {
        [
            (TaskField::Title, self.title.as_deref()),
            (TaskField::Description, self.description.as_deref()),
            (TaskField::Status, self.status.as_deref()),
            (TaskField::Assignee, self.assignee.as_deref()),
            (TaskField::SecurityStandards, self.security_standards.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
    }
}

/// Containment conditions keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainsSpec {
    /// Substring required in `title`.
    #[serde(default)]
    pub title: Option<String>,
    /// Substring required in `description`.
    #[serde(default)]
    pub description: Option<String>,
    /// Substring required in `status`.
    #[serde(default)]
    pub status: Option<String>,
    /// Substring required in `assignee`.
    #[serde(default)]
    pub assignee: Option<String>,
    /// Tags that must all be present on the task.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A single condition the store can evaluate natively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field equals the value exactly.
    Term {
        /// Field being compared.
        field: TaskField,
        /// Required value.
        value: String,
    },
    /// Date field lies within inclusive bounds; at least one bound is set.
    Range {
        /// Field being compared.
        field: DateField,
        /// Inclusive lower bound.
        gte: Option<String>,
        /// Inclusive upper bound.
        lte: Option<String>,
    },
}

impl Predicate {
    /// Evaluate the predicate against a task.
    ///
    /// Dates compare lexicographically, which orders `YYYY-MM-DD` values
    /// chronologically. A task without the date never satisfies a range.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::Term { field, value } => task.text(*field) == Some(value.as_str()),
            Self::Range { field, gte, lte } => task.date(*field).is_some_and(|date| {
                gte.as_deref().is_none_or(|lower| date >= lower)
                    && lte.as_deref().is_none_or(|upper| date <= upper)
            }),
        }
    }

    fn to_dsl(&self) -> Value {
        match self {
            Self::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Self::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(lower) = gte {
                    bounds.insert("gte".into(), Value::String(lower.clone()));
                }
                if let Some(upper) = lte {
                    bounds.insert("lte".into(), Value::String(upper.clone()));
                }
                json!({ "range": { field.as_str(): bounds } })
            }
        }
    }
}

/// Conjunction of predicates pushed to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushableQuery {
    must: Vec<Predicate>,
}

impl PushableQuery {
    /// Query that matches every document.
    #[must_use]
    pub const fn match_all() -> Self {
        Self { must: Vec::new() }
    }

    /// Predicates combined with AND.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.must
    }

    /// True when no predicate restricts the result.
    #[must_use]
    pub const fn is_match_all(&self) -> bool {
        self.must.is_empty()
    }

    /// Evaluate every predicate against `task`.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.must.iter().all(|predicate| predicate.matches(task))
    }

    /// Render as a document-search boolean query.
    #[must_use]
    pub fn to_dsl(&self) -> Value {
        if self.must.is_empty() {
            return json!({ "match_all": {} });
        }
        let must: Vec<Value> = self.must.iter().map(Predicate::to_dsl).collect();
        json!({ "bool": { "must": must } })
    }
}

/// Conditions applied to retrieved tasks in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidualFilter {
    substrings: Vec<(TaskField, String)>,
    tags: Vec<String>,
}

impl ResidualFilter {
    /// True when the filter keeps every task.
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        self.substrings.is_empty() && self.tags.is_empty()
    }

    /// Whether `task` satisfies every containment condition.
    ///
    /// A condition against a field the task does not have excludes the task.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        let substrings_ok = self.substrings.iter().all(|(field, needle)| {
            task.text(*field)
                .is_some_and(|value| value.contains(needle.as_str()))
        });
        substrings_ok
            && self
                .tags
                .iter()
                .all(|wanted| task.tag_slice().iter().any(|tag| tag == wanted))
    }

    /// Keep the matching tasks, preserving their order.
    #[must_use]
    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        if self.is_pass_through() {
            return tasks;
        }
        tasks.into_iter().filter(|task| self.matches(task)).collect()
    }
}

/// Output of [`compile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    /// Part evaluated by the store.
    pub query: PushableQuery,
    /// Part evaluated after retrieval.
    pub residual: ResidualFilter,
}

/// Split a [`FilterSpec`] into its pushable and residual halves.
#[must_use]
pub fn compile(spec: &FilterSpec) -> CompiledFilter {
    let mut must = Vec::new();

    if let Some(equals) = &spec.equals {
        must.extend(equals.terms().map(|(field, value)| Predicate::Term {
            field,
            value: value.to_owned(),
        }));
    }

    for field in DateField::ALL {
        let (gte, lte) = spec.bounds(field);
        if gte.is_some() || lte.is_some() {
            must.push(Predicate::Range {
                field,
                gte: gte.map(str::to_owned),
                lte: lte.map(str::to_owned),
            });
        }
    }

    let residual = spec
        .contains
        .as_ref()
        .map(|contains| ResidualFilter {
            substrings: [
                (TaskField::Title, contains.title.as_deref()),
                (TaskField::Description, contains.description.as_deref()),
                (TaskField::Status, contains.status.as_deref()),
                (TaskField::Assignee, contains.assignee.as_deref()),
            ]
            .into_iter()
            .filter_map(|(field, needle)| needle.map(|n| (field, n.to_owned())))
            .collect(),
            tags: contains.tags.clone().unwrap_or_default(),
        })
        .unwrap_or_default();

    CompiledFilter {
        query: PushableQuery { must },
        residual,
    }
}

impl FilterSpec {
    fn bounds(&self, field: DateField) -> (Option<&str>, Option<&str>) {
        let (from, to) = match field {
            DateField::CreationDate => (&self.creation_date_from, &self.creation_date_to),
            DateField::CompletionDate => (&self.completion_date_from, &self.completion_date_to),
            DateField::PlannedDate => (&self.planned_date_from, &self.planned_date_to),
        };
        (from.as_deref(), to.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> FilterSpec {
        serde_json::from_str(raw).unwrap_or_else(|err| panic!("parse filter spec: {err}"))
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task {
                title: Some("Task 1".into()),
                description: Some("Description 1".into()),
                status: Some("open".into()),
                assignee: Some("user1".into()),
                tags: Some(vec!["tag1".into(), "tag2".into()]),
                ..Task::default()
            },
            Task {
                title: Some("Task 2".into()),
                description: Some("Description 2".into()),
                status: Some("closed".into()),
                assignee: Some("user2".into()),
                tags: Some(vec!["tag3".into()]),
                ..Task::default()
            },
        ]
    }

    #[test]
    fn empty_spec_compiles_to_match_all() {
        let compiled = compile(&FilterSpec::default());
        assert!(compiled.query.is_match_all());
        assert!(compiled.residual.is_pass_through());
        assert_eq!(compiled.query.to_dsl(), json!({ "match_all": {} }));
    }

    #[test]
    fn equals_and_ranges_become_pushable_predicates() {
        let spec = parse(
            r#"{
                "equals": { "status": "PLANNED", "assignee": "alice", "priority": "high" },
                "creationDateFrom": "2024-01-01",
                "creationDateTo": "2024-12-31",
                "plannedDateTo": "2025-06-30"
            }"#,
        );
        let compiled = compile(&spec);
        assert_eq!(
            compiled.query.predicates(),
            [
                Predicate::Term {
                    field: TaskField::Status,
                    value: "PLANNED".into(),
                },
                Predicate::Term {
                    field: TaskField::Assignee,
                    value: "alice".into(),
                },
                Predicate::Range {
                    field: DateField::CreationDate,
                    gte: Some("2024-01-01".into()),
                    lte: Some("2024-12-31".into()),
                },
                Predicate::Range {
                    field: DateField::PlannedDate,
                    gte: None,
                    lte: Some("2025-06-30".into()),
                },
            ]
        );
        assert!(compiled.residual.is_pass_through());
        assert_eq!(
            compiled.query.to_dsl(),
            json!({ "bool": { "must": [
                { "term": { "status": "PLANNED" } },
                { "term": { "assignee": "alice" } },
                { "range": { "creationDate": { "gte": "2024-01-01", "lte": "2024-12-31" } } },
                { "range": { "plannedDate": { "lte": "2025-06-30" } } },
            ] } })
        );
    }

    #[test]
    fn legacy_equality_keys_are_accepted() {
        let spec = parse(r#"{ "equals": { "statusIs": "PLANNED", "assigneeIs": "bob" } }"#);
        let equals = spec.equals.unwrap_or_default();
        assert_eq!(equals.status.as_deref(), Some("PLANNED"));
        assert_eq!(equals.assignee.as_deref(), Some("bob"));
    }

    #[test]
    fn alias_and_canonical_key_together_are_rejected() {
        for raw in [
            r#"{ "equals": { "statusIs": "PLANNED", "status": "EXECUTED_OK" } }"#,
            r#"{ "equals": { "assignee": "alice", "assigneeIs": "bob" } }"#,
        ] {
            let Err(err) = serde_json::from_str::<FilterSpec>(raw) else {
                panic!("{raw} must not parse");
            };
            assert!(err.to_string().contains("duplicate field"), "unexpected error: {err}");
        }
    }

    #[test]
    fn contains_is_case_sensitive() {
        let compiled = compile(&parse(r#"{ "contains": { "title": "task 1" } }"#));
        assert!(compiled.residual.apply(sample_tasks()).is_empty());
    }

    #[test]
    fn contains_title_keeps_only_matching_task() {
        let compiled = compile(&parse(r#"{ "contains": { "title": "Task 1" } }"#));
        let kept = compiled.residual.apply(sample_tasks());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title.as_deref(), Some("Task 1"));
    }

    #[test]
    fn contains_tags_requires_superset() {
        let compiled = compile(&parse(r#"{ "contains": { "tags": ["tag1", "tag2"] } }"#));
        let kept = compiled.residual.apply(sample_tasks());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].assignee.as_deref(), Some("user1"));

        let partial = compile(&parse(r#"{ "contains": { "tags": ["tag1", "tag9"] } }"#));
        assert!(partial.residual.apply(sample_tasks()).is_empty());
    }

    #[test]
    fn empty_tag_filter_passes_everything() {
        let compiled = compile(&parse(r#"{ "contains": { "tags": [] } }"#));
        assert_eq!(compiled.residual.apply(sample_tasks()).len(), 2);
    }

    #[test]
    fn contains_against_missing_field_excludes_task() {
        let mut tasks = sample_tasks();
        tasks[0].assignee = None;
        tasks[1].tags = None;
        let compiled = compile(&parse(r#"{ "contains": { "assignee": "user" } }"#));
        let kept = compiled.residual.apply(tasks.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].assignee.as_deref(), Some("user2"));

        let by_tag = compile(&parse(r#"{ "contains": { "tags": ["tag3"] } }"#));
        assert!(by_tag.residual.apply(tasks).is_empty());
    }

    #[test]
    fn residual_preserves_store_order() {
        let mut tasks = sample_tasks();
        tasks.reverse();
        let compiled = compile(&parse(r#"{ "contains": { "description": "Description" } }"#));
        let kept = compiled.residual.apply(tasks);
        let titles: Vec<_> = kept.iter().filter_map(|task| task.title.as_deref()).collect();
        assert_eq!(titles, ["Task 2", "Task 1"]);
    }

    #[test]
    fn range_predicate_is_inclusive_and_skips_missing_dates() {
        let predicate = Predicate::Range {
            field: DateField::CompletionDate,
            gte: Some("2024-01-01".into()),
            lte: Some("2024-01-31".into()),
        };
        let on = |date: Option<&str>| Task {
            completion_date: date.map(str::to_owned),
            ..Task::default()
        };
        assert!(predicate.matches(&on(Some("2024-01-01"))));
        assert!(predicate.matches(&on(Some("2024-01-31"))));
        assert!(!predicate.matches(&on(Some("2024-02-01"))));
        assert!(!predicate.matches(&on(None)));
    }

    #[test]
    fn term_predicate_is_exact() {
        let query = compile(&parse(r#"{ "equals": { "title": "Task" } }"#)).query;
        assert!(sample_tasks().iter().all(|task| !query.matches(task)));
        assert!(query.matches(&Task {
            title: Some("Task".into()),
            ..Task::default()
        }));
    }
}
