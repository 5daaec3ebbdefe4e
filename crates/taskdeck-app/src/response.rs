//! Request and response envelopes for hosts driving the engine.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use taskdeck_core::{FilterSpec, Task};
use tracing::debug;

use crate::engine::{EngineError, TaskEngine};
use crate::task_store::TaskStore;

/// Outcome class of a request, with the matching HTTP code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// 200.
    Ok,
    /// 201.
    Created,
    /// 400.
    BadRequest,
    /// 404.
    NotFound,
    /// 500.
    InternalServerError,
}

impl ResponseStatus {
    /// Numeric HTTP status code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
        }
    }

    /// True for 2xx outcomes.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Created)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for ResponseStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

/// One engine operation with its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "body", rename_all = "snake_case")]
pub enum TaskRequest {
    /// Create a task; any id on it is ignored.
    Create(Task),
    /// Fetch by id.
    Get(Option<String>),
    /// Full replacement of the task named by its id.
    Update(Task),
    /// Partial update of the task named by its id.
    Patch(Task),
    /// Delete by id.
    Delete(Option<String>),
    /// Filtered search.
    Search(FilterSpec),
}

impl TaskRequest {
    /// Operation name used in logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Get(_) => "get",
            Self::Update(_) => "update",
            Self::Patch(_) => "patch",
            Self::Delete(_) => "delete",
            Self::Search(_) => "search",
        }
    }
}

/// Status plus optional JSON body returned for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResponse {
    /// Outcome class.
    pub status: ResponseStatus,
    /// Payload; absent for update and patch success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl TaskResponse {
    /// Response carrying a body.
    #[must_use]
    pub const fn with_body(status: ResponseStatus, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    /// Response without a body.
    #[must_use]
    pub const fn empty(status: ResponseStatus) -> Self {
        Self { status, body: None }
    }

    /// Error response with a `{"error": …}` body.
    #[must_use]
    pub fn error(status: ResponseStatus, message: impl fmt::Display) -> Self {
        Self::with_body(status, json!({ "error": message.to_string() }))
    }
}

impl From<EngineError> for TaskResponse {
    fn from(err: EngineError) -> Self {
        Self::error(err.status(), &err)
    }
}

/// Run `request` against `engine` and fold the outcome into a response.
pub fn handle<S: TaskStore>(engine: &TaskEngine<S>, request: TaskRequest) -> TaskResponse {
    let operation = request.operation();
    let response = match request {
        TaskRequest::Create(task) => engine
            .create(task)
            .and_then(|created| respond(ResponseStatus::Created, &created)),
        TaskRequest::Get(id) => engine
            .get(id.as_deref())
            .and_then(|task| respond(ResponseStatus::Ok, &task)),
        TaskRequest::Update(task) => engine
            .update(&task)
            .map(|_| TaskResponse::empty(ResponseStatus::Ok)),
        TaskRequest::Patch(patch) => engine
            .patch(&patch)
            .map(|_| TaskResponse::empty(ResponseStatus::Ok)),
        TaskRequest::Delete(id) => engine
            .delete(id.as_deref())
            .map(|(id, _)| TaskResponse::with_body(ResponseStatus::Ok, json!({ "id": id }))),
        TaskRequest::Search(spec) => engine.search(&spec).and_then(|tasks| {
            let tasks = to_body(&tasks)?;
            Ok(TaskResponse::with_body(ResponseStatus::Ok, json!({ "tasks": tasks })))
        }),
    };
    let response = response.unwrap_or_else(TaskResponse::from);
    debug!(operation, status = %response.status, "Handled request");
    response
}

fn respond<T: Serialize>(status: ResponseStatus, value: &T) -> Result<TaskResponse, EngineError> {
    Ok(TaskResponse::with_body(status, to_body(value)?))
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|err| EngineError::Storage(err.into()))
}
