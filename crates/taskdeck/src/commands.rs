use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use taskdeck_app::{
    ResponseStatus, ServiceConfig, TaskDispatcher, TaskEngine, TaskRequest, TaskResponse, TaskStore,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::Command;

/// Execute `cmd` and report the status of its response.
pub async fn run(cmd: Command, config: &ServiceConfig) -> Result<ResponseStatus> {
    let dispatcher = TaskDispatcher::new(TaskEngine::new(config.open_store()?), config.workers()?);

    if matches!(cmd, Command::Serve) {
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        serve(dispatcher, input, tokio::io::stdout()).await?;
        return Ok(ResponseStatus::Ok);
    }

    let response = match request_for(cmd).await {
        Ok(request) => dispatcher.dispatch(request).await,
        Err(rejected) => rejected,
    };
    println!("{}", render(&response)?);
    Ok(response.status)
}

async fn request_for(cmd: Command) -> Result<TaskRequest, TaskResponse> {
    match cmd {
        Command::Create { body } => parse_body(&body).await.map(TaskRequest::Create),
        Command::Get { id } => Ok(TaskRequest::Get(id)),
        Command::Update { body } => parse_body(&body).await.map(TaskRequest::Update),
        Command::Patch { body } => parse_body(&body).await.map(TaskRequest::Patch),
        Command::Delete { id } => Ok(TaskRequest::Delete(id)),
        Command::Search { filter } => parse_body(&filter).await.map(TaskRequest::Search),
        Command::Serve => Err(TaskResponse::error(
            ResponseStatus::BadRequest,
            "serve does not take a request body",
        )),
    }
}

async fn parse_body<T: DeserializeOwned>(raw: &str) -> Result<T, TaskResponse> {
    let text = if raw == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await.map_err(|err| {
            TaskResponse::error(
                ResponseStatus::InternalServerError,
                format!("failed to read stdin: {err}"),
            )
        })?;
        buf
    } else {
        raw.to_owned()
    };
    serde_json::from_str(&text).map_err(|err| {
        TaskResponse::error(ResponseStatus::BadRequest, format!("malformed request body: {err}"))
    })
}

fn render(response: &TaskResponse) -> Result<String> {
    serde_json::to_string(response).context("failed to encode response")
}

/// Answer each request line on `input` with one response line on `output`.
///
/// Requests run concurrently on the dispatcher; responses are written in
/// request order.
async fn serve<S, R, W>(dispatcher: TaskDispatcher<S>, input: R, output: W) -> Result<W>
where
    S: TaskStore + Send + Sync + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (pending_tx, mut pending_rx) = mpsc::channel::<JoinHandle<TaskResponse>>(dispatcher.workers().get());

    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(pending) = pending_rx.recv().await {
            let response = pending.await.unwrap_or_else(|err| {
                TaskResponse::error(
                    ResponseStatus::InternalServerError,
                    format!("request task failed: {err}"),
                )
            });
            let mut line = render(&response)?;
            line.push('\n');
            output.write_all(line.as_bytes()).await?;
            output.flush().await?;
        }
        anyhow::Ok(output)
    });

    let mut lines = input.lines();
    let mut served = 0_usize;
    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        let pending = match serde_json::from_str::<TaskRequest>(&line) {
            Ok(request) => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move { dispatcher.dispatch(request).await })
            }
            Err(err) => {
                debug!(error = %err, "Rejected malformed request line");
                let rejected =
                    TaskResponse::error(ResponseStatus::BadRequest, format!("malformed request: {err}"));
                tokio::spawn(async move { rejected })
            }
        };
        if pending_tx.send(pending).await.is_err() {
            break;
        }
        served += 1;
    }
    drop(pending_tx);

    let output = writer.await.context("response writer stopped")??;
    info!(served, "Request stream closed");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn in_memory_dispatcher() -> TaskDispatcher<impl TaskStore + Send + Sync + 'static> {
        let config = ServiceConfig::default();
        let store = config
            .open_store()
            .unwrap_or_else(|err| panic!("in-memory store must open: {err}"));
        let workers = config
            .workers()
            .unwrap_or_else(|err| panic!("default workers must be valid: {err}"));
        TaskDispatcher::new(TaskEngine::new(store), workers)
    }

    #[tokio::test]
    async fn malformed_body_becomes_bad_request() {
        let Err(rejected) = request_for(Command::Create { body: "{ nope".into() }).await else {
            panic!("malformed body must be rejected");
        };
        assert_eq!(rejected.status, ResponseStatus::BadRequest);
    }

    #[tokio::test]
    async fn search_body_parses_filter() {
        let request = request_for(Command::Search {
            filter: r#"{"equals":{"statusIs":"PLANNED"}}"#.into(),
        })
        .await
        .unwrap_or_else(|response| panic!("filter must parse: {response:?}"));
        assert_eq!(request.operation(), "search");
    }

    #[tokio::test]
    async fn run_reports_response_status() -> Result<()> {
        let config = ServiceConfig::default();
        let created = run(
            Command::Create {
                body: r#"{"title":"Ship","status":"PLANNED"}"#.into(),
            },
            &config,
        )
        .await?;
        assert_eq!(created, ResponseStatus::Created);

        let missing = run(Command::Get { id: Some("unknown".into()) }, &config).await?;
        assert_eq!(missing, ResponseStatus::NotFound);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn serve_answers_every_line_in_order() -> Result<()> {
        let dispatcher = in_memory_dispatcher();
        let input = concat!(
            r#"{"op":"create","body":{"title":"Ship","status":"PLANNED"}}"#,
            "\n",
            "{ broken\n",
            "\n",
            r#"{"op":"get","body":null}"#,
            "\n",
            r#"{"op":"create","body":{"title":"Sail","status":"unknown"}}"#,
            "\n",
        );

        let output = serve(dispatcher.clone(), input.as_bytes(), Vec::new()).await?;
        let responses = parse_lines(&output)?;
        let statuses: Vec<_> = responses.iter().map(|r| r["status"].clone()).collect();
        assert_eq!(statuses, [201, 400, 400, 400]);

        let search = r#"{"op":"search","body":{"contains":{"title":"Sh"}}}"#;
        let output = serve(dispatcher, search.as_bytes(), Vec::new()).await?;
        let responses = parse_lines(&output)?;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["status"], 200);
        assert_eq!(responses[0]["body"]["tasks"][0]["title"], "Ship");
        Ok(())
    }

    #[tokio::test]
    async fn search_with_alias_and_canonical_key_is_bad_request() -> Result<()> {
        let dispatcher = in_memory_dispatcher();
        let input = concat!(
            r#"{"op":"search","body":{"equals":{"statusIs":"PLANNED","status":"EXECUTED_OK"}}}"#,
            "\n",
            r#"{"op":"search","body":{"equals":{"statusIs":"PLANNED"}}}"#,
            "\n",
        );

        let output = serve(dispatcher, input.as_bytes(), Vec::new()).await?;
        let responses = parse_lines(&output)?;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["status"], 400);
        let message = responses[0]["body"]["error"].as_str().unwrap_or_default();
        assert!(message.contains("duplicate field"), "unexpected error: {message}");
        assert_eq!(responses[1]["status"], 200);

        let Err(rejected) = request_for(Command::Search {
            filter: r#"{"equals":{"assigneeIs":"bob","assignee":"alice"}}"#.into(),
        })
        .await
        else {
            panic!("conflicting equality keys must be rejected");
        };
        assert_eq!(rejected.status, ResponseStatus::BadRequest);
        Ok(())
    }

    fn parse_lines(output: &[u8]) -> Result<Vec<Value>> {
        let text = std::str::from_utf8(output)?;
        Ok(text
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?)
    }
}
