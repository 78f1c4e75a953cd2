//! Mock OpenAI-compatible backend for integration tests
//!
//! Records every request it receives and answers with canned completions,
//! chunked SSE streams, and model listings.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Fragments of the raw completion stream, split mid-event on purpose;
/// the last event has no terminator
pub const RAW_STREAM_FRAGMENTS: [&str; 4] = [
    "da",
    "ta: {\"text\":\"Bonjour\"}\n",
    "\n",
    "data: {\"text\":\" à tous\"}\n\ndata: [DONE]",
];

/// Content of the chunks sent for streamed chat completions
pub const CHAT_STREAM_DELTAS: [&str; 2] = ["Hel", "lo"];

/// A request as the backend saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub host: Option<String>,
    pub forwarded_host: Option<String>,
    pub body: Value,
}

/// Mock backend
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockLlmState>,
}

struct MockLlmState {
    requests: Mutex<Vec<RecordedRequest>>,
    /// `choices[0].message.content` of non-streaming completions
    content: Value,
    /// Status every endpoint answers with, if set
    fail_status: Option<StatusCode>,
    /// Stream chunks forever instead of finishing
    endless: bool,
    /// Cancelled once an endless response body has been dropped
    released: CancellationToken,
}

/// Cancels the mock's release token when the response body holding it is
/// dropped
struct ReleaseGuard(CancellationToken);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl MockLlm {
    /// Start a mock that answers chat completions with "Hello from mock LLM"
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(json!("Hello from mock LLM"), None, false).await
    }

    /// Start a mock that answers chat completions with the given content
    pub async fn start_with_content(content: Value) -> anyhow::Result<Self> {
        Self::start_inner(content, None, false).await
    }

    /// Start a mock that fails every request with `status`
    pub async fn start_failing(status: StatusCode) -> anyhow::Result<Self> {
        Self::start_inner(Value::Null, Some(status), false).await
    }

    /// Start a mock whose streaming endpoints never finish on their own
    pub async fn start_endless() -> anyhow::Result<Self> {
        Self::start_inner(Value::Null, None, true).await
    }

    async fn start_inner(content: Value, fail_status: Option<StatusCode>, endless: bool) -> anyhow::Result<Self> {
        let state = Arc::new(MockLlmState {
            requests: Mutex::new(Vec::new()),
            content,
            fail_status,
            endless,
            released: CancellationToken::new(),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .route("/v1/completions", routing::post(handle_completions))
            .route("/v1/models", routing::get(handle_models))
            .route("/v1/embeddings", routing::post(handle_embeddings))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as the upstream, including `/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// `host:port` the mock listens on
    pub fn authority(&self) -> String {
        self.addr.to_string()
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Whether an endless response body has been dropped yet
    pub fn stream_released(&self) -> bool {
        self.state.released.is_cancelled()
    }

    /// Wait until an endless response body is dropped
    pub async fn wait_for_stream_release(&self) {
        self.state.released.cancelled().await;
    }

    /// Most recent request
    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("mock received no requests")
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Wire types --

#[derive(Debug, Serialize)]
struct ChatCompletionResponse {
    id: String,
    object: String,
    created: u64,
    model: String,
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Debug, Serialize)]
struct Choice {
    index: u32,
    message: ResponseMessage,
    finish_reason: String,
}

#[derive(Debug, Serialize)]
struct ResponseMessage {
    role: String,
    content: Value,
}

#[derive(Debug, Serialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct StreamChunk {
    id: String,
    object: String,
    created: u64,
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Serialize)]
struct StreamChoice {
    index: u32,
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct StreamDelta {
    content: String,
}

// -- Handlers --

fn header(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

/// Record the request and return its parsed JSON body (or `null`)
async fn record(state: &MockLlmState, request: Request) -> Value {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    state.requests.lock().unwrap().push(RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_owned(),
        query: parts.uri.query().map(str::to_owned),
        authorization: header(&parts.headers, AUTHORIZATION),
        host: header(&parts.headers, HOST),
        forwarded_host: header(&parts.headers, "x-forwarded-host"),
        body: body.clone(),
    });

    body
}

fn failure(status: StatusCode) -> Response {
    (status, [(CONTENT_TYPE, "text/plain")], "mock backend failure").into_response()
}

async fn handle_chat_completions(State(state): State<Arc<MockLlmState>>, request: Request) -> Response {
    let body = record(&state, request).await;

    if let Some(status) = state.fail_status {
        return failure(status);
    }

    if body["stream"].as_bool().unwrap_or(false) {
        if state.endless {
            return endless_response(&state);
        }
        return chat_stream_response();
    }

    let response = ChatCompletionResponse {
        id: "chatcmpl-test-123".to_owned(),
        object: "chat.completion".to_owned(),
        created: 1_700_000_000,
        model: body["model"].as_str().unwrap_or("mock-model").to_owned(),
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: "assistant".to_owned(),
                content: state.content.clone(),
            },
            finish_reason: "stop".to_owned(),
        }],
        usage: Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
    };

    Json(response).into_response()
}

fn chat_stream_response() -> Response {
    let mut body = String::new();

    for (i, delta) in CHAT_STREAM_DELTAS.iter().enumerate() {
        let last = i + 1 == CHAT_STREAM_DELTAS.len();
        let chunk = StreamChunk {
            id: "chatcmpl-test-stream".to_owned(),
            object: "chat.completion.chunk".to_owned(),
            created: 1_700_000_000,
            choices: vec![StreamChoice {
                index: 0,
                delta: StreamDelta {
                    content: (*delta).to_owned(),
                },
                finish_reason: last.then(|| "stop".to_owned()),
            }],
        };
        body.push_str(&format!("data: {}\n\n", serde_json::to_string(&chunk).unwrap()));
    }
    body.push_str("data: [DONE]\n\n");

    ([(CONTENT_TYPE, "text/event-stream")], body).into_response()
}

/// Chunk events every 20ms until the client goes away
fn endless_response(state: &MockLlmState) -> Response {
    let guard = ReleaseGuard(state.released.clone());

    let events = futures_util::stream::unfold((guard, 0_u64), |(guard, n)| async move {
        if n > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let chunk = StreamChunk {
            id: "chatcmpl-endless".to_owned(),
            object: "chat.completion.chunk".to_owned(),
            created: 1_700_000_000,
            choices: vec![StreamChoice {
                index: 0,
                delta: StreamDelta {
                    content: format!("tick {n}"),
                },
                finish_reason: None,
            }],
        };
        let event = format!("data: {}\n\n", serde_json::to_string(&chunk).unwrap());
        Some((Ok::<_, Infallible>(Bytes::from(event)), (guard, n + 1)))
    });

    ([(CONTENT_TYPE, "text/event-stream")], Body::from_stream(events)).into_response()
}

async fn handle_completions(State(state): State<Arc<MockLlmState>>, request: Request) -> Response {
    record(&state, request).await;

    if let Some(status) = state.fail_status {
        return failure(status);
    }

    if state.endless {
        return endless_response(&state);
    }

    let fragments = RAW_STREAM_FRAGMENTS
        .into_iter()
        .map(|fragment| Ok::<_, Infallible>(Bytes::from_static(fragment.as_bytes())));
    let body = Body::from_stream(futures_util::stream::iter(fragments));

    ([(CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn handle_models(State(state): State<Arc<MockLlmState>>, request: Request) -> Response {
    record(&state, request).await;

    if let Some(status) = state.fail_status {
        return failure(status);
    }

    (
        [("x-mock-backend", "1")],
        Json(json!({
            "object": "list",
            "data": [{"id": "mock-model", "object": "model", "created": 1_700_000_000, "owned_by": "mock"}]
        })),
    )
        .into_response()
}

async fn handle_embeddings(State(state): State<Arc<MockLlmState>>, request: Request) -> Response {
    let body = record(&state, request).await;

    if let Some(status) = state.fail_status {
        return failure(status);
    }

    Json(json!({
        "object": "list",
        "data": [{"object": "embedding", "embedding": [0.1, 0.2, 0.3], "index": 0}],
        "model": body["model"],
        "stream": body.get("stream").cloned().unwrap_or(Value::Null)
    }))
    .into_response()
}
