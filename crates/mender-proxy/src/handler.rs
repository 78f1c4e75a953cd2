//! Axum entry point that classifies requests and wires the pipeline together

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, request::Parts};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use futures_util::TryStreamExt;
use mender_config::{Config, RewriteConfig};
use mender_core::{Credential, HttpError};
use serde_json::Value;

use crate::dispatch::{CHAT_COMPLETIONS_PATH, Channel, Dispatched, EventStream, dispatch};
use crate::error::ProxyError;
use crate::normalize::normalize;
use crate::passthrough;
use crate::protocol::openai::ChatRequest;
use crate::rewrite::rewrite_tool_history;
use crate::upstream::Upstream;

/// Largest request body the proxy will buffer
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared state for the proxy handlers
#[derive(Clone)]
pub struct ProxyState {
    inner: Arc<ProxyStateInner>,
}

struct ProxyStateInner {
    upstream: Upstream,
    rewrite: RewriteConfig,
}

impl ProxyState {
    pub fn new(upstream: Upstream, rewrite: RewriteConfig) -> Self {
        Self {
            inner: Arc::new(ProxyStateInner { upstream, rewrite }),
        }
    }

    /// Build state, including the connection pool, from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let upstream = Upstream::from_config(&config.upstream)?;
        Ok(Self::new(upstream, config.rewrite.clone()))
    }

    pub fn upstream(&self) -> &Upstream {
        &self.inner.upstream
    }
}

/// Router that sends every request through the proxy
///
/// Registered as a fallback so that it sees any method and path not claimed
/// by other routes.
pub fn proxy_router(state: ProxyState) -> Router {
    Router::new().fallback(proxy).with_state(state)
}

/// How a request is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `POST /v1/chat/completions`: rewrite, dispatch, normalize
    NormalizedChat,
    /// Any other JSON body with `"stream": true`: raw streaming
    GenericStream,
    /// Everything else: forwarded untouched
    Passthrough,
}

/// Decide how to handle a request from its method, path, and body
pub fn classify(method: &Method, path: &str, body: &[u8]) -> Route {
    if *method == Method::POST && path == CHAT_COMPLETIONS_PATH {
        return Route::NormalizedChat;
    }

    let wants_stream = !body.is_empty()
        && serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|value| value.get("stream").and_then(Value::as_bool))
            .unwrap_or(false);

    if wants_stream {
        Route::GenericStream
    } else {
        Route::Passthrough
    }
}

async fn proxy(State(state): State<ProxyState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            return error_response(ProxyError::InvalidRequest(format!("failed to read request body: {e}")));
        }
    };

    let route = classify(&parts.method, parts.uri.path(), &body);
    tracing::debug!(method = %parts.method, path = parts.uri.path(), ?route, "classified request");

    let result = match route {
        Route::NormalizedChat => normalized_chat(&state, &parts, &body).await,
        Route::GenericStream => generic_stream(&state, &parts, &body).await,
        Route::Passthrough => passthrough::forward(state.upstream(), &parts, body).await,
    };

    result.unwrap_or_else(error_response)
}

/// Parse the credential and request body, then apply the tool rewrite
fn prepare(state: &ProxyState, parts: &Parts, body: &[u8]) -> Result<(Credential, ChatRequest), ProxyError> {
    let credential = Credential::from_headers(&parts.headers)?;

    let mut request: ChatRequest =
        serde_json::from_slice(body).map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

    if request.is_stream() && parts.uri.path() == CHAT_COMPLETIONS_PATH {
        return Err(ProxyError::StreamingNotImplemented);
    }

    rewrite_tool_history(&mut request, &state.inner.rewrite)?;

    Ok((credential, request))
}

async fn normalized_chat(state: &ProxyState, parts: &Parts, body: &[u8]) -> Result<Response, ProxyError> {
    let (credential, request) = prepare(state, parts, body)?;

    let dispatched = dispatch(
        state.upstream(),
        &parts.method,
        parts.uri.path(),
        Channel::Library,
        &request,
        credential,
    )
    .await?;

    match dispatched {
        Dispatched::Completion(mut response) => {
            normalize(&mut response);
            Ok(Json(response).into_response())
        }
        Dispatched::Events(_) => Err(ProxyError::StreamingNotImplemented),
    }
}

async fn generic_stream(state: &ProxyState, parts: &Parts, body: &[u8]) -> Result<Response, ProxyError> {
    let (credential, request) = prepare(state, parts, body)?;

    let dispatched = dispatch(
        state.upstream(),
        &parts.method,
        parts.uri.path(),
        Channel::RawHttp,
        &request,
        credential,
    )
    .await?;

    match dispatched {
        Dispatched::Events(events) => Ok(event_stream_response(events)),
        Dispatched::Completion(response) => Ok(Json(response).into_response()),
    }
}

fn event_stream_response(events: EventStream) -> Response {
    let events = events.inspect_err(|e| tracing::error!(error = %e, "stream ended with error"));

    let mut response = Response::new(Body::from_stream(events));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response
}

/// Convert a proxy error into an `OpenAI`-style error response
///
/// Backend error statuses from the raw channel are relayed verbatim.
pub fn error_response(error: ProxyError) -> Response {
    match error {
        ProxyError::UpstreamStatus {
            status,
            content_type,
            body,
        } => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            if let Some(content_type) = content_type {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            response
        }
        error => {
            let status = error.status_code();
            if status.is_server_error() {
                tracing::error!(error = %error, "request failed");
            } else {
                tracing::warn!(error = %error, "request rejected");
            }
            (status, Json(error.error_body())).into_response()
        }
    }
}
