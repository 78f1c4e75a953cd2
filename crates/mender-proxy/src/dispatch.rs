//! Chooses how a request reaches the backend and issues the call

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use http::Method;
use mender_core::Credential;

use crate::assembler::assemble_events;
use crate::client::ChatClient;
use crate::error::ProxyError;
use crate::protocol::openai::{ChatRequest, ChatResponse};
use crate::upstream::Upstream;

/// Canonical chat completions path
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Stream of complete wire events (`data: ...\n\n`)
pub type EventStream = Pin<Box<dyn Stream<Item = Result<String, ProxyError>> + Send>>;

/// Transport used to reach the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Structured chat completion client
    Library,
    /// Raw HTTP streaming passthrough
    RawHttp,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library => f.write_str("library"),
            Self::RawHttp => f.write_str("raw_http"),
        }
    }
}

/// Result of a dispatch
pub enum Dispatched {
    /// One completed response
    Completion(Box<ChatResponse>),
    /// Lazily produced wire events, in backend order
    Events(EventStream),
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion(response) => f.debug_tuple("Completion").field(response).finish(),
            Self::Events(_) => f.write_str("Events(..)"),
        }
    }
}

/// Send `request` to the backend over `channel`
///
/// Supported combinations are `POST` on the chat completions path over the
/// library channel (streaming or not) and streaming `POST` on any path over
/// the raw HTTP channel. Everything else is a [`ProxyError::ProtocolMismatch`].
pub async fn dispatch(
    upstream: &Upstream,
    method: &Method,
    path: &str,
    channel: Channel,
    request: &ChatRequest,
    credential: Credential,
) -> Result<Dispatched, ProxyError> {
    let mismatch = || ProxyError::ProtocolMismatch {
        method: method.clone(),
        path: path.to_owned(),
        channel,
    };

    if *method != Method::POST {
        return Err(mismatch());
    }

    tracing::info!(%channel, path, stream = request.is_stream(), "dispatching request");

    match (channel, path == CHAT_COMPLETIONS_PATH, request.is_stream()) {
        (Channel::Library, true, false) => {
            let client = ChatClient::new(upstream, credential);
            let response = client.create(request).await?;
            Ok(Dispatched::Completion(Box::new(response)))
        }
        (Channel::Library, true, true) => {
            let chunks = ChatClient::new(upstream, credential).create_stream(request).await?;
            let events = chunks.map(|chunk| -> Result<String, ProxyError> {
                let chunk = chunk?;
                let data = serde_json::to_string(&chunk).map_err(|e| ProxyError::Internal(e.into()))?;
                Ok(format!("data: {data}\n\n"))
            });
            Ok(Dispatched::Events(Box::pin(Scoped::new(events, channel))))
        }
        (Channel::RawHttp, _, true) => {
            let events = raw_stream(upstream, path, request, &credential).await?;
            Ok(Dispatched::Events(Box::pin(Scoped::new(events, channel))))
        }
        _ => Err(mismatch()),
    }
}

/// Open a streaming POST and frame its body into events
async fn raw_stream(
    upstream: &Upstream,
    path: &str,
    request: &ChatRequest,
    credential: &Credential,
) -> Result<EventStream, ProxyError> {
    let url = upstream.raw_url(path);
    tracing::debug!(url = %url, "opening raw stream");

    let response = upstream
        .client()
        .post(url)
        .bearer_auth(credential.expose())
        .timeout(upstream.timeout())
        .json(request)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "upstream stream request failed");
            ProxyError::Upstream(e.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = %status, "upstream returned error");
        let content_type = response.headers().get(http::header::CONTENT_TYPE).cloned();
        let body = response.bytes().await.unwrap_or_default();
        return Err(ProxyError::UpstreamStatus {
            status,
            content_type,
            body,
        });
    }

    let fragments = response
        .bytes_stream()
        .map(|fragment| fragment.map_err(|e| ProxyError::Streaming(e.to_string())));

    Ok(Box::pin(assemble_events(fragments)))
}

/// Event stream that logs when it is released, whether exhausted or dropped
/// early by a disconnecting client
struct Scoped<S> {
    inner: S,
    channel: Channel,
    finished: bool,
}

impl<S> Scoped<S> {
    const fn new(inner: S, channel: Channel) -> Self {
        Self {
            inner,
            channel,
            finished: false,
        }
    }
}

impl<S> Stream for Scoped<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = self.inner.poll_next_unpin(cx);
        if let Poll::Ready(None) = poll {
            self.finished = true;
        }
        poll
    }
}

impl<S> Drop for Scoped<S> {
    fn drop(&mut self) {
        if self.finished {
            tracing::debug!(channel = %self.channel, "upstream stream completed");
        } else {
            tracing::debug!(channel = %self.channel, "upstream stream released before completion");
        }
    }
}
