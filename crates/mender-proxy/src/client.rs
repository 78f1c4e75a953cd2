//! Structured chat completion client used by the library channel

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt, future};
use mender_core::Credential;
use reqwest::Client;

use crate::error::ProxyError;
use crate::protocol::openai::{ChatRequest, ChatResponse, StreamChunk};
use crate::upstream::Upstream;

/// Stream of decoded chunks from the backend
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ProxyError>> + Send>>;

/// End-of-stream sentinel sent as the final SSE `data` payload
const DONE_SENTINEL: &str = "[DONE]";

/// Per-call client for the backend's chat completion operation
///
/// Borrows a connection from the shared pool; dropping the client (or the
/// stream it returned) releases it.
pub struct ChatClient {
    client: Client,
    url: String,
    credential: Credential,
}

impl ChatClient {
    pub fn new(upstream: &Upstream, credential: Credential) -> Self {
        Self {
            client: upstream.client().clone(),
            url: upstream.chat_completions_url(),
            credential,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, ProxyError> {
        tracing::debug!(url = %self.url, "sending chat completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.credential.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "upstream request failed");
                ProxyError::Upstream(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "upstream returned error");
            return Err(ProxyError::Upstream(format!("backend returned {status}: {body}")));
        }

        Ok(response)
    }

    /// Issue a non-streaming completion
    pub async fn create(&self, request: &ChatRequest) -> Result<ChatResponse, ProxyError> {
        let response = self.send(request).await?;

        response
            .json()
            .await
            .map_err(|e| ProxyError::Upstream(format!("failed to parse response: {e}")))
    }

    /// Issue a streaming completion, consuming the client
    ///
    /// The stream ends at the backend's `[DONE]` sentinel or when the
    /// connection closes.
    pub async fn create_stream(self, request: &ChatRequest) -> Result<ChunkStream, ProxyError> {
        let response = self.send(request).await?;

        let chunks = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                future::ready(!matches!(event, Ok(event) if event.data.trim() == DONE_SENTINEL))
            })
            .map(|event| match event {
                Ok(event) => serde_json::from_str::<StreamChunk>(event.data.trim())
                    .map_err(|e| ProxyError::Streaming(format!("failed to parse chunk: {e}"))),
                Err(e) => {
                    tracing::error!(error = %e, "upstream stream failed");
                    Err(ProxyError::Streaming(e.to_string()))
                }
            });

        Ok(Box::pin(chunks))
    }
}
