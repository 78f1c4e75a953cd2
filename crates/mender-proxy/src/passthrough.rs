//! Verbatim forwarding for requests the proxy does not repair

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST};
use http::request::Parts;
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::ProxyError;
use crate::upstream::Upstream;

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Connection-scoped headers that must not cross the proxy
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Client headers to send upstream; `Host` and `Content-Length` are set
/// by the outgoing request itself
fn request_headers(headers: &HeaderMap, authority: HeaderValue) -> HeaderMap {
    let mut forwarded: HeaderMap = headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name) && **name != HOST && **name != CONTENT_LENGTH)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    forwarded.insert(HOST, authority.clone());
    forwarded.insert(X_FORWARDED_HOST, authority);
    forwarded
}

fn response_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Forward a request to the backend and relay its response as-is
///
/// The response body is streamed back without buffering.
pub async fn forward(upstream: &Upstream, parts: &Parts, body: Bytes) -> Result<Response, ProxyError> {
    let url = upstream.passthrough_url(parts.uri.path(), parts.uri.query());
    let authority = HeaderValue::from_str(upstream.authority()).map_err(|e| ProxyError::Internal(e.into()))?;

    tracing::debug!(method = %parts.method, url = %url, "forwarding request");

    let upstream_response = upstream
        .client()
        .request(parts.method.clone(), url)
        .headers(request_headers(&parts.headers, authority))
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "passthrough request failed");
            ProxyError::Upstream(e.to_string())
        })?;

    let status = upstream_response.status();
    let headers = response_headers(upstream_response.headers());

    let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    Ok(response)
}
