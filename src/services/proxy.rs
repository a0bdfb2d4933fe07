//! Trusted proxy forwarder
//!
//! Forwards authorized requests to the studio service with the trusted
//! identity envelope attached. The original bearer token never crosses this
//! boundary; the studio trusts the envelope because of the shared secret.
//! Bodies are streamed through unmodified in both directions.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::Response,
};
use futures::TryStreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::StudioConfig;
use crate::models::envelope::{self, TrustedEnvelope};
use crate::utils::error::AppError;

/// Hop-by-hop headers that must not be forwarded in either direction
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Forwarder for the studio service
#[derive(Clone)]
pub struct StudioForwarder {
    client: Client,
    base_url: String,
    proxy_secret: String,
    request_timeout: Duration,
    stream_suffix: String,
}

impl StudioForwarder {
    pub fn new(config: &StudioConfig) -> Result<Self> {
        // No total timeout on the client itself: streaming responses run for
        // as long as the studio keeps generating. Non-streaming requests get
        // a per-request timeout instead.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .use_rustls_tls()
            .build()
            .context("Failed to create studio HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            proxy_secret: config.proxy_secret.clone(),
            request_timeout: Duration::from_secs(config.timeout_secs),
            stream_suffix: config.stream_suffix.clone(),
        })
    }

    /// Forward a request to the studio service and relay the response.
    ///
    /// The caller must already have passed the route's access decision. A
    /// dropped caller connection drops the returned future and with it the
    /// in-flight studio request.
    pub async fn forward(
        &self,
        envelope: &TrustedEnvelope,
        method: Method,
        target_path: &str,
        query: Option<&str>,
        inbound_headers: &HeaderMap,
        body: Body,
    ) -> Result<Response, AppError> {
        let mut url = format!("{}{}", self.base_url, target_path);
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }

        let mut headers = filter_request_headers(inbound_headers);
        headers.extend(envelope.to_headers(&self.proxy_secret)?);

        let streaming_route = self.is_streaming_path(target_path);

        let mut request = self
            .client
            .request(method.clone(), url.as_str())
            .headers(headers)
            .body(reqwest::Body::wrap_stream(
                body.into_data_stream().map_err(std::io::Error::other),
            ));
        if !streaming_route {
            request = request.timeout(self.request_timeout);
        }

        debug!(%method, %url, streaming_route, "Forwarding to studio");

        let upstream = request.send().await.map_err(|e| {
            warn!(error = %e, %url, "Studio request failed");
            AppError::UpstreamUnavailable(if e.is_timeout() {
                "studio request timed out".to_string()
            } else if e.is_connect() {
                "failed to connect to studio".to_string()
            } else {
                e.to_string()
            })
        })?;

        let status =
            StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

        let streaming = streaming_route || is_event_stream(upstream.headers());

        let mut builder = axum::http::Response::builder().status(status);
        if let Some(response_headers) = builder.headers_mut() {
            for (name, value) in upstream.headers() {
                if !is_hop_by_hop(name.as_str()) {
                    response_headers.append(name.clone(), value.clone());
                }
            }
            if streaming {
                // Keep intermediaries from buffering the stream
                response_headers
                    .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                response_headers.insert(
                    HeaderName::from_static("x-accel-buffering"),
                    HeaderValue::from_static("no"),
                );
            }
        }

        let body = Body::from_stream(upstream.bytes_stream());
        builder
            .body(body)
            .map_err(|e| AppError::internal(format!("Failed to build proxied response: {}", e)))
    }

    fn is_streaming_path(&self, path: &str) -> bool {
        path.ends_with(&self.stream_suffix)
    }
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Strip everything the studio must not see: hop-by-hop headers, the host,
/// the original bearer token, and any inbound attempt to spoof the trusted
/// header set.
fn filter_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for (name, value) in inbound {
        let name_str = name.as_str();
        if is_hop_by_hop(name_str) {
            continue;
        }
        if matches!(name_str, "host" | "authorization" | "content-length") {
            continue;
        }
        if name_str == envelope::PROXY_SECRET_HEADER || name_str.starts_with("x-trusted-") {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("text/event-stream"))
}
