//! The network primitive the pipeline dispatches through.
//!
//! [`Transport`] performs exactly one exchange per call. [`ReqwestTransport`]
//! is the default implementation; tests and embedders can plug in their own.

use crate::body::WireBody;
use crate::options::{AbortSignal, CacheMode, Credentials, Priority, RequestMode};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use http::{HeaderMap, Method, StatusCode};
use std::fmt;
use std::time::Duration;

/// A one-shot stream of body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Errors raised by a transport before or while reading a response.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The abort signal fired.
    #[error("Request aborted")]
    Aborted,

    /// A network-level error from reqwest.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Connection-level failure reported by a custom transport.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// The kind of a response, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Basic,
    Cors,
    /// A cross-origin response whose status and body are hidden.
    Opaque,
    OpaqueRedirect,
    Error,
}

impl ResponseType {
    /// Returns `true` for opaque and opaque-redirect responses.
    pub fn is_opaque(self) -> bool {
        matches!(self, ResponseType::Opaque | ResponseType::OpaqueRedirect)
    }
}

/// Everything the transport needs to send one request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: WireBody,
    pub signal: Option<AbortSignal>,
    pub credentials: Credentials,
    pub cache: CacheMode,
    pub mode: RequestMode,
    pub priority: Priority,
}

/// What a transport hands back for one exchange.
pub struct TransportResponse {
    pub status: StatusCode,
    /// The final URL, after any redirects.
    pub url: String,
    pub redirected: bool,
    pub kind: ResponseType,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl TransportResponse {
    /// Builds a response with an in-memory body.
    pub fn from_bytes(status: StatusCode, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            status,
            url: url.into(),
            redirected: false,
            kind: ResponseType::Basic,
            headers: HeaderMap::new(),
            body: futures::stream::once(async move { Ok(body) }).boxed(),
        }
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("redirected", &self.redirected)
            .field("kind", &self.kind)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs one network exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Performs a navigation when a forced redirect is detected.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

/// [`Transport`] backed by a `reqwest::Client`.
///
/// Browser-only hints (credentials, cache, CORS mode, priority) have no
/// reqwest equivalent and are ignored.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Wraps an existing reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Sets a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
            signal,
            ..
        } = request;

        let mut builder = self.client.request(method, url.as_str()).headers(headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match body {
            WireBody::Empty => builder,
            WireBody::Bytes(bytes) => builder.body(bytes),
            WireBody::Multipart(form) => builder.multipart(form.into_reqwest()?),
        };

        let response = match &signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.cancelled() => return Err(TransportError::Aborted),
                response = builder.send() => response?,
            },
            None => builder.send().await?,
        };

        let redirected = url::Url::parse(&url)
            .map(|requested| &requested != response.url())
            .unwrap_or(false);

        Ok(TransportResponse {
            status: response.status(),
            url: response.url().to_string(),
            redirected,
            kind: ResponseType::Basic,
            headers: response.headers().clone(),
            body: abort_on(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(TransportError::from))
                    .boxed(),
                signal,
            ),
        })
    }
}

/// Ends `body` with [`TransportError::Aborted`] once `signal` fires.
fn abort_on(body: ByteStream, signal: Option<AbortSignal>) -> ByteStream {
    let Some(signal) = signal else {
        return body;
    };
    futures::stream::unfold(Some((body, signal)), |state| async move {
        let (mut body, signal) = state?;
        tokio::select! {
            biased;
            _ = signal.cancelled() => Some((Err(TransportError::Aborted), None)),
            chunk = body.next() => chunk.map(|chunk| (chunk, Some((body, signal)))),
        }
    })
    .boxed()
}
