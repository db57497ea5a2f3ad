//! Responses and resolved call outcomes.
//!
//! A [`Response`] pairs the [`ResponseHead`] with a body stream that can be
//! consumed once; the consuming methods take `self`. [`Resolved`] is what a
//! pipeline call returns.

use crate::body::Blob;
use crate::transport::{ByteStream, ResponseType, TransportError, TransportResponse};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Status line and headers of a response, without the body.
///
/// Errors carry a head so the status and headers stay available after the
/// body has been consumed.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The final URL of the response.
    pub url: String,
    /// Whether the transport followed a redirect.
    pub redirected: bool,
    /// Basic, CORS, opaque...
    pub kind: ResponseType,
    /// The response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Returns `true` for a 2xx status on a non-opaque response.
    ///
    /// Opaque responses always report not-ok, whatever their status.
    ///
    /// ```
    /// # use wirefetch::{ResponseHead, ResponseType};
    /// # use http::{HeaderMap, StatusCode};
    /// let mut head = ResponseHead {
    ///     status: StatusCode::OK,
    ///     url: "https://cdn.example.com/pixel".to_string(),
    ///     redirected: false,
    ///     kind: ResponseType::Basic,
    ///     headers: HeaderMap::new(),
    /// };
    /// assert!(head.ok());
    ///
    /// head.kind = ResponseType::Opaque;
    /// assert!(!head.ok());
    /// ```
    pub fn ok(&self) -> bool {
        self.status.is_success() && !self.kind.is_opaque()
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns the `content-type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE)?.to_str().ok()
    }
}

/// A response whose body has not been read yet.
pub struct Response {
    head: ResponseHead,
    body: ByteStream,
}

impl Response {
    /// Creates a response from a head and an unread body.
    pub fn new(head: ResponseHead, body: ByteStream) -> Self {
        Self { head, body }
    }

    /// Returns the status line and headers.
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// Returns the HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    /// Returns `true` for a 2xx, non-opaque response.
    pub fn ok(&self) -> bool {
        self.head.ok()
    }

    /// Returns the final URL, after any redirects.
    pub fn url(&self) -> &str {
        &self.head.url
    }

    /// Returns whether the transport followed a redirect.
    pub fn redirected(&self) -> bool {
        self.head.redirected
    }

    /// Returns the response kind.
    pub fn kind(&self) -> ResponseType {
        self.head.kind
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    /// Splits the response into its head and the unread body stream.
    pub fn into_parts(self) -> (ResponseHead, ByteStream) {
        (self.head, self.body)
    }

    /// Returns the unread body stream.
    pub fn into_stream(self) -> ByteStream {
        self.body
    }

    /// Reads the whole body.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Reads the body as UTF-8 text, replacing invalid sequences.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads the body as a blob typed with the response `content-type`.
    pub async fn blob(self) -> Result<Blob, TransportError> {
        let mime = self.head.content_type().map(str::to_string);
        let bytes = self.bytes().await?;
        Ok(Blob { bytes, mime })
    }
}

impl From<TransportResponse> for Response {
    fn from(response: TransportResponse) -> Self {
        Response {
            head: ResponseHead {
                status: response.status,
                url: response.url,
                redirected: response.redirected,
                kind: response.kind,
                headers: response.headers,
            },
            body: response.body,
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// A downloaded file: a blob plus the name the server gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub blob: Blob,
}

impl File {
    /// Returns the MIME type of the file.
    pub fn mime(&self) -> Option<&str> {
        self.blob.mime.as_deref()
    }

    /// Returns the file contents.
    pub fn bytes(&self) -> &Bytes {
        &self.blob.bytes
    }
}

/// The outcome of a pipeline call.
pub enum Resolved {
    Json(Value),
    Blob(Blob),
    Text(String),
    /// The unread body.
    Stream(ByteStream),
    File(File),
    /// The response itself, body unread.
    Response(Response),
    /// Nothing was read.
    Void,
}

impl Resolved {
    /// Returns the JSON value, if the outcome is JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Resolved::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the text, if the outcome is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Resolved::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the blob, if the outcome is a blob.
    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Resolved::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    /// Returns the file, if the outcome is a file.
    pub fn into_file(self) -> Option<File> {
        match self {
            Resolved::File(file) => Some(file),
            _ => None,
        }
    }

    /// Returns the unread response, if the outcome is a response.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Resolved::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Returns the body stream, if the outcome is a stream.
    pub fn into_stream(self) -> Option<ByteStream> {
        match self {
            Resolved::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// Returns `true` if nothing was read.
    pub fn is_void(&self) -> bool {
        matches!(self, Resolved::Void)
    }

    /// Deserializes a JSON outcome into `T`.
    ///
    /// # Errors
    ///
    /// Fails if the outcome is not JSON or does not match `T`.
    ///
    /// ```
    /// use wirefetch::Resolved;
    ///
    /// let resolved = Resolved::Json(serde_json::json!([1, 2, 3]));
    /// let numbers: Vec<u32> = resolved.into_json().unwrap();
    /// assert_eq!(numbers, vec![1, 2, 3]);
    ///
    /// assert!(Resolved::Void.into_json::<Vec<u32>>().is_err());
    /// ```
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        match self {
            Resolved::Json(value) => serde_json::from_value(value),
            other => Err(serde::de::Error::custom(format!(
                "expected a JSON outcome, got {}",
                other.kind_name()
            ))),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Resolved::Json(_) => "json",
            Resolved::Blob(_) => "blob",
            Resolved::Text(_) => "text",
            Resolved::Stream(_) => "stream",
            Resolved::File(_) => "file",
            Resolved::Response(_) => "response",
            Resolved::Void => "void",
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Resolved::Blob(blob) => f.debug_tuple("Blob").field(blob).finish(),
            Resolved::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Resolved::Stream(_) => f.write_str("Stream(..)"),
            Resolved::File(file) => f.debug_tuple("File").field(file).finish(),
            Resolved::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Resolved::Void => f.write_str("Void"),
        }
    }
}
