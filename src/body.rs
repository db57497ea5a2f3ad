//! Logical request bodies and their wire encoding.
//!
//! A [`Body`] is one of a closed set of carriers. [`encode_body`] checks
//! them in a fixed order (form data, blob, url-encoded, text, JSON) and pairs
//! each with its own serializer and content type.

use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const TEXT_PLAIN: &str = "text/plain";

/// Binary data with an optional MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    pub bytes: Bytes,
    pub mime: Option<String>,
}

impl Blob {
    /// Creates an untyped blob.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: None,
        }
    }

    /// Sets the MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text(String),
    File { blob: Blob, filename: Option<String> },
}

/// A multipart form. The transport picks the boundary and the content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub parts: Vec<(String, FormPart)>,
}

impl FormData {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Adds a file field, optionally named.
    pub fn file(mut self, name: impl Into<String>, blob: Blob, filename: Option<String>) -> Self {
        self.parts
            .push((name.into(), FormPart::File { blob, filename }));
        self
    }

    /// Converts the form into reqwest's multipart representation.
    pub(crate) fn into_reqwest(self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new();
        for (name, part) in self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name, value),
                FormPart::File { blob, filename } => {
                    let mut part = reqwest::multipart::Part::bytes(blob.bytes.to_vec());
                    if let Some(filename) = filename {
                        part = part.file_name(filename);
                    }
                    if let Some(mime) = blob.mime {
                        part = part.mime_str(&mime)?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

trait JsonPayload: Send + Sync {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T> JsonPayload for T
where
    T: Serialize + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// A structured value serialized with `serde_json` at encoding time.
#[derive(Clone)]
pub struct JsonBody {
    inner: Arc<dyn JsonPayload>,
}

impl JsonBody {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        self.inner.to_json()
    }
}

impl fmt::Debug for JsonBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonBody(..)")
    }
}

/// The logical body of a request.
#[derive(Debug, Clone)]
pub enum Body {
    FormData(FormData),
    Blob(Blob),
    UrlEncoded(Vec<(String, String)>),
    Text(String),
    Json(JsonBody),
}

impl Body {
    /// Wraps any serializable value. Serialization happens when the request
    /// is encoded, so failures surface as [`crate::Error::Serialization`].
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Body::Json(JsonBody {
            inner: Arc::new(value),
        })
    }

    /// Builds a url-encoded body from key/value pairs.
    pub fn url_encoded<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Body::UrlEncoded(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Blob> for Body {
    fn from(blob: Blob) -> Self {
        Body::Blob(blob)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::FormData(form)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::json(value)
    }
}

/// The payload handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireBody {
    Empty,
    Bytes(Bytes),
    Multipart(FormData),
}

impl WireBody {
    /// Returns the payload of a [`WireBody::Bytes`] body.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            WireBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// The content type / payload pair actually sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub content_type: Option<&'static str>,
    pub payload: WireBody,
}

impl EncodedBody {
    fn new(content_type: Option<&'static str>, payload: WireBody) -> Self {
        Self {
            content_type,
            payload,
        }
    }
}

fn url_encode(pairs: &[(String, String)]) -> Bytes {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    Bytes::from(serializer.finish())
}

/// Encodes a logical body for the wire.
///
/// With `explicit_content_type` the caller owns serialization: no content
/// type is inferred and every carrier is sent in its natural byte form.
///
/// # Errors
///
/// Returns the serde error if a JSON body fails to serialize.
pub fn encode_body(
    body: Option<&Body>,
    explicit_content_type: bool,
) -> serde_json::Result<EncodedBody> {
    let Some(body) = body else {
        return Ok(EncodedBody::new(None, WireBody::Empty));
    };

    let (inferred, payload) = match body {
        Body::FormData(form) => (None, WireBody::Multipart(form.clone())),
        Body::Blob(blob) => (Some(OCTET_STREAM), WireBody::Bytes(blob.bytes.clone())),
        Body::UrlEncoded(pairs) => (Some(FORM_URLENCODED), WireBody::Bytes(url_encode(pairs))),
        Body::Text(text) => (Some(TEXT_PLAIN), WireBody::Bytes(Bytes::from(text.clone()))),
        Body::Json(json) => (
            Some(APPLICATION_JSON),
            WireBody::Bytes(Bytes::from(json.to_json()?)),
        ),
    };

    let content_type = if explicit_content_type { None } else { inferred };
    Ok(EncodedBody::new(content_type, payload))
}
