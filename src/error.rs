//! Error types for the request pipeline.
//!
//! Every failure produced while executing a request is an [`Error`]. The
//! variant tells you where the pipeline stopped, and the accessors expose
//! the HTTP method, the response head (when a response was obtained) and the
//! underlying cause.

use crate::response::ResponseHead;
use crate::transport::TransportError;
use http::{Method, StatusCode};

/// The main error type for pipeline calls.
///
/// # Examples
///
/// ```no_run
/// use wirefetch::{Client, Error, RequestOptions};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// match client.fetch("/users/42", &RequestOptions::new()).await {
///     Ok(resolved) => println!("Success: {:?}", resolved),
///     Err(Error::NotOk { response, raw_response, .. }) => {
///         eprintln!("HTTP error {}: {}", response.status, raw_response);
///     }
///     Err(Error::Parse { response, source, .. }) => {
///         eprintln!("Could not decode {} body: {}", response.status, source);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request body could not be serialized to JSON.
    ///
    /// No request was sent, so there is no response.
    #[error("{method} request failed: could not serialize body: {source}")]
    Serialization {
        /// The HTTP method of the failed call
        method: Method,
        /// The serde error
        #[source]
        source: serde_json::Error,
    },

    /// The transport failed before a response existed (network failure, abort).
    #[error("{method} request failed: {source}")]
    Transport {
        /// The HTTP method of the failed call
        method: Method,
        /// The transport error
        #[source]
        source: TransportError,
    },

    /// The server answered with a status outside the success range.
    ///
    /// The raw body is read and kept for debugging.
    #[error("{method} request failed: HTTP {}: {raw_response}", .response.status)]
    NotOk {
        /// The HTTP method of the failed call
        method: Method,
        /// The response status line and headers
        response: ResponseHead,
        /// The raw response body
        raw_response: String,
    },

    /// A forced-redirect call observed a redirect.
    ///
    /// `location` is the redirect target, taken from the `Location` header or
    /// the final response URL.
    #[error("{method} request was redirected to {location}")]
    Redirected {
        /// The HTTP method of the failed call
        method: Method,
        /// The response status line and headers
        response: ResponseHead,
        /// Where the server sent the request
        location: String,
    },

    /// The response body could not be decoded.
    #[error("{method} request failed: could not decode {} response: {source}", .response.status)]
    Parse {
        /// The HTTP method of the failed call
        method: Method,
        /// The response status line and headers
        response: ResponseHead,
        /// What went wrong while decoding
        #[source]
        source: ParseError,
    },

    /// Invalid configuration was provided.
    ///
    /// Raised before any request exists, e.g. for an invalid header name or
    /// by guard checks in calling code.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Reasons a response body could not be turned into a [`crate::Resolved`] value.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// Reading the body from the transport failed.
    #[error("failed to read body: {0}")]
    Body(#[from] TransportError),

    /// The body was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The auto mode met a content type it does not decode and the
    /// [`crate::UnmatchedContentType::Fail`] policy was selected.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

impl Error {
    /// Builds an out-of-pipeline error for guard checks done before a call.
    ///
    /// ```
    /// let err = wirefetch::Error::guard("user is not signed in");
    /// assert!(err.response().is_none());
    /// ```
    pub fn guard(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Returns the HTTP method of the call that failed.
    ///
    /// `None` for configuration errors, which happen outside a call.
    pub fn method(&self) -> Option<&Method> {
        match self {
            Error::Serialization { method, .. }
            | Error::Transport { method, .. }
            | Error::NotOk { method, .. }
            | Error::Redirected { method, .. }
            | Error::Parse { method, .. } => Some(method),
            Error::Configuration(_) => None,
        }
    }

    /// Returns the response head if a response was obtained before failing.
    pub fn response(&self) -> Option<&ResponseHead> {
        match self {
            Error::NotOk { response, .. }
            | Error::Redirected { response, .. }
            | Error::Parse { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Returns the HTTP status code if this error has a response.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|response| response.status)
    }

    /// Returns `true` if the error carries a response with exactly this status.
    ///
    /// ```
    /// use wirefetch::Error;
    ///
    /// let err = Error::guard("not signed in");
    /// assert!(!err.has_status(401));
    /// ```
    pub fn has_status(&self, status: u16) -> bool {
        self.status().is_some_and(|s| s.as_u16() == status)
    }

    /// Returns the raw response body for [`Error::NotOk`].
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::NotOk { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the redirect target for [`Error::Redirected`].
    pub fn location(&self) -> Option<&str> {
        match self {
            Error::Redirected { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// Returns `true` if `error` is a pipeline [`Error`], optionally one whose
/// response has exactly the given status.
///
/// Useful when errors have already been boxed or wrapped by calling code.
///
/// ```
/// use http::StatusCode;
/// use wirefetch::{is_request_error, Error};
///
/// let err: Box<dyn std::error::Error> = Box::new(Error::guard("nope"));
/// assert!(is_request_error(err.as_ref(), None));
/// assert!(!is_request_error(err.as_ref(), Some(StatusCode::FORBIDDEN)));
///
/// let io = std::io::Error::other("disk");
/// assert!(!is_request_error(&io, None));
/// ```
pub fn is_request_error(
    error: &(dyn std::error::Error + 'static),
    status: Option<StatusCode>,
) -> bool {
    match error.downcast_ref::<Error>() {
        Some(err) => match status {
            Some(status) => err.status() == Some(status),
            None => true,
        },
        None => false,
    }
}

/// A specialized `Result` type for pipeline calls.
pub type Result<T> = std::result::Result<T, Error>;
