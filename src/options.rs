//! Per-call request configuration.

use crate::body::Body;
use crate::csrf::CsrfOptions;
use crate::Error;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cancels an in-flight request when triggered.
pub type AbortSignal = CancellationToken;

/// Observer called with every error right before it is returned.
pub type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Transforms each decoded JSON value, bottom-up, given its key.
///
/// The root value is passed with an empty key. Array elements get their
/// index as key.
pub type Reviver = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

/// Formats a path variable: `(name, value) -> replacement`.
pub type PathFormatter = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Formats a query entry before insertion: `(key, value) -> (key, value)`.
pub type QueryFormatter = Arc<dyn Fn(&str, &str) -> (String, String) + Send + Sync>;

/// Whether the transport should send credentials (cookies, auth) along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Only send credentials to the same origin.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// How the transport should interact with an HTTP cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

/// Cross-origin mode of the request.
///
/// Calls made with [`RequestMode::NoCors`] accept opaque responses: the
/// pipeline resolves them to [`crate::Resolved::Void`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    #[default]
    Cors,
    NoCors,
    SameOrigin,
    Navigate,
}

/// Scheduling hint for the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    Low,
    #[default]
    Auto,
}

/// How the response body is turned into a [`crate::Resolved`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Decide from the `content-type` header.
    #[default]
    Auto,
    /// Return the response itself, body unread.
    Response,
    /// Return the unread body stream.
    Raw,
    /// Read nothing.
    Void,
    /// Read the body as a blob.
    Blob,
    /// Read the body as a blob named after `Content-Disposition`.
    File,
}

/// What [`ResolveMode::Auto`] does with a content type it does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedContentType {
    /// Hand back the unread body stream.
    #[default]
    Stream,
    /// Fail with a parse error.
    Fail,
}

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Set once for the key.
    Single(String),
    /// Appended once per element, repeating the key.
    Many(Vec<String>),
}

macro_rules! query_value_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::Single(value.to_string())
                }
            }
        )*
    };
}

query_value_from_display!(&str, String, bool, i32, i64, u32, u64, usize, f64);

impl<T: ToString> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::Many(values.iter().map(ToString::to_string).collect())
    }
}

/// Query parameters of a request.
#[derive(Clone, Default)]
pub enum QueryParams {
    /// No query string.
    #[default]
    None,
    /// Ordered entries; `None` values are skipped.
    Map {
        entries: Vec<(String, Option<QueryValue>)>,
        formatter: Option<QueryFormatter>,
    },
    /// Already assembled pairs, used verbatim.
    Prebuilt(Vec<(String, String)>),
}

impl fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryParams::None => f.write_str("None"),
            QueryParams::Map { entries, formatter } => f
                .debug_struct("Map")
                .field("entries", entries)
                .field("formatter", &formatter.is_some())
                .finish(),
            QueryParams::Prebuilt(pairs) => f.debug_tuple("Prebuilt").field(pairs).finish(),
        }
    }
}

/// Values for `:name` placeholders in the path.
#[derive(Clone, Default)]
pub struct PathVariables {
    pub values: Vec<(String, Option<String>)>,
    pub formatter: Option<PathFormatter>,
}

impl PathVariables {
    /// Returns the value supplied for `name`, if any.
    ///
    /// A later entry for the same name wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Returns `true` if no variable was supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for PathVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathVariables")
            .field("values", &self.values)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

/// Configuration for a single pipeline call.
///
/// Every field is optional. Fields left unset fall back to the client-level
/// configuration, then to the documented defaults. The pipeline only ever
/// borrows the options, so one value can be reused for many calls.
///
/// # Examples
///
/// ```
/// use wirefetch::{RequestOptions, ResolveMode};
/// use http::Method;
///
/// let options = RequestOptions::new()
///     .method(Method::POST)
///     .path_variable("id", "42")
///     .query("verbose", true)
///     .header("X-Request-Id", "abc")
///     .unwrap()
///     .json(&serde_json::json!({ "name": "a" }))
///     .resolve(ResolveMode::Auto);
///
/// assert_eq!(options.method, Method::POST);
/// ```
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// The HTTP method; `GET` by default.
    pub method: Method,
    /// Overrides the client's base URL.
    pub base_url: Option<String>,
    /// Overrides the client's path prefix.
    pub path_prefix: Option<String>,
    pub path_variables: PathVariables,
    pub query: QueryParams,
    /// Headers for this call, applied over the client's default headers.
    pub headers: HeaderMap,
    /// The logical body.
    pub body: Option<Body>,
    pub credentials: Credentials,
    pub cache: CacheMode,
    pub mode: RequestMode,
    pub priority: Priority,
    /// Overrides the client's CSRF configuration.
    pub csrf: Option<CsrfOptions>,
    pub signal: Option<AbortSignal>,
    pub resolve: ResolveMode,
    pub unmatched_content_type: UnmatchedContentType,
    pub reviver: Option<Reviver>,
    /// Overrides the client's error hook.
    pub on_error: Option<ErrorHook>,
    /// Fail with [`Error::Redirected`] when the transport followed a redirect.
    pub force_redirect: bool,
}

impl RequestOptions {
    /// Creates options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the method from a string, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid method token.
    pub fn method_str(mut self, method: impl AsRef<str>) -> Result<Self, Error> {
        let upper = method.as_ref().to_ascii_uppercase();
        self.method = Method::from_bytes(upper.as_bytes())
            .map_err(|e| Error::Configuration(format!("Invalid method: {}", e)))?;
        Ok(self)
    }

    /// Overrides the client's base URL for this call.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the client's path prefix for this call.
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Supplies a value for the `:name` placeholder.
    pub fn path_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_variables
            .values
            .push((name.into(), Some(value.into())));
        self
    }

    /// Declares a placeholder without a value; it stays in the path as-is.
    pub fn path_variable_unset(mut self, name: impl Into<String>) -> Self {
        self.path_variables.values.push((name.into(), None));
        self
    }

    /// Replaces the default percent-encoding of path variables.
    pub fn path_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.path_variables.formatter = Some(Arc::new(formatter));
        self
    }

    /// Adds a query entry.
    ///
    /// Vectors expand to one entry per element; other values set the key once.
    pub fn query(self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query_opt(key, Some(value.into()))
    }

    /// Adds a query entry that is skipped when `value` is `None`.
    ///
    /// After [`query_prebuilt`](Self::query_prebuilt) the entry is appended
    /// to the prebuilt pairs, one pair per value.
    pub fn query_opt(mut self, key: impl Into<String>, value: Option<QueryValue>) -> Self {
        match &mut self.query {
            QueryParams::Map { entries, .. } => entries.push((key.into(), value)),
            QueryParams::Prebuilt(pairs) => {
                let key = key.into();
                match value {
                    Some(QueryValue::Single(value)) => pairs.push((key, value)),
                    Some(QueryValue::Many(values)) => {
                        pairs.extend(values.into_iter().map(|value| (key.clone(), value)))
                    }
                    None => {}
                }
            }
            QueryParams::None => {
                self.query = QueryParams::Map {
                    entries: vec![(key.into(), value)],
                    formatter: None,
                }
            }
        }
        self
    }

    /// Transforms each query entry before it is inserted.
    ///
    /// Has no effect on prebuilt query parameters.
    pub fn query_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str, &str) -> (String, String) + Send + Sync + 'static,
    {
        let formatter: QueryFormatter = Arc::new(formatter);
        match &mut self.query {
            QueryParams::Map { formatter: slot, .. } => *slot = Some(formatter),
            QueryParams::None => {
                self.query = QueryParams::Map {
                    entries: Vec::new(),
                    formatter: Some(formatter),
                }
            }
            QueryParams::Prebuilt(_) => {}
        }
        self
    }

    /// Uses already assembled query pairs verbatim.
    pub fn query_prebuilt(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query = QueryParams::Prebuilt(pairs.into_iter().collect());
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self, Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replaces all call headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the logical body.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a body serialized to JSON when the request is encoded.
    pub fn json<T>(self, value: &T) -> Self
    where
        T: serde::Serialize + Clone + Send + Sync + 'static,
    {
        self.body(Body::json(value.clone()))
    }

    /// Sets the credentials hint passed to the transport.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the cache hint passed to the transport.
    pub fn cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the request mode. [`RequestMode::NoCors`] accepts opaque responses.
    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the priority hint passed to the transport.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Overrides the client's CSRF configuration.
    pub fn csrf(mut self, csrf: CsrfOptions) -> Self {
        self.csrf = Some(csrf);
        self
    }

    /// Sets the signal that aborts the call, including the body read.
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Sets how the response body is decoded.
    pub fn resolve(mut self, resolve: ResolveMode) -> Self {
        self.resolve = resolve;
        self
    }

    /// Sets what auto mode does with an unknown content type.
    pub fn unmatched_content_type(mut self, policy: UnmatchedContentType) -> Self {
        self.unmatched_content_type = policy;
        self
    }

    /// Sets a function applied to every decoded JSON value, bottom-up.
    pub fn reviver<F>(mut self, reviver: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.reviver = Some(Arc::new(reviver));
        self
    }

    /// Sets the hook called once with every pipeline failure.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Fails with [`Error::Redirected`] when the transport followed a redirect.
    pub fn force_redirect(mut self, force: bool) -> Self {
        self.force_redirect = force;
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("path_prefix", &self.path_prefix)
            .field("path_variables", &self.path_variables)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("mode", &self.mode)
            .field("resolve", &self.resolve)
            .field("force_redirect", &self.force_redirect)
            .finish_non_exhaustive()
    }
}
