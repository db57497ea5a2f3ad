//! The request pipeline.
//!
//! The [`Client`] type is the main entry point for making requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    body::{encode_body, Body},
    csrf::{apply_csrf, CookieSource, CsrfOptions},
    options::{ErrorHook, RequestMode, RequestOptions},
    resolve::{resolve, ResolveOptions},
    response::{Resolved, Response},
    transport::{Navigator, ReqwestTransport, Transport, TransportRequest},
    url_builder::{build_url, UrlParts},
    Error, Result,
};
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An HTTP client that runs every call through the request pipeline.
///
/// The client is cheap to clone and holds no per-call state: each call is a
/// single, independent execution.
///
/// # Examples
///
/// ```no_run
/// use wirefetch::{Client, CsrfOptions, RequestOptions};
/// use serde::Serialize;
///
/// #[derive(Serialize, Clone)]
/// struct CreateUser {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), wirefetch::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .path_prefix("/v1")
///     .csrf(CsrfOptions::from_token("s3cr3t").default_matcher(true))
///     .build()?;
///
/// // GET /v1/users/42?active=true
/// let user = client
///     .fetch(
///         "/users/:id",
///         &RequestOptions::new()
///             .path_variable("id", "42")
///             .query("active", true),
///     )
///     .await?;
/// println!("User: {:?}", user);
///
/// // POST /v1/users with a JSON body and the CSRF header
/// let created = client
///     .post("/users", &CreateUser { name: "Alice".to_string() })
///     .await?;
/// println!("Created: {:?}", created);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: Option<String>,
    path_prefix: Option<String>,
    default_headers: HeaderMap,
    csrf: Option<CsrfOptions>,
    cookies: Option<Arc<dyn CookieSource>>,
    navigator: Option<Arc<dyn Navigator>>,
    on_error: Option<ErrorHook>,
}

/// Logs the error once, hands it to the hook, and gives it back for returning.
///
/// The hook only observes; the caller always receives the error.
fn report(hook: Option<&ErrorHook>, error: Error) -> Error {
    match &error {
        Error::NotOk {
            response,
            raw_response,
            ..
        } if response.status.is_client_error() => {
            tracing::warn!(
                status = response.status.as_u16(),
                response = %raw_response,
                "Client error (4xx)"
            );
        }
        Error::NotOk {
            response,
            raw_response,
            ..
        } if response.status.is_server_error() => {
            tracing::warn!(
                status = response.status.as_u16(),
                response = %raw_response,
                "Server error (5xx)"
            );
        }
        _ => {
            tracing::error!(
                error = %error,
                status = error.status().map(|s| s.as_u16()),
                "Request failed"
            );
        }
    }
    if let Some(hook) = hook {
        hook(&error);
    }
    error
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Runs one request through the pipeline.
    ///
    /// Steps run strictly in order: URL build, body encoding, header
    /// assembly (including CSRF), dispatch, status check, redirect check and
    /// body decoding. Any failure is reported to the error hook and returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Serialization`] if a JSON body cannot be serialized
    /// - [`Error::Transport`] if the exchange fails or is aborted
    /// - [`Error::NotOk`] for a non-2xx response
    /// - [`Error::Redirected`] when `force_redirect` is set and a redirect happened
    /// - [`Error::Parse`] if the body cannot be decoded
    pub async fn fetch(&self, url_like: &str, options: &RequestOptions) -> Result<Resolved> {
        let inner = &self.inner;
        let method = options.method.clone();
        let hook = options.on_error.as_ref().or(inner.on_error.as_ref());

        let url = build_url(
            url_like,
            &UrlParts {
                base_url: options.base_url.as_deref().or(inner.base_url.as_deref()),
                path_prefix: options
                    .path_prefix
                    .as_deref()
                    .or(inner.path_prefix.as_deref()),
                path_variables: Some(&options.path_variables),
                query: Some(&options.query),
            },
        );

        // Fresh copy: the caller's maps are never touched.
        let mut headers = inner.default_headers.clone();
        for name in options.headers.keys() {
            headers.remove(name);
            for value in options.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        let encoded = encode_body(options.body.as_ref(), headers.contains_key(CONTENT_TYPE))
            .map_err(|source| {
                report(
                    hook,
                    Error::Serialization {
                        method: method.clone(),
                        source,
                    },
                )
            })?;
        if let Some(content_type) = encoded.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        apply_csrf(
            &mut headers,
            &method,
            options.csrf.as_ref().or(inner.csrf.as_ref()),
            inner.cookies.as_deref(),
            &url,
        );

        tracing::debug!(method = %method, url = %url, "Executing HTTP request");

        let start_time = Instant::now();
        let request = TransportRequest {
            method: method.clone(),
            url: url.clone(),
            headers,
            body: encoded.payload,
            signal: options.signal.clone(),
            credentials: options.credentials,
            cache: options.cache,
            mode: options.mode,
            priority: options.priority,
        };
        let response: Response = inner
            .transport
            .send(request)
            .await
            .map_err(|source| {
                report(
                    hook,
                    Error::Transport {
                        method: method.clone(),
                        source,
                    },
                )
            })?
            .into();

        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            redirected = response.redirected(),
            "Received HTTP response"
        );

        if !response.ok() {
            if response.kind().is_opaque() && options.mode == RequestMode::NoCors {
                tracing::debug!(url = %url, "Accepting opaque response");
                return Ok(Resolved::Void);
            }
            let head = response.head().clone();
            let raw_response = response.text().await.unwrap_or_default();

            return Err(report(
                hook,
                Error::NotOk {
                    method,
                    response: head,
                    raw_response,
                },
            ));
        }

        if options.force_redirect && response.redirected() {
            let location = response
                .header(LOCATION.as_str())
                .unwrap_or(response.url())
                .to_string();
            if let Some(navigator) = &inner.navigator {
                navigator.navigate(&location);
            }
            let (head, _) = response.into_parts();
            return Err(report(
                hook,
                Error::Redirected {
                    method,
                    response: head,
                    location,
                },
            ));
        }

        let resolve_options = ResolveOptions {
            mode: options.resolve,
            reviver: options.reviver.as_ref(),
            unmatched: options.unmatched_content_type,
        };
        let head = response.head().clone();
        resolve(response, &resolve_options).await.map_err(|source| {
            report(
                hook,
                Error::Parse {
                    method,
                    response: head,
                    source,
                },
            )
        })
    }

    async fn send_with(&self, method: Method, path: &str, body: Option<Body>) -> Result<Resolved> {
        let mut options = RequestOptions::new().method(method);
        options.body = body;
        self.fetch(path, &options).await
    }

    /// Makes a GET request to the specified path.
    pub async fn get(&self, path: &str) -> Result<Resolved> {
        self.send_with(Method::GET, path, None).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post<Req>(&self, path: &str, body: &Req) -> Result<Resolved>
    where
        Req: serde::Serialize + Clone + Send + Sync + 'static,
    {
        self.send_with(Method::POST, path, Some(Body::json(body.clone())))
            .await
    }

    /// Makes a PUT request with a JSON body.
    pub async fn put<Req>(&self, path: &str, body: &Req) -> Result<Resolved>
    where
        Req: serde::Serialize + Clone + Send + Sync + 'static,
    {
        self.send_with(Method::PUT, path, Some(Body::json(body.clone())))
            .await
    }

    /// Makes a PATCH request with a JSON body.
    pub async fn patch<Req>(&self, path: &str, body: &Req) -> Result<Resolved>
    where
        Req: serde::Serialize + Clone + Send + Sync + 'static,
    {
        self.send_with(Method::PATCH, path, Some(Body::json(body.clone())))
            .await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete(&self, path: &str) -> Result<Resolved> {
        self.send_with(Method::DELETE, path, None).await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use wirefetch::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), wirefetch::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .on_error(|e| eprintln!("request failed: {}", e))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<String>,
    path_prefix: Option<String>,
    default_headers: HeaderMap,
    csrf: Option<CsrfOptions>,
    cookies: Option<Arc<dyn CookieSource>>,
    navigator: Option<Arc<dyn Navigator>>,
    on_error: Option<ErrorHook>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            base_url: None,
            path_prefix: None,
            default_headers: HeaderMap::new(),
            csrf: None,
            cookies: None,
            navigator: None,
            on_error: None,
            timeout: None,
        }
    }

    /// Sets the base URL prepended to every path.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets a prefix inserted between the base URL and every path.
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the CSRF configuration used when a call does not bring its own.
    pub fn csrf(mut self, csrf: CsrfOptions) -> Self {
        self.csrf = Some(csrf);
        self
    }

    /// Sets where CSRF tokens are looked up by cookie name.
    pub fn cookie_source(mut self, cookies: Arc<dyn CookieSource>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    /// Sets the navigator invoked on forced redirects.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Sets the error hook used when a call does not bring its own.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Replaces the default reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the request timeout of the default reqwest transport.
    ///
    /// Ignored when a custom transport is set.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default HTTP client cannot be created.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http_client = reqwest::Client::builder().build().map_err(|e| {
                    Error::Configuration(format!("Failed to build HTTP client: {}", e))
                })?;
                let mut transport = ReqwestTransport::new(http_client);
                if let Some(timeout) = self.timeout {
                    transport = transport.with_timeout(timeout);
                }
                Arc::new(transport)
            }
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url: self.base_url,
                path_prefix: self.path_prefix,
                default_headers: self.default_headers,
                csrf: self.csrf,
                cookies: self.cookies,
                navigator: self.navigator,
                on_error: self.on_error,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
