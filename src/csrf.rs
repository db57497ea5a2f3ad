//! CSRF header injection.

use crate::Error;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use reqwest::cookie::CookieStore;
use url::Url;

/// Header used when [`CsrfOptions`] does not name one.
pub const DEFAULT_CSRF_HEADER: &str = "x-csrf-token";

/// Read-only access to the cookies visible for a URL.
///
/// Implementations return a `;`-delimited `name=value` list.
pub trait CookieSource: Send + Sync {
    fn cookie_header(&self, url: &str) -> Option<String>;
}

/// A fixed cookie list, e.g. copied from an incoming request.
#[derive(Debug, Clone, Default)]
pub struct StaticCookies(pub String);

impl CookieSource for StaticCookies {
    fn cookie_header(&self, _url: &str) -> Option<String> {
        Some(self.0.clone())
    }
}

impl CookieSource for reqwest::cookie::Jar {
    fn cookie_header(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        let header = self.cookies(&url)?;
        header.to_str().ok().map(str::to_string)
    }
}

/// Where the CSRF token comes from and which requests carry it.
///
/// # Examples
///
/// ```
/// use wirefetch::CsrfOptions;
///
/// let csrf = CsrfOptions::from_cookie("XSRF-TOKEN")
///     .header_name("X-XSRF-TOKEN")
///     .unwrap()
///     .default_matcher(true);
/// ```
#[derive(Debug, Clone)]
pub struct CsrfOptions {
    pub token: Option<String>,
    pub cookie_name: Option<String>,
    pub header_name: HeaderName,
    /// Only inject for state-changing methods (POST, PUT, DELETE, PATCH).
    pub default_matcher: bool,
}

impl Default for CsrfOptions {
    fn default() -> Self {
        Self {
            token: None,
            cookie_name: None,
            header_name: HeaderName::from_static(DEFAULT_CSRF_HEADER),
            default_matcher: false,
        }
    }
}

impl CsrfOptions {
    /// Creates options with no token source and the default header name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed token.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Reads the token from the named cookie.
    pub fn from_cookie(name: impl Into<String>) -> Self {
        Self {
            cookie_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Overrides the header name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name is invalid.
    pub fn header_name(mut self, name: impl AsRef<str>) -> Result<Self, Error> {
        self.header_name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        Ok(self)
    }

    /// Limits the token to POST, PUT, DELETE and PATCH when enabled.
    pub fn default_matcher(mut self, enabled: bool) -> Self {
        self.default_matcher = enabled;
        self
    }

    fn matches(&self, method: &Method) -> bool {
        !self.default_matcher
            || matches!(
                *method,
                Method::POST | Method::PUT | Method::DELETE | Method::PATCH
            )
    }

    fn resolve_token(&self, cookies: Option<&dyn CookieSource>, url: &str) -> String {
        if let Some(token) = &self.token {
            return token.clone();
        }
        self.cookie_name
            .as_deref()
            .zip(cookies.and_then(|source| source.cookie_header(url)))
            .and_then(|(name, header)| find_cookie(&header, name))
            .unwrap_or_default()
    }
}

/// Finds the first cookie whose trimmed name starts with `name` and returns
/// everything after its first `=`.
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find(|cookie| cookie.starts_with(name))
        .map(|cookie| {
            cookie
                .split_once('=')
                .map(|(_, value)| value.to_string())
                .unwrap_or_default()
        })
}

/// Sets the CSRF header on the pipeline's own header map.
///
/// Returns `true` if a header was set.
pub fn apply_csrf(
    headers: &mut HeaderMap,
    method: &Method,
    csrf: Option<&CsrfOptions>,
    cookies: Option<&dyn CookieSource>,
    url: &str,
) -> bool {
    let Some(csrf) = csrf else {
        return false;
    };
    if !csrf.matches(method) {
        return false;
    }

    let token = csrf.resolve_token(cookies, url);
    match HeaderValue::from_str(&token) {
        Ok(value) => {
            headers.insert(csrf.header_name.clone(), value);
            true
        }
        Err(e) => {
            tracing::warn!(
                header = %csrf.header_name,
                error = %e,
                "CSRF token is not a valid header value, skipping"
            );
            false
        }
    }
}
