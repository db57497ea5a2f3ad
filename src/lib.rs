//! # wirefetch - an HTTP request pipeline
//!
//! wirefetch wraps a "send a request, get a response" transport with
//! everything a REST call needs around it: URL templating, automatic body
//! encoding, CSRF header injection, response decoding and a single structured
//! error type.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wirefetch::{Client, RequestOptions, Resolved};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Clone)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")
//!         .build()?;
//!
//!     // GET https://api.example.com/users/123?fields=name
//!     let user: User = client
//!         .fetch(
//!             "/users/:id",
//!             &RequestOptions::new()
//!                 .path_variable("id", "123")
//!                 .query("fields", "name"),
//!         )
//!         .await?
//!         .into_json()?;
//!     println!("User: {}", user.name);
//!
//!     // POST with a JSON body; the content type is set automatically
//!     let created = client
//!         .post("/users", &CreateUser { name: "Alice".to_string() })
//!         .await?;
//!     if let Resolved::Json(value) = created {
//!         println!("Created: {}", value);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! Each call runs these steps in order, and never retries:
//!
//! 1. **URL** - base URL, path prefix, `:name` path variables, query string
//! 2. **Body** - form data, blob, url-encoded, text or JSON, with the content
//!    type inferred unless the caller set one
//! 3. **CSRF** - an optional token header from a fixed value or a cookie
//! 4. **Dispatch** - one exchange through the [`Transport`]
//! 5. **Checks** - non-2xx fails, opaque responses are accepted on opt-in,
//!    forced redirects fail with the target location
//! 6. **Resolve** - decode per [`ResolveMode`]
//!
//! ## Error Handling
//!
//! ```no_run
//! use wirefetch::{Client, Error, RequestOptions};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com").build()?;
//! match client.fetch("/endpoint", &RequestOptions::new()).await {
//!     Ok(resolved) => println!("Success: {:?}", resolved),
//!     Err(e) if e.has_status(401) => eprintln!("Please sign in"),
//!     Err(Error::Transport { source, .. }) => eprintln!("Network trouble: {}", source),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod body;
mod client;
pub mod csrf;
mod error;
pub mod options;
pub mod resolve;
mod response;
pub mod reviver;
pub mod transport;
mod url_builder;

pub use body::{Blob, Body, FormData, FormPart};
pub use client::{Client, ClientBuilder};
pub use csrf::{CookieSource, CsrfOptions, StaticCookies};
pub use error::{is_request_error, Error, ParseError, Result};
pub use options::{
    AbortSignal, CacheMode, Credentials, Priority, QueryParams, QueryValue, RequestMode,
    RequestOptions, ResolveMode, Reviver, UnmatchedContentType,
};
pub use response::{File, Resolved, Response, ResponseHead};
pub use transport::{
    ByteStream, Navigator, ReqwestTransport, ResponseType, Transport, TransportError,
    TransportRequest, TransportResponse,
};
pub use url_builder::{build_url, encode_component, UrlParts};
