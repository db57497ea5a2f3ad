//! Turns a response into a [`Resolved`] value according to a [`ResolveMode`].

use crate::body::{APPLICATION_JSON, OCTET_STREAM, TEXT_PLAIN};
use crate::error::ParseError;
use crate::options::{ResolveMode, Reviver, UnmatchedContentType};
use crate::response::{File, Resolved, Response};
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Name given to downloads whose `Content-Disposition` has no usable filename.
pub const UNNAMED_FILE: &str = "unnamed";

static FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*?=(?:[\w-]+'[\w-]*')?"?([^";]+)"?"#)
        .expect("filename pattern is valid")
});

/// Decoding settings taken from the request options.
#[derive(Clone, Copy, Default)]
pub struct ResolveOptions<'a> {
    pub mode: ResolveMode,
    pub reviver: Option<&'a Reviver>,
    pub unmatched: UnmatchedContentType,
}

/// Extracts the filename from a `Content-Disposition` header value.
///
/// ```
/// use wirefetch::resolve::filename_from_disposition;
///
/// assert_eq!(
///     filename_from_disposition(Some("attachment; filename=\"report.pdf\"")),
///     "report.pdf"
/// );
/// assert_eq!(
///     filename_from_disposition(Some("attachment; filename*=UTF-8''na%C3%AFve.txt")),
///     "naïve.txt"
/// );
/// assert_eq!(filename_from_disposition(None), "unnamed");
/// ```
pub fn filename_from_disposition(header: Option<&str>) -> String {
    header
        .and_then(|header| FILENAME.captures(header))
        .and_then(|caps| {
            percent_decode_str(caps[1].trim())
                .decode_utf8()
                .ok()
                .map(|name| name.into_owned())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNNAMED_FILE.to_string())
}

/// Applies `reviver` bottom-up: children first, then their parent, ending
/// with the root under the empty key.
pub fn revive(value: Value, reviver: &Reviver) -> Value {
    let value = revive_children(value, reviver);
    reviver("", value)
}

fn revive_children(value: Value, reviver: &Reviver) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| {
                    let child = revive_children(child, reviver);
                    let revived = reviver(&key, child);
                    (key, revived)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(index, child)| {
                    let child = revive_children(child, reviver);
                    reviver(&index.to_string(), child)
                })
                .collect(),
        ),
        other => other,
    }
}

/// The essence of a content type, lower-cased and without parameters.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

async fn read_json(response: Response, reviver: Option<&Reviver>) -> Result<Value, ParseError> {
    let bytes = response.bytes().await?;
    let value: Value = serde_json::from_slice(&bytes)?;
    Ok(match reviver {
        Some(reviver) => revive(value, reviver),
        None => value,
    })
}

/// Decodes the response per `options.mode`.
///
/// Every mode is terminal. Only [`ResolveMode::Auto`] looks at the
/// `content-type` header.
///
/// # Errors
///
/// Returns a [`ParseError`] if reading or decoding the body fails, or if the
/// auto mode meets an unknown content type under
/// [`UnmatchedContentType::Fail`].
pub async fn resolve(
    response: Response,
    options: &ResolveOptions<'_>,
) -> Result<Resolved, ParseError> {
    match options.mode {
        ResolveMode::Response => Ok(Resolved::Response(response)),
        ResolveMode::Raw => Ok(Resolved::Stream(response.into_stream())),
        ResolveMode::Void => Ok(Resolved::Void),
        ResolveMode::Blob => Ok(Resolved::Blob(response.blob().await?)),
        ResolveMode::File => {
            let name = filename_from_disposition(response.header("content-disposition"));
            let blob = response.blob().await?;
            Ok(Resolved::File(File { name, blob }))
        }
        ResolveMode::Auto => {
            let Some(content_type) = response.head().content_type().map(essence) else {
                return Ok(Resolved::Stream(response.into_stream()));
            };
            match content_type.as_str() {
                APPLICATION_JSON => Ok(Resolved::Json(
                    read_json(response, options.reviver).await?,
                )),
                OCTET_STREAM => Ok(Resolved::Blob(response.blob().await?)),
                TEXT_PLAIN => Ok(Resolved::Text(response.text().await?)),
                _ => match options.unmatched {
                    UnmatchedContentType::Stream => {
                        Ok(Resolved::Stream(response.into_stream()))
                    }
                    UnmatchedContentType::Fail => {
                        Err(ParseError::UnsupportedContentType(content_type))
                    }
                },
            }
        }
    }
}
