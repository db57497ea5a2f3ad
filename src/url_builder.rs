//! URL assembly: base URL, path prefix, path variables and query string.

use crate::options::{PathVariables, QueryParams, QueryValue};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static PATH_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([A-Za-z0-9_]+)").expect("path variable pattern is valid")
});

/// Inputs to [`build_url`] besides the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlParts<'a> {
    pub base_url: Option<&'a str>,
    pub path_prefix: Option<&'a str>,
    pub path_variables: Option<&'a PathVariables>,
    pub query: Option<&'a QueryParams>,
}

/// Percent-encodes a single path or query component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Empty and `/` become `""`; anything else gets exactly one leading `/`
/// and loses one trailing `/`.
fn normalize_segment(segment: &str) -> String {
    if segment.is_empty() || segment == "/" {
        return String::new();
    }
    let mut normalized = if segment.starts_with('/') {
        segment.to_string()
    } else {
        format!("/{}", segment)
    };
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Strips one trailing `/` unless the base is just `/`. A bare `/` base is
/// dropped when a path follows, since the path already starts with one.
fn normalize_base<'a>(base: &'a str, path: &str) -> &'a str {
    if base.len() > 1 {
        base.strip_suffix('/').unwrap_or(base)
    } else if base == "/" && !path.is_empty() {
        ""
    } else {
        base
    }
}

/// Replaces `:name` placeholders. Placeholders without a value are kept.
fn substitute(path: &str, variables: &PathVariables) -> String {
    PATH_VARIABLE
        .replace_all(path, |caps: &Captures<'_>| {
            let name = &caps[1];
            match variables.get(name) {
                Some(value) => match &variables.formatter {
                    Some(format) => format(name, value),
                    None => encode_component(value),
                },
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Sets `key` to `value`: the first existing entry is replaced in place and
/// any later duplicates removed.
fn set_pair(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter().position(|(k, _)| *k == key) {
        Some(index) => {
            pairs[index].1 = value;
            let mut seen = 0;
            pairs.retain(|(k, _)| {
                if *k != key {
                    return true;
                }
                seen += 1;
                seen == 1
            });
        }
        None => pairs.push((key, value)),
    }
}

fn query_pairs(query: &QueryParams) -> Vec<(String, String)> {
    match query {
        QueryParams::None => Vec::new(),
        QueryParams::Prebuilt(pairs) => pairs.clone(),
        QueryParams::Map { entries, formatter } => {
            let format = |key: &str, value: &str| match formatter {
                Some(format) => format(key, value),
                None => (key.to_string(), value.to_string()),
            };
            let mut pairs = Vec::new();
            for (key, value) in entries {
                match value {
                    None => {}
                    Some(QueryValue::Many(values)) => {
                        pairs.extend(values.iter().map(|value| format(key, value)));
                    }
                    Some(QueryValue::Single(value)) => {
                        let (key, value) = format(key, value);
                        set_pair(&mut pairs, key, value);
                    }
                }
            }
            pairs
        }
    }
}

fn encode_query(pairs: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    serializer.finish()
}

/// Builds the request URL from a path and the surrounding configuration.
///
/// ```
/// use wirefetch::{build_url, RequestOptions, UrlParts};
///
/// let options = RequestOptions::new()
///     .path_variable("id", "42")
///     .query("active", true);
/// let url = build_url(
///     "/users/:id",
///     &UrlParts {
///         base_url: Some("https://api.example.com/"),
///         path_variables: Some(&options.path_variables),
///         query: Some(&options.query),
///         ..UrlParts::default()
///     },
/// );
/// assert_eq!(url, "https://api.example.com/users/42?active=true");
/// ```
pub fn build_url(path: &str, parts: &UrlParts<'_>) -> String {
    let prefix = normalize_segment(parts.path_prefix.unwrap_or_default());
    let mut full_path = prefix + &normalize_segment(path);

    if let Some(variables) = parts.path_variables.filter(|v| !v.is_empty()) {
        full_path = substitute(&full_path, variables);
    }

    let query = parts
        .query
        .map(|query| encode_query(&query_pairs(query)))
        .unwrap_or_default();

    let base = normalize_base(parts.base_url.unwrap_or_default(), &full_path);
    if query.is_empty() {
        format!("{}{}", base, full_path)
    } else {
        format!("{}{}?{}", base, full_path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestOptions;

    fn url(path: &str, base: Option<&str>, prefix: Option<&str>) -> String {
        build_url(
            path,
            &UrlParts {
                base_url: base,
                path_prefix: prefix,
                ..UrlParts::default()
            },
        )
    }

    fn with_options(path: &str, options: &RequestOptions) -> String {
        build_url(
            path,
            &UrlParts {
                base_url: options.base_url.as_deref(),
                path_prefix: options.path_prefix.as_deref(),
                path_variables: Some(&options.path_variables),
                query: Some(&options.query),
            },
        )
    }

    #[test]
    fn test_join_points_never_double_slash() {
        let bases = [
            None,
            Some("/"),
            Some("https://api.example.com"),
            Some("https://api.example.com/"),
        ];
        let prefixes = [
            None,
            Some(""),
            Some("/"),
            Some("v1"),
            Some("/v1"),
            Some("v1/"),
            Some("/v1/"),
        ];
        let paths = ["", "/", "users", "/users", "users/", "/users/"];

        for base in bases {
            for prefix in prefixes {
                for path in paths {
                    let built = url(path, base, prefix);
                    let without_scheme = built.trim_start_matches("https://");
                    assert!(
                        !without_scheme.contains("//"),
                        "double slash in {:?} (base {:?}, prefix {:?}, path {:?})",
                        built,
                        base,
                        prefix,
                        path
                    );
                    if !path.trim_matches('/').is_empty() {
                        assert!(built.ends_with("/users"), "dropped path in {:?}", built);
                    }
                    if prefix.is_some_and(|p| p.trim_matches('/') == "v1") {
                        assert!(built.contains("/v1"), "dropped prefix in {:?}", built);
                    }
                }
            }
        }
    }

    #[test]
    fn test_prefix_then_path() {
        assert_eq!(url("items", Some("https://h.io/"), Some("api/")), "https://h.io/api/items");
        assert_eq!(url("/", None, None), "");
        assert_eq!(url("/items/", None, Some("/")), "/items");
    }

    #[test]
    fn test_root_base_is_kept() {
        assert_eq!(url("users", Some("/"), None), "/users");
        assert_eq!(url("", Some("/"), None), "/");
    }

    #[test]
    fn test_path_variables_are_encoded() {
        let options = RequestOptions::new().path_variable("name", "a b/c");
        assert_eq!(with_options("/files/:name", &options), "/files/a%20b%2Fc");
    }

    #[test]
    fn test_missing_path_variable_survives() {
        let options = RequestOptions::new()
            .path_variable("org", "acme")
            .path_variable_unset("repo");
        assert_eq!(
            with_options("/orgs/:org/repos/:repo/issues/:issue", &options),
            "/orgs/acme/repos/:repo/issues/:issue"
        );
    }

    #[test]
    fn test_path_formatter() {
        let options = RequestOptions::new()
            .path_variable("id", "AbC")
            .path_formatter(|name, value| format!("{}-{}", name, value.to_lowercase()));
        assert_eq!(with_options("/x/:id", &options), "/x/id-abc");
    }

    #[test]
    fn test_undefined_query_value_is_skipped() {
        let options = RequestOptions::new()
            .query("a", 1)
            .query_opt("skip", None)
            .query("b", "two");
        let built = with_options("/q", &options);
        assert_eq!(built, "/q?a=1&b=two");
        assert!(!built.contains("skip"));
    }

    #[test]
    fn test_sequence_expands_in_order() {
        let options = RequestOptions::new().query("tag", vec!["z", "a", "m"]);
        assert_eq!(with_options("/q", &options), "/q?tag=z&tag=a&tag=m");
    }

    #[test]
    fn test_scalar_overwrites_earlier_value() {
        let options = RequestOptions::new()
            .query("tag", vec!["x", "y"])
            .query("page", 1)
            .query("tag", "only");
        assert_eq!(with_options("/q", &options), "/q?tag=only&page=1");
    }

    #[test]
    fn test_query_formatter() {
        let options = RequestOptions::new()
            .query("Sort", "Name")
            .query_formatter(|k, v| (k.to_lowercase(), v.to_lowercase()));
        assert_eq!(with_options("/q", &options), "/q?sort=name");
    }

    #[test]
    fn test_prebuilt_query_is_used_verbatim() {
        let options = RequestOptions::new().query_prebuilt(vec![
            ("a".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
        ]);
        assert_eq!(with_options("/q", &options), "/q?a=1&a=2");
    }

    #[test]
    fn test_empty_query_adds_no_question_mark() {
        let options = RequestOptions::new().query_opt("gone", None);
        assert_eq!(with_options("/q", &options), "/q");
    }

    #[test]
    fn test_user_scenario() {
        let options = RequestOptions::new()
            .base_url("https://api.example.com/")
            .path_variable("id", "42")
            .query("active", true);
        assert_eq!(
            with_options("/users/:id", &options),
            "https://api.example.com/users/42?active=true"
        );
    }
}
