//! Request description and the pure pieces of request assembly.
//!
//! # Design
//! `RequestDetails` is built by the caller right before a call and moved into
//! `Client::execute`, so the optional body goes with it and is dropped on
//! every exit path. URL composition and header merging are free functions
//! with no I/O; the executor calls them and so do the vector tests.

use std::collections::BTreeMap;

use bytes::Bytes;
use futures::TryStream;
use url::{form_urlencoded, ParseError, Url};

/// Header name to ordered values. Sorted by name, so a request's header
/// order does not change between calls.
pub type Headers = BTreeMap<String, Vec<String>>;

/// Query key to ordered values. Sorted by key, which fixes the encoded order.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// One call for `Client::execute`.
///
/// A successful JSON body is decoded into `response_out`; on any failure it
/// is left as it was.
#[derive(Debug)]
pub struct RequestDetails<'a, T> {
    /// HTTP method token. Empty means `GET`.
    pub method: String,
    /// Path joined onto the client's base address.
    pub uri: String,
    pub query: Option<QueryParams>,
    /// Merged over the client's default headers, replacing same-named keys.
    pub extra_headers: Option<Headers>,
    /// Read lazily while the request is sent. Dropped on every exit path.
    pub body: Option<reqwest::Body>,
    pub response_out: &'a mut T,
}

impl<'a, T> RequestDetails<'a, T> {
    pub fn new(method: impl Into<String>, uri: impl Into<String>, response_out: &'a mut T) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            query: None,
            extra_headers: None,
            body: None,
            response_out,
        }
    }

    pub fn get(uri: impl Into<String>, response_out: &'a mut T) -> Self {
        Self::new("GET", uri, response_out)
    }

    pub fn post(uri: impl Into<String>, response_out: &'a mut T) -> Self {
        Self::new("POST", uri, response_out)
    }

    /// Appends `value` to the query values for `key`.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(QueryParams::new)
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Appends `value` to the extra header values for `name`.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers
            .get_or_insert_with(Headers::new)
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// In-memory bytes, or anything else reqwest can turn into a body
    /// (a `tokio::fs::File`, for one).
    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// A body pulled chunk by chunk as the request is written.
    pub fn body_stream<S>(mut self, stream: S) -> Self
    where
        S: TryStream + Send + 'static,
        S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        Bytes: From<S::Ok>,
    {
        self.body = Some(reqwest::Body::wrap_stream(stream));
        self
    }
}

/// Joins `uri` onto `base` and applies `query`.
///
/// Path segments are rejoined with exactly one `/`; `.` segments are dropped
/// and `..` removes the previous one. A trailing `/` survives only when `uri`
/// ends with one. `Some(query)` replaces whatever query `base` carried, while
/// `None` keeps it.
pub fn compose_url(base: &str, uri: &str, query: Option<&QueryParams>) -> Result<Url, ParseError> {
    let mut url = Url::parse(base)?;
    if url.cannot_be_a_base() {
        return Err(ParseError::RelativeUrlWithCannotBeABaseBase);
    }

    let path = join_path(url.path(), uri);
    url.set_path(&path);

    if let Some(query) = query {
        let encoded = encode_query(query);
        url.set_query((!encoded.is_empty()).then_some(encoded.as_str()));
    }
    Ok(url)
}

fn join_path(base: &str, uri: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(uri.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if uri.ends_with('/') && !path.ends_with('/') {
        path.push('/');
    }
    path
}

fn encode_query(query: &QueryParams) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(
            query
                .iter()
                .flat_map(|(key, values)| values.iter().map(move |value| (key, value))),
        )
        .finish()
}

/// Right-biased union: every key of `extra` wins with its whole value list.
pub fn merge_headers(defaults: &Headers, extra: Option<&Headers>) -> Headers {
    let mut merged = defaults.clone();
    if let Some(extra) = extra {
        merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &[&str])]) -> Headers {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn compose_handles_slashes_on_both_sides() {
        let query = QueryParams::from([("limit".to_string(), vec!["10".to_string()])]);
        let url = compose_url("https://api.example.com/", "/v1/items", Some(&query)).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/items?limit=10");

        for (base, uri) in [
            ("https://api.example.com", "v1/items"),
            ("https://api.example.com/", "v1/items"),
            ("https://api.example.com", "/v1/items"),
            ("https://api.example.com//", "//v1//items"),
        ] {
            let url = compose_url(base, uri, None).unwrap();
            assert_eq!(url.as_str(), "https://api.example.com/v1/items", "{base} + {uri}");
        }
    }

    #[test]
    fn compose_never_doubles_or_drops_separators() {
        let bases = ["http://h.example", "http://h.example/", "http://h.example/a", "http://h.example/a/"];
        let uris = ["b", "/b", "b/", "/b/", "//b//c", ""];
        for base in bases {
            for uri in uris {
                let url = compose_url(base, uri, None).unwrap();
                let path = url.path();
                assert!(!path.contains("//"), "{base} + {uri} -> {path}");
                assert!(path.starts_with('/'), "{base} + {uri} -> {path}");
                if base.ends_with("/a") || base.ends_with("/a/") {
                    assert!(path.starts_with("/a"), "{base} + {uri} -> {path}");
                }
                if uri.contains('b') {
                    assert!(path.contains("/b"), "{base} + {uri} -> {path}");
                }
            }
        }
    }

    #[test]
    fn compose_keeps_trailing_slash_from_uri_only() {
        let url = compose_url("https://h.example/api/", "items/", None).unwrap();
        assert_eq!(url.path(), "/api/items/");
        let url = compose_url("https://h.example/api/", "", None).unwrap();
        assert_eq!(url.path(), "/api");
        let url = compose_url("https://h.example", "/", None).unwrap();
        assert_eq!(url.as_str(), "https://h.example/");
    }

    #[test]
    fn compose_resolves_dot_segments() {
        let url = compose_url("https://h.example/a/b", "../c/./d", None).unwrap();
        assert_eq!(url.path(), "/a/c/d");
        let url = compose_url("https://h.example/a", "../../x", None).unwrap();
        assert_eq!(url.path(), "/x");
    }

    #[test]
    fn query_is_sorted_and_form_encoded() {
        let query = QueryParams::from([
            ("b".to_string(), vec!["2".to_string()]),
            ("a".to_string(), vec!["1".to_string(), "3".to_string()]),
            ("q".to_string(), vec!["hello world&more".to_string()]),
        ]);
        let url = compose_url("https://h.example", "s", Some(&query)).unwrap();
        assert_eq!(url.query(), Some("a=1&a=3&b=2&q=hello+world%26more"));
    }

    #[test]
    fn present_query_replaces_base_query_absent_keeps_it() {
        let base = "https://h.example/search?x=1";
        let url = compose_url(base, "v1", None).unwrap();
        assert_eq!(url.as_str(), "https://h.example/search/v1?x=1");

        let query = QueryParams::from([("y".to_string(), vec!["2".to_string()])]);
        let url = compose_url(base, "v1", Some(&query)).unwrap();
        assert_eq!(url.as_str(), "https://h.example/search/v1?y=2");

        let url = compose_url(base, "v1", Some(&QueryParams::new())).unwrap();
        assert_eq!(url.as_str(), "https://h.example/search/v1");
    }

    #[test]
    fn compose_is_deterministic() {
        let query = QueryParams::from([
            ("z".to_string(), vec!["1".to_string()]),
            ("m".to_string(), vec!["2".to_string()]),
        ]);
        let first = compose_url("https://h.example/", "/v1", Some(&query)).unwrap();
        let second = compose_url("https://h.example/", "/v1", Some(&query)).unwrap();
        assert_eq!(first.as_str(), second.as_str());
    }

    #[test]
    fn compose_rejects_unusable_bases() {
        assert_eq!(
            compose_url("not a url", "/v1", None).unwrap_err(),
            ParseError::RelativeUrlWithoutBase
        );
        assert_eq!(compose_url("", "/v1", None).unwrap_err(), ParseError::RelativeUrlWithoutBase);
        assert_eq!(
            compose_url("mailto:ops@example.com", "/v1", None).unwrap_err(),
            ParseError::RelativeUrlWithCannotBeABaseBase
        );
    }

    #[test]
    fn merge_extra_replaces_whole_value_list() {
        let defaults = headers(&[("Authorization", &["Bearer x"]), ("Accept", &["a", "b"])]);
        let extra = headers(&[("Authorization", &["Bearer y"]), ("Accept", &["c"])]);
        let merged = merge_headers(&defaults, Some(&extra));
        assert_eq!(merged, headers(&[("Authorization", &["Bearer y"]), ("Accept", &["c"])]));
    }

    #[test]
    fn merge_is_right_biased_union() {
        let defaults = headers(&[("A", &["1"]), ("B", &["2"])]);
        let extra = headers(&[("B", &["3"]), ("C", &["4"])]);
        let merged = merge_headers(&defaults, Some(&extra));
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["A"], vec!["1"]);
        assert_eq!(merged["B"], vec!["3"]);
        assert_eq!(merged["C"], vec!["4"]);

        assert_eq!(merge_headers(&defaults, None), defaults);
    }

    #[test]
    fn details_builder_appends_values() {
        let mut out = 0u8;
        let details = RequestDetails::get("/v1/items", &mut out)
            .query("tag", "a")
            .query("tag", "b")
            .header("X-Trace", "1");
        assert_eq!(details.method, "GET");
        assert_eq!(details.query.as_ref().unwrap()["tag"], vec!["a", "b"]);
        assert_eq!(details.extra_headers.as_ref().unwrap()["X-Trace"], vec!["1"]);
        assert!(details.body.is_none());
    }

    #[test]
    fn body_stream_is_attached_without_reading() {
        let mut out = 0u8;
        let chunks = futures::stream::iter([
            Ok::<_, std::io::Error>(Bytes::from_static(b"{")),
            Ok(Bytes::from_static(b"}")),
        ]);
        let details = RequestDetails::post("/items", &mut out).body_stream(chunks);
        let body = details.body.as_ref().unwrap();
        assert!(body.as_bytes().is_none());
    }
}
