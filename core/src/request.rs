use std::mem;
use std::str::FromStr;

use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;

use crate::{Error, Result};

/// Signing context for request.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, exactly as it appears on the wire (still percent-encoded).
    pub path: String,
    /// HTTP query parameters, decoded.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        let path = match paq.path() {
            "" => "/".to_string(),
            v => v.to_string(),
        };

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path,
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    ///
    /// Query pairs are written as they are, callers must encode them first.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if self.query.is_empty() {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum::<usize>()
    }

    /// Push a new query pair into query list.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Normalize header value.
    ///
    /// Leading and trailing whitespace is trimmed and every inner run of
    /// spaces or tabs is collapsed into a single space.
    pub fn header_value_normalize(v: &HeaderValue) -> Result<String> {
        let value = v.to_str()?;

        let mut s = String::with_capacity(value.len());
        for word in value.split([' ', '\t']).filter(|w| !w.is_empty()) {
            if !s.is_empty() {
                s.push(' ');
            }
            s.push_str(word);
        }
        Ok(s)
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("no-space", "no-space")]
    #[test_case("\ttab-space", "tab-space")]
    #[test_case("trailing-space    ", "trailing-space")]
    #[test_case("    leading-space", "leading-space")]
    #[test_case("    wrapped-space    ", "wrapped-space")]
    #[test_case("inner      space", "inner space")]
    #[test_case("a \t b", "a b")]
    fn test_header_value_normalize(input: &str, expected: &str) {
        let v = HeaderValue::from_str(input).expect("must be valid header value");
        assert_eq!(SigningRequest::header_value_normalize(&v).unwrap(), expected);
    }

    #[test]
    fn test_build_and_apply() -> anyhow::Result<()> {
        let req = http::Request::get("https://example.com/a%20b?x=1&y=hello%20world")
            .header("x-test", "value")
            .body(())?;
        let (mut parts, _) = req.into_parts();

        let mut sr = SigningRequest::build(&mut parts)?;
        assert_eq!(sr.path, "/a%20b");
        assert_eq!(
            sr.query,
            vec![
                ("x".to_string(), "1".to_string()),
                ("y".to_string(), "hello world".to_string())
            ]
        );
        assert!(parts.headers.is_empty());

        sr.query = vec![("z".to_string(), "2".to_string())];
        sr.apply(&mut parts)?;
        assert_eq!(parts.uri.to_string(), "https://example.com/a%20b?z=2");
        assert_eq!(parts.headers["x-test"], "value");
        Ok(())
    }

    #[test]
    fn test_build_without_authority() -> anyhow::Result<()> {
        let (mut parts, _) = http::Request::get("/relative").body(())?.into_parts();
        let err = SigningRequest::build(&mut parts).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RequestInvalid);
        Ok(())
    }
}
