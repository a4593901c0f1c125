//! Request wrapper handed to hooks, middleware and handlers.
//!
//! # Responsibilities
//! - Expose method, path, host, headers, query and buffered body
//! - Content negotiation over the `Accept` header
//! - Request ID lookup (`x-request-id`)
//!
//! # Design Decisions
//! - The body is buffered by the transport before dispatch; parsing it is
//!   left to handlers (`json()` is a thin serde helper)
//! - Host comes from the `Host` header, falling back to the URI authority

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::header::{ACCEPT, HOST};
use axum::http::{request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::de::DeserializeOwned;

use crate::error::HttpError;
use crate::routing::url::verify_signed_url;
use crate::security::Encrypter;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// An incoming HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpRequest {
    /// Build a request from a method and a path (with optional query).
    /// An unparsable URI falls back to `/`.
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.parse().unwrap_or_default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        }
    }

    /// Builder-style header insert; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query_string(&self) -> &str {
        self.uri.query().unwrap_or_default()
    }

    /// Decoded query parameters. Repeated keys keep the last value.
    pub fn query(&self) -> BTreeMap<String, String> {
        form_urlencoded::parse(self.query_string().as_bytes())
            .into_owned()
            .collect()
    }

    pub fn host(&self) -> Option<&str> {
        self.header(HOST.as_str()).or_else(|| self.uri.host())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Pick the best of `types` for the `Accept` header.
    ///
    /// Types are short names (`json`, `html`, `text`, `xml`) or full media
    /// types. A missing or empty header accepts the first candidate.
    pub fn accepts<'a>(&self, types: &[&'a str]) -> Option<&'a str> {
        let header = self.header(ACCEPT.as_str()).unwrap_or_default().trim();
        if header.is_empty() {
            return types.first().copied();
        }

        let mut accepted: Vec<(String, f32)> = header
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let media = parts.next()?.trim().to_ascii_lowercase();
                let quality = parts
                    .filter_map(|p| p.trim().strip_prefix("q="))
                    .find_map(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                (!media.is_empty() && quality > 0.0).then_some((media, quality))
            })
            .collect();
        accepted.sort_by(|a, b| b.1.total_cmp(&a.1));

        accepted.iter().find_map(|(media, _)| {
            types
                .iter()
                .copied()
                .find(|candidate| media_matches(media, expand_type(candidate)))
        })
    }

    /// Whether the query carries a valid, unexpired signature.
    pub fn has_valid_signature(&self, encrypter: &dyn Encrypter) -> bool {
        verify_signed_url(self.path(), self.query_string(), encrypter)
    }
}

fn expand_type(short: &str) -> &str {
    match short {
        "json" => "application/json",
        "html" => "text/html",
        "text" => "text/plain",
        "xml" => "application/xml",
        other => other,
    }
}

fn media_matches(accepted: &str, candidate: &str) -> bool {
    if accepted == "*/*" || accepted.eq_ignore_ascii_case(candidate) {
        return true;
    }
    let (Some((a_type, a_sub)), Some((c_type, c_sub))) =
        (accepted.split_once('/'), candidate.split_once('/'))
    else {
        return false;
    };
    if a_sub == "*" {
        return a_type.eq_ignore_ascii_case(c_type);
    }
    // `application/vnd.api+json` satisfies `application/json`.
    a_type.eq_ignore_ascii_case(c_type)
        && a_sub
            .rsplit_once('+')
            .is_some_and(|(_, suffix)| suffix.eq_ignore_ascii_case(c_sub))
}
