//! Response wrapper written by hooks, middleware and handlers.
//!
//! # Responsibilities
//! - Collect status, headers and body for the current request
//! - Track whether a response was given (used for short-circuiting)
//! - Convert into an axum response for the transport
//!
//! # Design Decisions
//! - Setting a status or writing a body marks the response as given;
//!   later writes replace it. Headers alone do not
//! - Invalid header names/values are dropped with a warning, not a panic

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;

use crate::error::HttpError;

/// The outgoing HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    responded: bool,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
            responded: false,
        }
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self.responded = true;
        self
    }

    /// Mark the response as given without writing a body, e.g. a
    /// preflight answered with headers only.
    pub fn end(&mut self) -> &mut Self {
        self.responded = true;
        self
    }

    pub fn get_status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn content_type_or(&mut self, content_type: &'static str) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }

    /// Send a plain text body.
    pub fn send(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.content_type_or("text/plain; charset=utf-8");
        self.write(body)
    }

    /// Send an HTML body.
    pub fn html(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        self.write(body)
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, HttpError> {
        let body = serde_json::to_vec(value).map_err(HttpError::from_source)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self.write(body))
    }

    /// Redirect to `location`.
    pub fn redirect(&mut self, location: &str, status: StatusCode) -> &mut Self {
        self.status(status).header(LOCATION.as_str(), location);
        self.write(Bytes::new())
    }

    fn write(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self.responded = true;
        self
    }

    /// Whether a status or body was set, or [`Self::end`] was called.
    pub fn is_responded(&self) -> bool {
        self.responded
    }

    /// Whether a body (possibly empty) was written.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Body as UTF-8 text (lossy), empty when nothing was written.
    pub fn body_text(&self) -> String {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// Convert into an axum response. An unwritten response becomes an
    /// empty 204 when the status was left at 200.
    pub fn into_http(self) -> Response {
        let status = match (&self.body, self.status) {
            (None, StatusCode::OK) => StatusCode::NO_CONTENT,
            (_, status) => status,
        };
        let mut response = Response::new(Body::from(self.body.unwrap_or_default()));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}
