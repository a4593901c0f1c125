//! Error types shared across the dispatch core.
//!
//! # Taxonomy
//! - [`RegistrationError`]: raised while routes, middleware and handlers are
//!   being registered and committed. Always fatal at boot.
//! - [`HttpError`]: raised while a request is being served. Carries an
//!   optional status and code and is rendered by the exception handler.
//!
//! # Design Decisions
//! - A missing status is not defaulted here; the exception handler decides
//!   (500) so errors raised deep in a handler stay untouched until rendering.
//! - Errors may carry their own report/render behavior. When present it takes
//!   precedence over the exception handler defaults.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::http::context::HttpContext;

/// Errors raised while building the route table and middleware chains.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("duplicate route name `{0}`")]
    DuplicateRouteName(String),

    #[error("cannot create nested route groups")]
    NestedGroups,

    #[error("missing named middleware `{0}`")]
    MissingNamedMiddleware(String),

    #[error("cannot resolve route handler `{0}`")]
    MissingHandler(String),

    #[error("brisk route `{0}` has no handler")]
    IncompleteBriskRoute(String),

    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("routes cannot be registered after the router is committed")]
    RouterCommitted,
}

/// Custom reporting behavior attached to a single error.
pub type ErrorReporter = Arc<dyn Fn(&HttpError, &HttpContext) + Send + Sync>;

/// Custom rendering behavior attached to a single error.
pub type ErrorRenderer = Arc<dyn Fn(&HttpError, &mut HttpContext) + Send + Sync>;

/// Error code attached to route misses.
pub const E_ROUTE_NOT_FOUND: &str = "E_ROUTE_NOT_FOUND";

/// A runtime error raised by a hook, middleware or handler.
pub struct HttpError {
    message: String,
    status: Option<StatusCode>,
    code: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    backtrace: Backtrace,
    reporter: Option<ErrorReporter>,
    renderer: Option<ErrorRenderer>,
}

impl HttpError {
    /// Create an error with a message and no status.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
            source: None,
            backtrace: Backtrace::capture(),
            reporter: None,
            renderer: None,
        }
    }

    /// Wrap another error, keeping it as the source.
    pub fn from_source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut this = Self::new(error.to_string());
        this.source = Some(Box::new(error));
        this
    }

    /// The error raised when no route matches the request.
    pub fn route_not_found(method: &Method, path: &str) -> Self {
        Self::new(format!("Cannot {} {}", method, path))
            .with_status(StatusCode::NOT_FOUND)
            .with_code(E_ROUTE_NOT_FOUND)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a reporter that replaces the default logging for this error.
    pub fn report_with<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&HttpError, &HttpContext) + Send + Sync + 'static,
    {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Attach a renderer that replaces the default response for this error.
    pub fn render_with<F>(mut self, renderer: F) -> Self
    where
        F: Fn(&HttpError, &mut HttpContext) + Send + Sync + 'static,
    {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn reporter(&self) -> Option<&ErrorReporter> {
        self.reporter.as_ref()
    }

    pub fn renderer(&self) -> Option<&ErrorRenderer> {
        self.renderer.as_ref()
    }

    /// Human readable trace: the error, its source chain and the captured
    /// backtrace when `RUST_BACKTRACE` enabled capturing.
    pub fn stack(&self) -> Vec<String> {
        let mut frames = vec![format!("Error: {}", self.message)];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            frames.push(format!("Caused by: {}", err));
            source = err.source();
        }
        if self.backtrace.status() == BacktraceStatus::Captured {
            frames.extend(self.backtrace.to_string().lines().map(str::to_string));
        }
        frames
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError")
            .field("message", &self.message)
            .field("status", &self.status)
            .field("code", &self.code)
            .field("source", &self.source)
            .field("reporter", &self.reporter.is_some())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(error: serde_json::Error) -> Self {
        Self::from_source(error).with_status(StatusCode::BAD_REQUEST)
    }
}

impl From<std::io::Error> for HttpError {
    fn from(error: std::io::Error) -> Self {
        Self::from_source(error)
    }
}

impl From<crate::routing::url::UrlError> for HttpError {
    fn from(error: crate::routing::url::UrlError) -> Self {
        Self::from_source(error)
    }
}
