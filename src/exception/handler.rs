//! Default reporting and rendering of request errors.
//!
//! # Responsibilities
//! - Decide whether an error is logged (ignored statuses and codes)
//! - Pick the log level from the status
//! - Render JSON or HTML, verbose in development, terse in production
//!
//! # Design Decisions
//! - An error's own reporter/renderer always wins over the defaults
//! - Status pages only apply to HTML responses in production
//! - A failing status page template falls back to the plain `<h1>` page

use std::ops::RangeInclusive;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use crate::config::{parse_status_range, ExceptionConfig};
use crate::error::HttpError;
use crate::http::context::HttpContext;
use crate::http::view::{escape_html, ViewRenderer};
use crate::observability::metrics;

pub struct ExceptionHandler {
    debug: bool,
    ignore_statuses: Vec<u16>,
    ignore_codes: Vec<String>,
    status_pages: Vec<(RangeInclusive<u16>, String)>,
    views: Option<Arc<dyn ViewRenderer>>,
}

impl Default for ExceptionHandler {
    fn default() -> Self {
        Self::from_config(&ExceptionConfig::default(), false)
    }
}

impl ExceptionHandler {
    /// Build from config. Status page keys that do not parse are skipped
    /// (validation reports them).
    pub fn from_config(config: &ExceptionConfig, production: bool) -> Self {
        let status_pages = config
            .status_pages
            .iter()
            .filter_map(|(key, template)| {
                parse_status_range(key).map(|range| (range, template.clone()))
            })
            .collect();
        Self {
            debug: !production,
            ignore_statuses: config.ignore_statuses.clone(),
            ignore_codes: config.ignore_codes.clone(),
            status_pages,
            views: None,
        }
    }

    /// Renderer used for status pages.
    pub fn with_views(mut self, views: Arc<dyn ViewRenderer>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    fn status_of(error: &HttpError) -> StatusCode {
        error.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn should_report(&self, error: &HttpError) -> bool {
        let status = Self::status_of(error).as_u16();
        if self.ignore_statuses.contains(&status) {
            return false;
        }
        !error
            .code()
            .is_some_and(|code| self.ignore_codes.iter().any(|c| c == code))
    }

    pub fn report(&self, error: &HttpError, ctx: &HttpContext) {
        if let Some(reporter) = error.reporter() {
            reporter(error, ctx);
            return;
        }
        if !self.should_report(error) {
            return;
        }

        let status = Self::status_of(error).as_u16();
        let code = error.code().unwrap_or_default();
        let request_id = ctx.request_id();
        let path = ctx.request.path();

        if status >= 500 {
            tracing::error!(
                request_id = %request_id,
                status,
                code,
                path,
                error = %error,
                "Request failed"
            );
            metrics::record_error_reported("error");
        } else if status >= 400 {
            tracing::warn!(
                request_id = %request_id,
                status,
                code,
                path,
                error = %error,
                "Request failed"
            );
            metrics::record_error_reported("warn");
        } else {
            tracing::info!(
                request_id = %request_id,
                status,
                code,
                path,
                error = %error,
                "Request failed"
            );
            metrics::record_error_reported("info");
        }
    }

    /// Write the error response into `ctx.response`.
    pub async fn handle(&self, error: HttpError, ctx: &mut HttpContext) {
        if let Some(renderer) = error.renderer().cloned() {
            renderer(&error, ctx);
            return;
        }

        let status = Self::status_of(&error);
        ctx.response.status(status);

        if ctx.request.accepts(&["html", "json"]) == Some("json") {
            self.render_json(&error, ctx);
        } else {
            self.render_html(&error, status, ctx).await;
        }
    }

    fn render_json(&self, error: &HttpError, ctx: &mut HttpContext) {
        let body = if self.debug {
            json!({ "message": error.message(), "stack": error.stack() })
        } else {
            json!({ "message": error.message() })
        };
        if let Err(e) = ctx.response.json(&body) {
            tracing::error!(error = %e, "Failed to serialize error response");
            ctx.response.send(error.message().to_string());
        }
    }

    async fn render_html(&self, error: &HttpError, status: StatusCode, ctx: &mut HttpContext) {
        if self.debug {
            let html = trace_page(error, status, ctx);
            ctx.response.html(html);
            return;
        }

        if let Some(html) = self.render_status_page(error, status).await {
            ctx.response.html(html);
            return;
        }

        ctx.response
            .html(format!("<h1>{}</h1>", escape_html(error.message())));
    }

    async fn render_status_page(&self, error: &HttpError, status: StatusCode) -> Option<String> {
        let views = self.views.as_ref()?;
        let (_, template) = self
            .status_pages
            .iter()
            .find(|(range, _)| range.contains(&status.as_u16()))?;

        let data = json!({
            "error": {
                "message": error.message(),
                "status": status.as_u16(),
                "code": error.code(),
            }
        });
        match views.render(template, &data).await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!(template = %template, error = %e, "Status page failed to render");
                None
            }
        }
    }
}

fn trace_page(error: &HttpError, status: StatusCode, ctx: &HttpContext) -> String {
    let frames: String = error
        .stack()
        .iter()
        .map(|frame| format!("<li>{}</li>", escape_html(frame)))
        .collect();
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{status}</title></head>\n<body>\n\
         <h1>{message}</h1>\n\
         <p><strong>{status}</strong> {method} {path} <code>{code}</code></p>\n\
         <p>Request ID: {request_id}</p>\n\
         <ol>{frames}</ol>\n</body>\n</html>\n",
        status = status,
        message = escape_html(error.message()),
        method = ctx.request.method(),
        path = escape_html(ctx.request.path()),
        code = escape_html(error.code().unwrap_or_default()),
        request_id = escape_html(ctx.request_id()),
        frames = frames,
    )
}
