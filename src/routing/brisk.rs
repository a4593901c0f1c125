//! Brisk routes: one-off routes declared by pattern first, handler second.
//!
//! ```ignore
//! router.on("/about")?.render("pages/about");
//! router.on("/docs")?.redirect("https://docs.example.com");
//! ```
//!
//! Setting a handler twice replaces the first definition; the replaced one is
//! soft-deleted so the router drops it at commit.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};

use crate::error::{HttpError, RegistrationError};
use crate::http::context::HttpContext;
use crate::routing::route::{Handler, RouteDefinition, RouteHandler};
use crate::routing::url::UrlOptions;

/// A pattern awaiting its handler.
#[derive(Debug)]
pub struct BriskRoute {
    pattern: String,
    routes: Vec<RouteDefinition>,
}

impl BriskRoute {
    pub(crate) fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            routes: Vec::new(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Attach a handler for the given methods (GET when empty).
    pub fn set_handler(
        &mut self,
        handler: impl Into<RouteHandler>,
        methods: impl IntoIterator<Item = Method>,
    ) -> &mut RouteDefinition {
        if let Some(previous) = self.routes.last_mut() {
            tracing::debug!(pattern = %self.pattern, "Replacing brisk route handler");
            previous.mark_deleted();
        }
        self.routes
            .push(RouteDefinition::new(methods, &self.pattern, handler));
        let index = self.routes.len() - 1;
        &mut self.routes[index]
    }

    /// Render a view template with the route params.
    pub fn render(&mut self, template: impl Into<String>) -> &mut RouteDefinition {
        let handler: Arc<dyn Handler> = Arc::new(RenderView {
            template: template.into(),
        });
        self.set_handler(handler, [Method::GET])
    }

    /// Redirect to a fixed URL.
    pub fn redirect(&mut self, to: impl Into<String>) -> &mut RouteDefinition {
        let handler: Arc<dyn Handler> = Arc::new(Redirect {
            target: RedirectTarget::Url(to.into()),
            status: StatusCode::FOUND,
        });
        self.set_handler(handler, [Method::GET])
    }

    /// Redirect to another route, forwarding the current params.
    pub fn redirect_to_route(&mut self, identifier: impl Into<String>) -> &mut RouteDefinition {
        let handler: Arc<dyn Handler> = Arc::new(Redirect {
            target: RedirectTarget::Route(identifier.into()),
            status: StatusCode::FOUND,
        });
        self.set_handler(handler, [Method::GET])
    }

    /// Every definition created so far, replaced ones included.
    pub fn routes(&self) -> Result<Vec<RouteDefinition>, RegistrationError> {
        if self.routes.is_empty() {
            return Err(RegistrationError::IncompleteBriskRoute(self.pattern.clone()));
        }
        Ok(self.routes.clone())
    }
}

struct RenderView {
    template: String,
}

#[async_trait]
impl Handler for RenderView {
    async fn handle(&self, ctx: &mut HttpContext) -> Result<(), HttpError> {
        let views = ctx
            .views()
            .ok_or_else(|| HttpError::new("View renderer is not configured"))?;
        let data = serde_json::json!({ "params": ctx.params() });
        let html = views.render(&self.template, &data).await?;
        ctx.response.html(html);
        Ok(())
    }
}

enum RedirectTarget {
    Url(String),
    Route(String),
}

struct Redirect {
    target: RedirectTarget,
    status: StatusCode,
}

#[async_trait]
impl Handler for Redirect {
    async fn handle(&self, ctx: &mut HttpContext) -> Result<(), HttpError> {
        let location = match &self.target {
            RedirectTarget::Url(url) => url.clone(),
            RedirectTarget::Route(identifier) => {
                let options = UrlOptions::new().params(ctx.params().clone());
                ctx.url_for(identifier, &options)?.ok_or_else(|| {
                    HttpError::new(format!("Cannot redirect to unknown route `{}`", identifier))
                })?
            }
        };
        ctx.response.redirect(&location, self.status);
        Ok(())
    }
}
