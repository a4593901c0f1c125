//! Per-request context.
//!
//! # Responsibilities
//! - Own the request and the response being built
//! - Carry the matched route, its params and subdomain captures
//! - Give handlers access to shared services (router, views, encrypter)
//!
//! # Design Decisions
//! - One context per request, passed as `&mut` through hooks, middleware
//!   and the handler; nothing is shared between requests except `Services`
//! - Arbitrary per-request data travels in typed `Extensions`

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Extensions;
use uuid::Uuid;

use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::view::ViewRenderer;
use crate::routing::route::RouteDefinition;
use crate::routing::router::{RouteMatch, Router};
use crate::routing::url::{UrlError, UrlOptions};
use crate::security::Encrypter;

/// Collaborators shared by every request of a server.
#[derive(Clone)]
pub struct Services {
    pub router: Arc<Router>,
    pub views: Option<Arc<dyn ViewRenderer>>,
    pub encrypter: Option<Arc<dyn Encrypter>>,
}

pub struct HttpContext {
    pub request: HttpRequest,
    pub response: HttpResponse,
    request_id: String,
    route: Option<Arc<RouteDefinition>>,
    params: HashMap<String, String>,
    subdomains: HashMap<String, String>,
    extensions: Extensions,
    services: Option<Arc<Services>>,
}

impl HttpContext {
    /// Context for `request`. The request ID is taken from `x-request-id`
    /// when present, otherwise a fresh UUID.
    pub fn new(request: HttpRequest) -> Self {
        let request_id = request
            .request_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            request,
            response: HttpResponse::new(),
            request_id,
            route: None,
            params: HashMap::new(),
            subdomains: HashMap::new(),
            extensions: Extensions::new(),
            services: None,
        }
    }

    pub fn with_services(mut self, services: Arc<Services>) -> Self {
        self.services = Some(services);
        self
    }

    /// Attach the lookup result.
    pub fn bind(&mut self, matched: RouteMatch) {
        self.route = Some(matched.route);
        self.params = matched.params;
        self.subdomains = matched.subdomains;
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The matched route; `None` before lookup or when nothing matched.
    pub fn route(&self) -> Option<&Arc<RouteDefinition>> {
        self.route.as_ref()
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn subdomains(&self) -> &HashMap<String, String> {
        &self.subdomains
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn views(&self) -> Option<Arc<dyn ViewRenderer>> {
        self.services.as_ref().and_then(|s| s.views.clone())
    }

    pub fn encrypter(&self) -> Option<Arc<dyn Encrypter>> {
        self.services.as_ref().and_then(|s| s.encrypter.clone())
    }

    /// URL for a registered route. `Ok(None)` when the route is unknown or
    /// the context is not attached to a server.
    pub fn url_for(
        &self,
        identifier: &str,
        options: &UrlOptions,
    ) -> Result<Option<String>, UrlError> {
        match &self.services {
            Some(services) => services.router.url_for(identifier, options),
            None => Ok(None),
        }
    }

    /// Signed URL for a registered route. `Ok(None)` without an encrypter.
    pub fn url_for_signed(
        &self,
        identifier: &str,
        options: &UrlOptions,
    ) -> Result<Option<String>, UrlError> {
        match self.services.as_deref() {
            Some(Services {
                router,
                encrypter: Some(encrypter),
                ..
            }) => router.url_for_signed(identifier, options, encrypter.as_ref()),
            _ => Ok(None),
        }
    }

    /// Whether the current URL carries a valid signature. Always false
    /// without an encrypter.
    pub fn has_valid_signature(&self) -> bool {
        self.encrypter()
            .is_some_and(|encrypter| self.request.has_valid_signature(encrypter.as_ref()))
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}
