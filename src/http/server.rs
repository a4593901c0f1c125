//! Request execution pipeline.
//!
//! # Responsibilities
//! - Commit the router and precompute one execution chain per route
//! - Resolve `Controller.method` handlers once, at build time
//! - Run before hooks, lookup, the chain and after hooks for each request
//! - Route every error through the exception handler
//!
//! # Design Decisions
//! - Everything that can fail at registration fails in `build()`, before
//!   the first request: duplicate names, unknown middleware, unresolved
//!   handlers, invalid patterns
//! - Chains are indexed like the route table, so a lookup hit is one
//!   slice index away from its chain
//! - The pipeline never retries; the response is whatever the last writer
//!   left in the context

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::error::{HttpError, RegistrationError};
use crate::exception::ExceptionHandler;
use crate::http::context::{HttpContext, Services};
use crate::http::hooks::{BeforeOutcome, Hook, Hooks};
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::view::ViewRenderer;
use crate::middleware::{ExecutionChain, MiddlewareStore};
use crate::observability::metrics;
use crate::routing::resolver::HandlerResolver;
use crate::routing::route::{Handler, RouteHandler};
use crate::routing::router::Router;
use crate::security::Encrypter;

/// The dispatcher: a frozen route table plus composed chains.
pub struct Server {
    services: Arc<Services>,
    chains: Vec<ExecutionChain>,
    hooks: Hooks,
    exception_handler: ExceptionHandler,
}

impl Server {
    pub fn builder(router: Router) -> ServerBuilder {
        ServerBuilder::new(router)
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.services.router
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Dispatch one request. Never fails: errors become error responses.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let start = Instant::now();
        let mut ctx = HttpContext::new(request).with_services(self.services.clone());
        let method = ctx.request.method().to_string();
        let span = tracing::info_span!(
            "request",
            request_id = %ctx.request_id(),
            method = %method,
            path = %ctx.request.path(),
        );

        async {
            if let Err(error) = self.dispatch(&mut ctx).await {
                self.exception_handler.report(&error, &ctx);
                self.exception_handler.handle(error, &mut ctx).await;
            }

            let status = ctx.response.get_status().as_u16();
            let route = ctx
                .route()
                .map(|r| r.pattern().to_string())
                .unwrap_or_else(|| "none".to_string());
            tracing::debug!(status, route = %route, "Request finished");
            metrics::record_request(&method, status, &route, start);
        }
        .instrument(span)
        .await;

        ctx.into_response()
    }

    async fn dispatch(&self, ctx: &mut HttpContext) -> Result<(), HttpError> {
        if self.hooks.run_before(ctx).await? == BeforeOutcome::Responded {
            return Ok(());
        }

        let matched = self
            .services
            .router
            .find(ctx.request.path(), ctx.request.method(), ctx.request.host())
            .ok_or_else(|| {
                metrics::record_route_miss();
                HttpError::route_not_found(ctx.request.method(), ctx.request.path())
            })?;

        let chain = self
            .chains
            .get(matched.index)
            .ok_or_else(|| HttpError::new("Route table and chains are out of sync"))?;
        ctx.bind(matched);

        chain.run(ctx).await?;
        self.hooks.run_after(ctx).await
    }
}

/// Collects the collaborators of a [`Server`].
pub struct ServerBuilder {
    router: Router,
    middleware: MiddlewareStore,
    resolver: Option<Arc<dyn HandlerResolver>>,
    hooks: Hooks,
    exception_handler: Option<ExceptionHandler>,
    views: Option<Arc<dyn ViewRenderer>>,
    encrypter: Option<Arc<dyn Encrypter>>,
}

impl ServerBuilder {
    fn new(router: Router) -> Self {
        Self {
            router,
            middleware: MiddlewareStore::new(),
            resolver: None,
            hooks: Hooks::new(),
            exception_handler: None,
            views: None,
            encrypter: None,
        }
    }

    pub fn middleware(mut self, store: MiddlewareStore) -> Self {
        self.middleware = store;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn HandlerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn before(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.before(hook);
        self
    }

    pub fn after(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.after(hook);
        self
    }

    pub fn exception_handler(mut self, handler: ExceptionHandler) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    pub fn views(mut self, views: Arc<dyn ViewRenderer>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn encrypter(mut self, encrypter: Arc<dyn Encrypter>) -> Self {
        self.encrypter = Some(encrypter);
        self
    }

    /// Commit the router and compose every chain.
    pub fn build(mut self) -> Result<Server, RegistrationError> {
        self.router.commit()?;

        let mut resolved: HashMap<String, Arc<dyn Handler>> = HashMap::new();
        let mut chains = Vec::new();

        for route in self.router.routes() {
            let endpoint = match route.handler() {
                RouteHandler::Inline(handler) => handler.clone(),
                RouteHandler::Identifier(_) => {
                    let identifier = route
                        .handler_identifier()
                        .unwrap_or_else(|| route.pattern().to_string());
                    match resolved.get(&identifier) {
                        Some(handler) => handler.clone(),
                        None => {
                            let handler = self
                                .resolver
                                .as_ref()
                                .and_then(|r| r.resolve(&identifier))
                                .ok_or_else(|| {
                                    RegistrationError::MissingHandler(identifier.clone())
                                })?;
                            resolved.insert(identifier, handler.clone());
                            handler
                        }
                    }
                }
            };
            chains.push(self.middleware.compose_for_route(route, endpoint)?);
        }

        tracing::info!(
            routes = chains.len(),
            controllers = resolved.len(),
            global_middleware = self.middleware.global().len(),
            hooks = self.hooks.len(),
            "Server built"
        );

        let exception_handler = match (self.exception_handler, &self.views) {
            (Some(handler), _) => handler,
            (None, Some(views)) => ExceptionHandler::default().with_views(views.clone()),
            (None, None) => ExceptionHandler::default(),
        };

        Ok(Server {
            services: Arc::new(Services {
                router: Arc::new(self.router),
                views: self.views,
                encrypter: self.encrypter,
            }),
            chains,
            hooks: self.hooks,
            exception_handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::middleware_fn;
    use crate::routing::route::handler_fn;
    use axum::http::{Method, StatusCode};

    fn hello() -> Arc<dyn Handler> {
        handler_fn(|ctx| {
            Box::pin(async move {
                let name = ctx.param("name").unwrap_or("world").to_string();
                ctx.response.send(format!("hello {}", name));
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn test_dispatches_to_matching_route() {
        let mut router = Router::new();
        router.get("/hello/:name", hello()).unwrap();
        let server = Server::builder(router).build().unwrap();

        let res = server.handle(HttpRequest::new(Method::GET, "/hello/virk")).await;
        assert_eq!(res.get_status(), StatusCode::OK);
        assert_eq!(res.body_text(), "hello virk");
    }

    #[tokio::test]
    async fn test_route_miss_is_404() {
        let server = Server::builder(Router::new()).build().unwrap();
        let res = server
            .handle(
                HttpRequest::new(Method::GET, "/nope").with_header("accept", "application/json"),
            )
            .await;
        assert_eq!(res.get_status(), StatusCode::NOT_FOUND);
        assert!(res.body_text().contains("Cannot GET /nope"));
    }

    #[test]
    fn test_build_fails_on_unresolved_handler() {
        let mut router = Router::new();
        router.get("/", "HomeController.index").unwrap();
        assert!(matches!(
            Server::builder(router).build(),
            Err(RegistrationError::MissingHandler(ref id)) if id == "HomeController.index"
        ));
    }

    #[test]
    fn test_build_fails_on_unknown_middleware() {
        let mut router = Router::new();
        router.get("/", hello()).unwrap().middleware(["auth"]);
        assert!(matches!(
            Server::builder(router).build(),
            Err(RegistrationError::MissingNamedMiddleware(ref name)) if name == "auth"
        ));
    }

    #[tokio::test]
    async fn test_middleware_can_respond_without_next() {
        let mut store = MiddlewareStore::new();
        store.register_named([(
            "deny",
            middleware_fn(|ctx, _next| {
                Box::pin(async move {
                    ctx.response.status(StatusCode::FORBIDDEN).send("denied");
                    Ok(())
                })
            }),
        )]);

        let mut router = Router::new();
        router.get("/secret", hello()).unwrap().middleware(["deny"]);
        let server = Server::builder(router).middleware(store).build().unwrap();

        let res = server.handle(HttpRequest::new(Method::GET, "/secret")).await;
        assert_eq!(res.get_status(), StatusCode::FORBIDDEN);
        assert_eq!(res.body_text(), "denied");
    }
}
