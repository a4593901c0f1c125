//! Route definitions.
//!
//! # Responsibilities
//! - Describe one methods + pattern + handler registration
//! - Offer fluent configuration used only while registering
//!
//! # Design Decisions
//! - Definitions are plain values; aggregates clone and transform them when
//!   flattening, so flattening is repeatable
//! - After commit the router freezes each definition behind an `Arc`

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::HttpError;
use crate::http::context::HttpContext;
use crate::middleware::MiddlewareUnit;
use crate::routing::matcher::{join_patterns, normalize_pattern};

/// Terminal unit of an execution chain.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut HttpContext) -> Result<(), HttpError>;
}

struct HandlerFn<F>(F);

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut HttpContext) -> BoxFuture<'a, Result<(), HttpError>> + Send + Sync,
{
    async fn handle(&self, ctx: &mut HttpContext) -> Result<(), HttpError> {
        (self.0)(ctx).await
    }
}

/// Wrap a closure as a route handler.
///
/// ```ignore
/// router.get("/", handler_fn(|ctx| Box::pin(async move {
///     ctx.response.send("home");
///     Ok(())
/// })))?;
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: for<'a> Fn(&'a mut HttpContext) -> BoxFuture<'a, Result<(), HttpError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(HandlerFn(f))
}

/// What a route invokes once its middleware ran.
#[derive(Clone)]
pub enum RouteHandler {
    /// An invokable registered inline.
    Inline(Arc<dyn Handler>),
    /// A `Controller.method` identifier resolved at boot.
    Identifier(String),
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline(<handler>)"),
            Self::Identifier(id) => f.debug_tuple("Identifier").field(id).finish(),
        }
    }
}

impl From<Arc<dyn Handler>> for RouteHandler {
    fn from(handler: Arc<dyn Handler>) -> Self {
        Self::Inline(handler)
    }
}

impl From<&str> for RouteHandler {
    fn from(identifier: &str) -> Self {
        Self::Identifier(identifier.to_string())
    }
}

impl From<String> for RouteHandler {
    fn from(identifier: String) -> Self {
        Self::Identifier(identifier)
    }
}

/// Join a namespace and a controller identifier.
pub fn namespaced(namespace: Option<&str>, identifier: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns.trim_end_matches('/'), identifier),
        _ => identifier.to_string(),
    }
}

/// One method + pattern + handler registration.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    methods: Vec<Method>,
    pattern: String,
    handler: RouteHandler,
    namespace: Option<String>,
    constraints: BTreeMap<String, String>,
    middleware: Vec<MiddlewareUnit>,
    name: Option<String>,
    domain: Option<String>,
    meta: BTreeMap<String, Value>,
    deleted: bool,
}

impl RouteDefinition {
    pub fn new(
        methods: impl IntoIterator<Item = Method>,
        pattern: &str,
        handler: impl Into<RouteHandler>,
    ) -> Self {
        let mut unique: Vec<Method> = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }
        if unique.is_empty() {
            unique.push(Method::GET);
        }

        Self {
            methods: unique,
            pattern: normalize_pattern(pattern),
            handler: handler.into(),
            namespace: None,
            constraints: BTreeMap::new(),
            middleware: Vec::new(),
            name: None,
            domain: None,
            meta: BTreeMap::new(),
            deleted: false,
        }
    }

    /// Give the route a unique name used by URL generation.
    pub fn as_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Constrain a parameter with a regular expression.
    pub fn where_param(
        &mut self,
        param: impl Into<String>,
        constraint: impl Into<String>,
    ) -> &mut Self {
        self.constraints.insert(param.into(), constraint.into());
        self
    }

    /// Append named or inline middleware, keeping declaration order.
    pub fn middleware<I, U>(&mut self, units: I) -> &mut Self
    where
        I: IntoIterator<Item = U>,
        U: Into<MiddlewareUnit>,
    {
        self.middleware.extend(units.into_iter().map(Into::into));
        self
    }

    /// Insert middleware ahead of the route's own list.
    pub fn prepend_middleware<I, U>(&mut self, units: I) -> &mut Self
    where
        I: IntoIterator<Item = U>,
        U: Into<MiddlewareUnit>,
    {
        let mut units: Vec<MiddlewareUnit> = units.into_iter().map(Into::into).collect();
        units.append(&mut self.middleware);
        self.middleware = units;
        self
    }

    /// Restrict the route to a host pattern.
    pub fn domain(&mut self, domain: impl Into<String>) -> &mut Self {
        self.domain = Some(domain.into());
        self
    }

    /// Prefix the route pattern.
    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        self.pattern = join_patterns(prefix, &self.pattern);
        self
    }

    /// Namespace prepended to identifier handlers.
    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Attach free-form metadata surfaced in the match result.
    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Soft-delete; deleted routes are dropped at commit.
    pub fn mark_deleted(&mut self) -> &mut Self {
        self.deleted = true;
        self
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Whether the route serves `method`. `HEAD` is served by `GET` routes.
    pub fn accepts_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
            || (*method == Method::HEAD && self.methods.contains(&Method::GET))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &RouteHandler {
        &self.handler
    }

    /// Fully qualified identifier for string handlers.
    pub fn handler_identifier(&self) -> Option<String> {
        match &self.handler {
            RouteHandler::Identifier(id) => Some(namespaced(self.namespace.as_deref(), id)),
            RouteHandler::Inline(_) => None,
        }
    }

    pub fn get_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn constraints(&self) -> &BTreeMap<String, String> {
        &self.constraints
    }

    pub fn middleware_units(&self) -> &[MiddlewareUnit] {
        &self.middleware
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn get_meta(&self) -> &BTreeMap<String, Value> {
        &self.meta
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Serializable summary used by listings and the CLI.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "methods": self.methods.iter().map(Method::as_str).collect::<Vec<_>>(),
            "pattern": self.pattern,
            "name": self.name,
            "domain": self.domain,
            "handler": match &self.handler {
                RouteHandler::Inline(_) => "<closure>".to_string(),
                RouteHandler::Identifier(_) => self.handler_identifier().unwrap_or_default(),
            },
            "middleware": self.middleware.iter().map(|m| m.label()).collect::<Vec<_>>(),
            "meta": self.meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_normalized() {
        let route = RouteDefinition::new([Method::GET], "users/", "UsersController.index");
        assert_eq!(route.pattern(), "/users");
    }

    #[test]
    fn test_methods_are_unique_and_head_follows_get() {
        let route = RouteDefinition::new([Method::GET, Method::GET], "/", "Home.index");
        assert_eq!(route.methods(), [Method::GET]);
        assert!(route.accepts_method(&Method::HEAD));
        assert!(!route.accepts_method(&Method::POST));
    }

    #[test]
    fn test_fluent_configuration() {
        let mut route = RouteDefinition::new([Method::GET], "/:id", "UsersController.show");
        route
            .prefix("/users")
            .as_name("users.show")
            .where_param("id", r"\d+")
            .namespace("Admin")
            .middleware(["auth"])
            .prepend_middleware(["throttle:60"]);

        assert_eq!(route.pattern(), "/users/:id");
        assert_eq!(route.name(), Some("users.show"));
        assert_eq!(route.handler_identifier().as_deref(), Some("Admin/UsersController.show"));
        let labels: Vec<String> = route.middleware_units().iter().map(|m| m.label()).collect();
        assert_eq!(labels, ["throttle:60", "auth"]);
    }
}
