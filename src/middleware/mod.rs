//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! Boot:
//!     register_global([A, B]) / register_named({"auth": Auth})
//!     → store.rs resolves "auth:basic" into (Auth, ["basic"])
//!     → chain.rs composes [A, B, auth, handler] once per route
//!
//! Request:
//!     ExecutionChain::run(ctx)
//!     → A(ctx, next) → B(ctx, next) → auth(ctx, next) → handler(ctx)
//! ```
//!
//! # Design Decisions
//! - Declared order equals execution order; each unit wraps the remainder
//! - A unit stops the chain by returning without calling `next`
//! - Errors propagate unchanged; no unit swallows an error it did not catch
//! - Unknown named middleware is a boot error, never a silent skip

pub mod chain;
pub mod store;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::HttpError;
use crate::http::context::HttpContext;

pub use chain::{ExecutionChain, Next, ResolvedMiddleware};
pub use store::MiddlewareStore;

/// A piece of per-request logic wrapping the rest of the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// `args` carries the parsed arguments of a named reference
    /// (`"auth:basic"` → `["basic"]`); empty for inline units.
    async fn handle(
        &self,
        ctx: &mut HttpContext,
        next: Next<'_>,
        args: &[String],
    ) -> Result<(), HttpError>;
}

struct MiddlewareFn<F>(F);

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut HttpContext, Next<'a>) -> BoxFuture<'a, Result<(), HttpError>>
        + Send
        + Sync,
{
    async fn handle(
        &self,
        ctx: &mut HttpContext,
        next: Next<'_>,
        _args: &[String],
    ) -> Result<(), HttpError> {
        (self.0)(ctx, next).await
    }
}

/// Wrap a closure as middleware.
pub fn middleware_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: for<'a> Fn(&'a mut HttpContext, Next<'a>) -> BoxFuture<'a, Result<(), HttpError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(MiddlewareFn(f))
}

/// Middleware as declared on a route, before resolution.
#[derive(Clone)]
pub enum MiddlewareUnit {
    Inline(Arc<dyn Middleware>),
    /// `name` or `name:arg1,arg2`, looked up in the named registry.
    Named(String),
}

impl MiddlewareUnit {
    pub fn label(&self) -> String {
        match self {
            Self::Inline(_) => "<inline>".to_string(),
            Self::Named(name) => name.clone(),
        }
    }
}

impl fmt::Debug for MiddlewareUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline(<middleware>)"),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

impl From<&str> for MiddlewareUnit {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for MiddlewareUnit {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareUnit {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Self::Inline(middleware)
    }
}
