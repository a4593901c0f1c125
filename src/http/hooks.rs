//! Server-level before/after hooks.
//!
//! Before hooks run ahead of route lookup, so they also see requests that
//! match nothing. A before hook that responds (sets a status, writes a
//! body or calls `end`) ends the request: lookup, middleware and the
//! handler are skipped. After hooks run
//! only when the handler finished without error.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::HttpError;
use crate::http::context::HttpContext;

#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, ctx: &mut HttpContext) -> Result<(), HttpError>;
}

struct FnHook<F>(F);

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: for<'a> Fn(&'a mut HttpContext) -> BoxFuture<'a, Result<(), HttpError>> + Send + Sync,
{
    async fn call(&self, ctx: &mut HttpContext) -> Result<(), HttpError> {
        (self.0)(ctx).await
    }
}

/// Wrap a closure as a hook.
pub fn hook_fn<F>(f: F) -> Arc<dyn Hook>
where
    F: for<'a> Fn(&'a mut HttpContext) -> BoxFuture<'a, Result<(), HttpError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnHook(f))
}

/// Outcome of the before phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeforeOutcome {
    Continue,
    /// A hook wrote the response.
    Responded,
}

#[derive(Default, Clone)]
pub struct Hooks {
    before: Vec<Arc<dyn Hook>>,
    after: Vec<Arc<dyn Hook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(&mut self, hook: Arc<dyn Hook>) -> &mut Self {
        self.before.push(hook);
        self
    }

    pub fn after(&mut self, hook: Arc<dyn Hook>) -> &mut Self {
        self.after.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn run_before(&self, ctx: &mut HttpContext) -> Result<BeforeOutcome, HttpError> {
        for hook in &self.before {
            hook.call(ctx).await?;
            if ctx.response.is_responded() {
                tracing::debug!(request_id = %ctx.request_id(), "Before hook ended the request");
                return Ok(BeforeOutcome::Responded);
            }
        }
        Ok(BeforeOutcome::Continue)
    }

    pub async fn run_after(&self, ctx: &mut HttpContext) -> Result<(), HttpError> {
        for hook in &self.after {
            hook.call(ctx).await?;
        }
        Ok(())
    }
}
