//! Composed middleware chains and the `next` continuation.

use std::fmt;
use std::sync::Arc;

use crate::error::HttpError;
use crate::http::context::HttpContext;
use crate::middleware::Middleware;
use crate::routing::route::Handler;

/// A middleware unit resolved into an invokable plus its arguments.
#[derive(Clone)]
pub struct ResolvedMiddleware {
    name: String,
    middleware: Arc<dyn Middleware>,
    args: Arc<[String]>,
}

impl ResolvedMiddleware {
    pub fn new(
        name: impl Into<String>,
        middleware: Arc<dyn Middleware>,
        args: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            middleware,
            args: args.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn middleware(&self) -> &Arc<dyn Middleware> {
        &self.middleware
    }
}

impl fmt::Debug for ResolvedMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMiddleware")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

/// Continuation handed to each middleware; runs the rest of the chain.
pub struct Next<'a> {
    units: &'a [ResolvedMiddleware],
    endpoint: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Advance to the next unit, or to the handler when none remain.
    pub async fn run(self, ctx: &mut HttpContext) -> Result<(), HttpError> {
        match self.units.split_first() {
            Some((unit, rest)) => {
                let next = Next {
                    units: rest,
                    endpoint: self.endpoint,
                };
                unit.middleware.handle(ctx, next, &unit.args).await
            }
            None => self.endpoint.handle(ctx).await,
        }
    }
}

/// Ordered units plus the route handler, composed once per route.
#[derive(Clone)]
pub struct ExecutionChain {
    units: Vec<ResolvedMiddleware>,
    endpoint: Arc<dyn Handler>,
}

impl ExecutionChain {
    pub fn new(units: Vec<ResolvedMiddleware>, endpoint: Arc<dyn Handler>) -> Self {
        Self { units, endpoint }
    }

    pub fn units(&self) -> &[ResolvedMiddleware] {
        &self.units
    }

    /// Execute the chain for one request.
    pub async fn run(&self, ctx: &mut HttpContext) -> Result<(), HttpError> {
        Next {
            units: &self.units,
            endpoint: self.endpoint.as_ref(),
        }
        .run(ctx)
        .await
    }
}

impl fmt::Debug for ExecutionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionChain")
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}
