//! Registry of global and named middleware.
//!
//! # Responsibilities
//! - Keep global middleware in registration order, without duplicates
//! - Map names to implementations and resolve `name:arg1,arg2` references
//! - Compose the per-route execution chain
//!
//! # Design Decisions
//! - Resolution results are cached per full reference string; the same
//!   named middleware on many routes is parsed and looked up once
//! - Global identity is `Arc` pointer identity

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::RegistrationError;
use crate::middleware::{ExecutionChain, Middleware, MiddlewareUnit, ResolvedMiddleware};
use crate::routing::route::{Handler, RouteDefinition};

/// Middleware registry, built at boot and read-only afterwards.
#[derive(Default)]
pub struct MiddlewareStore {
    global: Vec<ResolvedMiddleware>,
    named: HashMap<String, Arc<dyn Middleware>>,
    cache: DashMap<String, ResolvedMiddleware>,
}

/// Split `auth:basic,admin` into `("auth", ["basic", "admin"])`.
pub fn parse_reference(reference: &str) -> (&str, Vec<String>) {
    match reference.split_once(':') {
        Some((base, args)) => (
            base.trim(),
            args.split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        None => (reference.trim(), Vec::new()),
    }
}

impl MiddlewareStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append global middleware. Units already registered are skipped.
    pub fn register_global<I>(&mut self, list: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        for middleware in list {
            let exists = self
                .global
                .iter()
                .any(|g| Arc::ptr_eq(g.middleware(), &middleware));
            if exists {
                tracing::debug!("Skipping duplicate global middleware");
                continue;
            }
            let name = format!("global#{}", self.global.len());
            self.global
                .push(ResolvedMiddleware::new(name, middleware, Vec::new()));
        }
        self
    }

    /// Register named middleware. A later registration under the same name
    /// replaces the earlier one.
    pub fn register_named<I, K>(&mut self, map: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Arc<dyn Middleware>)>,
        K: Into<String>,
    {
        for (name, middleware) in map {
            self.named.insert(name.into(), middleware);
        }
        self.cache.clear();
        self
    }

    pub fn global(&self) -> &[ResolvedMiddleware] {
        &self.global
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Resolve a named reference into an invokable unit.
    pub fn resolve(&self, reference: &str) -> Result<ResolvedMiddleware, RegistrationError> {
        if let Some(hit) = self.cache.get(reference) {
            return Ok(hit.value().clone());
        }

        let (base, args) = parse_reference(reference);
        let middleware = self
            .named
            .get(base)
            .ok_or_else(|| RegistrationError::MissingNamedMiddleware(base.to_string()))?;

        let resolved = ResolvedMiddleware::new(base, middleware.clone(), args);
        self.cache.insert(reference.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Resolve any declared unit.
    pub fn resolve_unit(
        &self,
        unit: &MiddlewareUnit,
    ) -> Result<ResolvedMiddleware, RegistrationError> {
        match unit {
            MiddlewareUnit::Inline(middleware) => {
                Ok(ResolvedMiddleware::new("<inline>", middleware.clone(), Vec::new()))
            }
            MiddlewareUnit::Named(reference) => self.resolve(reference),
        }
    }

    /// Globals in registration order, then the route's units in declared
    /// order, then the handler.
    pub fn compose_for_route(
        &self,
        route: &RouteDefinition,
        endpoint: Arc<dyn Handler>,
    ) -> Result<ExecutionChain, RegistrationError> {
        let mut units = self.global.clone();
        for unit in route.middleware_units() {
            units.push(self.resolve_unit(unit)?);
        }
        Ok(ExecutionChain::new(units, endpoint))
    }

    /// Number of cached resolutions.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
