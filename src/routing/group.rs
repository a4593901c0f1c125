//! Route groups.
//!
//! A group collects the routes registered inside its callback and applies a
//! set of pending transformations to every one of them when flattened.

use std::collections::BTreeMap;

use crate::error::RegistrationError;
use crate::middleware::MiddlewareUnit;
use crate::routing::matcher::join_patterns;
use crate::routing::route::RouteDefinition;
use crate::routing::router::RouteEntry;

/// Routes sharing a prefix, domain, name prefix or middleware.
#[derive(Debug)]
pub struct RouteGroup {
    children: Vec<RouteEntry>,
    prefix: Option<String>,
    domain: Option<String>,
    name_prefix: Option<String>,
    namespace: Option<String>,
    middleware: Vec<MiddlewareUnit>,
    constraints: BTreeMap<String, String>,
}

impl RouteGroup {
    pub(crate) fn new(children: Vec<RouteEntry>) -> Self {
        Self {
            children,
            prefix: None,
            domain: None,
            name_prefix: None,
            namespace: None,
            middleware: Vec::new(),
            constraints: BTreeMap::new(),
        }
    }

    /// Prefix every child pattern. Repeated calls nest outward.
    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        self.prefix = Some(match &self.prefix {
            Some(existing) => join_patterns(prefix, existing),
            None => join_patterns(prefix, "/"),
        });
        self
    }

    /// Domain applied to children that do not declare their own.
    pub fn domain(&mut self, domain: impl Into<String>) -> &mut Self {
        self.domain = Some(domain.into());
        self
    }

    /// Prefix for the names of named children (`admin` → `admin.dashboard`).
    pub fn as_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name_prefix = Some(name.into());
        self
    }

    /// Namespace for children without one.
    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Middleware running before each child's own middleware.
    pub fn middleware<I, U>(&mut self, units: I) -> &mut Self
    where
        I: IntoIterator<Item = U>,
        U: Into<MiddlewareUnit>,
    {
        self.middleware.extend(units.into_iter().map(Into::into));
        self
    }

    /// Constraint for children that do not constrain `param` themselves.
    pub fn where_param(
        &mut self,
        param: impl Into<String>,
        constraint: impl Into<String>,
    ) -> &mut Self {
        self.constraints.insert(param.into(), constraint.into());
        self
    }

    /// Flatten the group. Children are cloned, so calling this again yields
    /// the same list.
    pub fn routes(&self) -> Result<Vec<RouteDefinition>, RegistrationError> {
        let mut routes = Vec::new();
        for child in &self.children {
            for mut route in child.flatten()? {
                self.apply(&mut route);
                routes.push(route);
            }
        }
        Ok(routes)
    }

    fn apply(&self, route: &mut RouteDefinition) {
        if let Some(prefix) = &self.prefix {
            route.prefix(prefix);
        }
        if let (Some(domain), None) = (&self.domain, route.get_domain()) {
            route.domain(domain.clone());
        }
        if let (Some(prefix), Some(name)) = (&self.name_prefix, route.name()) {
            let name = format!("{}.{}", prefix, name);
            route.as_name(name);
        }
        if let (Some(namespace), None) = (&self.namespace, route.get_namespace()) {
            route.namespace(namespace.clone());
        }
        if !self.middleware.is_empty() {
            route.prepend_middleware(self.middleware.iter().cloned());
        }
        for (param, constraint) in &self.constraints {
            if !route.constraints().contains_key(param) {
                route.where_param(param.clone(), constraint.clone());
            }
        }
    }
}
