//! Route registration, lookup and URL generation.
//!
//! # Responsibilities
//! - Collect routes and aggregates during registration
//! - Flatten, validate and compile them once at commit
//! - Look up the matching route for a method + path + host
//! - Generate plain and signed URLs for named routes
//!
//! # Design Decisions
//! - Immutable after commit (thread-safe without locks)
//! - O(n) scan in registration order: the first matching route wins, so
//!   specific routes must be registered before general ones
//! - Explicit no-match rather than a silent default

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::Method;

use crate::error::RegistrationError;
use crate::routing::brisk::BriskRoute;
use crate::routing::group::RouteGroup;
use crate::routing::matcher::{DomainMatcher, PathMatcher};
use crate::routing::resource::RouteResource;
use crate::routing::route::{RouteDefinition, RouteHandler};
use crate::routing::url::{decode_segment, make_signed_url, make_url, UrlError, UrlOptions};
use crate::security::Encrypter;

/// Anything registered on the router, before flattening.
#[derive(Debug)]
pub enum RouteEntry {
    Route(RouteDefinition),
    Group(RouteGroup),
    Resource(RouteResource),
    Brisk(BriskRoute),
}

impl RouteEntry {
    /// Expand into route definitions, deleted ones included.
    pub fn flatten(&self) -> Result<Vec<RouteDefinition>, RegistrationError> {
        match self {
            Self::Route(route) => Ok(vec![route.clone()]),
            Self::Group(group) => group.routes(),
            Self::Resource(resource) => Ok(resource.routes()),
            Self::Brisk(brisk) => brisk.routes(),
        }
    }
}

/// A route plus its compiled matchers.
#[derive(Debug)]
struct CompiledRoute {
    route: Arc<RouteDefinition>,
    path: PathMatcher,
    domain: Option<DomainMatcher>,
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteDefinition>,
    /// Position in the route table.
    pub index: usize,
    pub params: HashMap<String, String>,
    pub subdomains: HashMap<String, String>,
}

/// The application route table.
#[derive(Debug, Default)]
pub struct Router {
    entries: Vec<RouteEntry>,
    open_group: Option<Vec<RouteEntry>>,
    table: Option<Vec<CompiledRoute>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: RouteEntry) -> Result<&mut RouteEntry, RegistrationError> {
        if self.table.is_some() {
            return Err(RegistrationError::RouterCommitted);
        }
        let list = match self.open_group.as_mut() {
            Some(children) => children,
            None => &mut self.entries,
        };
        list.push(entry);
        let index = list.len() - 1;
        Ok(&mut list[index])
    }

    /// Register a route for a set of methods.
    pub fn route(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        pattern: &str,
        handler: impl Into<RouteHandler>,
    ) -> Result<&mut RouteDefinition, RegistrationError> {
        match self.push(RouteEntry::Route(RouteDefinition::new(methods, pattern, handler)))? {
            RouteEntry::Route(route) => Ok(route),
            _ => unreachable!("route entry was just pushed"),
        }
    }

    pub fn get(
        &mut self,
        pattern: &str,
        handler: impl Into<RouteHandler>,
    ) -> Result<&mut RouteDefinition, RegistrationError> {
        self.route([Method::GET], pattern, handler)
    }

    pub fn post(
        &mut self,
        pattern: &str,
        handler: impl Into<RouteHandler>,
    ) -> Result<&mut RouteDefinition, RegistrationError> {
        self.route([Method::POST], pattern, handler)
    }

    pub fn put(
        &mut self,
        pattern: &str,
        handler: impl Into<RouteHandler>,
    ) -> Result<&mut RouteDefinition, RegistrationError> {
        self.route([Method::PUT], pattern, handler)
    }

    pub fn patch(
        &mut self,
        pattern: &str,
        handler: impl Into<RouteHandler>,
    ) -> Result<&mut RouteDefinition, RegistrationError> {
        self.route([Method::PATCH], pattern, handler)
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        handler: impl Into<RouteHandler>,
    ) -> Result<&mut RouteDefinition, RegistrationError> {
        self.route([Method::DELETE], pattern, handler)
    }

    /// Register a route answering every common method.
    pub fn any(
        &mut self,
        pattern: &str,
        handler: impl Into<RouteHandler>,
    ) -> Result<&mut RouteDefinition, RegistrationError> {
        self.route(
            [
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            pattern,
            handler,
        )
    }

    /// Register the routes added by `callback` as one group.
    ///
    /// Groups cannot nest: calling `group` from inside the callback fails with
    /// [`RegistrationError::NestedGroups`].
    pub fn group<F>(&mut self, callback: F) -> Result<&mut RouteGroup, RegistrationError>
    where
        F: FnOnce(&mut Router) -> Result<(), RegistrationError>,
    {
        if self.table.is_some() {
            return Err(RegistrationError::RouterCommitted);
        }
        if self.open_group.is_some() {
            return Err(RegistrationError::NestedGroups);
        }

        self.open_group = Some(Vec::new());
        let outcome = callback(self);
        let children = self.open_group.take().unwrap_or_default();
        outcome?;

        self.entries.push(RouteEntry::Group(RouteGroup::new(children)));
        match self.entries.last_mut() {
            Some(RouteEntry::Group(group)) => Ok(group),
            _ => unreachable!("group entry was just pushed"),
        }
    }

    /// Register the conventional routes of a resource.
    pub fn resource(
        &mut self,
        name: &str,
        controller: &str,
    ) -> Result<&mut RouteResource, RegistrationError> {
        match self.push(RouteEntry::Resource(RouteResource::new(name, controller)))? {
            RouteEntry::Resource(resource) => Ok(resource),
            _ => unreachable!("resource entry was just pushed"),
        }
    }

    /// Declare a pattern whose handler is attached afterwards.
    pub fn on(&mut self, pattern: &str) -> Result<&mut BriskRoute, RegistrationError> {
        match self.push(RouteEntry::Brisk(BriskRoute::new(pattern)))? {
            RouteEntry::Brisk(brisk) => Ok(brisk),
            _ => unreachable!("brisk entry was just pushed"),
        }
    }

    /// Flatten every aggregate, dropping soft-deleted routes. Pure: calling
    /// it twice yields the same list.
    pub fn flatten(&self) -> Result<Vec<RouteDefinition>, RegistrationError> {
        let mut routes = Vec::new();
        for entry in &self.entries {
            routes.extend(entry.flatten()?.into_iter().filter(|r| !r.is_deleted()));
        }
        Ok(routes)
    }

    /// Freeze the route table. Idempotent.
    pub fn commit(&mut self) -> Result<(), RegistrationError> {
        if self.table.is_some() {
            return Ok(());
        }
        if self.open_group.is_some() {
            return Err(RegistrationError::NestedGroups);
        }

        let routes = self.flatten()?;
        let mut names = HashSet::new();
        let mut table = Vec::with_capacity(routes.len());

        for route in routes {
            if let Some(name) = route.name() {
                if !names.insert(name.to_string()) {
                    return Err(RegistrationError::DuplicateRouteName(name.to_string()));
                }
            }
            let path = PathMatcher::compile(route.pattern(), route.constraints())?;
            let domain = route.get_domain().map(DomainMatcher::compile).transpose()?;
            table.push(CompiledRoute {
                route: Arc::new(route),
                path,
                domain,
            });
        }

        tracing::info!(routes = table.len(), "Route table committed");
        self.table = Some(table);
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.table.is_some()
    }

    /// Committed routes in match order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.table.iter().flatten().map(|c| &c.route)
    }

    /// Find the first route accepting `method`, `path` and `host`.
    pub fn find(&self, path: &str, method: &Method, host: Option<&str>) -> Option<RouteMatch> {
        let table = self.table.as_ref()?;

        for (index, compiled) in table.iter().enumerate() {
            if !compiled.route.accepts_method(method) {
                continue;
            }

            let subdomains = match &compiled.domain {
                Some(domain) => match host.and_then(|h| domain.captures(h)) {
                    Some(captures) => captures.into_iter().collect(),
                    None => continue,
                },
                None => HashMap::new(),
            };

            let Some(captures) = compiled.path.captures(path) else {
                continue;
            };

            let params = compiled
                .path
                .params()
                .iter()
                .zip(captures)
                .filter_map(|(name, value)| value.map(|v| (name.clone(), decode_segment(v))))
                .collect();

            return Some(RouteMatch {
                route: compiled.route.clone(),
                index,
                params,
                subdomains,
            });
        }

        None
    }

    /// Find a route by name, raw pattern or `Controller.method` identifier.
    pub fn lookup(&self, identifier: &str, domain: Option<&str>) -> Option<&Arc<RouteDefinition>> {
        self.routes().find(|route| {
            let identified = route.name() == Some(identifier)
                || route.pattern() == identifier
                || matches!(route.handler(), RouteHandler::Identifier(id) if id == identifier)
                || route.handler_identifier().as_deref() == Some(identifier);
            identified && domain.map_or(true, |d| route.get_domain() == Some(d))
        })
    }

    /// URL for a route; `None` when no route matches `identifier`.
    pub fn url_for(
        &self,
        identifier: &str,
        options: &UrlOptions,
    ) -> Result<Option<String>, UrlError> {
        self.lookup(identifier, options.get_domain())
            .map(|route| make_url(route, options))
            .transpose()
    }

    /// Signed URL for a route; `None` when no route matches `identifier`.
    pub fn url_for_signed(
        &self,
        identifier: &str,
        options: &UrlOptions,
        encrypter: &dyn Encrypter,
    ) -> Result<Option<String>, UrlError> {
        self.lookup(identifier, options.get_domain())
            .map(|route| make_signed_url(route, options, encrypter))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(build: impl FnOnce(&mut Router) -> Result<(), RegistrationError>) -> Router {
        let mut router = Router::new();
        build(&mut router).unwrap();
        router.commit().unwrap();
        router
    }

    #[test]
    fn test_first_match_wins() {
        let router = committed(|r| {
            r.get("/users/new", "UsersController.create")?;
            r.get("/users/:id", "UsersController.show")?;
            Ok(())
        });
        let m = router.find("/users/new", &Method::GET, None).unwrap();
        assert_eq!(m.route.pattern(), "/users/new");

        let reversed = committed(|r| {
            r.get("/users/:id", "UsersController.show")?;
            r.get("/users/new", "UsersController.create")?;
            Ok(())
        });
        let m = reversed.find("/users/new", &Method::GET, None).unwrap();
        assert_eq!(m.route.pattern(), "/users/:id");
        assert_eq!(m.params.get("id").map(String::as_str), Some("new"));
    }

    #[test]
    fn test_method_filtering() {
        let router = committed(|r| {
            r.post("/users", "UsersController.store")?;
            Ok(())
        });
        assert!(router.find("/users", &Method::GET, None).is_none());
        assert!(router.find("/users", &Method::POST, None).is_some());
    }

    #[test]
    fn test_nested_groups_are_rejected() {
        let mut router = Router::new();
        let err = router
            .group(|r| {
                r.group(|_| Ok(()))?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, RegistrationError::NestedGroups));

        // The failed group left no open state behind.
        router.get("/", "Home.index").unwrap();
        router.commit().unwrap();
    }

    #[test]
    fn test_duplicate_names_fail_commit() {
        let mut router = Router::new();
        router.get("/a", "A.index").unwrap().as_name("dup");
        router.get("/b", "B.index").unwrap().as_name("dup");
        assert!(matches!(
            router.commit(),
            Err(RegistrationError::DuplicateRouteName(ref n)) if n == "dup"
        ));
    }

    #[test]
    fn test_commit_is_idempotent_and_freezes() {
        let mut router = Router::new();
        router.get("/", "Home.index").unwrap();
        router.commit().unwrap();
        router.commit().unwrap();
        assert_eq!(router.routes().count(), 1);
        assert!(matches!(
            router.get("/late", "Late.index"),
            Err(RegistrationError::RouterCommitted)
        ));
    }

    #[test]
    fn test_subdomain_captures() {
        let router = committed(|r| {
            r.get("/", "Tenants.home")?.domain(":tenant.example.com");
            Ok(())
        });
        let m = router.find("/", &Method::GET, Some("acme.example.com")).unwrap();
        assert!(m.params.is_empty());
        assert_eq!(m.subdomains.get("tenant").map(String::as_str), Some("acme"));
        assert!(router.find("/", &Method::GET, None).is_none());
    }

    #[test]
    fn test_captures_are_percent_decoded() {
        let router = committed(|r| {
            r.get("/users/:id", "UsersController.show")?.as_name("users.show");
            Ok(())
        });
        let m = router.find("/users/john%20doe", &Method::GET, None).unwrap();
        assert_eq!(m.params.get("id").map(String::as_str), Some("john doe"));

        let url = router
            .url_for("users.show", &UrlOptions::new().param("id", "a/b c"))
            .unwrap()
            .unwrap();
        let m = router.find(&url, &Method::GET, None).unwrap();
        assert_eq!(m.params.get("id").map(String::as_str), Some("a/b c"));
    }

    #[test]
    fn test_malformed_host_is_a_miss() {
        let router = committed(|r| {
            r.get("/", "Tenants.home")?.domain(":tenant.example.com");
            Ok(())
        });
        assert!(router.find("/", &Method::GET, Some("[abc")).is_none());
        assert!(router.find("/", &Method::GET, Some("[::1]:8080")).is_none());
    }

    #[test]
    fn test_lookup_by_identifier() {
        let router = committed(|r| {
            r.get("/users/:id", "UsersController.show")?
                .as_name("users.show")
                .namespace("Admin");
            Ok(())
        });
        for identifier in [
            "users.show",
            "/users/:id",
            "UsersController.show",
            "Admin/UsersController.show",
        ] {
            assert!(router.lookup(identifier, None).is_some(), "{}", identifier);
        }

        let options = UrlOptions::new().param("id", 5).query("tab", "profile");
        assert_eq!(
            router.url_for("users.show", &options).unwrap().as_deref(),
            Some("/users/5?tab=profile")
        );
        assert_eq!(router.url_for("missing", &options).unwrap(), None);
        assert!(matches!(
            router.url_for("users.show", &UrlOptions::new()),
            Err(UrlError::MissingRouteParam { .. })
        ));
    }

    #[test]
    fn test_resource_filtering_drops_deleted() {
        let router = committed(|r| {
            r.resource("users", "UsersController")?.only(&["index", "show"]);
            Ok(())
        });
        assert_eq!(router.routes().count(), 2);
        assert!(router.find("/users/create", &Method::GET, None).is_some()); // matched by show
        assert!(router.find("/users", &Method::POST, None).is_none());
    }
}
