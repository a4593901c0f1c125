//! Resourceful routes.
//!
//! # Conventions
//! ```text
//! GET       /users            users.index     UsersController.index
//! GET       /users/create     users.create    UsersController.create
//! POST      /users            users.store     UsersController.store
//! GET       /users/:id        users.show      UsersController.show
//! GET       /users/:id/edit   users.edit      UsersController.edit
//! PUT,PATCH /users/:id        users.update    UsersController.update
//! DELETE    /users/:id        users.destroy   UsersController.destroy
//! ```
//!
//! Nested resources (`posts.comments`) are mounted under the parent member
//! path: `/posts/:post_id/comments`.
//!
//! # Design Decisions
//! - Filtering (`only`, `except`, `api_only`) soft-deletes routes instead of
//!   removing them; the router drops deleted routes at commit

use axum::http::Method;

use crate::middleware::MiddlewareUnit;
use crate::routing::route::RouteDefinition;

/// One conventional resource action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceAction {
    Index,
    Create,
    Store,
    Show,
    Edit,
    Update,
    Destroy,
}

impl ResourceAction {
    pub const ALL: [ResourceAction; 7] = [
        Self::Index,
        Self::Create,
        Self::Store,
        Self::Show,
        Self::Edit,
        Self::Update,
        Self::Destroy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Create => "create",
            Self::Store => "store",
            Self::Show => "show",
            Self::Edit => "edit",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }

    pub fn parse(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == action)
    }

    fn methods(self) -> Vec<Method> {
        match self {
            Self::Index | Self::Create | Self::Show | Self::Edit => vec![Method::GET],
            Self::Store => vec![Method::POST],
            Self::Update => vec![Method::PUT, Method::PATCH],
            Self::Destroy => vec![Method::DELETE],
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Index | Self::Store => "",
            Self::Create => "/create",
            Self::Show | Self::Update | Self::Destroy => "/:id",
            Self::Edit => "/:id/edit",
        }
    }
}

/// Seven (or five, API only) conventional routes for one controller.
#[derive(Debug)]
pub struct RouteResource {
    resource: String,
    controller: String,
    routes: Vec<(ResourceAction, RouteDefinition)>,
}

/// `posts.comments` → `/posts/:post_id/comments`.
fn base_pattern(resource: &str) -> String {
    let parts: Vec<&str> = resource.split('.').filter(|p| !p.is_empty()).collect();
    let mut pattern = String::new();
    for (i, part) in parts.iter().enumerate() {
        pattern.push('/');
        pattern.push_str(part);
        if i + 1 < parts.len() {
            pattern.push_str(&format!("/:{}_id", singular(part)));
        }
    }
    pattern
}

fn singular(word: &str) -> &str {
    word.strip_suffix('s').filter(|w| !w.is_empty()).unwrap_or(word)
}

impl RouteResource {
    pub(crate) fn new(resource: &str, controller: &str) -> Self {
        let base = base_pattern(resource);
        let routes = ResourceAction::ALL
            .into_iter()
            .map(|action| {
                let pattern = format!("{}{}", base, action.suffix());
                let handler = format!("{}.{}", controller, action.as_str());
                let mut route = RouteDefinition::new(action.methods(), &pattern, handler);
                route.as_name(format!("{}.{}", resource, action.as_str()));
                (action, route)
            })
            .collect();

        Self {
            resource: resource.to_string(),
            controller: controller.to_string(),
            routes,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Drop the HTML form actions (`create`, `edit`).
    pub fn api_only(&mut self) -> &mut Self {
        self.except(&["create", "edit"])
    }

    /// Keep only the listed actions.
    pub fn only(&mut self, actions: &[&str]) -> &mut Self {
        for (action, route) in &mut self.routes {
            if !actions.contains(&action.as_str()) {
                route.mark_deleted();
            }
        }
        self
    }

    /// Remove the listed actions.
    pub fn except(&mut self, actions: &[&str]) -> &mut Self {
        for (action, route) in &mut self.routes {
            if actions.contains(&action.as_str()) {
                route.mark_deleted();
            }
        }
        self
    }

    /// Middleware for every action.
    pub fn middleware<I, U>(&mut self, units: I) -> &mut Self
    where
        I: IntoIterator<Item = U>,
        U: Into<MiddlewareUnit>,
    {
        let units: Vec<MiddlewareUnit> = units.into_iter().map(Into::into).collect();
        for (_, route) in &mut self.routes {
            route.middleware(units.iter().cloned());
        }
        self
    }

    /// Middleware for the listed actions only.
    pub fn middleware_for<I, U>(&mut self, actions: &[&str], units: I) -> &mut Self
    where
        I: IntoIterator<Item = U>,
        U: Into<MiddlewareUnit>,
    {
        let units: Vec<MiddlewareUnit> = units.into_iter().map(Into::into).collect();
        for (action, route) in &mut self.routes {
            if actions.contains(&action.as_str()) {
                route.middleware(units.iter().cloned());
            }
        }
        self
    }

    /// Constrain a parameter on every action that declares it.
    pub fn where_param(&mut self, param: &str, constraint: &str) -> &mut Self {
        for (_, route) in &mut self.routes {
            route.where_param(param, constraint);
        }
        self
    }

    /// Rename the route name prefix (`users` → `people.index`, ...).
    pub fn as_name(&mut self, name: &str) -> &mut Self {
        for (action, route) in &mut self.routes {
            route.as_name(format!("{}.{}", name, action.as_str()));
        }
        self
    }

    /// Namespace for the controller identifiers.
    pub fn namespace(&mut self, namespace: &str) -> &mut Self {
        for (_, route) in &mut self.routes {
            route.namespace(namespace);
        }
        self
    }

    /// Mutable access to one action's route.
    pub fn route_mut(&mut self, action: ResourceAction) -> Option<&mut RouteDefinition> {
        self.routes
            .iter_mut()
            .find(|(a, _)| *a == action)
            .map(|(_, route)| route)
    }

    /// All routes, including filtered ones (marked deleted).
    pub fn routes(&self) -> Vec<RouteDefinition> {
        self.routes.iter().map(|(_, route)| route.clone()).collect()
    }
}
