//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at boot):
//!     get/post/.../group/resource/on
//!     → route.rs, group.rs, resource.rs, brisk.rs (definitions + aggregates)
//!     → router.rs commit: flatten, drop deleted, check names
//!     → matcher.rs (compile path + domain patterns)
//!     → Freeze as immutable table
//!
//! Incoming request (method, path, host)
//!     → router.rs find (scan in registration order)
//!     → Return: RouteMatch { route, params, subdomains } or no match
//!
//! URL generation:
//!     name | pattern | Controller.method → url.rs (params, query, signature)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at commit, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (registration order, no specificity ranking)
//! - Handler identifiers resolved through resolver.rs, never by reflection

pub mod brisk;
pub mod group;
pub mod matcher;
pub mod resolver;
pub mod resource;
pub mod route;
pub mod router;
pub mod url;

pub use brisk::BriskRoute;
pub use group::RouteGroup;
pub use resolver::{ControllerRegistry, HandlerResolver};
pub use resource::{ResourceAction, RouteResource};
pub use route::{handler_fn, Handler, RouteDefinition, RouteHandler};
pub use router::{RouteMatch, Router};
pub use url::{verify_signed_url, UrlError, UrlOptions};
