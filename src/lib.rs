//! Request dispatch core for HTTP applications.
//!
//! # Architecture Overview
//!
//! ```text
//!   Boot                                       Request
//!   ────                                       ───────
//!   Router::get/group/resource/on              transport (axum, request ID, timeout)
//!        │                                          │
//!        ▼                                          ▼
//!   flatten + commit ──▶ compiled table ◀──── Router::find(path, method, host)
//!        │                                          │
//!        ▼                                          ▼
//!   MiddlewareStore ──▶ ExecutionChain ────▶ before hooks → chain → after hooks
//!   HandlerResolver        (per route)              │
//!                                                   ▼ error
//!                                            ExceptionHandler (report, handle)
//! ```
//!
//! ```ignore
//! let mut router = Router::new();
//! router.get("/users/:id", "UsersController.show")?.as_name("users.show");
//! let server = Server::builder(router).resolver(controllers).build()?;
//! let response = server.handle(HttpRequest::new(Method::GET, "/users/1")).await;
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod exception;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::AppConfig;
pub use error::{HttpError, RegistrationError};
pub use exception::ExceptionHandler;
pub use http::{HttpContext, HttpRequest, HttpResponse, HttpServer, Server};
pub use lifecycle::Shutdown;
pub use middleware::{middleware_fn, Middleware, MiddlewareStore};
pub use routing::{handler_fn, Handler, Router, UrlOptions};
pub use security::{Encrypter, MessageVerifier};
