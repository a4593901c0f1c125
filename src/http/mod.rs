//! HTTP request handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → transport.rs (axum, request ID, timeout, body buffering)
//!     → request.rs (HttpRequest)
//!     → server.rs (before hooks → Router::find → context.rs → chain → after hooks)
//!     → exception handler on any error
//!     → response.rs (HttpResponse → axum response)
//!     → Send to client
//! ```

pub mod context;
pub mod hooks;
pub mod request;
pub mod response;
pub mod server;
pub mod transport;
pub mod view;

pub use context::{HttpContext, Services};
pub use hooks::{hook_fn, Hook, Hooks};
pub use request::{HttpRequest, X_REQUEST_ID};
pub use response::HttpResponse;
pub use server::{Server, ServerBuilder};
pub use transport::HttpServer;
pub use view::{StaticViews, ViewRenderer};
