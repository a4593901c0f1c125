//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::Method;
use tokio::net::TcpListener;

use dispatch_core::config::AppConfig;
use dispatch_core::http::{HttpRequest, HttpResponse, HttpServer, Server};
use dispatch_core::lifecycle::Shutdown;
use dispatch_core::middleware::{middleware_fn, Middleware};
use dispatch_core::routing::{handler_fn, Handler};

/// Ordered record of what ran during a request.
pub type Trail = Arc<Mutex<Vec<String>>>;

pub fn trail() -> Trail {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(trail: &Trail) -> Vec<String> {
    trail.lock().unwrap().clone()
}

/// Handler that writes a fixed text body.
pub fn text(body: &'static str) -> Arc<dyn Handler> {
    handler_fn(move |ctx| {
        Box::pin(async move {
            ctx.response.send(body);
            Ok(())
        })
    })
}

/// Handler that records itself, then writes `body`.
pub fn recording_handler(trail: Trail, body: &'static str) -> Arc<dyn Handler> {
    handler_fn(move |ctx| {
        let trail = trail.clone();
        Box::pin(async move {
            trail.lock().unwrap().push("handler".to_string());
            ctx.response.send(body);
            Ok(())
        })
    })
}

/// Middleware that records `label` and continues.
pub fn recording(trail: Trail, label: &'static str) -> Arc<dyn Middleware> {
    middleware_fn(move |ctx, next| {
        let trail = trail.clone();
        Box::pin(async move {
            trail.lock().unwrap().push(label.to_string());
            next.run(ctx).await
        })
    })
}

/// Middleware that records `label` and responds without calling `next`.
pub fn responding(trail: Trail, label: &'static str) -> Arc<dyn Middleware> {
    middleware_fn(move |ctx, _next| {
        let trail = trail.clone();
        Box::pin(async move {
            trail.lock().unwrap().push(label.to_string());
            ctx.response.send(label);
            Ok(())
        })
    })
}

pub async fn get(server: &Server, path: &str) -> HttpResponse {
    server.handle(HttpRequest::new(Method::GET, path)).await
}

pub fn json_body(response: &HttpResponse) -> serde_json::Value {
    serde_json::from_str(&response.body_text()).expect("response body is JSON")
}

/// Serve `server` on an ephemeral port. Trigger the returned `Shutdown` to stop it.
pub async fn start_server(server: Server, config: AppConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let http = HttpServer::new(Arc::new(server), &config);

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = http.run(listener, &server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}
