//! Axum transport adapter.
//!
//! # Responsibilities
//! - Bind the dispatcher to a TCP listener through axum
//! - Wire up tower layers (request ID, tracing, timeout)
//! - Buffer request bodies up to the configured limit
//! - Graceful shutdown on the lifecycle signal
//!
//! # Design Decisions
//! - Axum routing is not used: a single fallback hands every request to
//!   the dispatcher, which owns matching
//! - Request IDs are set before tracing so every span carries one, and
//!   echoed back on the response

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::request::HttpRequest;
use crate::http::server::Server;
use crate::lifecycle::Shutdown;

#[derive(Clone)]
struct TransportState {
    server: Arc<Server>,
    max_body_size: usize,
}

/// HTTP front end for a [`Server`].
pub struct HttpServer {
    app: Router,
}

impl HttpServer {
    pub fn new(server: Arc<Server>, config: &AppConfig) -> Self {
        let state = TransportState {
            server,
            max_body_size: config.http.max_body_size,
        };
        Self {
            app: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: TransportState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The axum router, for embedding or in-process tests.
    pub fn into_router(self) -> Router {
        self.app
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: &Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut signal = shutdown.subscribe();
        axum::serve(listener, self.app.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = signal.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(State(state): State<TransportState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_size,
                error = %e,
                "Rejecting request body"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    state
        .server
        .handle(HttpRequest::from_parts(parts, body))
        .await
        .into_http()
}
