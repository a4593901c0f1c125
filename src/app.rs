//! Demo application served by the `dispatch-core` binary and inspected by
//! `dispatch-cli`.
//!
//! ```text
//! GET  /                     TenantsController.home on :tenant.localhost
//! GET  /                     HomeController.index            home
//! GET  /health               inline
//! GET  /about                brisk render pages/about
//! GET  /docs                 brisk redirect
//! /api/v1 (group, auth)      users resource (index, show, store)
//! GET  /downloads/:file      DownloadsController.show        signed
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use serde_json::json;

use crate::config::{AppConfig, ValidationError};
use crate::error::{HttpError, RegistrationError};
use crate::exception::ExceptionHandler;
use crate::http::server::Server;
use crate::http::view::StaticViews;
use crate::middleware::{middleware_fn, MiddlewareStore};
use crate::routing::resolver::ControllerRegistry;
use crate::routing::route::handler_fn;
use crate::routing::router::Router;
use crate::security::MessageVerifier;

/// Key used when `http.app_key` is empty outside production.
pub const DEVELOPMENT_APP_KEY: &str = "development-only-app-key";

/// Bearer token accepted by `auth` when none is configured outside production.
pub const DEVELOPMENT_API_TOKEN: &str = "secret";

/// Environment variable carrying the `auth` bearer token.
pub const API_TOKEN_ENV: &str = "DISPATCH_API_TOKEN";

/// Register every demo route.
pub fn register_routes(router: &mut Router) -> Result<(), RegistrationError> {
    // Domain routes first: the plain `/` below matches every host.
    router
        .get("/", "TenantsController.home")?
        .domain(":tenant.localhost")
        .as_name("tenants.home");

    router.get("/", "HomeController.index")?.as_name("home");

    router.get(
        "/health",
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.response.json(&json!({ "status": "ok" }))?;
                Ok::<(), HttpError>(())
            })
        }),
    )?;

    router.on("/about")?.render("pages/about");
    router.on("/docs")?.redirect("https://docs.rs");

    router
        .group(|r| {
            r.resource("users", "UsersController")?
                .api_only()
                .only(&["index", "show", "store"])
                .where_param("id", r"^\d+$");
            Ok(())
        })?
        .prefix("/api/v1")
        .as_name("api")
        .middleware(["auth"]);

    router
        .get("/downloads/:file", "DownloadsController.show")?
        .as_name("downloads.show")
        .middleware(["signed"]);

    Ok(())
}

/// Controllers backing the identifier routes.
pub fn controllers() -> ControllerRegistry {
    let mut registry = ControllerRegistry::new();

    registry
        .register(
            "HomeController.index",
            handler_fn(|ctx| {
                Box::pin(async move {
                    ctx.response.send("It works!");
                    Ok(())
                })
            }),
        )
        .register(
            "UsersController.index",
            handler_fn(|ctx| {
                Box::pin(async move {
                    ctx.response.json(&json!([
                        { "id": 1, "name": "virk" },
                        { "id": 2, "name": "romain" }
                    ]))?;
                    Ok::<(), HttpError>(())
                })
            }),
        )
        .register(
            "UsersController.show",
            handler_fn(|ctx| {
                Box::pin(async move {
                    let id = ctx.param("id").unwrap_or_default().to_string();
                    ctx.response.json(&json!({ "id": id }))?;
                    Ok::<(), HttpError>(())
                })
            }),
        )
        .register(
            "UsersController.store",
            handler_fn(|ctx| {
                Box::pin(async move {
                    let user: serde_json::Value = ctx.request.json()?;
                    ctx.response.status(StatusCode::CREATED).json(&user)?;
                    Ok::<(), HttpError>(())
                })
            }),
        )
        .register(
            "DownloadsController.show",
            handler_fn(|ctx| {
                Box::pin(async move {
                    let file = ctx.param("file").unwrap_or_default().to_string();
                    ctx.response.send(format!("contents of {}", file));
                    Ok(())
                })
            }),
        )
        .register(
            "TenantsController.home",
            handler_fn(|ctx| {
                Box::pin(async move {
                    let tenant = ctx.subdomains().get("tenant").cloned().unwrap_or_default();
                    ctx.response.send(format!("Welcome to {}", tenant));
                    Ok(())
                })
            }),
        );

    registry
}

/// Global and named middleware of the demo.
pub fn middleware(api_token: String) -> MiddlewareStore {
    let mut store = MiddlewareStore::new();

    store.register_global([middleware_fn(|ctx, next| {
        Box::pin(async move {
            let start = Instant::now();
            let outcome = next.run(ctx).await;
            let elapsed = format!("app;dur={:.3}", start.elapsed().as_secs_f64() * 1000.0);
            ctx.response.header("server-timing", &elapsed);
            outcome
        })
    })]);

    let token = Arc::new(format!("Bearer {}", api_token));
    store.register_named([
        (
            "auth",
            middleware_fn(move |ctx, next| {
                let token = token.clone();
                Box::pin(async move {
                    if ctx.request.header("authorization") != Some(token.as_str()) {
                        return Err(HttpError::new("Unauthorized access")
                            .with_status(StatusCode::UNAUTHORIZED)
                            .with_code("E_UNAUTHORIZED_ACCESS"));
                    }
                    next.run(ctx).await
                })
            }),
        ),
        (
            "signed",
            middleware_fn(|ctx, next| {
                Box::pin(async move {
                    if !ctx.has_valid_signature() {
                        return Err(HttpError::new("Invalid or expired signature")
                            .with_status(StatusCode::FORBIDDEN)
                            .with_code("E_INVALID_SIGNATURE"));
                    }
                    next.run(ctx).await
                })
            }),
        ),
    ]);

    store
}

fn views() -> StaticViews {
    StaticViews::new()
        .template("pages/about", "<h1>About</h1><p>Served by dispatch-core.</p>")
        .template(
            "errors/not_found",
            "<h1>Page not found</h1><p>{{ error.message }}</p>",
        )
        .template(
            "errors/server_error",
            "<h1>Something went wrong</h1><p>{{ error.status }}</p>",
        )
}

/// The application key, falling back to a fixed development key.
pub fn app_key(config: &AppConfig) -> String {
    if config.http.app_key.is_empty() {
        DEVELOPMENT_APP_KEY.to_string()
    } else {
        config.http.app_key.clone()
    }
}

/// The `auth` bearer token. Production refuses to fall back to the
/// development token.
pub fn api_token(
    config: &AppConfig,
    configured: Option<String>,
) -> Result<String, ValidationError> {
    match configured.filter(|token| !token.is_empty()) {
        Some(token) => Ok(token),
        None if config.is_production() => Err(ValidationError {
            field: API_TOKEN_ENV.to_string(),
            message: "must be set in production".to_string(),
        }),
        None => Ok(DEVELOPMENT_API_TOKEN.to_string()),
    }
}

/// The demo router, registered but not committed.
pub fn router() -> Result<Router, RegistrationError> {
    let mut router = Router::new();
    register_routes(&mut router)?;
    Ok(router)
}

/// Build the full demo server.
pub fn build_server(config: &AppConfig, api_token: &str) -> Result<Server, RegistrationError> {
    let views = Arc::new(views());
    let exception_handler = ExceptionHandler::from_config(&config.exception, config.is_production())
        .with_views(views.clone());

    Server::builder(router()?)
        .middleware(middleware(api_token.to_string()))
        .resolver(Arc::new(controllers()))
        .views(views)
        .encrypter(Arc::new(MessageVerifier::new(app_key(config))))
        .exception_handler(exception_handler)
        .build()
}
