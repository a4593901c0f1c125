//! Request pipeline: middleware composition, hooks, controllers and the
//! exception handler, exercised through `Server::handle`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;

use dispatch_core::config::ExceptionConfig;
use dispatch_core::error::{HttpError, RegistrationError};
use dispatch_core::exception::ExceptionHandler;
use dispatch_core::http::{hook_fn, HttpRequest, Server, StaticViews};
use dispatch_core::middleware::{middleware_fn, MiddlewareStore};
use dispatch_core::routing::{handler_fn, ControllerRegistry, Router};

mod common;

#[tokio::test]
async fn test_middleware_runs_in_declared_order() {
    let trail = common::trail();
    let mut store = MiddlewareStore::new();
    store
        .register_global([
            common::recording(trail.clone(), "A"),
            common::recording(trail.clone(), "B"),
        ])
        .register_named([("C", common::recording(trail.clone(), "C"))]);

    let mut router = Router::new();
    router
        .get("/", common::recording_handler(trail.clone(), "done"))
        .unwrap()
        .middleware(["C"]);
    let server = Server::builder(router).middleware(store).build().unwrap();

    let res = common::get(&server, "/").await;
    assert_eq!(res.body_text(), "done");
    assert_eq!(common::entries(&trail), vec!["A", "B", "C", "handler"]);
}

#[tokio::test]
async fn test_responding_middleware_stops_the_chain() {
    let trail = common::trail();
    let mut store = MiddlewareStore::new();
    store
        .register_global([
            common::recording(trail.clone(), "A"),
            common::responding(trail.clone(), "B"),
        ])
        .register_named([("C", common::recording(trail.clone(), "C"))]);

    let mut router = Router::new();
    router
        .get("/", common::recording_handler(trail.clone(), "done"))
        .unwrap()
        .middleware(["C"]);
    let server = Server::builder(router).middleware(store).build().unwrap();

    let res = common::get(&server, "/").await;
    assert_eq!(res.get_status(), StatusCode::OK);
    assert_eq!(res.body_text(), "B");
    assert_eq!(common::entries(&trail), vec!["A", "B"]);
}

#[tokio::test]
async fn test_global_middleware_is_deduplicated() {
    let trail = common::trail();
    let a = common::recording(trail.clone(), "A");
    let mut store = MiddlewareStore::new();
    store.register_global([a.clone()]).register_global([a]);
    assert_eq!(store.global().len(), 1);

    let mut router = Router::new();
    router.get("/", common::text("ok")).unwrap();
    let server = Server::builder(router).middleware(store).build().unwrap();
    common::get(&server, "/").await;
    assert_eq!(common::entries(&trail), vec!["A"]);
}

#[tokio::test]
async fn test_named_middleware_receives_arguments() {
    let mut store = MiddlewareStore::new();
    store.register_named([(
        "role",
        Arc::new(RequireRole) as Arc<dyn dispatch_core::middleware::Middleware>,
    )]);

    let mut router = Router::new();
    router
        .get("/admin", common::text("welcome"))
        .unwrap()
        .middleware(["role:admin,owner"]);
    let server = Server::builder(router).middleware(store).build().unwrap();

    let denied = server
        .handle(HttpRequest::new(Method::GET, "/admin").with_header("x-role", "guest"))
        .await;
    assert_eq!(denied.get_status(), StatusCode::FORBIDDEN);

    let allowed = server
        .handle(HttpRequest::new(Method::GET, "/admin").with_header("x-role", "owner"))
        .await;
    assert_eq!(allowed.body_text(), "welcome");
}

struct RequireRole;

#[async_trait::async_trait]
impl dispatch_core::middleware::Middleware for RequireRole {
    async fn handle(
        &self,
        ctx: &mut dispatch_core::http::HttpContext,
        next: dispatch_core::middleware::Next<'_>,
        args: &[String],
    ) -> Result<(), HttpError> {
        let role = ctx.request.header("x-role").unwrap_or_default();
        if !args.iter().any(|a| a == role) {
            return Err(HttpError::new("Forbidden").with_status(StatusCode::FORBIDDEN));
        }
        next.run(ctx).await
    }
}

#[test]
fn test_missing_named_middleware_is_fatal() {
    let mut router = Router::new();
    router
        .get("/", common::text("ok"))
        .unwrap()
        .middleware(["doesNotExist"]);
    assert!(matches!(
        Server::builder(router).build(),
        Err(RegistrationError::MissingNamedMiddleware(ref name)) if name == "doesNotExist"
    ));

    let store = MiddlewareStore::new();
    assert!(matches!(
        store.resolve("doesNotExist:1,2"),
        Err(RegistrationError::MissingNamedMiddleware(ref name)) if name == "doesNotExist"
    ));
}

#[tokio::test]
async fn test_errors_propagate_past_later_middleware() {
    let trail = common::trail();
    let after = trail.clone();
    let mut store = MiddlewareStore::new();
    store.register_global([middleware_fn(move |ctx, next| {
        let after = after.clone();
        Box::pin(async move {
            let outcome = next.run(ctx).await;
            after
                .lock()
                .unwrap()
                .push(format!("outer saw error: {}", outcome.is_err()));
            outcome
        })
    })]);

    let mut router = Router::new();
    router
        .get(
            "/boom",
            handler_fn(|_ctx| {
                Box::pin(async {
                    Err::<(), _>(HttpError::new("kaboom").with_status(StatusCode::CONFLICT))
                })
            }),
        )
        .unwrap();
    let server = Server::builder(router).middleware(store).build().unwrap();

    let res = server
        .handle(HttpRequest::new(Method::GET, "/boom").with_header("accept", "application/json"))
        .await;
    assert_eq!(res.get_status(), StatusCode::CONFLICT);
    assert_eq!(common::json_body(&res)["message"], "kaboom");
    assert_eq!(common::entries(&trail), vec!["outer saw error: true"]);
}

#[tokio::test]
async fn test_error_without_status_is_500_with_message_only_in_production() {
    let mut router = Router::new();
    router
        .get(
            "/fail",
            handler_fn(|_ctx| Box::pin(async { Err::<(), _>(HttpError::new("Something broke")) })),
        )
        .unwrap();
    let server = Server::builder(router)
        .exception_handler(ExceptionHandler::from_config(&ExceptionConfig::default(), true))
        .build()
        .unwrap();

    let res = server
        .handle(HttpRequest::new(Method::GET, "/fail").with_header("accept", "application/json"))
        .await;
    assert_eq!(res.get_status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(common::json_body(&res), json!({ "message": "Something broke" }));
}

#[tokio::test]
async fn test_before_hooks_see_unmatched_requests() {
    let mut router = Router::new();
    router.get("/", common::text("home")).unwrap();
    let server = Server::builder(router)
        .before(hook_fn(|ctx| {
            Box::pin(async move {
                if ctx.request.path().starts_with("/legacy") {
                    ctx.response.status(StatusCode::GONE).send("moved on");
                }
                Ok(())
            })
        }))
        .build()
        .unwrap();

    let res = common::get(&server, "/legacy/page").await;
    assert_eq!(res.get_status(), StatusCode::GONE);
    assert_eq!(res.body_text(), "moved on");

    let res = common::get(&server, "/").await;
    assert_eq!(res.body_text(), "home");
}

#[tokio::test]
async fn test_before_hook_answers_cors_preflight() {
    let server = Server::builder(Router::new())
        .before(hook_fn(|ctx| {
            Box::pin(async move {
                if *ctx.request.method() == Method::OPTIONS {
                    ctx.response
                        .header("access-control-allow-origin", "*")
                        .header("access-control-allow-methods", "GET, POST")
                        .end();
                }
                Ok(())
            })
        }))
        .build()
        .unwrap();

    let res = server
        .handle(HttpRequest::new(Method::OPTIONS, "/anything"))
        .await;
    assert!(!res.has_body());
    assert_eq!(res.get_header("access-control-allow-origin"), Some("*"));
    assert_eq!(res.into_http().status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_after_hooks_skip_the_error_path() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut router = Router::new();
    router.get("/ok", common::text("ok")).unwrap();
    router
        .get(
            "/fail",
            handler_fn(|_ctx| Box::pin(async { Err::<(), _>(HttpError::new("nope")) })),
        )
        .unwrap();
    let server = Server::builder(router)
        .after(hook_fn(move |ctx| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ctx.response.header("x-after", "1");
                Ok(())
            })
        }))
        .build()
        .unwrap();

    let ok = common::get(&server, "/ok").await;
    assert_eq!(ok.get_header("x-after"), Some("1"));
    let failed = common::get(&server, "/fail").await;
    assert_eq!(failed.get_status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failed.get_header("x-after"), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_route_miss_renders_404_without_reporting() {
    let server = Server::builder(Router::new()).build().unwrap();

    let res = server
        .handle(HttpRequest::new(Method::POST, "/missing").with_header("accept", "text/html"))
        .await;
    assert_eq!(res.get_status(), StatusCode::NOT_FOUND);
    assert!(res.body_text().contains("Cannot POST /missing"));

    let handler = ExceptionHandler::default();
    assert!(!handler.should_report(&HttpError::route_not_found(&Method::POST, "/missing")));
}

#[tokio::test]
async fn test_controller_identifiers_and_fakes() {
    let mut registry = ControllerRegistry::new();
    registry
        .register("UsersController.show", common::text("real"))
        .register("Admin/UsersController.show", common::text("admin"));

    let mut router = Router::new();
    router.get("/users/:id", "UsersController.show").unwrap();
    router
        .get("/admin/users/:id", "UsersController.show")
        .unwrap()
        .namespace("Admin");

    let real = Server::builder(router).resolver(Arc::new(registry)).build().unwrap();
    assert_eq!(common::get(&real, "/users/1").await.body_text(), "real");
    assert_eq!(common::get(&real, "/admin/users/1").await.body_text(), "admin");

    let mut faked = ControllerRegistry::new();
    faked
        .register("UsersController.show", common::text("real"))
        .fake("UsersController.show", common::text("fake"));
    let mut router = Router::new();
    router.get("/users/:id", "UsersController.show").unwrap();
    let server = Server::builder(router).resolver(Arc::new(faked)).build().unwrap();
    assert_eq!(common::get(&server, "/users/1").await.body_text(), "fake");
}

#[tokio::test]
async fn test_context_carries_route_params_and_subdomains() {
    let mut router = Router::new();
    router
        .get(
            "/posts/:id",
            handler_fn(|ctx| {
                Box::pin(async move {
                    let body = json!({
                        "route": ctx.route().map(|r| r.pattern().to_string()),
                        "id": ctx.param("id"),
                        "tenant": ctx.subdomains().get("tenant"),
                    });
                    ctx.response.json(&body)?;
                    Ok::<(), HttpError>(())
                })
            }),
        )
        .unwrap()
        .domain(":tenant.example.com");
    let server = Server::builder(router).build().unwrap();

    let res = server
        .handle(
            HttpRequest::new(Method::GET, "/posts/9").with_header("host", "acme.example.com:8080"),
        )
        .await;
    assert_eq!(
        common::json_body(&res),
        json!({ "route": "/posts/:id", "id": "9", "tenant": "acme" })
    );
}

#[tokio::test]
async fn test_brisk_routes() {
    let mut router = Router::new();
    router.get("/posts/:id", common::text("post")).unwrap().as_name("posts.show");
    router.on("/about").unwrap().render("pages/about");
    router.on("/p/:id").unwrap().redirect_to_route("posts.show");
    router.on("/old").unwrap().redirect("/new");

    let views = StaticViews::new().template("pages/about", "<h1>About</h1>");
    let server = Server::builder(router).views(Arc::new(views)).build().unwrap();

    let about = common::get(&server, "/about").await;
    assert_eq!(about.body_text(), "<h1>About</h1>");
    assert_eq!(about.get_header("content-type"), Some("text/html; charset=utf-8"));

    let short = common::get(&server, "/p/12").await;
    assert_eq!(short.get_status(), StatusCode::FOUND);
    assert_eq!(short.get_header("location"), Some("/posts/12"));

    let old = common::get(&server, "/old").await;
    assert_eq!(old.get_header("location"), Some("/new"));
}

#[tokio::test]
async fn test_head_requests_reach_get_handlers() {
    let mut router = Router::new();
    router.get("/ping", common::text("pong")).unwrap();
    let server = Server::builder(router).build().unwrap();
    let res = server.handle(HttpRequest::new(Method::HEAD, "/ping")).await;
    assert_eq!(res.get_status(), StatusCode::OK);
}
