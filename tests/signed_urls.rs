//! Signed URL generation and verification, standalone and through the
//! demo app's `signed` middleware.

use std::time::Duration;

use axum::http::{Method, StatusCode, Uri};

use dispatch_core::app;
use dispatch_core::config::AppConfig;
use dispatch_core::http::HttpRequest;
use dispatch_core::routing::{verify_signed_url, Router, UrlOptions};
use dispatch_core::security::MessageVerifier;

mod common;

fn downloads_router() -> Router {
    let mut router = Router::new();
    router
        .get("/downloads/:file", "DownloadsController.show")
        .unwrap()
        .as_name("downloads.show");
    router.commit().unwrap();
    router
}

fn verify(url: &str, verifier: &MessageVerifier) -> bool {
    let uri: Uri = url.parse().unwrap();
    verify_signed_url(uri.path(), uri.query().unwrap_or_default(), verifier)
}

#[test]
fn test_signed_url_verifies() {
    let verifier = MessageVerifier::new("a-long-enough-application-key");
    let url = downloads_router()
        .url_for_signed(
            "downloads.show",
            &UrlOptions::new().param("file", "report.pdf").query("v", "2"),
            &verifier,
        )
        .unwrap()
        .unwrap();

    assert!(url.starts_with("/downloads/report.pdf?"));
    assert!(url.contains("signature="));
    assert!(verify(&url, &verifier));
}

#[test]
fn test_tampered_url_is_rejected() {
    let verifier = MessageVerifier::new("a-long-enough-application-key");
    let url = downloads_router()
        .url_for_signed(
            "downloads.show",
            &UrlOptions::new().param("file", "report.pdf").query("v", "2"),
            &verifier,
        )
        .unwrap()
        .unwrap();

    assert!(!verify(&url.replace("report.pdf", "secrets.txt"), &verifier));
    assert!(!verify(&url.replace("v=2", "v=3"), &verifier));
    assert!(!verify(&format!("{}&extra=1", url), &verifier));

    let other = MessageVerifier::new("a-different-application-key");
    assert!(!verify(&url, &other));
}

#[test]
fn test_expired_url_is_rejected() {
    let verifier = MessageVerifier::new("a-long-enough-application-key");
    let router = downloads_router();

    // A caller-supplied expiry is signed as-is.
    let past = router
        .url_for_signed(
            "downloads.show",
            &UrlOptions::new().param("file", "a.txt").query("expires_at", 1),
            &verifier,
        )
        .unwrap()
        .unwrap();
    assert!(!verify(&past, &verifier));

    let future = router
        .url_for_signed(
            "downloads.show",
            &UrlOptions::new()
                .param("file", "a.txt")
                .expires_in(Duration::from_secs(3600)),
            &verifier,
        )
        .unwrap()
        .unwrap();
    assert!(future.contains("expires_at="));
    assert!(verify(&future, &verifier));
}

#[test]
fn test_malformed_signatures_never_error() {
    let verifier = MessageVerifier::new("a-long-enough-application-key");
    for query in [
        "",
        "signature=",
        "signature=not-base64!!",
        "signature=abc.def",
        "signature=a.b.c&expires_at=soon",
        "%zz=%zz",
    ] {
        assert!(!verify_signed_url("/downloads/x", query, &verifier), "{}", query);
    }
}

#[tokio::test]
async fn test_signed_middleware_guards_downloads() {
    let config = AppConfig::default();
    let server = app::build_server(&config, "secret").unwrap();
    let verifier = MessageVerifier::new(app::app_key(&config));

    let unsigned = common::get(&server, "/downloads/report.pdf").await;
    assert_eq!(unsigned.get_status(), StatusCode::FORBIDDEN);

    let url = server
        .router()
        .url_for_signed(
            "downloads.show",
            &UrlOptions::new().param("file", "report.pdf"),
            &verifier,
        )
        .unwrap()
        .unwrap();
    let signed = server.handle(HttpRequest::new(Method::GET, &url)).await;
    assert_eq!(signed.get_status(), StatusCode::OK);
    assert_eq!(signed.body_text(), "contents of report.pdf");

    let tampered = common::get(&server, &url.replace("report.pdf", "other.pdf")).await;
    assert_eq!(tampered.get_status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_signed_download_with_spaces_in_file_name() {
    let config = AppConfig::default();
    let server = app::build_server(&config, "secret").unwrap();
    let verifier = MessageVerifier::new(app::app_key(&config));

    let url = server
        .router()
        .url_for_signed(
            "downloads.show",
            &UrlOptions::new().param("file", "my report.pdf"),
            &verifier,
        )
        .unwrap()
        .unwrap();
    assert!(url.starts_with("/downloads/my%20report.pdf?"));
    assert!(verify(&url, &verifier));

    let res = server.handle(HttpRequest::new(Method::GET, &url)).await;
    assert_eq!(res.get_status(), StatusCode::OK);
    assert_eq!(res.body_text(), "contents of my report.pdf");
}
