#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use tower::ServiceExt;

use splitwatch::{with_server_timing, ServerTimingOptions, Timing};

#[tokio::test]
async fn facade_exposes_middleware_and_tracker() {
    let routes = Router::new().route(
        "/",
        get(|timing: Timing| async move {
            timing.start("db", Some("query users"));
            timing.end("db");
            "ok"
        }),
    );
    let app = with_server_timing(routes, ServerTimingOptions::new().write_headers(true));

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    let value = res.headers().get("server-timing").unwrap().to_str().unwrap();
    assert!(value.starts_with("db;dur="));
    assert!(value.ends_with(";desc=\"db: query users\""));
}

#[test]
fn facade_exposes_core_modules() {
    let tracker = splitwatch::Tracker::new();
    tracker.start("cache", None);
    let snap = tracker.snapshot(splitwatch::SnapshotOptions::default());
    assert_eq!(snap.len(), 1);
    assert_eq!(
        splitwatch::core::header::render_values(&[]),
        Vec::<String>::new()
    );
}
