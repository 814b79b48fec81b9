// src/tests/router_tests.rs

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use astra::{Body, Request};
use http::Method;

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::errors::ServerError;
use crate::notify::{MockMailer, NotificationDispatcher};
use crate::router::{handle, AppContext};
use crate::scheduler::Scheduler;
use crate::source::FlashfoodClient;
use crate::tests::utils::make_test_db;

fn make_ctx(tag: &str) -> AppContext {
    let db = make_test_db(tag);

    // Offline source: every fetch fails fast against a closed port.
    let config = Config {
        bind_addr: "127.0.0.1:0".to_string(),
        database_path: ":memory:".to_string(),
        source_base_url: "http://127.0.0.1:9".to_string(),
        source_api_key: "test".to_string(),
        poll_interval_secs: 3600,
        search_radius_meters: 75000,
        stores_limit: 50,
        resend_api_key: None,
        email_from: "noreply@dealwatch.example".to_string(),
        email_sender_name: "Dealwatch".to_string(),
        max_deals_per_email: 10,
    };

    let client = FlashfoodClient::new(&config).expect("client init");
    let dispatcher = NotificationDispatcher::new(Box::new(MockMailer), 10);
    let broadcaster = Arc::new(Broadcaster::new());
    let scheduler = Scheduler::new(
        db.clone(),
        client,
        dispatcher,
        broadcaster.clone(),
        Duration::from_secs(3600),
    );

    AppContext {
        db,
        scheduler,
        broadcaster,
    }
}

fn request(method: Method, path: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

fn body_string(resp: astra::Response) -> String {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    body
}

#[test]
fn health_responds_ok() {
    let ctx = make_ctx("router_health");
    let resp = handle(request(Method::GET, "/health"), &ctx).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(body_string(resp), "ok");
}

#[test]
fn status_page_renders() {
    let ctx = make_ctx("router_home");
    let resp = handle(request(Method::GET, "/"), &ctx).unwrap();
    assert_eq!(resp.status(), 200);

    let body = body_string(resp);
    assert!(body.contains("Dealwatch"));
    assert!(body.contains("Calgary"));
    assert!(body.contains("No cycles recorded yet."));
}

#[test]
fn unknown_route_is_not_found() {
    let ctx = make_ctx("router_404");
    let result = handle(request(Method::GET, "/nope"), &ctx);
    assert!(matches!(result, Err(ServerError::NotFound)));
}

#[test]
fn manual_refresh_reports_counts() {
    let ctx = make_ctx("router_refresh");
    let resp = handle(request(Method::POST, "/refresh"), &ctx).unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = serde_json::from_str(&body_string(resp)).unwrap();
    assert_eq!(body["success"], true);
    // The offline source means zero deals, but the surface still reports
    // aggregate counts rather than an error.
    assert_eq!(body["new_deals"], 0);
    assert_eq!(body["stores_seen"], 0);
}
