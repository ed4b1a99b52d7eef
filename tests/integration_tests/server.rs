use crate::common::{fixture, folder, seed_folders, seed_items};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use mongo_search::CallerContext;
use mongo_search::auth::StaticTokens;
use mongo_search::server::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> axum::Router {
    let fx = fixture();
    seed_items(&fx.engine, 60);
    seed_folders(&fx.engine, [folder("shared", false, &["alice"], &[]), folder("open", true, &[], &[])]);
    let mut tokens = StaticTokens::new();
    tokens.insert("t-admin", CallerContext::administrator("root"));
    tokens.insert("t-alice", CallerContext::user("alice"));
    build_router(AppState::new(fx.gateway, Arc::new(tokens)))
}

async fn call(app: &axum::Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header("authorization", format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())).unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn search_defaults_to_fifty_results() {
    let app = app();
    let (status, body) = call(&app, "GET", "/search?type=item&q=%7B%7D", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let docs = body.as_array().unwrap();
    assert_eq!(docs.len(), 50);
    assert!(docs.iter().all(|d| d.get("secret").is_none()));
}

#[tokio::test]
async fn search_honors_limit_offset_and_operators() {
    let app = app();
    let uri = "/search?type=item&q=%7B%22size%22%3A%7B%22%24gte%22%3A10%7D%7D&limit=3&offset=2";
    let (status, body) = call(&app, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["item-012", "item-013", "item-014"]);
}

#[tokio::test]
async fn search_errors_map_to_json_bodies() {
    let app = app();
    let (status, body) = call(&app, "GET", "/search?type=widget&q=%7B%7D", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "unknown_collection");

    let (status, body) = call(&app, "GET", "/search?type=item&q=not-json", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "malformed_query");

    let (status, body) = call(&app, "GET", "/search?type=item", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = call(&app, "GET", "/search?type=item&q=%7B%7D&limit=-1", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("limit"));

    let (status, body) = call(&app, "GET", "/search?type=item&q=%7B%22%24where%22%3A1%7D", None, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "store");
}

#[tokio::test]
async fn bearer_tokens_select_the_caller() {
    let app = app();
    let (_, anon) = call(&app, "GET", "/search?type=folder&q=%7B%7D", None, None).await;
    let anon = anon.as_array().unwrap();
    assert_eq!(anon.len(), 1);
    assert_eq!(anon[0]["name"], "open");
    let mut keys: Vec<&str> = anon[0].as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["_id", "description", "name"]);

    let (_, alice) = call(&app, "GET", "/search?type=folder&q=%7B%7D", Some("t-alice"), None).await;
    let names: Vec<&str> = alice.as_array().unwrap().iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["open", "shared"]);

    let (_, unknown) = call(&app, "GET", "/search?type=folder&q=%7B%7D", Some("bogus"), None).await;
    assert_eq!(unknown.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn allowed_endpoint_requires_an_administrator() {
    let app = app();
    let (status, body) = call(&app, "GET", "/search/allowed", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "authorization");

    let (status, _) = call(&app, "GET", "/search/allowed", Some("t-alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "PUT", "/search/allowed", Some("t-alice"), Some(json!({"item": ["name"]}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "GET", "/search/allowed?default=true", Some("t-admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"], json!(["_id", "name", "description", "folderId"]));
}

#[tokio::test]
async fn bad_default_flag_gets_a_json_error() {
    let app = app();
    for flag in ["1", "yes"] {
        let uri = format!("/search/allowed?default={flag}");
        let (status, body) = call(&app, "GET", &uri, Some("t-admin"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(body["error"]["message"].as_str().unwrap().contains("default"));
    }
    let (status, _) = call(&app, "GET", "/search/allowed?default=false", Some("t-admin"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn limits_above_ten_thousand_are_honored() {
    let fx = fixture();
    seed_items(&fx.engine, 10_500);
    let app = build_router(AppState::new(fx.gateway, Arc::new(StaticTokens::new())));
    let (status, body) = call(&app, "GET", "/search?type=item&q=%7B%7D&limit=10500", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 10_500);
}

#[tokio::test]
async fn put_allowed_validates_and_applies() {
    let app = app();
    let (status, body) =
        call(&app, "PUT", "/search/allowed", Some("t-admin"), Some(json!({"item": ["bogusField"]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");
    assert_eq!(body["error"]["field"], "value");

    let (status, body) =
        call(&app, "PUT", "/search/allowed", Some("t-admin"), Some(json!({"item": ["name", "size"]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"item": ["name", "size"]}));

    let (_, current) = call(&app, "GET", "/search/allowed", Some("t-admin"), None).await;
    assert_eq!(current, json!({"item": ["name", "size"]}));

    let (_, docs) = call(&app, "GET", "/search?type=item&q=%7B%7D&limit=1", None, None).await;
    assert_eq!(docs, json!([{"name": "item-000", "size": 0}]));

    let (status, _) = call(&app, "GET", "/search?type=folder&q=%7B%7D", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_version() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["features"].is_array());
}
