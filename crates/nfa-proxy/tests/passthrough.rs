//! Passthrough of `/blockchain/models` routes to a mock marketplace.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use nfa_core::SessionStore;
use nfa_core::testing::StaticMarketplace;
use nfa_proxy::passthrough::Passthrough;
use nfa_proxy::{ProxyState, create_router};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(marketplace_url: &str) -> Router {
    let market = Arc::new(StaticMarketplace::new());
    let sessions = Arc::new(SessionStore::new(market.clone(), Duration::from_secs(1800)));
    let passthrough = Passthrough::new(marketplace_url).unwrap();
    create_router(ProxyState::new(market, sessions, passthrough))
}

#[tokio::test]
async fn test_models_listing_is_proxied_verbatim() {
    let server = MockServer::start().await;
    let listing = json!({"models": [{"id": "0x1", "name": "GPT-4"}]});
    Mock::given(method("GET"))
        .and(path("/blockchain/models"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing.clone())
                .insert_header("x-marketplace", "yes"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server.uri())
        .oneshot(
            Request::builder()
                .uri("/blockchain/models?page=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-marketplace"], "yes");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed, listing);
}

#[tokio::test]
async fn test_session_post_keeps_method_headers_and_body() {
    let server = MockServer::start().await;
    let payload = json!({"sessionDuration": "3600"});
    Mock::given(method("POST"))
        .and(path("/blockchain/models/0x1/session"))
        .and(header("authorization", "Basic dTpw"))
        .and(body_json(payload.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sessionID": "0xs"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server.uri())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/blockchain/models/0x1/session")
                .header("authorization", "Basic dTpw")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_delete_and_upstream_status_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/blockchain/models/0x1/session/0xs"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server.uri())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/blockchain/models/0x1/session/0xs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"gone");
}

#[tokio::test]
async fn test_unreachable_marketplace() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let response = app(&uri)
        .oneshot(
            Request::builder()
                .uri("/blockchain/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["error"]["code"], "upstream_error");
}
