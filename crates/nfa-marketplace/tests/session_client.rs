//! HTTP contract tests for session creation.

use std::time::Duration;

use nfa_core::{CredentialSettings, MarketplaceApiMode, MarketplaceError, MarketplacePort};
use nfa_marketplace::{Credentials, MarketplaceClient, MarketplaceClientConfig};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_PATH: &str = "/blockchain/models/model1/session";

/// Credentials from the environment pair; the cookie path points nowhere.
fn env_credentials(dir: &TempDir) -> CredentialSettings {
    CredentialSettings {
        cookie_path: dir.path().join(".cookie"),
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
    }
}

fn config(server: &MockServer, dir: &TempDir) -> MarketplaceClientConfig {
    MarketplaceClientConfig::new(server.uri(), server.uri())
        .with_credentials(env_credentials(dir))
        .with_retry_delay(Duration::from_millis(10))
}

fn client(config: MarketplaceClientConfig) -> MarketplaceClient {
    MarketplaceClient::new(config).unwrap()
}

#[tokio::test]
async fn test_503_exhausts_exactly_three_attempts() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(config(&server, &dir))
        .open_session("model1", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MarketplaceError::RetriesExhausted { attempts: 3, .. }
    ));
    let msg = err.to_string();
    assert!(msg.contains("3 attempts"), "{msg}");
    assert!(msg.contains("503"), "{msg}");
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(config(&server, &dir))
        .open_session("model1", None)
        .await
        .unwrap_err();

    assert!(matches!(err, MarketplaceError::Unauthorized(ref m) if m == "invalid credentials"));
}

#[tokio::test]
async fn test_bad_request_is_rejection() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "no provider accepting session"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(config(&server, &dir))
        .open_session("model1", None)
        .await
        .unwrap_err();

    assert!(matches!(err, MarketplaceError::Rejected(ref m) if m.contains("no provider accepting session")));
}

#[tokio::test]
async fn test_payload_and_basic_auth() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let expected_auth = Credentials::new("admin", "secret").authorization_header();

    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .and(header("authorization", expected_auth.as_str()))
        .and(header("accept", "application/json"))
        .and(body_json(json!({
            "sessionDuration": "5400",
            "directPayment": false,
            "failover": false,
            "fee": "300000000000",
            "stake": "1000000"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionID": "0xsession"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, &dir).with_session_duration(Duration::from_secs(5400));
    let grant = client(config)
        .open_session("model1", Some("1000000"))
        .await
        .unwrap();

    assert_eq!(grant.session_token, "0xsession");
    assert!(grant.expires_at > chrono::Utc::now() + chrono::Duration::minutes(89));
}

#[tokio::test]
async fn test_stake_omitted_when_absent() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionID": "0xs"})))
        .mount(&server)
        .await;

    client(config(&server, &dir))
        .open_session("model1", None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("stake").is_none());
    assert_eq!(body["sessionDuration"], "3600");
}

#[tokio::test]
async fn test_recovers_after_server_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("temporary"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionID": "0xok"})))
        .expect(1)
        .mount(&server)
        .await;

    let grant = client(config(&server, &dir))
        .open_session("model1", None)
        .await
        .unwrap();
    assert_eq!(grant.session_token, "0xok");
}

#[tokio::test]
async fn test_timeout_on_final_attempt() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"sessionID": "0xslow"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = config(&server, &dir)
        .with_max_attempts(1)
        .with_session_timeout(Duration::from_millis(100));
    let err = client(config)
        .open_session("model1", None)
        .await
        .unwrap_err();

    assert!(matches!(err, MarketplaceError::TimedOut { attempts: 1, .. }));
}

#[tokio::test]
async fn test_cookie_file_credentials_win() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cookie = dir.path().join(".cookie");
    std::fs::write(&cookie, "cookieuser:cookiepass\n").unwrap();
    let expected_auth = Credentials::new("cookieuser", "cookiepass").authorization_header();

    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .and(header("authorization", expected_auth.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionID": "0xc"})))
        .expect(2)
        .mount(&server)
        .await;

    let settings = CredentialSettings {
        cookie_path: cookie.clone(),
        ..env_credentials(&dir)
    };
    let client = client(config(&server, &dir).with_credentials(settings));
    client.open_session("model1", None).await.unwrap();

    // Credentials are resolved once; removing the file changes nothing.
    std::fs::remove_file(&cookie).unwrap();
    client.open_session("model1", None).await.unwrap();
}

#[tokio::test]
async fn test_missing_credentials_sends_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = CredentialSettings {
        cookie_path: dir.path().join(".cookie"),
        username: None,
        password: None,
    };
    let err = client(config(&server, &dir).with_credentials(settings))
        .open_session("model1", None)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to set auth: CONSUMER_USERNAME environment variable is required"
    );
}

#[tokio::test]
async fn test_simplified_mode() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionId": "0xsimple"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, &dir).with_api_mode(MarketplaceApiMode::Simplified);
    let grant = client(config).open_session("model1", Some("5")).await.unwrap();
    assert_eq!(grant.session_token, "0xsimple");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_simplified_mode_single_attempt() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, &dir).with_api_mode(MarketplaceApiMode::Simplified);
    let err = client(config).open_session("model1", None).await.unwrap_err();
    assert_eq!(err.attempts(), Some(1));
}
