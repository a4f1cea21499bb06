//! Integration tests for the full token stack
//!
//! These tests wire the real HTTP transport and system clock into the token
//! manager and drive the provider flows against a local mock server.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use gatekey_application::TokenManager;
use gatekey_domain::{AuthError, Credentials, TokenKind};
use gatekey_infrastructure::{HttpTransport, SystemClock};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager_for(server: &MockServer, kind: TokenKind) -> TokenManager<HttpTransport, SystemClock> {
    let transport =
        HttpTransport::new(Credentials::new("cid", "sec")).with_base_url(server.uri());
    TokenManager::new(transport, SystemClock::new(), kind)
        .with_scopes(["bits:read", "user:read:email"])
}

#[tokio::test]
async fn test_application_token_is_issued_once_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT1",
            "expires_in": 3600,
            "token_type": "bearer",
        })))
        .mount(&server)
        .await;

    let manager = manager_for(&server, TokenKind::Application);

    assert_eq!(
        manager.access_token().await.expect("token issued"),
        "AT1"
    );
    assert_eq!(
        manager.access_token().await.expect("token cached"),
        "AT1"
    );

    // The second call is served from the cached expiry.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_user_flow_from_authorization_link_to_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/authorize"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "https://provider.test/login?client_id=cid"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=real-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT1",
            "refresh_token": "RT1",
            "expires_in": 3600,
            "scope": ["bits:read", "user:read:email"],
            "token_type": "bearer",
        })))
        .mount(&server)
        .await;

    let manager = manager_for(&server, TokenKind::User);

    // No token held and no way to self-heal: the caller is pointed at the
    // provider's consent page.
    let error = manager.access_token().await.expect_err("needs a human");
    let AuthError::NeedsAuthorization { link } = error else {
        panic!("expected NeedsAuthorization, got {error:?}");
    };
    assert_eq!(link, "https://provider.test/login?client_id=cid");

    // The human came back with a code.
    manager.set_code("real-code").await.expect("code exchanged");
    assert_eq!(
        manager.access_token().await.expect("token held"),
        "AT1"
    );
    assert_eq!(manager.refresh_token().await.as_deref(), Some("RT1"));
}

#[tokio::test]
async fn test_seeded_dead_user_token_is_rotated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/validate"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "status": 401,
            "message": "invalid access token",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=RT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT2",
            "refresh_token": "RT2",
            "expires_in": 3600,
            "scope": [],
            "token_type": "bearer",
        })))
        .mount(&server)
        .await;

    let manager = manager_for(&server, TokenKind::User)
        .with_access_token("stale")
        .with_refresh_token("RT1");

    assert_eq!(
        manager.access_token().await.expect("token rotated"),
        "AT2"
    );
    assert_eq!(manager.refresh_token().await.as_deref(), Some("RT2"));
}
