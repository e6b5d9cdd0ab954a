// ABOUTME: Integration tests for the token lifecycle manager
// ABOUTME: Validates exchange, refresh gating, terminal expiry, and single-flight refresh under races
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::{Duration, Utc};
use sage200_client::{CredentialStore, Sage200Error};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": refresh,
        "refresh_token_expires_in": 86400
    })
}

#[tokio::test]
async fn exchange_code_persists_credential_with_mapped_expiries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("abc", "r1")))
        .expect(1)
        .mount(&server)
        .await;

    let h = common::harness(&format!("{}/token", server.uri()), "https://api.example.com/");
    let owner = Uuid::new_v4();

    let before = Utc::now();
    let credential = h.tokens.exchange_code(owner, "auth-code").await.unwrap();

    assert_eq!(credential.access_token, "abc");
    assert_eq!(credential.token_type, "bearer");
    assert_eq!(credential.refresh_token, "r1");
    assert!(credential.access_token_expires_at >= before + Duration::seconds(3600));
    assert!(credential.refresh_token_expires_at >= before + Duration::seconds(86400));

    // A fresh credential is served from the store without another call.
    let token = h.tokens.get_valid_access_token(owner).await.unwrap();
    assert_eq!(token, "abc");
}

#[tokio::test]
async fn error_body_surfaces_as_token_exchange_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "authorization code expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = common::harness(&format!("{}/token", server.uri()), "https://api.example.com/");
    let owner = Uuid::new_v4();

    let err = h.tokens.exchange_code(owner, "stale-code").await.unwrap_err();
    assert!(matches!(err, Sage200Error::TokenExchange(_)));
    assert!(h.store.credential(owner).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_access_token_triggers_exactly_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("renewed", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let h = common::harness(&format!("{}/token", server.uri()), "https://api.example.com/");
    let owner = Uuid::new_v4();
    h.store
        .upsert_credential(common::credential(owner, -60, 86400))
        .await
        .unwrap();

    let token = h.tokens.get_valid_access_token(owner).await.unwrap();
    assert_eq!(token, "renewed");

    // The renewed credential is now fresh; no second refresh happens.
    let token = h.tokens.get_valid_access_token(owner).await.unwrap();
    assert_eq!(token, "renewed");
}

#[tokio::test]
async fn terminal_expiry_returns_unauthenticated_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("x", "y")))
        .expect(0)
        .mount(&server)
        .await;

    let h = common::harness(&format!("{}/token", server.uri()), "https://api.example.com/");
    let owner = Uuid::new_v4();
    h.store
        .upsert_credential(common::credential(owner, -7200, -60))
        .await
        .unwrap();

    let err = h.tokens.get_valid_access_token(owner).await.unwrap_err();
    assert!(matches!(err, Sage200Error::Unauthenticated));
}

#[tokio::test]
async fn unknown_owner_returns_unauthenticated() {
    let h = common::harness("https://token.example.com", "https://api.example.com/");
    let err = h
        .tokens
        .get_valid_access_token(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, Sage200Error::Unauthenticated));
}

#[tokio::test]
async fn concurrent_expiry_races_collapse_into_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("renewed", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let h = common::harness(&format!("{}/token", server.uri()), "https://api.example.com/");
    let owner = Uuid::new_v4();
    h.store
        .upsert_credential(common::credential(owner, -60, 86400))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let tokens = h.tokens.clone();
        handles.push(tokio::spawn(async move {
            tokens.get_valid_access_token(owner).await
        }));
    }

    for handle in handles {
        let token = handle.await.unwrap().unwrap();
        assert_eq!(token, "renewed");
    }
}
