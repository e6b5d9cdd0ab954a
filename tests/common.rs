// ABOUTME: Shared test fixtures for the Sage 200 client integration tests
// ABOUTME: Builds configs pointed at mock servers and seeds credentials with chosen expiries
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs, dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use sage200_client::{
    AuthorizationFlow, Credential, CredentialStore, MemoryStore, Sage200Config, TokenManager,
};
use uuid::Uuid;

/// Configuration pointed at test-controlled endpoints.
pub fn test_config(access_token_url: &str, api_url: &str) -> Sage200Config {
    Sage200Config {
        client_id: "client-id".into(),
        secret_key: "client-secret".into(),
        scope: "sage200".into(),
        signing_key: "signing-secret".into(),
        subscription_key: "sub-key".into(),
        auth_url: "https://signon.example.com/authorise".into(),
        auth_redirect_url: "https://backend.example.com/sage-api/authorise/".into(),
        access_token_url: access_token_url.into(),
        api_url: api_url.into(),
        auth_success_url: "/sage-api/success/".into(),
        http_timeout_secs: 30,
        http_connect_timeout_secs: 10,
    }
}

/// The wired-together component set most tests need.
pub struct Harness {
    pub config: Arc<Sage200Config>,
    pub store: Arc<MemoryStore>,
    pub tokens: Arc<TokenManager>,
    pub flow: AuthorizationFlow,
}

pub fn harness(access_token_url: &str, api_url: &str) -> Harness {
    let config = Arc::new(test_config(access_token_url, api_url));
    let store = Arc::new(MemoryStore::new());
    let store_dyn: Arc<dyn CredentialStore> = store.clone();
    let tokens = Arc::new(TokenManager::new(config.clone(), store_dyn.clone()));
    let flow = AuthorizationFlow::new(config.clone(), store_dyn, tokens.clone());
    Harness {
        config,
        store,
        tokens,
        flow,
    }
}

/// Credential with expiries offset in seconds from now; negative = expired.
pub fn credential(owner: Uuid, access_offset: i64, refresh_offset: i64) -> Credential {
    let now = Utc::now();
    Credential {
        owner,
        access_token: "stored-access-token".into(),
        token_type: "bearer".into(),
        access_token_expires_at: now + Duration::seconds(access_offset),
        refresh_token: "stored-refresh-token".into(),
        refresh_token_expires_at: now + Duration::seconds(refresh_offset),
    }
}
