// ABOUTME: Token lifecycle management for per-owner Sage 200 credentials
// ABOUTME: Exchanges authorization codes, refreshes expired tokens with per-owner single-flight
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token lifecycle manager.
//!
//! Exchanges authorization codes and refresh tokens at the Sage SSO token
//! endpoint and keeps exactly one credential per owner in the store.
//! Refresh is serialized per owner: concurrent callers that all observe an
//! expired access token collapse into a single network call, because Sage
//! rotates the refresh token on use and a second refresh with the stale
//! token would fail.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Sage200Config;
use crate::errors::{Sage200Error, Sage200Result};
use crate::http_client::{initialize_shared_client, shared_client};
use crate::models::{Credential, TokenStatus};
use crate::store::CredentialStore;

/// Manages per-owner OAuth credentials against the Sage token endpoint.
pub struct TokenManager {
    config: Arc<Sage200Config>,
    store: Arc<dyn CredentialStore>,
    refresh_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Token endpoint response. Sage answers 200 for failures too, with an
/// `error` field instead of tokens, so every field is optional here and
/// validated explicitly.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    error: Option<String>,
    error_description: Option<String>,
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    refresh_token_expires_in: Option<i64>,
}

impl TokenManager {
    /// Create a token manager over the given configuration and store.
    #[must_use]
    pub fn new(config: Arc<Sage200Config>, store: Arc<dyn CredentialStore>) -> Self {
        initialize_shared_client(&config);
        Self {
            config,
            store,
            refresh_locks: DashMap::new(),
        }
    }

    /// Exchange an authorization code for the owner's first credential.
    ///
    /// # Errors
    ///
    /// Returns [`Sage200Error::TokenExchange`] when the endpoint answers
    /// with an `error` body or a malformed grant, and transport or storage
    /// errors as they occur.
    pub async fn exchange_code(&self, owner: Uuid, auth_code: &str) -> Sage200Result<Credential> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", auth_code),
            ("redirect_uri", self.config.auth_redirect_url.as_str()),
        ];

        let credential = self.request_and_persist(owner, &params).await?;
        info!(%owner, "created Sage 200 credential from authorization code");
        Ok(credential)
    }

    /// Refresh the owner's access token using the stored refresh token.
    ///
    /// Serialized per owner; a caller that waited on another refresh gets
    /// the already-renewed credential without a second network call.
    ///
    /// # Errors
    ///
    /// Returns [`Sage200Error::Unauthenticated`] when no credential exists,
    /// [`Sage200Error::TokenExchange`] when the endpoint rejects the
    /// refresh token, and transport or storage errors as they occur.
    pub async fn refresh(&self, owner: Uuid) -> Sage200Result<Credential> {
        let lock = self.refresh_lock(owner);
        let _guard = lock.lock().await;
        self.refresh_locked(owner).await
    }

    /// Return a credential whose access token is currently valid,
    /// refreshing it first if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`Sage200Error::Unauthenticated`] when no credential exists
    /// or both tokens have expired; in that case no network call is made
    /// and the caller must restart the authorization flow.
    pub async fn valid_credential(&self, owner: Uuid) -> Sage200Result<Credential> {
        let credential = self
            .store
            .credential(owner)
            .await?
            .ok_or(Sage200Error::Unauthenticated)?;

        match credential.status(Utc::now()) {
            TokenStatus::Fresh => {
                debug!(%owner, "access token still valid");
                Ok(credential)
            }
            TokenStatus::ExpiredRefreshable => {
                let lock = self.refresh_lock(owner);
                let _guard = lock.lock().await;

                // Re-read under the lock: a racing caller may have already
                // refreshed while this one waited.
                let current = self
                    .store
                    .credential(owner)
                    .await?
                    .ok_or(Sage200Error::Unauthenticated)?;
                match current.status(Utc::now()) {
                    TokenStatus::Fresh => Ok(current),
                    TokenStatus::ExpiredRefreshable => self.refresh_locked(owner).await,
                    TokenStatus::ExpiredTerminal => Err(Sage200Error::Unauthenticated),
                }
            }
            TokenStatus::ExpiredTerminal => Err(Sage200Error::Unauthenticated),
        }
    }

    /// Return a currently valid access token for the owner.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TokenManager::valid_credential`].
    pub async fn get_valid_access_token(&self, owner: Uuid) -> Sage200Result<String> {
        Ok(self.valid_credential(owner).await?.access_token)
    }

    /// Refresh assuming the per-owner lock is already held.
    async fn refresh_locked(&self, owner: Uuid) -> Sage200Result<Credential> {
        let credential = self
            .store
            .credential(owner)
            .await?
            .ok_or(Sage200Error::Unauthenticated)?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", credential.refresh_token.as_str()),
        ];

        let refreshed = self.request_and_persist(owner, &params).await?;
        info!(
            %owner,
            expires_at = %refreshed.access_token_expires_at,
            "refreshed Sage 200 access token"
        );
        Ok(refreshed)
    }

    /// POST a grant request to the token endpoint and persist the result.
    async fn request_and_persist(
        &self,
        owner: Uuid,
        params: &[(&str, &str)],
    ) -> Sage200Result<Credential> {
        let basic =
            STANDARD.encode(format!("{}:{}", self.config.client_id, self.config.secret_key));

        let response: TokenEndpointResponse = shared_client()
            .post(&self.config.access_token_url)
            .header("Authorization", format!("Basic {basic}"))
            .form(params)
            .send()
            .await?
            .json()
            .await?;

        let credential = credential_from_response(owner, response)?;
        self.store.upsert_credential(credential.clone()).await?;
        Ok(credential)
    }

    fn refresh_lock(&self, owner: Uuid) -> Arc<Mutex<()>> {
        self.refresh_locks.entry(owner).or_default().clone()
    }
}

/// Turn a token endpoint response into a stored credential, surfacing
/// provider errors explicitly instead of ignoring them.
fn credential_from_response(
    owner: Uuid,
    response: TokenEndpointResponse,
) -> Sage200Result<Credential> {
    if let Some(error) = response.error {
        let detail = response
            .error_description
            .map_or_else(|| error.clone(), |description| format!("{error}: {description}"));
        return Err(Sage200Error::TokenExchange(detail));
    }

    let now = Utc::now();
    match (
        response.access_token,
        response.token_type,
        response.expires_in,
        response.refresh_token,
        response.refresh_token_expires_in,
    ) {
        (
            Some(access_token),
            Some(token_type),
            Some(expires_in),
            Some(refresh_token),
            Some(refresh_expires_in),
        ) => Ok(Credential {
            owner,
            access_token,
            token_type,
            access_token_expires_at: now + Duration::seconds(expires_in),
            refresh_token,
            refresh_token_expires_at: now + Duration::seconds(refresh_expires_in),
        }),
        _ => Err(Sage200Error::TokenExchange(
            "token endpoint response is missing required fields".to_owned(),
        )),
    }
}
