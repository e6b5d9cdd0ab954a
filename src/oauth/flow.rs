// ABOUTME: Browser-facing OAuth authorization flow for Sage 200
// ABOUTME: Builds consent URLs with anti-replay state codes and validates callback parameters
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization flow.
//!
//! The web layer calls [`AuthorizationFlow::authorization_url`] to send the
//! owner's browser to Sage's consent page, then hands the callback's query
//! parameters to [`AuthorizationFlow::handle_callback`]. The state code is
//! single-use: it is consumed atomically on the first matching callback and
//! a replayed or mismatched callback fails without touching credentials.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::Sage200Config;
use crate::errors::{Sage200Error, Sage200Result};
use crate::models::PendingStateCode;
use crate::oauth::TokenManager;
use crate::store::CredentialStore;

/// Drives the consent redirect and callback half of the OAuth flow.
pub struct AuthorizationFlow {
    config: Arc<Sage200Config>,
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenManager>,
}

impl AuthorizationFlow {
    /// Create an authorization flow over the shared components.
    #[must_use]
    pub const fn new(
        config: Arc<Sage200Config>,
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            config,
            store,
            tokens,
        }
    }

    /// Build the provider consent URL for `owner`.
    ///
    /// Reuses the owner's pending state code if one exists, so repeated
    /// calls before the callback completes yield the same `state` value.
    ///
    /// # Errors
    ///
    /// Returns [`Sage200Error::InvalidUrl`] if the configured auth URL is
    /// malformed, and storage errors as they occur.
    pub async fn authorization_url(&self, owner: Uuid) -> Sage200Result<String> {
        let state = match self.store.pending_state(owner).await? {
            Some(pending) => pending,
            None => {
                let fresh = PendingStateCode::generate(owner);
                self.store.put_pending_state(fresh.clone()).await?;
                fresh
            }
        };

        let mut url = Url::parse(&self.config.auth_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("state", &state.code)
            .append_pair("redirect_uri", &self.config.auth_redirect_url)
            .append_pair("scope", &self.config.scope);

        Ok(url.to_string())
    }

    /// Validate the callback state and exchange the authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`Sage200Error::InvalidState`] when no pending code matches
    /// `owner` and `state`; no credential is touched in that case. Exchange
    /// failures propagate from [`TokenManager::exchange_code`].
    pub async fn complete_authorization(
        &self,
        owner: Uuid,
        auth_code: &str,
        state: &str,
    ) -> Sage200Result<()> {
        if self.store.take_pending_state(owner, state).await?.is_none() {
            warn!(%owner, "rejected OAuth callback with invalid state code");
            return Err(Sage200Error::InvalidState);
        }

        self.tokens.exchange_code(owner, auth_code).await?;
        info!(%owner, "completed Sage 200 authorization");
        Ok(())
    }

    /// Entry point for the external web layer's callback endpoint.
    ///
    /// Validates that `code` and `state` are present, completes the
    /// authorization, and returns the configured success URL the web layer
    /// should redirect the browser to.
    ///
    /// # Errors
    ///
    /// Returns [`Sage200Error::MissingParameter`] when `code` or `state`
    /// is absent, plus everything `complete_authorization` can return.
    pub async fn handle_callback(
        &self,
        owner: Uuid,
        code: Option<&str>,
        state: Option<&str>,
    ) -> Sage200Result<String> {
        let code = code
            .filter(|value| !value.is_empty())
            .ok_or(Sage200Error::MissingParameter("code"))?;
        let state = state
            .filter(|value| !value.is_empty())
            .ok_or(Sage200Error::MissingParameter("state"))?;

        self.complete_authorization(owner, code, state).await?;
        Ok(self.config.auth_success_url.clone())
    }
}
