// ABOUTME: Immutable configuration for the Sage 200 client
// ABOUTME: Built once from environment variables or a literal struct, validated eagerly
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Sage 200 client.
//!
//! [`Sage200Config`] is constructed once and shared (via `Arc`) by the
//! authorization flow, token manager, signer, and API client. Validation is
//! eager: a missing required setting fails `from_env` immediately rather
//! than surfacing mid-request.

use std::env;

use crate::errors::{Sage200Error, Sage200Result};

/// Environment variable prefix for all settings.
const ENV_PREFIX: &str = "SAGE200_";

/// Sage-hosted defaults for the endpoint settings. Overridable for sandbox
/// tenants and tests; the credential settings have no defaults.
const DEFAULT_AUTH_URL: &str =
    "https://signon.sso.services.sage.com/SSO/OAuthService/WebStartAuthorisationAttempt";
const DEFAULT_ACCESS_TOKEN_URL: &str =
    "https://signon.sso.services.sage.com/SSO/OAuthService/WebGetAccessToken";
const DEFAULT_API_URL: &str = "https://api.columbus.sage.com/uk/sage200";
const DEFAULT_AUTH_REDIRECT_URL: &str = "http://127.0.0.1:8000/sage-api/authorise/";
const DEFAULT_AUTH_SUCCESS_URL: &str = "/sage-api/success/";

/// Default outbound call timeouts in seconds.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Immutable settings consumed by every component of the client.
#[derive(Debug, Clone)]
pub struct Sage200Config {
    /// OAuth client ID issued by Sage.
    pub client_id: String,
    /// OAuth client secret issued by Sage.
    pub secret_key: String,
    /// Scope string requested during authorization.
    pub scope: String,
    /// Shared secret for HMAC request signing. Distinct from `secret_key`.
    pub signing_key: String,
    /// Azure API Management subscription key sent with every API call.
    pub subscription_key: String,
    /// Browser-facing authorization (consent) endpoint.
    pub auth_url: String,
    /// Redirect URI registered with Sage for the OAuth callback.
    pub auth_redirect_url: String,
    /// Token endpoint for code exchange and refresh.
    pub access_token_url: String,
    /// Base URL that relative API resource paths resolve against.
    pub api_url: String,
    /// Where the web layer sends the browser after a completed callback.
    pub auth_success_url: String,
    /// Request timeout applied to every outbound call, in seconds.
    pub http_timeout_secs: u64,
    /// Connection timeout applied to every outbound call, in seconds.
    pub http_connect_timeout_secs: u64,
}

impl Sage200Config {
    /// Load configuration from `SAGE200_*` environment variables.
    ///
    /// Endpoint settings fall back to the Sage-hosted defaults; credential
    /// settings (`CLIENT_ID`, `SECRET_KEY`, `SCOPE`, `SIGNING_KEY`,
    /// `SUBSCRIPTION_KEY`) are required.
    ///
    /// # Errors
    ///
    /// Returns [`Sage200Error::Configuration`] naming the first missing
    /// required setting.
    pub fn from_env() -> Sage200Result<Self> {
        Ok(Self {
            client_id: required("CLIENT_ID")?,
            secret_key: required("SECRET_KEY")?,
            scope: required("SCOPE")?,
            signing_key: required("SIGNING_KEY")?,
            subscription_key: required("SUBSCRIPTION_KEY")?,
            auth_url: optional("AUTH_URL", DEFAULT_AUTH_URL),
            auth_redirect_url: optional("AUTH_REDIRECT_URL", DEFAULT_AUTH_REDIRECT_URL),
            access_token_url: optional("ACCESS_TOKEN_URL", DEFAULT_ACCESS_TOKEN_URL),
            api_url: optional("API_URL", DEFAULT_API_URL),
            auth_success_url: optional("AUTH_SUCCESS_URL", DEFAULT_AUTH_SUCCESS_URL),
            http_timeout_secs: optional_u64("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            http_connect_timeout_secs: optional_u64(
                "HTTP_CONNECT_TIMEOUT_SECS",
                DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            )?,
        })
    }
}

/// Read a required setting; empty counts as missing.
fn required(name: &str) -> Sage200Result<String> {
    let key = format!("{ENV_PREFIX}{name}");
    match env::var(&key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Sage200Error::Configuration(key)),
    }
}

/// Read an optional setting with a default.
fn optional(name: &str, default: &str) -> String {
    let key = format!("{ENV_PREFIX}{name}");
    match env::var(&key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_owned(),
    }
}

/// Read an optional numeric setting; a present but unparsable value is a
/// configuration error rather than a silent fallback.
fn optional_u64(name: &str, default: u64) -> Sage200Result<u64> {
    let key = format!("{ENV_PREFIX}{name}");
    match env::var(&key) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| Sage200Error::Configuration(key)),
        _ => Ok(default),
    }
}
