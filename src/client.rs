// ABOUTME: Signed HTTP client for Sage 200 API resources
// ABOUTME: Resolves relative paths, signs each request, validates responses, retries transient failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed API call pipeline.
//!
//! Each call resolves the resource path against the configured base URL,
//! obtains a currently valid access token from the [`TokenManager`], signs
//! the request, and executes it with bounded timeouts. Only HTTP 200 is a
//! success; anything else surfaces as an [`ApiFailure`](crate::errors::ApiFailure)
//! carrying the full request and response context. Timeouts and connection
//! failures are retried once with a fresh nonce; authentication and
//! signature rejections are never retried.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::Sage200Config;
use crate::errors::{ApiFailure, Sage200Error, Sage200Result};
use crate::http_client::{initialize_shared_client, shared_client};
use crate::oauth::TokenManager;
use crate::signing::RequestSigner;

/// Client for signed Sage 200 API calls on behalf of an owner.
pub struct ApiClient {
    config: Arc<Sage200Config>,
    tokens: Arc<TokenManager>,
    signer: RequestSigner,
}

impl ApiClient {
    /// Create an API client over the shared configuration and token manager.
    #[must_use]
    pub fn new(config: Arc<Sage200Config>, tokens: Arc<TokenManager>) -> Self {
        initialize_shared_client(&config);
        let signer = RequestSigner::new(
            config.signing_key.clone(),
            config.subscription_key.clone(),
        );
        Self {
            config,
            tokens,
            signer,
        }
    }

    /// GET a resource.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`] error conditions.
    pub async fn get(
        &self,
        owner: Uuid,
        path: &str,
        params: &BTreeMap<String, String>,
        site_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Sage200Result<Value> {
        self.execute(owner, Method::GET, path, params, None, site_id, company_id)
            .await
    }

    /// DELETE a resource.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`] error conditions.
    pub async fn delete(
        &self,
        owner: Uuid,
        path: &str,
        params: &BTreeMap<String, String>,
        site_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Sage200Result<Value> {
        self.execute(
            owner,
            Method::DELETE,
            path,
            params,
            None,
            site_id,
            company_id,
        )
        .await
    }

    /// POST a JSON body to a resource.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`] error conditions.
    pub async fn post(
        &self,
        owner: Uuid,
        path: &str,
        params: &BTreeMap<String, String>,
        body: Option<&Value>,
        site_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Sage200Result<Value> {
        self.execute(owner, Method::POST, path, params, body, site_id, company_id)
            .await
    }

    /// PUT a JSON body to a resource.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`] error conditions.
    pub async fn put(
        &self,
        owner: Uuid,
        path: &str,
        params: &BTreeMap<String, String>,
        body: Option<&Value>,
        site_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Sage200Result<Value> {
        self.execute(owner, Method::PUT, path, params, body, site_id, company_id)
            .await
    }

    /// List the Sage 200 sites the credential can reach.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`] error conditions.
    pub async fn list_sites(&self, owner: Uuid) -> Sage200Result<Value> {
        self.get(owner, "accounts/v1/sites", &BTreeMap::new(), None, None)
            .await
    }

    /// Resolve, sign, and execute one API call.
    ///
    /// # Errors
    ///
    /// [`Sage200Error::Unauthenticated`](crate::errors::Sage200Error::Unauthenticated)
    /// when no usable token exists,
    /// [`Sage200Error::Api`](crate::errors::Sage200Error::Api) for any
    /// non-200 response, and transport, URL, or serialization errors as
    /// they occur.
    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        owner: Uuid,
        method: Method,
        path: &str,
        params: &BTreeMap<String, String>,
        body: Option<&Value>,
        site_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Sage200Result<Value> {
        let resource_url = Url::parse(&self.config.api_url)?.join(path)?;
        let credential = self.tokens.valid_credential(owner).await?;

        let payload = if method == Method::POST || method == Method::PUT {
            Some(match body {
                Some(value) => serde_json::to_string(value)?,
                None => "{}".to_owned(),
            })
        } else {
            None
        };

        let mut request_url = resource_url.clone();
        if !params.is_empty() {
            request_url.query_pairs_mut().extend_pairs(params.iter());
        }

        let mut retried = false;
        loop {
            // Signing covers the pre-query resource URL; a retry re-signs
            // with a fresh nonce so the replayed call is not rejected.
            let signed = self.signer.sign(
                &method,
                resource_url.as_str(),
                params,
                payload.as_deref(),
                &credential,
                site_id,
                company_id,
            );
            debug!(%owner, method = %method, url = %request_url, "executing signed API call");

            let mut request = shared_client().request(method.clone(), request_url.clone());
            for (name, value) in &signed.headers {
                request = request.header(*name, value.as_str());
            }
            if let Some(ref payload) = payload {
                request = request.body(payload.clone());
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let error = Sage200Error::from(e);
                    if retried || !error.is_transient() {
                        return Err(error);
                    }
                    warn!(%owner, url = %request_url, error = %error, "transient transport failure, retrying once");
                    retried = true;
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 200 {
                return Ok(response.json().await?);
            }

            let response_headers = render_headers(response.headers());
            let response_body = response.text().await.unwrap_or_default();
            warn!(%owner, url = %request_url, status = status.as_u16(), "API call rejected");

            return Err(ApiFailure {
                status: status.as_u16(),
                url: request_url.to_string(),
                request_headers: signed
                    .headers
                    .iter()
                    .map(|(name, value)| format!("{name}: {value}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
                request_body: payload.clone().unwrap_or_default(),
                response_headers,
                response_body,
            }
            .into());
        }
    }
}

/// Render a response header map one `name: value` per line.
fn render_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join("\n")
}
