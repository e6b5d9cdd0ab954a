// ABOUTME: Unified error taxonomy for the Sage 200 client
// ABOUTME: Covers configuration, authorization, token exchange, signing, and API call failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sage 200 client.
//!
//! Every fallible operation in this crate returns [`Sage200Error`]. The
//! taxonomy distinguishes failures the caller can recover from by retrying
//! (transient transport problems) from failures that require operator or
//! end-user action (missing configuration, a consumed or mismatched state
//! code, an exhausted refresh token).

use std::fmt;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Sage200Result<T> = Result<T, Sage200Error>;

/// All error conditions surfaced by the Sage 200 client.
#[derive(Debug, Error)]
pub enum Sage200Error {
    /// A required setting is absent. Raised eagerly when the configuration
    /// is constructed, never lazily mid-request.
    #[error("required setting {0} is not configured")]
    Configuration(String),

    /// The callback carried a state code that does not match the pending
    /// code for this owner, or no code is pending at all.
    #[error("state code is invalid for this owner")]
    InvalidState,

    /// The callback is missing a required query parameter.
    #[error("callback is missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// The token endpoint answered with an `error` body instead of tokens.
    #[error("token endpoint rejected the request: {0}")]
    TokenExchange(String),

    /// No credential exists for the owner, or both the access and refresh
    /// tokens have expired. The authorization flow must be restarted.
    #[error("no valid access or refresh token; authorization must be restarted")]
    Unauthenticated,

    /// A signed API call returned a non-200 status. Carries the full
    /// request and response context for diagnosis.
    #[error("{0}")]
    Api(Box<ApiFailure>),

    /// The credential store rejected a read or write.
    #[error("credential store error: {0}")]
    Storage(String),

    /// The HTTP transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A configured or joined URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A request body or response could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Sage200Error {
    /// Whether this failure is worth retrying.
    ///
    /// Only transport-level timeouts and connection failures qualify.
    /// Authentication, signature, and provider rejections are never
    /// retried: replaying them cannot succeed and may lock the account.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Full diagnostic context for a rejected signed API call.
///
/// Mirrors everything the server saw: the request as sent (URL, headers,
/// body) and the response as received (status, headers, body). Signature
/// faults on the provider side are only debuggable with all of it.
#[derive(Debug, Clone)]
pub struct ApiFailure {
    /// HTTP status returned by the API.
    pub status: u16,
    /// Absolute request URL, including any query string.
    pub url: String,
    /// Headers sent with the request, rendered one per line.
    pub request_headers: String,
    /// Serialized request body, empty for GET/DELETE.
    pub request_body: String,
    /// Headers received with the response, rendered one per line.
    pub response_headers: String,
    /// Raw response body.
    pub response_body: String,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "API call failed with status {}", self.status)?;
        writeln!(f, "URL: {}", self.url)?;
        writeln!(f, "REQUEST HEADERS:\n{}", self.request_headers)?;
        writeln!(f, "REQUEST BODY:\n{}", self.request_body)?;
        writeln!(f, "RESPONSE HEADERS:\n{}", self.response_headers)?;
        write!(f, "RESPONSE BODY:\n{}", self.response_body)
    }
}

impl From<ApiFailure> for Sage200Error {
    fn from(failure: ApiFailure) -> Self {
        Self::Api(Box::new(failure))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn api_failure_display_includes_diagnostics() {
        let failure = ApiFailure {
            status: 500,
            url: "https://api.example.com/sites".into(),
            request_headers: "x-nonce: abc".into(),
            request_body: String::new(),
            response_headers: "content-type: application/json".into(),
            response_body: r#"{"msg":"fail"}"#.into(),
        };

        let rendered = Sage200Error::from(failure).to_string();
        assert!(rendered.contains("status 500"));
        assert!(rendered.contains("https://api.example.com/sites"));
        assert!(rendered.contains(r#"{"msg":"fail"}"#));
    }

    #[test]
    fn only_timeout_and_connect_failures_are_transient() {
        assert!(!Sage200Error::Unauthenticated.is_transient());
        assert!(!Sage200Error::InvalidState.is_transient());
        assert!(!Sage200Error::TokenExchange("invalid_grant".into()).is_transient());
    }
}
