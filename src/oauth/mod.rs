// ABOUTME: OAuth module organizing the authorization flow and token lifecycle management
// ABOUTME: Covers consent URL generation, callback validation, code exchange, and refresh
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 flow against the Sage SSO service.
//!
//! [`flow::AuthorizationFlow`] owns the browser-facing half: building the
//! consent URL with an anti-replay state code and validating the callback.
//! [`token_manager::TokenManager`] owns the token lifecycle: exchanging
//! authorization codes, refreshing expired access tokens, and serving a
//! currently valid token to the API client.

pub mod flow;
pub mod token_manager;

pub use flow::AuthorizationFlow;
pub use token_manager::TokenManager;
