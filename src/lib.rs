// ABOUTME: Main library entry point for the Sage 200 API client
// ABOUTME: OAuth2 token lifecycle plus HMAC-signed request pipeline for Sage 200 resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Sage 200 client
//!
//! An OAuth2 client for the Sage 200 accounting API. Sage layers a custom
//! HMAC-SHA1 request signature on top of the bearer token, so every API
//! call goes through a signing pipeline in addition to normal token
//! handling.
//!
//! ## Components
//!
//! - [`oauth::AuthorizationFlow`] — consent URL generation and callback
//!   validation with single-use anti-replay state codes
//! - [`oauth::TokenManager`] — code exchange, refresh, and serving a
//!   currently valid access token (refresh is single-flight per owner)
//! - [`signing::RequestSigner`] — per-request HMAC-SHA1 signatures and the
//!   authenticated header set
//! - [`client::ApiClient`] — signed `get`/`post`/`put`/`delete` against
//!   resources resolved from the configured base URL
//! - [`store::CredentialStore`] — keyed persistence trait; bring your own
//!   backend or use [`store::MemoryStore`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sage200_client::{
//!     client::ApiClient, config::Sage200Config, oauth::TokenManager, store::MemoryStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Sage200Config::from_env()?);
//!     let store = Arc::new(MemoryStore::new());
//!     let tokens = Arc::new(TokenManager::new(config.clone(), store));
//!     let api = ApiClient::new(config, tokens);
//!
//!     let owner = uuid::Uuid::new_v4();
//!     let sites = api.list_sites(owner).await?;
//!     println!("{sites}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod http_client;
pub mod models;
pub mod oauth;
pub mod signing;
pub mod store;

pub use client::ApiClient;
pub use config::Sage200Config;
pub use errors::{ApiFailure, Sage200Error, Sage200Result};
pub use models::{Credential, PendingStateCode, TokenStatus};
pub use oauth::{AuthorizationFlow, TokenManager};
pub use signing::RequestSigner;
pub use store::{CredentialStore, MemoryStore};
