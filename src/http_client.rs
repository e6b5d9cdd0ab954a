// ABOUTME: Shared HTTP client with connection pooling for token and API calls
// ABOUTME: Process-wide singleton whose bounded timeouts come from the Sage 200 configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared outbound HTTP client.
//!
//! Token exchanges and signed API calls all go through one pooled
//! `reqwest::Client` with bounded connect and request timeouts, so a hung
//! provider surfaces as a transient transport error instead of blocking a
//! caller indefinitely.

use reqwest::{Client, ClientBuilder};
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::Sage200Config;

/// Timeouts applied when [`initialize_shared_client`] was never called.
const FALLBACK_TIMEOUTS: (u64, u64) = (30, 10);

static CLIENT_TIMEOUTS: OnceLock<(u64, u64)> = OnceLock::new();
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Pin the shared client's timeouts to the configured values.
///
/// [`TokenManager::new`](crate::oauth::TokenManager::new) and
/// [`ApiClient::new`](crate::client::ApiClient::new) call this with their
/// configuration, so the first constructed component wins. Later calls and
/// calls after the client is built have no effect; without any call the
/// fallback timeouts apply (30s request, 10s connect).
pub fn initialize_shared_client(config: &Sage200Config) {
    let _ = CLIENT_TIMEOUTS.set((config.http_timeout_secs, config.http_connect_timeout_secs));
}

/// The pooled HTTP client used for every outbound call.
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        let (timeout, connect_timeout) =
            CLIENT_TIMEOUTS.get().copied().unwrap_or(FALLBACK_TIMEOUTS);

        ClientBuilder::new()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(connect_timeout))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}
