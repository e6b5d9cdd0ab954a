// ABOUTME: Data model for stored Sage 200 credentials and pending authorization state codes
// ABOUTME: Derives token lifecycle status from the two expiry timestamps
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data types: the per-owner credential record, the anti-replay state
//! code, and the derived token lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a credential at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// The access token is still valid and can be used directly.
    Fresh,
    /// The access token has expired but the refresh token has not; a
    /// refresh call can mint a new access token.
    ExpiredRefreshable,
    /// Both tokens have expired; the owner must re-authorize.
    ExpiredTerminal,
}

/// OAuth credential for one owner. At most one record exists per owner;
/// every exchange or refresh replaces the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Identity the tokens belong to.
    pub owner: Uuid,
    /// Short-lived bearer token used on signed API calls.
    pub access_token: String,
    /// Token type as reported by the provider, e.g. "bearer".
    pub token_type: String,
    /// When the access token stops being accepted.
    pub access_token_expires_at: DateTime<Utc>,
    /// Longer-lived token used to mint new access tokens.
    pub refresh_token: String,
    /// When the refresh token stops being accepted.
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl Credential {
    /// Derive the lifecycle status at `now`.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        if self.access_token_expires_at > now {
            TokenStatus::Fresh
        } else if self.refresh_token_expires_at > now {
            TokenStatus::ExpiredRefreshable
        } else {
            TokenStatus::ExpiredTerminal
        }
    }

    /// Token type with the leading character upper-cased, as the
    /// `Authorization` header expects ("bearer" becomes "Bearer").
    #[must_use]
    pub fn authorization_token_type(&self) -> String {
        let mut chars = self.token_type.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        })
    }
}

/// Pending anti-replay code for one owner's in-flight authorization.
/// Consumed exactly once when the callback validates; never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingStateCode {
    /// Identity that started the authorization.
    pub owner: Uuid,
    /// Opaque random code carried through the consent redirect.
    pub code: String,
}

impl PendingStateCode {
    /// Generate a fresh code for `owner`.
    #[must_use]
    pub fn generate(owner: Uuid) -> Self {
        Self {
            owner,
            code: Uuid::new_v4().to_string(),
        }
    }
}
